//! Asynchronous export.
//!
//! [`ExportQueue::export`] captures pixels immediately and hands encoding
//! and file I/O to an [`ExportWorker`]. The worker processes jobs one at a
//! time in submission order, so callbacks fire in arrival order and never
//! concurrently with each other. Every callback fires exactly once: with the
//! export result, or with [`CanvasError::ExportWorkerClosed`] if the worker
//! goes away first. A callback never runs inside the `export` call that
//! submitted it.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::{CanvasError, CanvasResult};
use crate::export::{Snapshot, SnapshotExporter, SnapshotRequest, TempFileResult};
use crate::surface::CanvasSurface;

/// Result delivered to an export callback.
pub type ExportOutcome = CanvasResult<TempFileResult>;

/// Completion callback for an asynchronous export.
pub type ExportCallback = Box<dyn FnOnce(ExportOutcome) + Send>;

/// Fires its callback exactly once, on completion or on drop.
struct Completion {
    callback: Option<ExportCallback>,
}

impl Completion {
    fn new(callback: ExportCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn complete(mut self, outcome: ExportOutcome) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Err(CanvasError::ExportWorkerClosed));
        }
    }
}

struct ExportJob {
    snapshot: CanvasResult<Snapshot>,
    completion: Completion,
}

/// Submits exports to an [`ExportWorker`].
#[derive(Clone)]
pub struct ExportQueue {
    tx: mpsc::UnboundedSender<ExportJob>,
    exporter: Arc<SnapshotExporter>,
}

impl std::fmt::Debug for ExportQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportQueue")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl ExportQueue {
    /// Create a queue and the worker that drains it.
    #[must_use]
    pub fn new(exporter: Arc<SnapshotExporter>) -> (Self, ExportWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ExportWorker {
            rx,
            exporter: Arc::clone(&exporter),
        };
        (Self { tx, exporter }, worker)
    }

    /// The exporter shared with the worker.
    #[must_use]
    pub fn exporter(&self) -> &Arc<SnapshotExporter> {
        &self.exporter
    }

    /// Export a surface region to a temp file and report through `callback`.
    ///
    /// The region is read back before this returns; the callback fires later
    /// from the worker, even when the request is invalid. If the worker is
    /// already gone the callback receives [`CanvasError::ExportWorkerClosed`]
    /// from a spawned task instead.
    pub fn export<F>(&self, surface: &CanvasSurface, request: &SnapshotRequest, callback: F)
    where
        F: FnOnce(ExportOutcome) + Send + 'static,
    {
        let job = ExportJob {
            snapshot: self.exporter.capture(surface, request),
            completion: Completion::new(Box::new(callback)),
        };
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            tracing::warn!("Export worker closed; failing export for canvas {}", surface.id());
            fail_later(job);
        }
    }

    /// Export and await the outcome.
    ///
    /// The region is read back before this returns, so the future can be
    /// awaited after further drawing without observing it.
    pub fn export_future(
        &self,
        surface: &CanvasSurface,
        request: &SnapshotRequest,
    ) -> impl Future<Output = ExportOutcome> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.export(surface, request, move |outcome| {
            let _ = tx.send(outcome);
        });
        async move { rx.await.unwrap_or(Err(CanvasError::ExportWorkerClosed)) }
    }
}

/// Complete a job the worker never received, off the caller's stack.
fn fail_later(job: ExportJob) {
    let complete = move || job.completion.complete(Err(CanvasError::ExportWorkerClosed));
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { complete() });
        }
        Err(_) => {
            std::thread::spawn(complete);
        }
    }
}

/// Drains an [`ExportQueue`], encoding and writing one job at a time.
pub struct ExportWorker {
    rx: mpsc::UnboundedReceiver<ExportJob>,
    exporter: Arc<SnapshotExporter>,
}

impl std::fmt::Debug for ExportWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportWorker")
            .field("pending", &self.rx.len())
            .finish_non_exhaustive()
    }
}

impl ExportWorker {
    /// Process jobs until every [`ExportQueue`] handle is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            self.process(job).await;
        }
        tracing::debug!("Export worker stopped");
    }

    /// Process the jobs already queued and return how many ran.
    pub async fn run_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.process(job).await;
            processed += 1;
        }
        processed
    }

    async fn process(&self, job: ExportJob) {
        let outcome = match job.snapshot {
            Ok(snapshot) => {
                let exporter = Arc::clone(&self.exporter);
                tokio::task::spawn_blocking(move || exporter.persist_snapshot(&snapshot))
                    .await
                    .unwrap_or_else(|e| Err(CanvasError::Encode(format!("export task failed: {e}"))))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            tracing::warn!("Export failed: {e}");
        }
        job.completion.complete(outcome);
    }
}
