//! Integration tests for canvas surfaces and snapshot export.

use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use minihost_canvas::{
    BackendError, BackendResult, BufferId, CanvasError, CanvasSurface, Color, ContextAttributes,
    ContextKind, DrawCommand, Host, HostConfig, ImageFileType, PixelRegion, RenderBackend,
    SnapshotRequest, SoftwareBackend,
};

fn host(dir: &std::path::Path) -> Host {
    Host::with_defaults(HostConfig::default().with_temp_dir(dir))
}

// ============================================================================
// End-to-end export
// ============================================================================

#[test]
fn test_fill_then_export_scaled_region() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let mut canvas = host.create_canvas_with_size(ContextKind::TwoD, 100, 100);
    let fill = Color::rgb(30, 144, 255);

    {
        let mut ctx = canvas.context_2d().expect("2d");
        ctx.set_fill_style(fill);
        ctx.fill_rect(0.0, 0.0, 50.0, 50.0).expect("fill");
    }

    let request = SnapshotRequest::new()
        .with_region(0, 0, 50, 50)
        .with_dest_size(25, 25)
        .with_file_type(ImageFileType::Png);
    let result = host
        .exporter()
        .export_sync(&canvas, &request)
        .expect("export");

    let decoded = image::open(&result.temp_file_path)
        .expect("decode")
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (25, 25));
    let expected = Rgba([fill.r, fill.g, fill.b, fill.a]);
    assert!(decoded.pixels().all(|p| *p == expected));
}

#[test]
fn test_png_round_trip_matches_back_buffer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let mut canvas = host.create_canvas_with_size(ContextKind::TwoD, 16, 12);

    let pattern = RgbaImage::from_fn(16, 12, |x, y| {
        Rgba([(x * 16) as u8, (y * 20) as u8, ((x + y) * 7) as u8, 255])
    });
    canvas
        .context_2d()
        .expect("2d")
        .put_image_data(&pattern, 0, 0)
        .expect("put");

    for (x, y, w, h) in [(0, 0, 16, 12), (3, 2, 5, 7), (15, 11, 1, 1), (0, 6, 16, 6)] {
        let expected = canvas
            .read_pixels(PixelRegion::new(x, y, w, h))
            .expect("read");
        let result = host
            .exporter()
            .export_sync(&canvas, &SnapshotRequest::new().with_region(x, y, w, h))
            .expect("export");
        let decoded = image::open(&result.temp_file_path)
            .expect("decode")
            .to_rgba8();
        assert_eq!(decoded, expected, "region ({x}, {y}, {w}, {h})");
    }
}

#[test]
fn test_out_of_range_quality_encodes_as_full_quality() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let mut canvas = host.create_canvas_with_size(ContextKind::TwoD, 32, 32);
    {
        let mut ctx = canvas.context_2d().expect("2d");
        ctx.set_fill_style(Color::rgb(200, 50, 20));
        ctx.fill_rect(4.0, 4.0, 20.0, 11.0).expect("fill");
    }

    let exporter = host.exporter();
    let encode = |quality: Option<f32>| {
        exporter
            .to_data_url_as(&canvas, ImageFileType::Jpg, quality)
            .expect("jpeg")
    };
    let full = encode(Some(1.0));
    assert_eq!(encode(None), full);
    assert_eq!(encode(Some(0.0)), full);
    assert_eq!(encode(Some(7.5)), full);
    assert_eq!(encode(Some(-1.0)), full);
    assert_ne!(encode(Some(0.1)), full);
}

#[test]
fn test_export_rejects_regions_outside_surface() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let canvas = host.create_canvas_with_size(ContextKind::TwoD, 10, 10);

    for request in [
        SnapshotRequest::new().with_region(5, 5, 6, 5),
        SnapshotRequest::new().with_region(10, 0, 1, 1),
        SnapshotRequest::new().with_region(0, 0, 0, 0),
    ] {
        let err = host
            .exporter()
            .export_sync(&canvas, &request)
            .expect_err("invalid region");
        assert!(matches!(err, CanvasError::InvalidRegion(_)));
    }
}

#[test]
fn test_unknown_format_is_unsupported() {
    let err = "bmp".parse::<ImageFileType>().expect_err("bmp");
    assert!(matches!(err, CanvasError::UnsupportedFormat(_)));

    let err = serde_json::from_str::<SnapshotRequest>(r#"{"fileType": "tiff"}"#)
        .expect_err("tiff");
    assert!(err.to_string().contains("Unsupported format"));
}

// ============================================================================
// Context acquisition
// ============================================================================

#[test]
fn test_acquire_twice_returns_same_buffer() {
    let mut canvas =
        CanvasSurface::new(Box::new(SoftwareBackend::new()), ContextKind::TwoD, 8, 8);
    let first = canvas.context_2d().expect("first").buffer_id();
    let second = canvas.context_2d().expect("second").buffer_id();
    assert_eq!(first, second);
}

#[test]
fn test_webgl_on_2d_surface_conflicts_and_2d_stays_usable() {
    let mut canvas =
        CanvasSurface::new(Box::new(SoftwareBackend::new()), ContextKind::TwoD, 8, 8);
    let buffer = canvas.context_2d().expect("2d").buffer_id();

    let err = canvas
        .get_context(ContextKind::WebGl, &ContextAttributes::default())
        .expect_err("conflict");
    assert!(matches!(
        err,
        CanvasError::ContextConflict {
            bound: ContextKind::TwoD,
            requested: ContextKind::WebGl,
        }
    ));

    let mut ctx = canvas.context_2d().expect("2d after conflict");
    assert_eq!(ctx.buffer_id(), buffer);
    ctx.fill_rect(0.0, 0.0, 8.0, 8.0).expect("fill");
    let pixels = ctx.get_image_data(0, 0, 8, 8).expect("read");
    assert!(pixels.pixels().all(|p| p[3] == 255));
}

// ============================================================================
// Backend capability
// ============================================================================

/// Records every call and delegates to the software backend.
struct RecordingBackend {
    inner: SoftwareBackend,
    log: Arc<Mutex<Vec<String>>>,
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn allocate_buffer(&mut self, width: u32, height: u32) -> BackendResult<BufferId> {
        self.log
            .lock()
            .expect("lock")
            .push(format!("allocate {width}x{height}"));
        self.inner.allocate_buffer(width, height)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.log.lock().expect("lock").push("release".to_string());
        self.inner.release_buffer(buffer);
    }

    fn bind_context(
        &mut self,
        buffer: BufferId,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> BackendResult<()> {
        self.log.lock().expect("lock").push(format!("bind {kind}"));
        self.inner.bind_context(buffer, kind, attributes)
    }

    fn draw_primitive(&mut self, buffer: BufferId, command: &DrawCommand) -> BackendResult<()> {
        let entry = match command {
            DrawCommand::FillRect { .. } => "fill",
            DrawCommand::ClearRect { .. } => "clear",
            _ => "other",
        };
        self.log.lock().expect("lock").push(entry.to_string());
        self.inner.draw_primitive(buffer, command)
    }

    fn read_pixels(&self, buffer: BufferId, region: PixelRegion) -> BackendResult<RgbaImage> {
        self.log.lock().expect("lock").push("read".to_string());
        self.inner.read_pixels(buffer, region)
    }
}

#[test]
fn test_draws_forwarded_immediately_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = RecordingBackend {
        inner: SoftwareBackend::new(),
        log: Arc::clone(&log),
    };
    let mut canvas = CanvasSurface::new(Box::new(backend), ContextKind::TwoD, 6, 4);

    {
        let mut ctx = canvas.context_2d().expect("2d");
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).expect("fill");
        assert_eq!(
            log.lock().expect("lock").last().map(String::as_str),
            Some("fill")
        );
        ctx.clear_rect(0.0, 0.0, 1.0, 1.0).expect("clear");
    }
    drop(canvas);

    assert_eq!(
        *log.lock().expect("lock"),
        vec!["allocate 6x4", "bind 2d", "fill", "clear", "release"]
    );
}

/// A backend whose read-back always fails.
struct BrokenReadBack(SoftwareBackend);

impl RenderBackend for BrokenReadBack {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn allocate_buffer(&mut self, width: u32, height: u32) -> BackendResult<BufferId> {
        self.0.allocate_buffer(width, height)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.0.release_buffer(buffer);
    }

    fn bind_context(
        &mut self,
        buffer: BufferId,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> BackendResult<()> {
        self.0.bind_context(buffer, kind, attributes)
    }

    fn draw_primitive(&mut self, buffer: BufferId, command: &DrawCommand) -> BackendResult<()> {
        self.0.draw_primitive(buffer, command)
    }

    fn read_pixels(&self, _buffer: BufferId, _region: PixelRegion) -> BackendResult<RgbaImage> {
        Err(BackendError::ReadBack("device lost".to_string()))
    }
}

#[test]
fn test_backend_read_failure_is_render_backend_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let mut canvas = CanvasSurface::new(
        Box::new(BrokenReadBack(SoftwareBackend::new())),
        ContextKind::TwoD,
        4,
        4,
    );
    canvas.context_2d().expect("2d");

    let err = host
        .exporter()
        .export_sync(&canvas, &SnapshotRequest::new())
        .expect_err("read-back failure");
    assert!(matches!(err, CanvasError::RenderBackend(BackendError::ReadBack(_))));
    assert_eq!(std::fs::read_dir(dir.path()).map_or(0, Iterator::count), 0);
}

// ============================================================================
// Asynchronous export
// ============================================================================

#[tokio::test]
async fn test_async_export_observes_prior_draws_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let (queue, worker) = host.export_queue();
    let worker = tokio::spawn(worker.run());

    let mut canvas = host.create_canvas_with_size(ContextKind::TwoD, 4, 4);
    {
        let mut ctx = canvas.context_2d().expect("2d");
        ctx.set_fill_style(Color::rgb(0, 255, 0));
        ctx.fill_rect(0.0, 0.0, 4.0, 4.0).expect("fill");
    }
    let pending = queue.export_future(&canvas, &SnapshotRequest::new());
    {
        let mut ctx = canvas.context_2d().expect("2d");
        ctx.set_fill_style(Color::rgb(255, 0, 0));
        ctx.fill_rect(0.0, 0.0, 4.0, 4.0).expect("fill");
    }

    let result = pending.await.expect("export");
    let decoded = image::open(&result.temp_file_path)
        .expect("decode")
        .to_rgba8();
    assert!(decoded.pixels().all(|p| *p == Rgba([0, 255, 0, 255])));

    drop(queue);
    worker.await.expect("worker");
}

#[tokio::test]
async fn test_async_callbacks_fire_once_each_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = host(dir.path());
    let (queue, mut worker) = host.export_queue();
    let canvas = host.create_canvas_with_size(ContextKind::TwoD, 4, 4);
    let log: Arc<Mutex<Vec<(usize, bool)>>> = Arc::new(Mutex::new(Vec::new()));

    let requests = [
        SnapshotRequest::new(),
        SnapshotRequest::new().with_region(0, 0, 5, 5),
        SnapshotRequest::new().with_file_type(ImageFileType::Jpg),
    ];
    for (i, request) in requests.iter().enumerate() {
        let log = Arc::clone(&log);
        queue.export(&canvas, request, move |outcome| {
            log.lock().expect("lock").push((i, outcome.is_ok()));
        });
    }

    assert_eq!(worker.run_pending().await, 3);
    drop(queue);
    drop(worker);
    assert_eq!(
        *log.lock().expect("lock"),
        vec![(0, true), (1, false), (2, true)]
    );
}
