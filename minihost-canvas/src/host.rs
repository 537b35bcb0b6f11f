//! The host root that wires injected capabilities together.

use std::sync::Arc;

use minihost_core::{
    InMemoryPermissions, PermissionAccessor, StaticSystemInfo, SystemInfo, SystemInfoAccessor,
};

use crate::backend::{BackendProvider, SoftwareProvider};
use crate::config::HostConfig;
use crate::context::ContextKind;
use crate::export::SnapshotExporter;
use crate::queue::{ExportQueue, ExportWorker};
use crate::store::TempFileStore;
use crate::surface::CanvasSurface;

/// Owns the host's capabilities and creates canvases.
///
/// Nothing here is global: every collaborator is passed in, so tests and
/// embedders can substitute their own backend or accessors.
pub struct Host {
    config: HostConfig,
    backends: Arc<dyn BackendProvider>,
    system_info: Arc<dyn SystemInfoAccessor>,
    permissions: Arc<dyn PermissionAccessor>,
    exporter: Arc<SnapshotExporter>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Create a host from explicit collaborators.
    #[must_use]
    pub fn new(
        config: HostConfig,
        backends: Arc<dyn BackendProvider>,
        system_info: Arc<dyn SystemInfoAccessor>,
        permissions: Arc<dyn PermissionAccessor>,
    ) -> Self {
        let exporter = Arc::new(
            SnapshotExporter::new(
                TempFileStore::new(config.temp_dir.clone()),
                config.jpeg_background,
            )
            .with_max_pixels(config.max_export_pixels),
        );
        Self {
            config,
            backends,
            system_info,
            permissions,
            exporter,
        }
    }

    /// Create a host with the software backend and in-memory accessors.
    #[must_use]
    pub fn with_defaults(config: HostConfig) -> Self {
        Self::with_permissions(config, Arc::new(InMemoryPermissions::new()))
    }

    /// Like [`Host::with_defaults`], with a caller-supplied permission accessor.
    ///
    /// System info reports the configured default size as the window.
    #[must_use]
    pub fn with_permissions(config: HostConfig, permissions: Arc<dyn PermissionAccessor>) -> Self {
        let info = SystemInfo {
            window_width: config.default_width,
            window_height: config.default_height,
            ..SystemInfo::default()
        };
        Self::new(
            config,
            Arc::new(SoftwareProvider),
            Arc::new(StaticSystemInfo::new(info)),
            permissions,
        )
    }

    /// Host configuration.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// System info accessor.
    #[must_use]
    pub fn system_info(&self) -> Arc<dyn SystemInfoAccessor> {
        Arc::clone(&self.system_info)
    }

    /// Permission accessor.
    #[must_use]
    pub fn permissions(&self) -> Arc<dyn PermissionAccessor> {
        Arc::clone(&self.permissions)
    }

    /// Snapshot exporter writing into the configured temp directory.
    #[must_use]
    pub fn exporter(&self) -> &Arc<SnapshotExporter> {
        &self.exporter
    }

    /// Create an export queue and its worker over this host's exporter.
    #[must_use]
    pub fn export_queue(&self) -> (ExportQueue, ExportWorker) {
        ExportQueue::new(Arc::clone(&self.exporter))
    }

    /// Create a canvas sized to the window reported by system info.
    ///
    /// Falls back to the configured default size if system info fails.
    #[must_use]
    pub fn create_canvas(&self, kind: ContextKind) -> CanvasSurface {
        let (width, height) = match self.system_info.system_info_sync() {
            Ok(info) => (info.window_width, info.window_height),
            Err(e) => {
                tracing::warn!("System info unavailable, using default canvas size: {e}");
                (self.config.default_width, self.config.default_height)
            }
        };
        self.create_canvas_with_size(kind, width, height)
    }

    /// Create a canvas with explicit dimensions.
    #[must_use]
    pub fn create_canvas_with_size(&self, kind: ContextKind, width: u32, height: u32) -> CanvasSurface {
        CanvasSurface::new(self.backends.create_backend(), kind, width, height)
            .with_pixel_limit(self.config.max_export_pixels)
    }
}
