//! # Minihost Canvas
//!
//! Canvas surfaces for the minihost application host.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   Host                      │
//! │  config · backend provider · accessors      │
//! ├──────────────────────┬──────────────────────┤
//! │   CanvasSurface      │  SnapshotExporter    │
//! │   - ContextRegistry  │  - capture/resample  │
//! │   - Context2d        │  - PNG/JPEG encode   │
//! │   - WebGlContext     │  - TempFileStore     │
//! │   - listeners        │  - ExportQueue       │
//! ├──────────────────────┴──────────────────────┤
//! │        RenderBackend (software: tiny-skia)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use minihost_canvas::{Color, ContextKind, Host, HostConfig, SnapshotRequest};
//!
//! let host = Host::with_defaults(HostConfig::default());
//! let mut canvas = host.create_canvas_with_size(ContextKind::TwoD, 100, 100);
//!
//! let mut ctx = canvas.context_2d().unwrap();
//! ctx.set_fill_style(Color::rgb(255, 0, 0));
//! ctx.fill_rect(0.0, 0.0, 50.0, 50.0).unwrap();
//!
//! let uri = host.exporter().to_data_url(&canvas).unwrap();
//! assert!(uri.starts_with("data:image/png;base64,"));
//!
//! let snapshot = host
//!     .exporter()
//!     .capture(&canvas, &SnapshotRequest::new().with_region(0, 0, 50, 50))
//!     .unwrap();
//! assert_eq!(snapshot.image.dimensions(), (50, 50));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod context;
pub mod context2d;
pub mod error;
pub mod export;
pub mod host;
pub mod queue;
pub mod store;
pub mod surface;
pub mod webgl;

pub use backend::{
    BackendError, BackendProvider, BackendResult, BufferId, Color, DrawCommand, PixelRegion,
    RectF, RenderBackend, SoftwareBackend, SoftwareProvider,
};
pub use config::{HostConfig, DEFAULT_MAX_EXPORT_PIXELS};
pub use context::{ContextAttributes, ContextInfo, ContextKind, ContextRegistry};
pub use context2d::Context2d;
pub use error::{CanvasError, CanvasResult};
pub use export::{ImageFileType, Snapshot, SnapshotExporter, SnapshotRequest, TempFileResult};
pub use host::Host;
pub use queue::{ExportCallback, ExportOutcome, ExportQueue, ExportWorker};
pub use store::TempFileStore;
pub use surface::{CanvasSurface, RenderingContext};
pub use webgl::WebGlContext;

/// Canvas crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
