//! Canvas surfaces.
//!
//! A [`CanvasSurface`] owns its backend and the single context bound to it.
//! Drawing goes through the [`Context2d`] or [`WebGlContext`] handle returned
//! by [`CanvasSurface::get_context`]; each call is forwarded to the backend
//! immediately, so a later read-back always observes it.

use image::RgbaImage;
use minihost_core::{ElementId, EventTarget, ListenerRegistry};

use crate::backend::{Color, DrawCommand, PixelRegion, RenderBackend};
use crate::context::{ContextAttributes, ContextInfo, ContextKind, ContextRegistry};
use crate::config::DEFAULT_MAX_EXPORT_PIXELS;
use crate::context2d::Context2d;
use crate::error::{CanvasError, CanvasResult};
use crate::export::check_pixel_budget;
use crate::webgl::WebGlContext;

/// Drawing state kept by the surface across context handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DrawState {
    pub fill: Color,
    pub stroke: Color,
    pub line_width: f32,
    pub global_alpha: f32,
    pub clear_color: Color,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            global_alpha: 1.0,
            clear_color: Color::TRANSPARENT,
        }
    }
}

/// A context handle borrowed from a surface.
#[derive(Debug)]
pub enum RenderingContext<'a> {
    /// Raster 2D context.
    TwoD(Context2d<'a>),
    /// WebGL context.
    WebGl(WebGlContext<'a>),
}

impl RenderingContext<'_> {
    /// Description of the bound context.
    #[must_use]
    pub fn info(&self) -> ContextInfo {
        match self {
            Self::TwoD(ctx) => ctx.info(),
            Self::WebGl(ctx) => ctx.info(),
        }
    }

    /// Context family.
    #[must_use]
    pub fn kind(&self) -> ContextKind {
        self.info().kind
    }
}

/// An addressable drawing surface.
pub struct CanvasSurface {
    id: ElementId,
    width: u32,
    height: u32,
    registry: ContextRegistry,
    backend: Box<dyn RenderBackend>,
    pub(crate) state: DrawState,
    listeners: ListenerRegistry,
    max_pixels: u64,
}

impl std::fmt::Debug for CanvasSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasSurface")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("backend", &self.backend.name())
            .field("context", &self.registry.active())
            .finish_non_exhaustive()
    }
}

impl CanvasSurface {
    /// Create a surface whose context family is fixed to `family`.
    ///
    /// No backend buffer exists until the first context acquisition.
    #[must_use]
    pub fn new(backend: Box<dyn RenderBackend>, family: ContextKind, width: u32, height: u32) -> Self {
        let id = ElementId::new();
        tracing::debug!(
            "Created {family} canvas {id} ({width}x{height}) on {} backend",
            backend.name()
        );
        Self {
            id,
            width,
            height,
            registry: ContextRegistry::new(family),
            backend,
            state: DrawState::default(),
            listeners: ListenerRegistry::new(),
            max_pixels: DEFAULT_MAX_EXPORT_PIXELS,
        }
    }

    /// Cap the pixels a single read-back from this surface may produce.
    #[must_use]
    pub fn with_pixel_limit(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Largest region, in pixels, [`CanvasSurface::read_pixels`] returns.
    #[must_use]
    pub fn pixel_limit(&self) -> u64 {
        self.max_pixels
    }

    /// Surface identity, used as the event target.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Logical width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Logical height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Context family fixed at creation.
    #[must_use]
    pub fn family(&self) -> ContextKind {
        self.registry.family()
    }

    /// The acquired context, if any.
    #[must_use]
    pub fn context_info(&self) -> Option<ContextInfo> {
        self.registry.active().copied()
    }

    /// Extent of the readable pixels.
    ///
    /// This is the backing store size once a context is acquired, which can
    /// differ from the logical size after [`CanvasSurface::resize`].
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        self.registry
            .active()
            .map_or((self.width, self.height), |info| (info.width, info.height))
    }

    /// Acquire the surface's context.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ContextConflict`] if `kind` is not the surface's
    /// family, or an attribute/backend error on first acquisition.
    pub fn get_context(
        &mut self,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> CanvasResult<RenderingContext<'_>> {
        let info = self.registry.acquire(
            self.backend.as_mut(),
            self.width,
            self.height,
            kind,
            attributes,
        )?;
        Ok(match info.kind {
            ContextKind::TwoD => RenderingContext::TwoD(Context2d::new(self, info)),
            ContextKind::WebGl => RenderingContext::WebGl(WebGlContext::new(self, info)),
        })
    }

    /// Acquire the 2D context with default attributes.
    ///
    /// # Errors
    ///
    /// Same as [`CanvasSurface::get_context`].
    pub fn context_2d(&mut self) -> CanvasResult<Context2d<'_>> {
        match self.get_context(ContextKind::TwoD, &ContextAttributes::default())? {
            RenderingContext::TwoD(ctx) => Ok(ctx),
            RenderingContext::WebGl(_) => Err(CanvasError::ContextConflict {
                bound: ContextKind::WebGl,
                requested: ContextKind::TwoD,
            }),
        }
    }

    /// Acquire the WebGL context with the given attributes.
    ///
    /// # Errors
    ///
    /// Same as [`CanvasSurface::get_context`].
    pub fn context_webgl(
        &mut self,
        attributes: &ContextAttributes,
    ) -> CanvasResult<WebGlContext<'_>> {
        match self.get_context(ContextKind::WebGl, attributes)? {
            RenderingContext::WebGl(ctx) => Ok(ctx),
            RenderingContext::TwoD(_) => Err(CanvasError::ContextConflict {
                bound: ContextKind::TwoD,
                requested: ContextKind::WebGl,
            }),
        }
    }

    /// Change the logical size.
    ///
    /// An acquired context keeps its backing store; call
    /// [`CanvasSurface::reacquire_context`] to resize it.
    pub fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(
            "Resized canvas {} from {}x{} to {width}x{height}",
            self.id,
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
    }

    /// Replace the context with a fresh one sized to the current logical size.
    ///
    /// The new backing store starts transparent. On failure the previous
    /// context stays bound.
    ///
    /// # Errors
    ///
    /// Returns an attribute or backend error.
    pub fn reacquire_context(&mut self, attributes: &ContextAttributes) -> CanvasResult<ContextInfo> {
        self.registry
            .reacquire(self.backend.as_mut(), self.width, self.height, attributes)
    }

    /// Read back a region of the current pixels as straight-alpha RGBA.
    ///
    /// A surface with no acquired context reads as transparent.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidRegion`] if the region is outside
    /// [`CanvasSurface::extent`] or over [`CanvasSurface::pixel_limit`], or
    /// [`CanvasError::RenderBackend`] if the backend read-back fails.
    pub fn read_pixels(&self, region: PixelRegion) -> CanvasResult<RgbaImage> {
        let (width, height) = self.extent();
        if !region.fits_within(width, height) {
            return Err(CanvasError::InvalidRegion(format!(
                "{region} outside {width}x{height} surface"
            )));
        }
        check_pixel_budget("read-back", region.width, region.height, self.max_pixels)?;

        match self.registry.active() {
            Some(info) => Ok(self.backend.read_pixels(info.buffer, region)?),
            None => Ok(RgbaImage::new(region.width, region.height)),
        }
    }

    pub(crate) fn draw(&mut self, info: &ContextInfo, command: &DrawCommand) -> CanvasResult<()> {
        tracing::trace!(
            "Canvas {} forwarding {} to buffer {}",
            self.id,
            command_name(command),
            info.buffer
        );
        self.backend.draw_primitive(info.buffer, command)?;
        Ok(())
    }
}

impl EventTarget for CanvasSurface {
    fn target_id(&self) -> ElementId {
        self.id
    }

    fn listener_registry(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }
}

impl Drop for CanvasSurface {
    fn drop(&mut self) {
        self.registry.release(self.backend.as_mut());
    }
}

fn command_name(command: &DrawCommand) -> &'static str {
    match command {
        DrawCommand::FillRect { .. } => "fillRect",
        DrawCommand::StrokeRect { .. } => "strokeRect",
        DrawCommand::ClearRect { .. } => "clearRect",
        DrawCommand::PutImageData { .. } => "putImageData",
        DrawCommand::DrawImage { .. } => "drawImage",
        DrawCommand::Clear { .. } => "clear",
        DrawCommand::UploadTexture { .. } => "texImage2D",
    }
}
