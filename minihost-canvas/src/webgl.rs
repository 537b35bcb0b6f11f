//! The `webgl` context handle.
//!
//! Only the calls that touch surface pixels are modelled: clearing and
//! binding another canvas as a texture. Shader pipelines belong to the
//! backend.

use crate::backend::{Color, DrawCommand, PixelRegion};
use crate::context::ContextInfo;
use crate::error::CanvasResult;
use crate::surface::CanvasSurface;

/// GPU-style drawing handle over a surface's buffer.
#[derive(Debug)]
pub struct WebGlContext<'a> {
    surface: &'a mut CanvasSurface,
    info: ContextInfo,
}

impl<'a> WebGlContext<'a> {
    pub(crate) fn new(surface: &'a mut CanvasSurface, info: ContextInfo) -> Self {
        Self { surface, info }
    }

    /// Description of the bound context.
    #[must_use]
    pub fn info(&self) -> ContextInfo {
        self.info
    }

    /// Set the color used by [`WebGlContext::clear`].
    pub fn clear_color(&mut self, color: Color) {
        self.surface.state.clear_color = color;
    }

    /// Fill the whole buffer with the clear color.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::RenderBackend`] if the backend rejects the draw.
    pub fn clear(&mut self) -> CanvasResult<()> {
        let color = self.surface.state.clear_color;
        self.surface.draw(&self.info, &DrawCommand::Clear { color })
    }

    /// Upload the current pixels of `source` as texture `texture`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the upload fails.
    pub fn bind_canvas_texture(&mut self, texture: u32, source: &CanvasSurface) -> CanvasResult<()> {
        let (width, height) = source.extent();
        let image = source.read_pixels(PixelRegion::new(0, 0, width, height))?;
        tracing::debug!(
            "Binding canvas {} ({width}x{height}) as texture {texture}",
            source.id()
        );
        self.surface
            .draw(&self.info, &DrawCommand::UploadTexture { texture, image })
    }
}
