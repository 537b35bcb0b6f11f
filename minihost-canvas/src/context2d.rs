//! The `2d` context handle.

use image::RgbaImage;

use crate::backend::{BufferId, Color, DrawCommand, PixelRegion, RectF};
use crate::context::ContextInfo;
use crate::error::CanvasResult;
use crate::surface::CanvasSurface;

/// Raster drawing handle over a surface's buffer.
///
/// Style setters follow canvas semantics: out-of-range values are ignored and
/// the previous value is kept.
#[derive(Debug)]
pub struct Context2d<'a> {
    surface: &'a mut CanvasSurface,
    info: ContextInfo,
}

impl<'a> Context2d<'a> {
    pub(crate) fn new(surface: &'a mut CanvasSurface, info: ContextInfo) -> Self {
        Self { surface, info }
    }

    /// Description of the bound context.
    #[must_use]
    pub fn info(&self) -> ContextInfo {
        self.info
    }

    /// Backend buffer this context draws into.
    #[must_use]
    pub fn buffer_id(&self) -> BufferId {
        self.info.buffer
    }

    /// Current fill color.
    #[must_use]
    pub fn fill_style(&self) -> Color {
        self.surface.state.fill
    }

    /// Set the fill color.
    pub fn set_fill_style(&mut self, color: Color) {
        self.surface.state.fill = color;
    }

    /// Current stroke color.
    #[must_use]
    pub fn stroke_style(&self) -> Color {
        self.surface.state.stroke
    }

    /// Set the stroke color.
    pub fn set_stroke_style(&mut self, color: Color) {
        self.surface.state.stroke = color;
    }

    /// Current line width.
    #[must_use]
    pub fn line_width(&self) -> f32 {
        self.surface.state.line_width
    }

    /// Set the line width. Non-positive or non-finite values are ignored.
    pub fn set_line_width(&mut self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.surface.state.line_width = width;
        }
    }

    /// Current global alpha.
    #[must_use]
    pub fn global_alpha(&self) -> f32 {
        self.surface.state.global_alpha
    }

    /// Set the global alpha. Values outside 0.0 to 1.0 are ignored.
    pub fn set_global_alpha(&mut self, alpha: f32) {
        if (0.0..=1.0).contains(&alpha) {
            self.surface.state.global_alpha = alpha;
        }
    }

    /// Fill a rectangle with the fill style.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::RenderBackend`] if the backend rejects the draw.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> CanvasResult<()> {
        let state = self.surface.state;
        self.draw(&DrawCommand::FillRect {
            rect: RectF::new(x, y, width, height),
            color: state.fill.with_alpha_scaled(state.global_alpha),
        })
    }

    /// Outline a rectangle with the stroke style and line width.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::RenderBackend`] if the backend rejects the draw.
    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> CanvasResult<()> {
        let state = self.surface.state;
        self.draw(&DrawCommand::StrokeRect {
            rect: RectF::new(x, y, width, height),
            color: state.stroke.with_alpha_scaled(state.global_alpha),
            line_width: state.line_width,
        })
    }

    /// Reset a rectangle to transparent black.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::RenderBackend`] if the backend rejects the draw.
    pub fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> CanvasResult<()> {
        self.draw(&DrawCommand::ClearRect {
            rect: RectF::new(x, y, width, height),
        })
    }

    /// Write pixels at (`dx`, `dy`) without blending; parts outside the
    /// buffer are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::RenderBackend`] if the backend rejects the draw.
    pub fn put_image_data(&mut self, image: &RgbaImage, dx: i32, dy: i32) -> CanvasResult<()> {
        self.draw(&DrawCommand::PutImageData {
            x: dx,
            y: dy,
            image: image.clone(),
        })
    }

    /// Read back a region of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::InvalidRegion`] if the region is outside
    /// the buffer, or a backend read-back error.
    pub fn get_image_data(&self, x: u32, y: u32, width: u32, height: u32) -> CanvasResult<RgbaImage> {
        self.surface
            .read_pixels(PixelRegion::new(x, y, width, height))
    }

    /// Composite another surface's current pixels at (`dx`, `dy`) using the
    /// global alpha.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the draw fails.
    pub fn draw_image(&mut self, source: &CanvasSurface, dx: i32, dy: i32) -> CanvasResult<()> {
        let (width, height) = source.extent();
        let image = source.read_pixels(PixelRegion::new(0, 0, width, height))?;
        if image.width() == 0 || image.height() == 0 {
            return Ok(());
        }
        let opacity = self.surface.state.global_alpha;
        self.draw(&DrawCommand::DrawImage {
            x: dx,
            y: dy,
            image,
            opacity,
        })
    }

    fn draw(&mut self, command: &DrawCommand) -> CanvasResult<()> {
        self.surface.draw(&self.info, command)
    }
}
