//! Rendering backend capability.
//!
//! Drawing primitives are not implemented by the canvas layer. Surfaces
//! forward every command to a [`RenderBackend`], which owns the native
//! buffers and reads them back on request.

pub mod software;

use std::fmt;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{ContextAttributes, ContextKind};

pub use software::{SoftwareBackend, SoftwareProvider};

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a rendering backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not allocate a buffer.
    #[error("Buffer allocation failed: {0}")]
    Allocation(String),

    /// The buffer handle is not known to the backend.
    #[error("Unknown buffer: {0}")]
    UnknownBuffer(BufferId),

    /// The buffer is already bound to another context type.
    #[error("Buffer {buffer} already bound to {bound}")]
    AlreadyBound {
        /// Buffer handle.
        buffer: BufferId,
        /// Context type it is bound to.
        bound: ContextKind,
    },

    /// Pixel read-back failed.
    #[error("Read-back failed: {0}")]
    ReadBack(String),

    /// A draw command failed.
    #[error("Draw failed: {0}")]
    Draw(String),
}

/// Opaque handle for a backend-owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    /// Create a handle from a raw backend value.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw backend value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer pixel rectangle within a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRegion {
    /// Create a region.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the region lies entirely within a `width` x `height` extent.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= height)
    }
}

impl fmt::Display for PixelRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Floating-point rectangle used by drawing commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width (may be negative before normalization).
    pub width: f32,
    /// Height (may be negative before normalization).
    pub height: f32,
}

impl RectF {
    /// Create a rectangle.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Flip negative extents so width and height are non-negative.
    #[must_use]
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    /// Create a color from components.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    ///
    /// # Errors
    ///
    /// Returns a message if the string is not a hex color.
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let digits = hex
            .strip_prefix('#')
            .ok_or_else(|| format!("color must start with '#': {hex}"))?;
        if !digits.is_ascii() {
            return Err(format!("invalid color {hex}"));
        }
        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|e| format!("invalid color {hex}: {e}"))
        };

        match digits.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, idx) in rgb.iter_mut().zip(0..3) {
                    let v = channel(&digits[idx..=idx])?;
                    *slot = v * 17;
                }
                Ok(Self::rgb(rgb[0], rgb[1], rgb[2]))
            }
            6 | 8 => {
                let r = channel(&digits[0..2])?;
                let g = channel(&digits[2..4])?;
                let b = channel(&digits[4..6])?;
                let a = if digits.len() == 8 {
                    channel(&digits[6..8])?
                } else {
                    255
                };
                Ok(Self::rgba(r, g, b, a))
            }
            _ => Err(format!("invalid color length: {hex}")),
        }
    }

    /// Scale alpha by a factor in 0.0 to 1.0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_alpha_scaled(self, factor: f32) -> Self {
        let a = (f32::from(self.a) * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        format!("#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a)
    }
}

/// A drawing primitive forwarded verbatim to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill a rectangle.
    FillRect {
        /// Area to fill.
        rect: RectF,
        /// Fill color (global alpha already applied).
        color: Color,
    },
    /// Stroke a rectangle outline.
    StrokeRect {
        /// Outline rectangle.
        rect: RectF,
        /// Stroke color (global alpha already applied).
        color: Color,
        /// Line width in pixels.
        line_width: f32,
    },
    /// Reset a rectangle to transparent black.
    ClearRect {
        /// Area to clear.
        rect: RectF,
    },
    /// Replace pixels without blending.
    PutImageData {
        /// Destination left edge.
        x: i32,
        /// Destination top edge.
        y: i32,
        /// Source pixels.
        image: RgbaImage,
    },
    /// Composite an image over the buffer.
    DrawImage {
        /// Destination left edge.
        x: i32,
        /// Destination top edge.
        y: i32,
        /// Source pixels.
        image: RgbaImage,
        /// Opacity in 0.0 to 1.0.
        opacity: f32,
    },
    /// Fill the whole buffer with a color (GL clear).
    Clear {
        /// Clear color.
        color: Color,
    },
    /// Store pixels as a GL texture.
    UploadTexture {
        /// Texture name.
        texture: u32,
        /// Texture pixels.
        image: RgbaImage,
    },
}

/// A native rendering implementation.
pub trait RenderBackend: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Allocate a transparent buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated.
    fn allocate_buffer(&mut self, width: u32, height: u32) -> BackendResult<BufferId>;

    /// Release a buffer and everything bound to it.
    fn release_buffer(&mut self, buffer: BufferId);

    /// Bind a context of the given type to a buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is unknown or already bound elsewhere.
    fn bind_context(
        &mut self,
        buffer: BufferId,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> BackendResult<()>;

    /// Execute a drawing primitive against a buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is unknown or drawing fails.
    fn draw_primitive(&mut self, buffer: BufferId, command: &DrawCommand) -> BackendResult<()>;

    /// Read back a region as straight-alpha RGBA.
    ///
    /// Must reflect every command previously passed to `draw_primitive`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is unknown or the region is outside it.
    fn read_pixels(&self, buffer: BufferId, region: PixelRegion) -> BackendResult<RgbaImage>;
}

/// Creates one backend instance per surface.
pub trait BackendProvider: Send + Sync {
    /// Create a backend for a new surface.
    fn create_backend(&self) -> Box<dyn RenderBackend>;
}

impl<F> BackendProvider for F
where
    F: Fn() -> Box<dyn RenderBackend> + Send + Sync,
{
    fn create_backend(&self) -> Box<dyn RenderBackend> {
        self()
    }
}
