//! Snapshot export to temp files and data URIs.
//!
//! Export reads a region of a surface back from its backend, resamples it
//! to the destination size with nearest-neighbour filtering, and encodes it
//! as PNG or JPEG. Pixels are captured before the call returns, so an export
//! always observes every draw issued before it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::backend::{Color, PixelRegion};
use crate::config::DEFAULT_MAX_EXPORT_PIXELS;
use crate::error::{CanvasError, CanvasResult};
use crate::store::TempFileStore;
use crate::surface::CanvasSurface;

/// Encoded image format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageFileType {
    /// Lossless PNG.
    #[default]
    Png,
    /// Lossy JPEG.
    Jpg,
}

impl ImageFileType {
    /// MIME type used in data URIs.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

impl fmt::Display for ImageFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFileType {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            _ => Err(CanvasError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for ImageFileType {
    type Error = CanvasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageFileType> for String {
    fn from(file_type: ImageFileType) -> Self {
        file_type.extension().to_string()
    }
}

/// What to export from a surface.
///
/// Omitted source fields default to the full surface extent (width and
/// height default to the remainder past `x`/`y`); omitted destination
/// fields default to the source size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotRequest {
    /// Source left edge.
    pub x: Option<u32>,
    /// Source top edge.
    pub y: Option<u32>,
    /// Source width.
    pub width: Option<u32>,
    /// Source height.
    pub height: Option<u32>,
    /// Output width.
    pub dest_width: Option<u32>,
    /// Output height.
    pub dest_height: Option<u32>,
    /// Output encoding.
    pub file_type: ImageFileType,
    /// JPEG quality in (0.0, 1.0].
    pub quality: Option<f32>,
}

impl SnapshotRequest {
    /// Request the full surface as PNG.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source rectangle.
    #[must_use]
    pub fn with_region(mut self, x: u32, y: u32, width: u32, height: u32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the output size.
    #[must_use]
    pub fn with_dest_size(mut self, width: u32, height: u32) -> Self {
        self.dest_width = Some(width);
        self.dest_height = Some(height);
        self
    }

    /// Set the output encoding.
    #[must_use]
    pub fn with_file_type(mut self, file_type: ImageFileType) -> Self {
        self.file_type = file_type;
        self
    }

    /// Set the JPEG quality.
    #[must_use]
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Quality actually used for encoding: the requested value if it lies in
    /// (0.0, 1.0], otherwise 1.0.
    #[must_use]
    pub fn effective_quality(&self) -> f32 {
        match self.quality {
            Some(q) if q.is_finite() && q > 0.0 && q <= 1.0 => q,
            _ => 1.0,
        }
    }

    /// Resolve against a surface extent into a source region and output size.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidRegion`] if the source region is empty
    /// or not entirely inside the extent, the output size is zero, or either
    /// holds more than `max_pixels` pixels.
    pub fn resolve(
        &self,
        extent: (u32, u32),
        max_pixels: u64,
    ) -> CanvasResult<(PixelRegion, (u32, u32))> {
        let (surface_width, surface_height) = extent;
        let x = self.x.unwrap_or(0);
        let y = self.y.unwrap_or(0);
        let region = PixelRegion::new(
            x,
            y,
            self.width.unwrap_or_else(|| surface_width.saturating_sub(x)),
            self.height.unwrap_or_else(|| surface_height.saturating_sub(y)),
        );

        if region.width == 0 || region.height == 0 {
            return Err(CanvasError::InvalidRegion(format!("{region} is empty")));
        }
        if !region.fits_within(surface_width, surface_height) {
            return Err(CanvasError::InvalidRegion(format!(
                "{region} outside {surface_width}x{surface_height} surface"
            )));
        }
        check_pixel_budget("source", region.width, region.height, max_pixels)?;

        let dest = (
            self.dest_width.unwrap_or(region.width),
            self.dest_height.unwrap_or(region.height),
        );
        if dest.0 == 0 || dest.1 == 0 {
            return Err(CanvasError::InvalidRegion(format!(
                "destination {}x{} is empty",
                dest.0, dest.1
            )));
        }
        check_pixel_budget("destination", dest.0, dest.1, max_pixels)?;
        Ok((region, dest))
    }
}

/// Reject images over `max_pixels` or whose RGBA length overflows `usize`.
pub(crate) fn check_pixel_budget(
    what: &str,
    width: u32,
    height: u32,
    max_pixels: u64,
) -> CanvasResult<()> {
    let pixels = u64::from(width).checked_mul(u64::from(height));
    let addressable = pixels
        .and_then(|p| p.checked_mul(4))
        .is_some_and(|bytes| usize::try_from(bytes).is_ok());
    match pixels {
        Some(p) if addressable && p <= max_pixels => Ok(()),
        _ => Err(CanvasError::InvalidRegion(format!(
            "{what} {width}x{height} exceeds the {max_pixels} pixel limit"
        ))),
    }
}

/// Pixels captured from a surface, ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Resampled straight-alpha pixels.
    pub image: RgbaImage,
    /// Output encoding.
    pub file_type: ImageFileType,
    /// Effective JPEG quality.
    pub quality: f32,
}

/// Successful file export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempFileResult {
    /// Path of the written file.
    #[serde(rename = "tempFilePath")]
    pub temp_file_path: PathBuf,
}

/// Captures, encodes and persists surface snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    store: TempFileStore,
    jpeg_background: Color,
    max_pixels: u64,
}

impl SnapshotExporter {
    /// Create an exporter writing into `store`.
    #[must_use]
    pub fn new(store: TempFileStore, jpeg_background: Color) -> Self {
        Self {
            store,
            jpeg_background,
            max_pixels: DEFAULT_MAX_EXPORT_PIXELS,
        }
    }

    /// Limit the source region and output image to `max_pixels` pixels.
    #[must_use]
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Largest source region or output image accepted, in pixels.
    #[must_use]
    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    /// The temp file store.
    #[must_use]
    pub fn store(&self) -> &TempFileStore {
        &self.store
    }

    /// Read back and resample the requested region.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidRegion`] (including requests over the
    /// pixel limit) or a backend read-back error.
    pub fn capture(
        &self,
        surface: &CanvasSurface,
        request: &SnapshotRequest,
    ) -> CanvasResult<Snapshot> {
        let (region, (dest_width, dest_height)) =
            request.resolve(surface.extent(), self.max_pixels)?;
        let pixels = surface.read_pixels(region)?;
        let image = if (dest_width, dest_height) == (region.width, region.height) {
            pixels
        } else {
            imageops::resize(&pixels, dest_width, dest_height, FilterType::Nearest)
        };

        tracing::debug!(
            "Captured {region} of canvas {} as {dest_width}x{dest_height} {}",
            surface.id(),
            request.file_type
        );
        Ok(Snapshot {
            image,
            file_type: request.file_type,
            quality: request.effective_quality(),
        })
    }

    /// Encode a snapshot to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Encode`] if the encoder fails.
    pub fn encode(&self, snapshot: &Snapshot) -> CanvasResult<Vec<u8>> {
        match snapshot.file_type {
            ImageFileType::Png => encode_png(&snapshot.image),
            ImageFileType::Jpg => {
                encode_jpeg(&snapshot.image, snapshot.quality, self.jpeg_background)
            }
        }
    }

    /// Encode a snapshot and write it to a new temp file.
    ///
    /// # Errors
    ///
    /// Returns an encode or I/O error; no file is left behind on failure.
    pub fn persist_snapshot(&self, snapshot: &Snapshot) -> CanvasResult<TempFileResult> {
        let bytes = self.encode(snapshot)?;
        let path = self.store.write(&bytes, snapshot.file_type.extension())?;
        tracing::info!(
            "Exported {}x{} {} snapshot to {}",
            snapshot.image.width(),
            snapshot.image.height(),
            snapshot.file_type,
            path.display()
        );
        Ok(TempFileResult {
            temp_file_path: path,
        })
    }

    /// Export synchronously to a temp file.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidRegion`], a backend read-back error, or
    /// an encode/I/O error.
    pub fn export_sync(
        &self,
        surface: &CanvasSurface,
        request: &SnapshotRequest,
    ) -> CanvasResult<TempFileResult> {
        let snapshot = self.capture(surface, request)?;
        self.persist_snapshot(&snapshot)
    }

    /// Encode the full surface at 1:1 scale as a PNG data URI.
    ///
    /// # Errors
    ///
    /// Returns a read-back or encode error.
    pub fn to_data_url(&self, surface: &CanvasSurface) -> CanvasResult<String> {
        self.to_data_url_as(surface, ImageFileType::Png, None)
    }

    /// Encode the full surface at 1:1 scale as a data URI of the given type.
    ///
    /// A surface with a zero dimension has no pixels to encode and yields
    /// the empty data URI `data:,`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidRegion`] if the surface is over the
    /// pixel limit, or a read-back or encode error.
    pub fn to_data_url_as(
        &self,
        surface: &CanvasSurface,
        file_type: ImageFileType,
        quality: Option<f32>,
    ) -> CanvasResult<String> {
        let (width, height) = surface.extent();
        if width == 0 || height == 0 {
            tracing::debug!("Canvas {} is {width}x{height}; empty data URI", surface.id());
            return Ok(EMPTY_DATA_URL.to_string());
        }
        let request = SnapshotRequest {
            file_type,
            quality,
            ..SnapshotRequest::default()
        };
        let snapshot = self.capture(surface, &request)?;
        let bytes = self.encode(&snapshot)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{};base64,{encoded}", file_type.mime_type()))
    }
}

/// Data URI for a surface with no pixels.
const EMPTY_DATA_URL: &str = "data:,";

fn encode_png(image: &RgbaImage) -> CanvasResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8.into(),
        )
        .map_err(|e| CanvasError::Encode(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Flatten alpha onto `background` and encode as JPEG.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_jpeg(image: &RgbaImage, quality: f32, background: Color) -> CanvasResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    let bg = [background.r, background.g, background.b];
    let mut rgb_data = Vec::with_capacity(image.as_raw().len() / 4 * 3);
    for pixel in image.pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        let inv = 1.0 - alpha;
        for (channel, base) in pixel.0.iter().zip(bg) {
            let value = f32::from(*channel).mul_add(alpha, f32::from(base) * inv);
            rgb_data.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut buf = std::io::Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
        .map_err(|e| CanvasError::Encode(format!("JPEG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}
