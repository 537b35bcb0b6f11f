//! CPU rasterizing backend built on tiny-skia.
//!
//! Serves both context families: `2d` commands rasterize directly into the
//! buffer's pixmap, and the `webgl` subset (clear, texture upload) is emulated
//! on the same pixmap so snapshots work identically for either family.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use tiny_skia::{
    BlendMode, ColorU8, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

use super::{
    BackendError, BackendProvider, BackendResult, BufferId, Color, DrawCommand, PixelRegion, RectF,
    RenderBackend,
};
use crate::context::{ContextAttributes, ContextKind};

struct SoftwareBuffer {
    pixmap: Pixmap,
    kind: Option<ContextKind>,
    anti_alias: bool,
    textures: HashMap<u32, RgbaImage>,
}

/// Software rendering backend.
#[derive(Default)]
pub struct SoftwareBackend {
    buffers: HashMap<BufferId, SoftwareBuffer>,
    next_id: u64,
}

impl std::fmt::Debug for SoftwareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareBackend")
            .field("buffers", &self.buffers.len())
            .finish_non_exhaustive()
    }
}

impl SoftwareBackend {
    /// Create a backend with no buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimensions of a texture uploaded to a buffer.
    #[must_use]
    pub fn texture_size(&self, buffer: BufferId, texture: u32) -> Option<(u32, u32)> {
        self.buffers
            .get(&buffer)?
            .textures
            .get(&texture)
            .map(RgbaImage::dimensions)
    }

    fn buffer_mut(&mut self, buffer: BufferId) -> BackendResult<&mut SoftwareBuffer> {
        self.buffers
            .get_mut(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn allocate_buffer(&mut self, width: u32, height: u32) -> BackendResult<BufferId> {
        // tiny-skia rejects zero-sized pixmaps; keep one pixel of storage.
        let pixmap = Pixmap::new(width.max(1), height.max(1)).ok_or_else(|| {
            BackendError::Allocation(format!("cannot allocate {width}x{height} pixmap"))
        })?;

        let id = BufferId::from_raw(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            id,
            SoftwareBuffer {
                pixmap,
                kind: None,
                anti_alias: false,
                textures: HashMap::new(),
            },
        );
        tracing::debug!("Software backend allocated buffer {id} ({width}x{height})");
        Ok(id)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            tracing::debug!("Software backend released buffer {buffer}");
        }
    }

    fn bind_context(
        &mut self,
        buffer: BufferId,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> BackendResult<()> {
        let target = self.buffer_mut(buffer)?;
        match target.kind {
            Some(bound) if bound != kind => Err(BackendError::AlreadyBound { buffer, bound }),
            _ => {
                target.kind = Some(kind);
                target.anti_alias = attributes.antialias;
                Ok(())
            }
        }
    }

    fn draw_primitive(&mut self, buffer: BufferId, command: &DrawCommand) -> BackendResult<()> {
        let target = self.buffer_mut(buffer)?;
        match command {
            DrawCommand::FillRect { rect, color } => {
                if let Some(rect) = to_skia_rect(*rect) {
                    let paint = solid_paint(*color, target.anti_alias);
                    target
                        .pixmap
                        .fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
            DrawCommand::StrokeRect {
                rect,
                color,
                line_width,
            } => {
                if let Some(rect) = to_skia_rect(*rect) {
                    let path = PathBuilder::from_rect(rect);
                    let paint = solid_paint(*color, target.anti_alias);
                    let stroke = Stroke {
                        width: line_width.max(0.0),
                        ..Stroke::default()
                    };
                    target.pixmap.stroke_path(
                        &path,
                        &paint,
                        &stroke,
                        Transform::identity(),
                        None,
                    );
                }
            }
            DrawCommand::ClearRect { rect } => {
                if let Some(rect) = to_skia_rect(*rect) {
                    let mut paint = Paint::default();
                    paint.blend_mode = BlendMode::Clear;
                    target
                        .pixmap
                        .fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
            DrawCommand::PutImageData { x, y, image } => {
                put_pixels(&mut target.pixmap, *x, *y, image);
            }
            DrawCommand::DrawImage {
                x,
                y,
                image,
                opacity,
            } => {
                let source = image_to_pixmap(image)?;
                let paint = PixmapPaint {
                    opacity: opacity.clamp(0.0, 1.0),
                    ..PixmapPaint::default()
                };
                target.pixmap.draw_pixmap(
                    *x,
                    *y,
                    source.as_ref(),
                    &paint,
                    Transform::identity(),
                    None,
                );
            }
            DrawCommand::Clear { color } => {
                target.pixmap.fill(tiny_skia::Color::from_rgba8(
                    color.r, color.g, color.b, color.a,
                ));
            }
            DrawCommand::UploadTexture { texture, image } => {
                target.textures.insert(*texture, image.clone());
            }
        }
        Ok(())
    }

    fn read_pixels(&self, buffer: BufferId, region: PixelRegion) -> BackendResult<RgbaImage> {
        let source = self
            .buffers
            .get(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))?;
        let pixmap = &source.pixmap;
        if !region.fits_within(pixmap.width(), pixmap.height()) {
            return Err(BackendError::ReadBack(format!(
                "region {region} outside {}x{} buffer",
                pixmap.width(),
                pixmap.height()
            )));
        }

        Ok(RgbaImage::from_fn(region.width, region.height, |x, y| {
            pixmap
                .pixel(region.x + x, region.y + y)
                .map_or(Rgba([0, 0, 0, 0]), |p| {
                    let c = p.demultiply();
                    Rgba([c.red(), c.green(), c.blue(), c.alpha()])
                })
        }))
    }
}

/// Creates a [`SoftwareBackend`] per surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareProvider;

impl BackendProvider for SoftwareProvider {
    fn create_backend(&self) -> Box<dyn RenderBackend> {
        Box::new(SoftwareBackend::new())
    }
}

fn to_skia_rect(rect: RectF) -> Option<Rect> {
    let rect = rect.normalized();
    Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

fn solid_paint(color: Color, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = anti_alias;
    paint
}

fn premultiplied(pixel: Rgba<u8>) -> tiny_skia::PremultipliedColorU8 {
    let [r, g, b, a] = pixel.0;
    ColorU8::from_rgba(r, g, b, a).premultiply()
}

/// Overwrite pixels without blending, clipped to the pixmap.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn put_pixels(pixmap: &mut Pixmap, dx: i32, dy: i32, image: &RgbaImage) {
    let (width, height) = (i64::from(pixmap.width()), i64::from(pixmap.height()));
    let pixels = pixmap.pixels_mut();
    for (sx, sy, pixel) in image.enumerate_pixels() {
        let tx = i64::from(dx) + i64::from(sx);
        let ty = i64::from(dy) + i64::from(sy);
        if tx < 0 || ty < 0 || tx >= width || ty >= height {
            continue;
        }
        pixels[(ty * width + tx) as usize] = premultiplied(*pixel);
    }
}

fn image_to_pixmap(image: &RgbaImage) -> BackendResult<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| {
        BackendError::Draw(format!(
            "cannot draw {}x{} image",
            image.width(),
            image.height()
        ))
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        *dst = premultiplied(*src);
    }
    Ok(pixmap)
}
