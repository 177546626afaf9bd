//! Pixel sink: rasterizes a [Drawing] into RGBA images, one per animation frame.
//!
//! A drawing point `(u, v)` in modules lands on pixel `((u + q) * m, (v + q) * m)` where `q` is the
//! quiet zone and `m` the magnification. Pixels are sampled at their center, so shapes aligned on
//! module boundaries render without antialiasing.

use std::io::Write;
use std::time::Duration;

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops;
use image::{Delay, Frame, Rgba, RgbaImage};

use qrstyle_core::{Color, Error, IntSize, Point, Rect};

use crate::placement::RESAMPLE_FILTER;
use crate::{sizing, DrawPrimitive, Drawing, Shape, SinkError};

/// Delay of frames that have none of their own.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Blend `color` over `pixel` with the source-over operator, on straight alpha.
fn blend(pixel: &mut Rgba<u8>, color: [u8; 4]) {
    let source_alpha = color[3] as f64 / 255.0;
    if source_alpha <= 0.0 {
        return;
    }
    let dest_alpha = pixel[3] as f64 / 255.0;
    let out_alpha = source_alpha + dest_alpha * (1.0 - source_alpha);
    for channel in 0..3 {
        let source = color[channel] as f64 * source_alpha;
        let dest = pixel[channel] as f64 * dest_alpha * (1.0 - source_alpha);
        pixel[channel] = ((source + dest) / out_alpha).round().clamp(0.0, 255.0) as u8;
    }
    pixel[3] = (out_alpha * 255.0).round() as u8;
}

fn inside_rounded_rect(point: Point, rect: &Rect, radius: f64) -> bool {
    if !rect.contains(point) {
        return false;
    }
    let radius = radius.min(rect.width() / 2.0).min(rect.height() / 2.0);
    if radius <= 0.0 {
        return true;
    }
    let dx = f64::max(rect.min_x() + radius - point.x, point.x - (rect.max_x() - radius)).max(0.0);
    let dy = f64::max(rect.min_y() + radius - point.y, point.y - (rect.max_y() - radius)).max(0.0);
    dx * dx + dy * dy <= radius * radius
}

fn inside_ring(
    point: Point,
    center: Point,
    radius: f64,
    stroke_width: f64,
    dash: Option<f64>,
) -> bool {
    let (dx, dy) = (point.x - center.x, point.y - center.y);
    let distance = dx.hypot(dy);
    if (distance - radius).abs() > stroke_width / 2.0 {
        return false;
    }
    match dash {
        Some(dash) if dash > 0.0 => {
            // Dashes start at the rightmost point and run clockwise, like SVG strokes on circles.
            let angle = dy.atan2(dx).rem_euclid(std::f64::consts::TAU);
            ((angle * radius) / dash).floor() as u64 % 2 == 0
        }
        _ => true,
    }
}

/// Rasterizer drawing every module on a square of `magnification` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rasterizer {
    magnification: u32,
}

impl Rasterizer {
    pub fn new(magnification: u32) -> Self {
        Self { magnification }
    }

    /// Rasterizer for the largest magnification whose rendering of `drawing` fits in `target`
    /// pixels. See [sizing::max_magnification].
    pub fn fitting(drawing: &Drawing, target: f64, thirds: bool) -> Result<Self, Error> {
        let magnification = sizing::max_magnification(drawing.extent(), target, thirds)?;
        Ok(Self::new(magnification as u32))
    }

    pub fn magnification(&self) -> u32 {
        self.magnification
    }

    /// Side in pixels of the images produced for `drawing`.
    pub fn side(&self, drawing: &Drawing) -> u32 {
        drawing.extent() as u32 * self.magnification
    }

    /// Render the first frame of `drawing`.
    pub fn render(&self, drawing: &Drawing) -> Result<RgbaImage, SinkError> {
        self.render_frame(drawing, 0)
    }

    /// Render every frame of `drawing` along with its delay. Static drawings give a single frame.
    pub fn render_frames(
        &self,
        drawing: &Drawing,
    ) -> Result<Vec<(RgbaImage, Duration)>, SinkError> {
        let delays = drawing.frame_delays();
        (0..drawing.frame_count())
            .map(|index| {
                let delay = delays.get(index).copied().unwrap_or(DEFAULT_FRAME_DELAY);
                Ok((self.render_frame(drawing, index)?, delay))
            })
            .collect()
    }

    /// Render frame `index` of `drawing`; shorter animations loop.
    pub fn render_frame(&self, drawing: &Drawing, index: usize) -> Result<RgbaImage, SinkError> {
        if self.magnification == 0 {
            return Err(Error::geometry("magnification must be positive").into());
        }
        let side = self.side(drawing);
        let backdrop = drawing.backdrop;
        let quiet = backdrop.quiet_zone as f64;
        let mut image = RgbaImage::new(side, side);
        let extent = drawing.extent() as f64;
        let frame = Rect::new(-quiet, -quiet, extent, extent);
        self.fill(&mut image, quiet, &frame, backdrop.color.to_rgba8(1.0), |point| {
            inside_rounded_rect(point, &frame, backdrop.corner_radius)
        });
        for primitive in &drawing.primitives {
            self.draw(&mut image, quiet, drawing, primitive, index)?;
        }
        log::trace!("rasterized frame {} at {}x{}", index, side, side);
        Ok(image)
    }

    fn draw(
        &self,
        image: &mut RgbaImage,
        quiet: f64,
        drawing: &Drawing,
        primitive: &DrawPrimitive,
        index: usize,
    ) -> Result<(), SinkError> {
        let mask = drawing
            .mask
            .as_ref()
            .filter(|mask| mask.applies_to(primitive.id));
        let visible = |point: Point| mask.map_or(true, |mask| mask.reveals(point));
        match primitive.shape {
            Shape::Rect {
                rect,
                corner_radius,
                fill,
            } => self.fill(image, quiet, &rect, fill.to_rgba8(primitive.opacity), |point| {
                visible(point) && inside_rounded_rect(point, &rect, corner_radius)
            }),
            Shape::Circle {
                center,
                radius,
                fill,
            } => {
                let bounds = Rect::new(
                    center.x - radius,
                    center.y - radius,
                    2.0 * radius,
                    2.0 * radius,
                );
                self.fill(image, quiet, &bounds, fill.to_rgba8(primitive.opacity), |point| {
                    let (dx, dy) = (point.x - center.x, point.y - center.y);
                    visible(point) && dx * dx + dy * dy <= radius * radius
                })
            }
            Shape::Ring {
                center,
                radius,
                stroke_width,
                dash,
                stroke,
            } => {
                let outer = radius + stroke_width / 2.0;
                let bounds = Rect::new(
                    center.x - outer,
                    center.y - outer,
                    2.0 * outer,
                    2.0 * outer,
                );
                self.fill(image, quiet, &bounds, stroke.to_rgba8(primitive.opacity), |point| {
                    visible(point) && inside_ring(point, center, radius, stroke_width, dash)
                })
            }
            Shape::Frame {
                rect,
                corner_radius,
                stroke_width,
                stroke,
            } => {
                let half = stroke_width / 2.0;
                let outer = rect.inset(-half);
                let inner = rect.inset(half);
                let inner_radius = (corner_radius - half).max(0.0);
                self.fill(image, quiet, &outer, stroke.to_rgba8(primitive.opacity), |point| {
                    visible(point)
                        && inside_rounded_rect(point, &outer, corner_radius + half)
                        && !inside_rounded_rect(point, &inner, inner_radius)
                })
            }
            Shape::Image {
                slot, mode, clip, ..
            } => {
                let Some(payload) = drawing.image(slot) else {
                    log::warn!("no image bound to {:?}, skipping primitive {}", slot, primitive.id);
                    return Ok(());
                };
                let x0 = self.to_pixel(clip.min_x(), quiet);
                let y0 = self.to_pixel(clip.min_y(), quiet);
                let x1 = self.to_pixel(clip.max_x(), quiet);
                let y1 = self.to_pixel(clip.max_y(), quiet);
                let (width, height) = ((x1 - x0).round(), (y1 - y0).round());
                if width < 1.0 || height < 1.0 {
                    return Ok(());
                }
                let fitted = mode.apply(
                    payload.frame(index),
                    IntSize::new(width as u32, height as u32),
                )?;
                let (left, top) = (x0.round() as i64, y0.round() as i64);
                for (x, y, source) in fitted.enumerate_pixels() {
                    let (px, py) = (left + x as i64, top + y as i64);
                    let outside = px < 0
                        || py < 0
                        || px >= image.width() as i64
                        || py >= image.height() as i64;
                    if outside || !visible(self.sample_point(px as u32, py as u32, quiet)) {
                        continue;
                    }
                    let Rgba([r, g, b, a]) = *source;
                    let color = Color::rgba(r, g, b, a as f64 / 255.0);
                    blend(
                        image.get_pixel_mut(px as u32, py as u32),
                        color.to_rgba8(primitive.opacity),
                    );
                }
            }
        }
        Ok(())
    }

    fn to_pixel(&self, coordinate: f64, quiet: f64) -> f64 {
        (coordinate + quiet) * self.magnification as f64
    }

    /// Drawing point at the center of pixel `(px, py)`.
    fn sample_point(&self, px: u32, py: u32, quiet: f64) -> Point {
        let scale = self.magnification as f64;
        Point::new(
            (px as f64 + 0.5) / scale - quiet,
            (py as f64 + 0.5) / scale - quiet,
        )
    }

    /// Blend `color` on every pixel within `bounds` whose center satisfies `inside`.
    fn fill<F: Fn(Point) -> bool>(
        &self,
        image: &mut RgbaImage,
        quiet: f64,
        bounds: &Rect,
        color: [u8; 4],
        inside: F,
    ) {
        if color[3] == 0 {
            return;
        }
        let limit = |value: f64, side: u32| value.clamp(0.0, side as f64) as u32;
        let x_range = limit(self.to_pixel(bounds.min_x(), quiet).floor(), image.width())
            ..limit(self.to_pixel(bounds.max_x(), quiet).ceil(), image.width());
        let y_range = limit(self.to_pixel(bounds.min_y(), quiet).floor(), image.height())
            ..limit(self.to_pixel(bounds.max_y(), quiet).ceil(), image.height());
        for py in y_range {
            for px in x_range.clone() {
                if inside(self.sample_point(px, py, quiet)) {
                    blend(image.get_pixel_mut(px, py), color);
                }
            }
        }
    }
}

/// Render `drawing` into an image exactly `size` pixels wide.
///
/// The drawing is rendered at the smallest magnification reaching `size` (a multiple of 3 with
/// `thirds`) and scaled down when that overshoots.
pub fn render_to_size(drawing: &Drawing, size: u32, thirds: bool) -> Result<RgbaImage, SinkError> {
    let extent = drawing.extent();
    let magnification = if thirds {
        sizing::min_magnification(extent, size as f64, true)?
    } else {
        sizing::min_suitable_size(extent, size as f64)? / extent
    };
    let image = Rasterizer::new(magnification as u32).render(drawing)?;
    if image.width() == size {
        return Ok(image);
    }
    log::debug!("scaling {}px rendering down to {}px", image.width(), size);
    Ok(imageops::resize(&image, size, size, RESAMPLE_FILTER))
}

/// Encode `frames` as an endlessly looping GIF.
pub fn write_gif<W: Write>(output: W, frames: Vec<(RgbaImage, Duration)>) -> Result<(), SinkError> {
    let mut encoder = GifEncoder::new(output);
    encoder.set_repeat(Repeat::Infinite)?;
    encoder.encode_frames(frames.into_iter().map(|(image, delay)| {
        Frame::from_parts(image, 0, 0, Delay::from_saturating_duration(delay))
    }))?;
    Ok(())
}
