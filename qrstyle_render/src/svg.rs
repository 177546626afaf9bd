use std::io::{Cursor, Write};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, RgbaImage};

use qrstyle_core::{Color, Rect};

use crate::{DrawPrimitive, Drawing, ImagePayload, ModuleMask, Shape, SinkError};

/// Format `value` with at most four fractional digits, no trailing zeros and no locale.
/// # Example
/// ```
/// use qrstyle_render::svg::format_number;
/// assert_eq!(format_number(1.0), "1");
/// assert_eq!(format_number(0.333333), "0.3333");
/// assert_eq!(format_number(-0.00001), "0");
/// assert_eq!(format_number(2.50), "2.5");
/// ```
pub fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Encode `image` as a `data:` URI holding a PNG.
pub fn png_data_uri(image: &RgbaImage) -> Result<String, SinkError> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(bytes.into_inner())
    ))
}

/// Text sink writing a [Drawing] as an SVG document whose user units are modules.
pub struct SvgWriter {
    size: Option<u32>,
}

impl SvgWriter {
    /// Construct a new [SvgWriter] that leaves the document size to the viewer.
    pub fn new() -> Self {
        Self { size: None }
    }

    /// Set the `width` and `height` of the document in pixels.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Render the `drawing` into `output`.
    pub fn write<W: Write>(&self, output: &mut W, drawing: &Drawing) -> Result<(), SinkError> {
        let quiet = drawing.backdrop.quiet_zone as f64;
        let extent = drawing.extent() as f64;
        let view_box = Rect::new(-quiet, -quiet, extent, extent);
        write!(
            output,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="{} {} {} {}""#,
            format_number(view_box.min_x()),
            format_number(view_box.min_y()),
            format_number(view_box.width()),
            format_number(view_box.height()),
        )?;
        if let Some(size) = self.size {
            write!(output, r#" width="{}" height="{}""#, size, size)?;
        }
        writeln!(output, ">")?;
        let backdrop = drawing.backdrop;
        if backdrop.color.alpha() > 0.0 {
            writeln!(
                output,
                r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" ry="{}" fill="{}"{}/>"#,
                format_number(view_box.min_x()),
                format_number(view_box.min_y()),
                format_number(view_box.width()),
                format_number(view_box.height()),
                format_number(backdrop.corner_radius),
                format_number(backdrop.corner_radius),
                backdrop.color.hex_string(),
                opacity_attribute(backdrop.color, 1.0),
            )?;
        }
        let mask = drawing
            .mask
            .as_ref()
            .filter(|mask| !mask.primitives.is_empty());
        for primitive in &drawing.primitives {
            if let Some(mask) = mask.filter(|mask| mask.primitives.start == primitive.id) {
                open_mask(output, mask)?;
            }
            self.write_primitive(output, drawing, primitive)?;
            if mask.is_some_and(|mask| mask.primitives.end == primitive.id + 1) {
                writeln!(output, "</g>")?;
            }
        }
        writeln!(output, "</svg>")?;
        Ok(())
    }

    /// Render the `drawing` into a string.
    pub fn to_string(&self, drawing: &Drawing) -> Result<String, SinkError> {
        let mut output = Vec::new();
        self.write(&mut output, drawing)?;
        // Everything written is ASCII or UTF-8 literals.
        String::from_utf8(output)
            .map_err(|e| SinkError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    fn write_primitive<W: Write>(
        &self,
        output: &mut W,
        drawing: &Drawing,
        primitive: &DrawPrimitive,
    ) -> Result<(), SinkError> {
        let id = primitive.id;
        match primitive.shape {
            Shape::Rect {
                rect,
                corner_radius,
                fill,
            } => {
                write!(
                    output,
                    r#"<rect data-id="{}" x="{}" y="{}" width="{}" height="{}""#,
                    id,
                    format_number(rect.min_x()),
                    format_number(rect.min_y()),
                    format_number(rect.width()),
                    format_number(rect.height()),
                )?;
                if corner_radius > 0.0 {
                    let radius = format_number(corner_radius);
                    write!(output, r#" rx="{}" ry="{}""#, radius, radius)?;
                }
                writeln!(
                    output,
                    r#" fill="{}"{}/>"#,
                    fill.hex_string(),
                    opacity_attribute(fill, primitive.opacity)
                )?;
            }
            Shape::Circle {
                center,
                radius,
                fill,
            } => writeln!(
                output,
                r#"<circle data-id="{}" cx="{}" cy="{}" r="{}" fill="{}"{}/>"#,
                id,
                format_number(center.x),
                format_number(center.y),
                format_number(radius),
                fill.hex_string(),
                opacity_attribute(fill, primitive.opacity)
            )?,
            Shape::Ring {
                center,
                radius,
                stroke_width,
                dash,
                stroke,
            } => {
                write!(
                    output,
                    r#"<circle data-id="{}" cx="{}" cy="{}" r="{}" fill="none" stroke="{}" stroke-width="{}""#,
                    id,
                    format_number(center.x),
                    format_number(center.y),
                    format_number(radius),
                    stroke.hex_string(),
                    format_number(stroke_width),
                )?;
                if let Some(dash) = dash {
                    let dash = format_number(dash);
                    write!(output, r#" stroke-dasharray="{},{}""#, dash, dash)?;
                }
                writeln!(output, "{}/>", opacity_attribute(stroke, primitive.opacity))?;
            }
            Shape::Frame {
                rect,
                corner_radius,
                stroke_width,
                stroke,
            } => {
                let radius = format_number(corner_radius);
                writeln!(
                    output,
                    r#"<rect data-id="{}" x="{}" y="{}" width="{}" height="{}" rx="{}" ry="{}" fill="none" stroke="{}" stroke-width="{}"{}/>"#,
                    id,
                    format_number(rect.min_x()),
                    format_number(rect.min_y()),
                    format_number(rect.width()),
                    format_number(rect.height()),
                    radius,
                    radius,
                    stroke.hex_string(),
                    format_number(stroke_width),
                    opacity_attribute(stroke, primitive.opacity)
                )?;
            }
            Shape::Image {
                slot,
                placement,
                clip,
                ..
            } => {
                let Some(image) = drawing.image(slot) else {
                    log::warn!("no image bound to {:?}, skipping primitive {}", slot, id);
                    return Ok(());
                };
                writeln!(
                    output,
                    r#"<defs><clipPath id="clip{}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath></defs>"#,
                    id,
                    format_number(clip.min_x()),
                    format_number(clip.min_y()),
                    format_number(clip.width()),
                    format_number(clip.height()),
                )?;
                write!(
                    output,
                    r#"<image data-id="{}" clip-path="url(#clip{})" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none"{} xlink:href="{}""#,
                    id,
                    id,
                    format_number(placement.min_x()),
                    format_number(placement.min_y()),
                    format_number(placement.width()),
                    format_number(placement.height()),
                    opacity_attribute(Color::BLACK, primitive.opacity),
                    png_data_uri(image.first_frame())?,
                )?;
                match image {
                    ImagePayload::Static(_) => writeln!(output, "/>")?,
                    ImagePayload::Animated { frames, delays } => {
                        writeln!(output, ">")?;
                        write_animation(output, frames, delays)?;
                        writeln!(output, "</image>")?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for SvgWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// `opacity` attribute for a paint of `color` drawn at `opacity`, omitted when fully opaque.
fn opacity_attribute(color: Color, opacity: f64) -> String {
    let value = color.alpha() * opacity;
    if value >= 1.0 {
        String::new()
    } else {
        format!(r#" opacity="{}""#, format_number(value))
    }
}

/// Define the mask revealing the dark modules and open the group it applies to. Each module of
/// the mask overlaps its neighbours by 0.01 so adjacent modules leave no seam.
fn open_mask<W: Write>(output: &mut W, mask: &ModuleMask) -> Result<(), SinkError> {
    let side = format_number(mask.modules.size() as f64);
    write!(
        output,
        r#"<defs><mask id="modules"><rect x="0" y="0" width="{}" height="{}" fill="black"/>"#,
        side, side
    )?;
    for (x, y, module) in mask.modules.modules() {
        if module.is_dark() {
            write!(
                output,
                r#"<rect x="{}" y="{}" width="1.02" height="1.02" fill="white"/>"#,
                format_number(x as f64 - 0.01),
                format_number(y as f64 - 0.01),
            )?;
        }
    }
    writeln!(output, "</mask></defs>")?;
    writeln!(output, r#"<g mask="url(#modules)">"#)?;
    Ok(())
}

/// Discrete SMIL animation cycling the `href` of the enclosing image through `frames`.
fn write_animation<W: Write>(
    output: &mut W,
    frames: &[RgbaImage],
    delays: &[Duration],
) -> Result<(), SinkError> {
    let total: f64 = delays.iter().map(Duration::as_secs_f64).sum();
    let uris = frames
        .iter()
        .map(png_data_uri)
        .collect::<Result<Vec<_>, _>>()?;
    let mut elapsed = 0.0;
    let mut key_times = Vec::with_capacity(delays.len());
    for delay in delays {
        key_times.push(if total > 0.0 { elapsed / total } else { 0.0 });
        elapsed += delay.as_secs_f64();
    }
    writeln!(
        output,
        r#"<animate attributeName="xlink:href" values="{}" keyTimes="{}" dur="{}s" repeatCount="indefinite" calcMode="discrete"/>"#,
        uris.join(";"),
        key_times
            .iter()
            .map(|&t| format_number(t))
            .collect::<Vec<_>>()
            .join(";"),
        format_number(total),
    )?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Backdrop, ImageSlot};
    use qrstyle_core::Point;

    fn drawing<'a>(primitives: Vec<DrawPrimitive>) -> Drawing<'a> {
        Drawing {
            dimension: 2,
            backdrop: Backdrop::default(),
            primitives,
            watermark: None,
            icon: None,
            mask: None,
        }
    }

    #[test]
    fn test_document_frame() {
        let svg = SvgWriter::new()
            .with_size(120)
            .to_string(&drawing(vec![]))
            .unwrap();
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"viewBox="-1 -1 4 4""#));
        assert!(svg.contains(r#"width="120" height="120""#));
        assert!(svg.contains(r##"fill="#ffffff""##));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_shapes() {
        let primitives = vec![
            DrawPrimitive {
                id: 0,
                shape: Shape::Rect {
                    rect: Rect::new(0.1, 0.1, 0.8, 0.8),
                    corner_radius: 0.2,
                    fill: Color::rgb(255, 0, 0),
                },
                opacity: 0.5,
            },
            DrawPrimitive {
                id: 1,
                shape: Shape::Circle {
                    center: Point::new(1.5, 0.5),
                    radius: 1.0 / 3.0,
                    fill: Color::BLACK,
                },
                opacity: 1.0,
            },
            DrawPrimitive {
                id: 2,
                shape: Shape::Ring {
                    center: Point::new(1.0, 1.0),
                    radius: 3.0,
                    stroke_width: 0.15,
                    dash: Some(0.5),
                    stroke: Color::BLACK,
                },
                opacity: 1.0,
            },
        ];
        let svg = SvgWriter::new().to_string(&drawing(primitives)).unwrap();
        assert!(svg.contains(
            r##"<rect data-id="0" x="0.1" y="0.1" width="0.8" height="0.8" rx="0.2" ry="0.2" fill="#ff0000" opacity="0.5"/>"##
        ));
        assert!(svg.contains(r##"<circle data-id="1" cx="1.5" cy="0.5" r="0.3333" fill="#000000"/>"##));
        assert!(svg.contains(r#"stroke-width="0.15" stroke-dasharray="0.5,0.5""#));
    }

    #[test]
    fn test_frame_outline() {
        let primitives = vec![DrawPrimitive {
            id: 0,
            shape: Shape::Frame {
                rect: Rect::new(0.5, 0.5, 6.0, 6.0),
                corner_radius: 1.92,
                stroke_width: 1.0,
                stroke: Color::BLACK,
            },
            opacity: 1.0,
        }];
        let svg = SvgWriter::default().to_string(&drawing(primitives)).unwrap();
        assert!(svg.contains(
            r##"<rect data-id="0" x="0.5" y="0.5" width="6" height="6" rx="1.92" ry="1.92" fill="none" stroke="#000000" stroke-width="1"/>"##
        ));
    }

    #[test]
    fn test_masked_run_is_grouped() {
        let rect = |id| DrawPrimitive {
            id,
            shape: Shape::Rect {
                rect: Rect::new(0.0, 0.0, 2.0, 2.0),
                corner_radius: 0.0,
                fill: Color::BLACK,
            },
            opacity: 1.0,
        };
        let mut drawing = drawing(vec![rect(0), rect(1), rect(2)]);
        drawing.mask = Some(ModuleMask {
            modules: qrstyle_core::ModuleGrid::from_text(".#\n..").unwrap(),
            primitives: 0..2,
        });
        let svg = SvgWriter::new().to_string(&drawing).unwrap();
        assert!(svg.contains(
            r#"<defs><mask id="modules"><rect x="0" y="0" width="2" height="2" fill="black"/><rect x="0.99" y="-0.01" width="1.02" height="1.02" fill="white"/></mask></defs>"#
        ));
        let group = svg.find(r#"<g mask="url(#modules)">"#).unwrap();
        let close = svg.find("</g>").unwrap();
        let first = svg.find(r#"data-id="0""#).unwrap();
        let second = svg.find(r#"data-id="1""#).unwrap();
        let third = svg.find(r#"data-id="2""#).unwrap();
        assert!(group < first && second < close && close < third);
    }

    #[test]
    fn test_image_is_embedded_and_clipped() {
        let payload = ImagePayload::Static(RgbaImage::new(2, 2));
        let mut drawing = drawing(vec![DrawPrimitive {
            id: 0,
            shape: Shape::Image {
                slot: ImageSlot::Watermark,
                mode: crate::ImageMode::ScaleAspectFill,
                placement: Rect::new(-0.5, 0.0, 3.0, 2.0),
                clip: Rect::new(0.0, 0.0, 2.0, 2.0),
            },
            opacity: 0.25,
        }]);
        drawing.watermark = Some(&payload);
        let svg = SvgWriter::new().to_string(&drawing).unwrap();
        assert!(svg.contains(r#"<clipPath id="clip0"><rect x="0" y="0" width="2" height="2"/>"#));
        assert!(svg.contains(r#"clip-path="url(#clip0)" x="-0.5" y="0" width="3" height="2""#));
        assert!(svg.contains(r#"opacity="0.25""#));
        assert!(svg.contains("xlink:href=\"data:image/png;base64,"));
    }

    #[test]
    fn test_animation_key_times() {
        let frames = vec![RgbaImage::new(1, 1), RgbaImage::new(1, 1)];
        let delays = vec![Duration::from_millis(100), Duration::from_millis(300)];
        let mut output = Vec::new();
        write_animation(&mut output, &frames, &delays).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains(r#"keyTimes="0;0.25""#));
        assert!(text.contains(r#"dur="0.4s""#));
        assert!(text.contains(r#"calcMode="discrete""#));
    }
}
