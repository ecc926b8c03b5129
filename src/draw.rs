//! Final dispatch from resolved elements to surface primitives. Elements
//! are issued strictly in document order; the surface paints later calls
//! on top of earlier ones.

use std::collections::HashMap;

use base64::Engine;
use image::GenericImageView;
use tracing::warn;

use crate::converter::fit_box;
use crate::error::PageSvgError;
use crate::geometry::{GeomRect, Point, Segment, clip_segment};
use crate::surface::{
    EllipseOptions, ImageOptions, LineOptions, PageSurface, PathOptions, RectangleOptions,
    TextOptions,
};
use crate::types::{Position, Pt, SvgBox};
use crate::walker::{ResolvedElement, Shape, TextAnchor};

// Width heuristic for anchor adjustment; the surface owns real metrics.
const CHAR_WIDTH_EM: f32 = 0.5;

/// Issues one surface call per element. Stops at the first fatal resource
/// failure; everything drawn up to that point is the caller's to discard.
pub fn dispatch<S: PageSurface>(
    surface: &mut S,
    elements: &[ResolvedElement],
    clip: GeomRect,
    fonts: &HashMap<String, S::Font>,
    default_font: Option<&S::Font>,
) -> Result<(), PageSvgError> {
    for element in elements {
        let paint = &element.paint;
        match &element.shape {
            Shape::Text { text, x, y, anchor } => {
                // The anchor point decides visibility for the whole run.
                if !clip.contains(Point::new(*x, *y)) {
                    continue;
                }
                let estimated = text.chars().count() as f32 * paint.font_size * CHAR_WIDTH_EM;
                let x = match anchor {
                    TextAnchor::Start => *x,
                    TextAnchor::Middle => *x - estimated / 2.0,
                    TextAnchor::End => *x - estimated,
                };
                let font = paint
                    .font_family
                    .as_deref()
                    .and_then(|family| fonts.get(family))
                    .or(default_font)
                    .cloned();
                surface.draw_text(
                    text,
                    TextOptions {
                        x: Pt::from_f32(x),
                        y: Pt::from_f32(*y),
                        font,
                        size: Pt::from_f32(paint.font_size),
                        color: paint.fill,
                        opacity: paint.fill_opacity,
                        rotation: paint.rotation,
                    },
                );
            }
            Shape::Line { x1, y1, x2, y2 } => {
                let seg = Segment::new(Point::new(*x1, *y1), Point::new(*x2, *y2));
                let Some(seg) = clip_segment(seg, clip) else {
                    continue;
                };
                surface.draw_line(LineOptions {
                    start: Position::new(seg.start.x, seg.start.y),
                    end: Position::new(seg.end.x, seg.end.y),
                    thickness: Pt::from_f32(paint.stroke_width),
                    color: paint.stroke,
                    opacity: paint.stroke_opacity,
                    line_cap: paint.line_cap,
                });
            }
            Shape::Path { data, origin } => {
                surface.draw_path(
                    data,
                    PathOptions {
                        x: Pt::from_f32(origin.0),
                        y: Pt::from_f32(origin.1),
                        border_color: paint.stroke,
                        border_width: Pt::from_f32(paint.stroke_width),
                        border_opacity: paint.stroke_opacity,
                        border_line_cap: paint.line_cap,
                        border_line_join: paint.line_join,
                        fill_color: paint.fill,
                        fill_opacity: paint.fill_opacity,
                        scale: None,
                        rotation: paint.rotation,
                    },
                );
            }
            Shape::Image {
                source,
                x,
                y,
                width,
                height,
                aspect,
            } => {
                if *width == 0.0 || *height == 0.0 {
                    continue;
                }
                let decoded = decode_image(source)?;
                let (pixel_w, pixel_h) = decoded.dimensions();
                let (iw, ih) = (pixel_w as f32, pixel_h as f32);
                let slot = SvgBox {
                    x: 0.0,
                    y: 0.0,
                    width: width.abs(),
                    height: height.abs(),
                };
                let fitted = fit_box(iw, ih, slot, *aspect);
                // Re-apply the axis signs the fit was computed without.
                let sw = width.signum();
                let sh = height.signum();
                surface.draw_image(
                    &decoded,
                    ImageOptions {
                        x: Pt::from_f32(x + fitted.x * sw),
                        y: Pt::from_f32(y + fitted.y * sh),
                        width: Pt::from_f32(fitted.width * sw),
                        height: Pt::from_f32(fitted.height * sh),
                        opacity: paint.fill_opacity,
                        x_skew: 0.0,
                        y_skew: 0.0,
                        rotation: paint.rotation,
                    },
                );
            }
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => {
                if paint.fill.is_none() && paint.stroke.is_none() {
                    continue;
                }
                surface.draw_rectangle(RectangleOptions {
                    x: Pt::from_f32(*x),
                    y: Pt::from_f32(*y),
                    width: Pt::from_f32(*width),
                    height: Pt::from_f32(*height),
                    fill_color: paint.fill,
                    fill_opacity: paint.fill_opacity,
                    border_color: paint.stroke,
                    border_width: Pt::from_f32(paint.stroke_width),
                    border_opacity: paint.stroke_opacity,
                    border_line_cap: paint.line_cap,
                    border_line_join: paint.line_join,
                });
            }
            Shape::Ellipse { cx, cy, rx, ry } => {
                surface.draw_ellipse(EllipseOptions {
                    x: Pt::from_f32(*cx),
                    y: Pt::from_f32(*cy),
                    x_scale: Pt::from_f32(*rx),
                    y_scale: Pt::from_f32(*ry),
                    fill_color: paint.fill,
                    fill_opacity: paint.fill_opacity,
                    border_color: paint.stroke,
                    border_width: Pt::from_f32(paint.stroke_width),
                    border_opacity: paint.stroke_opacity,
                });
            }
        }
    }
    Ok(())
}

/// Decodes an embedded `data:` URI into pixels. Only base64 payloads are
/// supported; remote references cannot be resolved here and are fatal,
/// matching the no-partial-output contract for missing resources.
fn decode_image(source: &str) -> Result<image::DynamicImage, PageSvgError> {
    let Some(rest) = source.strip_prefix("data:") else {
        warn!(source, "image source is not a data URI");
        return Err(PageSvgError::Asset(format!(
            "unsupported image source: {source}"
        )));
    };
    let payload = rest
        .split_once(";base64,")
        .map(|(_, p)| p)
        .ok_or_else(|| PageSvgError::Asset("data URI is not base64-encoded".to_string()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| PageSvgError::Asset(format!("invalid base64 image payload: {e}")))?;
    image::load_from_memory(&bytes)
        .map_err(|e| PageSvgError::Asset(format!("undecodable image payload: {e}")))
}
