//! Renders a subset of SVG markup onto an abstract page surface.
//!
//! The markup fragment is parsed, its style cascade and transform chain are
//! resolved, path data is rewritten into absolute page coordinates, lines
//! are clipped to the target rectangle, and the result is dispatched as a
//! sequence of primitive drawing operations on a caller-provided
//! [`PageSurface`]. The crate never rasterizes or serializes anything
//! itself; it is the translation layer between markup semantics and a
//! page's content operations.
//!
//! ```no_run
//! # use pagesvg::{render_svg, SvgOptions, PageSurface, Pt};
//! # fn demo<S: PageSurface>(page: &mut S) -> Result<(), pagesvg::PageSvgError> {
//! let options = SvgOptions {
//!     x: Pt::from_f32(50.0),
//!     y: Pt::from_f32(700.0),
//!     width: Some(Pt::from_f32(200.0)),
//!     height: Some(Pt::from_f32(100.0)),
//!     ..SvgOptions::default()
//! };
//! render_svg(page, r#"<svg><rect width="50" height="50" fill="teal"/></svg>"#, &options)?;
//! # Ok(())
//! # }
//! ```

mod converter;
mod draw;
mod error;
mod geometry;
mod path;
mod style;
mod surface;
mod types;
mod walker;

use std::collections::HashMap;

pub use converter::{AspectRatio, Converter, Transform};
pub use error::PageSvgError;
pub use style::{Inherited, ResolvedPaint};
pub use surface::{
    EllipseOptions, ImageOptions, LineOptions, PageSurface, PathOptions, RectangleOptions,
    TextOptions,
};
pub use types::{Color, LineCap, LineJoin, Position, Pt, SvgBox};
pub use walker::{ResolvedElement, Shape, TextAnchor};

use geometry::GeomRect;

/// Placement and resource options for one [`render_svg`] call.
///
/// `(x, y)` is the page position of the fragment's top-left corner (page
/// coordinates grow upward, so content extends downward from `y`). When
/// `width`/`height` are absent they fall back to the root element's
/// `width`/`height` attributes, then to its `viewBox` dimensions.
pub struct SvgOptions<F> {
    pub x: Pt,
    pub y: Pt,
    pub width: Option<Pt>,
    pub height: Option<Pt>,
    /// Initial font size in page units; elements may still override it.
    pub font_size: Option<Pt>,
    /// Fallback font for text whose family has no entry in `fonts`.
    pub font: Option<F>,
    /// Font handles keyed by family name, matched against `font-family`.
    pub fonts: HashMap<String, F>,
}

impl<F> Default for SvgOptions<F> {
    fn default() -> Self {
        Self {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: None,
            height: None,
            font_size: None,
            font: None,
            fonts: HashMap::new(),
        }
    }
}

/// Draws `markup` onto `surface` at the position and size given by
/// `options`.
///
/// Malformed XML and undecodable image payloads are fatal; everything else
/// degrades per element (unknown tags, attributes and transform
/// instructions are skipped). Markup without an `svg` root draws nothing
/// and succeeds.
pub fn render_svg<S: PageSurface>(
    surface: &mut S,
    markup: &str,
    options: &SvgOptions<S::Font>,
) -> Result<(), PageSvgError> {
    let doc = roxmltree::Document::parse(markup)?;
    let Some(root) = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "svg")
    else {
        return Ok(());
    };

    let view = walker::parse_view_box(root.attribute("viewBox"));
    let width = options
        .width
        .map(Pt::to_f32)
        .or_else(|| root.attribute("width").and_then(style::parse_number))
        .or(view.map(|v| v.width));
    let height = options
        .height
        .map(Pt::to_f32)
        .or_else(|| root.attribute("height").and_then(style::parse_number))
        .or(view.map(|v| v.height));
    let (Some(width), Some(height)) = (width, height) else {
        return Err(PageSvgError::InvalidOptions(
            "target size missing: pass width/height or size the root element".to_string(),
        ));
    };
    if width <= 0.0 || height <= 0.0 {
        return Err(PageSvgError::InvalidOptions(format!(
            "target size must be positive, got {width}x{height}"
        )));
    }

    let x = options.x.to_f32();
    let y = options.y.to_f32();
    let ctx = walker::Context {
        inherited: {
            let mut inherited = Inherited::root(width, height);
            if let Some(fs) = options.font_size {
                inherited.font_size = Some(fs.to_f32());
            }
            inherited
        },
        converter: Converter::page_root(x, y),
        clip: GeomRect::from_corners(x, y - height, x + width, y),
    };

    let mut elements = Vec::new();
    walker::walk_root(root, &ctx, &mut elements);
    draw::dispatch(surface, &elements, ctx.clip, &options.fonts, options.font.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Text {
            text: String,
            x: f32,
            y: f32,
            font: Option<&'static str>,
            size: f32,
        },
        Line {
            start: (f32, f32),
            end: (f32, f32),
        },
        Path {
            data: String,
        },
        Rectangle {
            x: f32,
            y: f32,
            width: f32,
            height: f32,
            fill: Option<Color>,
            border: Option<Color>,
        },
        Ellipse {
            x: f32,
            y: f32,
            x_scale: f32,
            y_scale: f32,
        },
        Image {
            width: f32,
            height: f32,
        },
    }

    #[derive(Default)]
    struct Page {
        ops: Vec<Op>,
    }

    impl PageSurface for Page {
        type Font = &'static str;

        fn draw_text(&mut self, text: &str, options: TextOptions<&'static str>) {
            self.ops.push(Op::Text {
                text: text.to_string(),
                x: options.x.to_f32(),
                y: options.y.to_f32(),
                font: options.font,
                size: options.size.to_f32(),
            });
        }

        fn draw_line(&mut self, options: LineOptions) {
            self.ops.push(Op::Line {
                start: (options.start.x.to_f32(), options.start.y.to_f32()),
                end: (options.end.x.to_f32(), options.end.y.to_f32()),
            });
        }

        fn draw_path(&mut self, data: &str, _options: PathOptions) {
            self.ops.push(Op::Path {
                data: data.to_string(),
            });
        }

        fn draw_image(&mut self, _image: &image::DynamicImage, options: ImageOptions) {
            self.ops.push(Op::Image {
                width: options.width.to_f32(),
                height: options.height.to_f32(),
            });
        }

        fn draw_rectangle(&mut self, options: RectangleOptions) {
            self.ops.push(Op::Rectangle {
                x: options.x.to_f32(),
                y: options.y.to_f32(),
                width: options.width.to_f32(),
                height: options.height.to_f32(),
                fill: options.fill_color,
                border: options.border_color,
            });
        }

        fn draw_ellipse(&mut self, options: EllipseOptions) {
            self.ops.push(Op::Ellipse {
                x: options.x.to_f32(),
                y: options.y.to_f32(),
                x_scale: options.x_scale.to_f32(),
                y_scale: options.y_scale.to_f32(),
            });
        }
    }

    fn at(x: f32, y: f32) -> SvgOptions<&'static str> {
        SvgOptions {
            x: Pt::from_f32(x),
            y: Pt::from_f32(y),
            ..SvgOptions::default()
        }
    }

    fn render(markup: &str, options: &SvgOptions<&'static str>) -> Vec<Op> {
        let mut page = Page::default();
        render_svg(&mut page, markup, options).expect("render succeeds");
        page.ops
    }

    #[test]
    fn filled_rect_lands_below_the_anchor() {
        let ops = render(
            r#"<svg width="100" height="100"><rect width="10" height="10" fill="red"/></svg>"#,
            &at(0.0, 100.0),
        );
        assert_eq!(
            ops,
            vec![Op::Rectangle {
                x: 0.0,
                y: 100.0,
                width: 10.0,
                height: -10.0,
                fill: Some(Color::rgb(1.0, 0.0, 0.0)),
                border: None,
            }]
        );
    }

    #[test]
    fn overlong_line_is_clipped_to_the_target_width() {
        let ops = render(
            r#"<svg width="50" height="50"><line x1="0" y1="0" x2="1000" y2="0" stroke="black"/></svg>"#,
            &at(0.0, 50.0),
        );
        assert_eq!(
            ops,
            vec![Op::Line {
                start: (0.0, 50.0),
                end: (50.0, 50.0),
            }]
        );
    }

    #[test]
    fn group_transforms_scale_the_circle() {
        let ops = render(
            r#"<svg width="100" height="100"><g transform="translate(10,10) scale(2)"><circle r="5" fill="blue"/></g></svg>"#,
            &at(0.0, 100.0),
        );
        assert_eq!(
            ops,
            vec![Op::Ellipse {
                x: 10.0,
                y: 90.0,
                x_scale: 10.0,
                y_scale: 10.0,
            }]
        );
    }

    #[test]
    fn malformed_markup_is_fatal() {
        let mut page = Page::default();
        let result = render_svg(&mut page, "<svg><rect", &at(0.0, 100.0));
        assert!(matches!(result, Err(PageSvgError::Markup(_))));
        assert!(page.ops.is_empty());
    }

    #[test]
    fn missing_root_draws_nothing_and_succeeds() {
        let mut page = Page::default();
        render_svg(&mut page, "<div>no drawing here</div>", &at(0.0, 100.0))
            .expect("succeeds without a root");
        assert!(page.ops.is_empty());
    }

    #[test]
    fn target_size_falls_back_to_root_attributes_then_view_box() {
        let from_attrs = render(
            r#"<svg width="30" height="30"><rect width="100%" height="100%" fill="red"/></svg>"#,
            &at(0.0, 30.0),
        );
        assert_eq!(
            from_attrs,
            vec![Op::Rectangle {
                x: 0.0,
                y: 30.0,
                width: 30.0,
                height: -30.0,
                fill: Some(Color::rgb(1.0, 0.0, 0.0)),
                border: None,
            }]
        );

        let mut page = Page::default();
        let result = render_svg(
            &mut page,
            r#"<svg><rect width="1" height="1" fill="red"/></svg>"#,
            &at(0.0, 100.0),
        );
        assert!(matches!(result, Err(PageSvgError::InvalidOptions(_))));
    }

    #[test]
    fn explicit_size_overrides_root_attributes() {
        let options = SvgOptions {
            width: Some(Pt::from_f32(50.0)),
            height: Some(Pt::from_f32(50.0)),
            ..at(0.0, 50.0)
        };
        let ops = render(
            r#"<svg width="999" height="999"><rect width="100%" height="100%" fill="red"/></svg>"#,
            &options,
        );
        let Op::Rectangle { width, height, .. } = &ops[0] else {
            panic!("expected rectangle");
        };
        assert_eq!((*width, *height), (50.0, -50.0));
    }

    #[test]
    fn fonts_are_matched_by_family_with_a_fallback() {
        let options = SvgOptions {
            font: Some("fallback"),
            fonts: HashMap::from([("Roboto".to_string(), "roboto")]),
            ..at(0.0, 100.0)
        };
        let ops = render(
            r#"<svg width="100" height="100">
                 <text x="10" y="10" font-family="Roboto">a</text>
                 <text x="10" y="30">b</text>
               </svg>"#,
            &options,
        );
        let fonts: Vec<_> = ops
            .iter()
            .map(|op| match op {
                Op::Text { font, .. } => *font,
                other => panic!("expected text, got {other:?}"),
            })
            .collect();
        assert_eq!(fonts, vec![Some("roboto"), Some("fallback")]);
    }

    #[test]
    fn option_font_size_seeds_the_cascade() {
        let options = SvgOptions {
            font_size: Some(Pt::from_f32(20.0)),
            ..at(0.0, 100.0)
        };
        let ops = render(
            r#"<svg width="100" height="100"><text x="10" y="10">a</text></svg>"#,
            &options,
        );
        let Op::Text { size, .. } = &ops[0] else {
            panic!("expected text");
        };
        assert_eq!(*size, 20.0);
    }

    #[test]
    fn path_data_arrives_in_page_coordinates() {
        let ops = render(
            r#"<svg width="100" height="100"><path d="M0 0 C10 10 20 20 30 30" stroke="black"/></svg>"#,
            &at(0.0, 100.0),
        );
        assert_eq!(
            ops,
            vec![Op::Path {
                data: "M0 100 C10 90 20 80 30 70".to_string(),
            }]
        );
    }
}
