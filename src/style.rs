//! Cascading style resolution: inline `style` wins over the same-named
//! presentation attribute, which wins over the inherited value, which wins
//! over a property-specific default.

use crate::converter::Converter;
use crate::types::{Color, LineCap, LineJoin};
use lightningcss::traits::Parse;
use lightningcss::values::color::{CssColor, SRGB};

/// Paint/font attributes flowing from ancestor groups to descendants.
/// `width`/`height` always carry the nearest ancestor's reference box (in
/// that ancestor's user units) for percentage resolution; everything else
/// is optional until some ancestor sets it.
#[derive(Debug, Clone)]
pub struct Inherited {
    pub width: f32,
    pub height: f32,
    pub fill: Option<Color>,
    pub fill_opacity: Option<f32>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
    pub stroke_opacity: Option<f32>,
    pub line_cap: Option<LineCap>,
    pub line_join: Option<LineJoin>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub rotation: f32,
}

impl Inherited {
    pub fn root(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            fill: Some(Color::BLACK),
            fill_opacity: None,
            stroke: None,
            stroke_width: None,
            stroke_opacity: None,
            line_cap: None,
            line_join: None,
            font_family: None,
            font_size: None,
            rotation: 0.0,
        }
    }

    /// Final paint snapshot for a leaf, with property defaults filled in.
    pub fn paint(&self) -> ResolvedPaint {
        ResolvedPaint {
            fill: self.fill,
            fill_opacity: self.fill_opacity.unwrap_or(1.0),
            stroke: self.stroke,
            stroke_width: self.stroke_width.unwrap_or(1.0),
            stroke_opacity: self.stroke_opacity.unwrap_or(1.0),
            line_cap: self.line_cap.unwrap_or_default(),
            line_join: self.line_join.unwrap_or_default(),
            font_family: self.font_family.clone(),
            font_size: self.font_size.unwrap_or(12.0),
            rotation: self.rotation,
        }
    }
}

/// Fully-defaulted paint attributes consumed by the draw dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaint {
    pub fill: Option<Color>,
    pub fill_opacity: f32,
    pub stroke: Option<Color>,
    pub stroke_width: f32,
    pub stroke_opacity: f32,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub font_family: Option<String>,
    pub font_size: f32,
    pub rotation: f32,
}

/// A parsed paint token. `NoPaint` is an explicit override (`none`,
/// `transparent`, empty string), distinct from an unparsable token which
/// yields no override at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintValue {
    NoPaint,
    Color(Color, Option<f32>),
}

/// One element's view of its raw attributes: inline `style` declarations
/// layered over presentation attributes.
pub struct Resolver<'a, 'input> {
    node: roxmltree::Node<'a, 'input>,
    declarations: Vec<(String, String)>,
}

impl<'a, 'input> Resolver<'a, 'input> {
    pub fn new(node: roxmltree::Node<'a, 'input>) -> Self {
        let declarations = node
            .attribute("style")
            .map(parse_inline_style)
            .unwrap_or_default();
        Self { node, declarations }
    }

    /// Raw value for a property, inline style first. Later declarations of
    /// the same property win.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .or_else(|| self.node.attribute(name))
    }

    pub fn length(&self, name: &str, reference: f32) -> Option<f32> {
        self.raw(name).and_then(|v| parse_length(v, reference))
    }

    pub fn number(&self, name: &str) -> Option<f32> {
        self.raw(name).and_then(parse_number)
    }

    /// Applies this element's cascade on top of the parent scope,
    /// producing the inherited set for the element and its subtree.
    /// `converter` is the element's active converter, used to re-express
    /// stroke width and font size in target units.
    pub fn resolve_inherited(&self, parent: &Inherited, converter: &Converter) -> Inherited {
        let mut out = parent.clone();

        let opacity = self.number("opacity").map(|v| v.clamp(0.0, 1.0));
        let fill_opacity = self
            .number("fill-opacity")
            .map(|v| v.clamp(0.0, 1.0))
            .or(opacity);
        let stroke_opacity = self
            .number("stroke-opacity")
            .map(|v| v.clamp(0.0, 1.0))
            .or(opacity);

        if let Some(paint) = self.raw("fill").and_then(parse_paint) {
            match paint {
                PaintValue::NoPaint => {
                    out.fill = None;
                }
                PaintValue::Color(color, alpha) => {
                    out.fill = Some(color);
                    // Explicit opacity properties outrank color-embedded alpha.
                    out.fill_opacity = fill_opacity.or(alpha).or(out.fill_opacity);
                }
            }
        }
        if let Some(v) = fill_opacity {
            out.fill_opacity = Some(v);
        }

        if let Some(paint) = self.raw("stroke").and_then(parse_paint) {
            match paint {
                PaintValue::NoPaint => {
                    out.stroke = None;
                }
                PaintValue::Color(color, alpha) => {
                    out.stroke = Some(color);
                    out.stroke_opacity = stroke_opacity.or(alpha).or(out.stroke_opacity);
                }
            }
        }
        if let Some(v) = stroke_opacity {
            out.stroke_opacity = Some(v);
        }

        if let Some(w) = self.length("stroke-width", parent.width) {
            let (wx, wy) = converter.size(w, w);
            // Clamp so non-uniform scaling can never produce an invisible
            // hairline.
            out.stroke_width = Some(wx.abs().min(wy.abs()).max(1.0));
        }

        if let Some(cap) = self.raw("stroke-linecap").and_then(parse_line_cap) {
            out.line_cap = Some(cap);
        }
        if let Some(join) = self.raw("stroke-linejoin").and_then(parse_line_join) {
            out.line_join = Some(join);
        }

        if let Some(family) = self.raw("font-family") {
            let family = strip_quotes(family.trim());
            if !family.is_empty() {
                out.font_family = Some(family.to_string());
            }
        }
        if let Some(fs) = self.length("font-size", parent.height) {
            let (vx, vy) = converter.size(0.0, fs);
            out.font_size = Some(libm::hypotf(vx, vy));
        }

        out
    }
}

fn parse_inline_style(input: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for decl in input.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((k, v)) = decl.split_once(':') else {
            continue;
        };
        out.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
    }
    out
}

/// Bare numbers are user units; `%` is a fraction of the caller-supplied
/// reference dimension; anything unparsable is absent and falls back to
/// the cascade.
pub fn parse_length(input: &str, reference: f32) -> Option<f32> {
    let s = input.trim();
    if let Some(p) = s.strip_suffix('%') {
        let v = p.trim().parse::<f32>().ok()?;
        return Some(v / 100.0 * reference);
    }
    parse_number(s)
}

pub fn parse_number(input: &str) -> Option<f32> {
    let s = input.trim();
    // Treat common unit suffixes as user units.
    let s = s
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim_end_matches("mm")
        .trim_end_matches("cm")
        .trim_end_matches("in")
        .trim();
    s.parse::<f32>().ok()
}

/// Parses a paint token through the CSS color machinery (named colors,
/// hex, rgb[a], hsl). Returns `None` for tokens that are not colors at
/// all (e.g. `url(#id)`, `currentColor`), which leaves the cascade alone.
pub fn parse_paint(input: &str) -> Option<PaintValue> {
    let v = input.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("transparent") {
        return Some(PaintValue::NoPaint);
    }
    let parsed = CssColor::parse_string(v).ok()?;
    css_color_to_paint(&parsed)
}

fn css_color_to_paint(color: &CssColor) -> Option<PaintValue> {
    if let CssColor::RGBA(rgba) = color {
        let r = rgba.red as f32 / 255.0;
        let g = rgba.green as f32 / 255.0;
        let b = rgba.blue as f32 / 255.0;
        let alpha = if rgba.alpha == 255 {
            None
        } else {
            Some((rgba.alpha as f32 / 255.0).clamp(0.0, 1.0))
        };
        return Some(PaintValue::Color(Color::rgb(r, g, b), alpha));
    }
    if let Ok(srgb) = SRGB::try_from(color) {
        return Some(PaintValue::Color(Color::rgb(srgb.r, srgb.g, srgb.b), None));
    }
    None
}

fn parse_line_cap(input: &str) -> Option<LineCap> {
    match input.trim() {
        "butt" => Some(LineCap::Butt),
        "round" => Some(LineCap::Round),
        "square" => Some(LineCap::Projecting),
        _ => None,
    }
}

fn parse_line_join(input: &str) -> Option<LineJoin> {
    match input.trim() {
        "miter" => Some(LineJoin::Miter),
        "round" => Some(LineJoin::Round),
        "bevel" => Some(LineJoin::Bevel),
        _ => None,
    }
}

fn strip_quotes(input: &str) -> &str {
    let s = input;
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        if (bytes[0] == b'"' && bytes[s.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[s.len() - 1] == b'\'')
        {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Converter, Transform};

    fn resolved_for(xml: &'static str) -> Inherited {
        let doc = roxmltree::Document::parse(xml).expect("test markup parses");
        let node = doc.root_element();
        let resolver = Resolver::new(node);
        resolver.resolve_inherited(&Inherited::root(100.0, 100.0), &Converter::identity())
    }

    #[test]
    fn percentage_length_resolves_against_reference() {
        assert_eq!(parse_length("50%", 200.0), Some(100.0));
    }

    #[test]
    fn non_numeric_length_is_absent() {
        assert_eq!(parse_length("wide", 200.0), None);
        let out = resolved_for(r#"<rect stroke-width="wide"/>"#);
        assert_eq!(out.stroke_width, None);
    }

    #[test]
    fn none_resolves_to_absent_paint() {
        assert_eq!(parse_paint("none"), Some(PaintValue::NoPaint));
        assert_eq!(parse_paint("transparent"), Some(PaintValue::NoPaint));
        assert_eq!(parse_paint(""), Some(PaintValue::NoPaint));
    }

    #[test]
    fn named_color_resolves_with_full_opacity() {
        let out = resolved_for(r#"<rect fill="red"/>"#);
        assert_eq!(out.fill, Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(out.paint().fill_opacity, 1.0);
    }

    #[test]
    fn color_alpha_applies_unless_explicit_opacity_is_given() {
        let with_alpha = resolved_for(r#"<rect fill="rgba(255, 0, 0, 0.5)"/>"#);
        assert!((with_alpha.fill_opacity.unwrap() - 0.5).abs() < 0.01);

        let with_explicit = resolved_for(r#"<rect fill="rgba(255, 0, 0, 0.5)" fill-opacity="0.8"/>"#);
        assert!((with_explicit.fill_opacity.unwrap() - 0.8).abs() < 0.01);
    }

    #[test]
    fn inline_style_wins_over_presentation_attribute() {
        let out = resolved_for(r#"<rect fill="red" style="fill: blue"/>"#);
        assert_eq!(out.fill, Some(Color::rgb(0.0, 0.0, 1.0)));
    }

    #[test]
    fn unknown_cap_token_keeps_inherited_value() {
        let out = resolved_for(r#"<rect stroke-linecap="fancy"/>"#);
        assert_eq!(out.line_cap, None);
        let out = resolved_for(r#"<rect stroke-linecap="square"/>"#);
        assert_eq!(out.line_cap, Some(LineCap::Projecting));
    }

    #[test]
    fn line_join_table() {
        let out = resolved_for(r#"<rect stroke-linejoin="bevel"/>"#);
        assert_eq!(out.line_join, Some(LineJoin::Bevel));
        let out = resolved_for(r#"<rect stroke-linejoin="round"/>"#);
        assert_eq!(out.line_join, Some(LineJoin::Round));
    }

    #[test]
    fn stroke_width_is_scaled_and_clamped() {
        let doc = roxmltree::Document::parse(r#"<rect stroke-width="4"/>"#).unwrap();
        let resolver = Resolver::new(doc.root_element());
        let converter = Converter::identity().apply(Transform::Scale { sx: 2.0, sy: 0.1 });
        let out = resolver.resolve_inherited(&Inherited::root(100.0, 100.0), &converter);
        // min(|8|, |0.4|) clamps up to 1.
        assert_eq!(out.stroke_width, Some(1.0));
    }

    #[test]
    fn font_family_quotes_are_stripped() {
        let out = resolved_for(r#"<text font-family="'Helvetica Neue'"/>"#);
        assert_eq!(out.font_family.as_deref(), Some("Helvetica Neue"));
    }

    #[test]
    fn font_size_maps_through_vertical_size() {
        let doc = roxmltree::Document::parse(r#"<text font-size="10"/>"#).unwrap();
        let resolver = Resolver::new(doc.root_element());
        let converter = Converter::identity().apply(Transform::Scale { sx: 1.0, sy: 2.0 });
        let out = resolver.resolve_inherited(&Inherited::root(100.0, 100.0), &converter);
        assert!((out.font_size.unwrap() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn hex_color_parses() {
        assert_eq!(
            parse_paint("#0000ff"),
            Some(PaintValue::Color(Color::rgb(0.0, 0.0, 1.0), None))
        );
    }
}
