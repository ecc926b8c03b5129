//! Depth-first traversal of the markup tree. Groups (`svg`, `g`) resolve
//! their cascade and transforms and recurse; every other recognized tag is
//! a leaf yielding exactly one [`ResolvedElement`], in document order so
//! later siblings paint on top of earlier ones.

use crate::converter::{
    AspectRatio, Converter, Transform, fit_box, parse_aspect_ratio, parse_number_list,
    parse_transform_list,
};
use crate::geometry::GeomRect;
use crate::path;
use crate::style::{Inherited, ResolvedPaint, Resolver};
use crate::types::SvgBox;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

/// Element-specific geometry, already in absolute target-page units.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Text {
        text: String,
        x: f32,
        y: f32,
        anchor: TextAnchor,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Path {
        data: String,
        origin: (f32, f32),
    },
    Image {
        source: String,
        x: f32,
        y: f32,
        /// Signed page extents; height is negative under the root flip.
        width: f32,
        height: f32,
        aspect: AspectRatio,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
    },
}

/// A leaf drawable with all attributes merged and transformed; the only
/// structure the draw dispatcher consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedElement {
    pub shape: Shape,
    pub paint: ResolvedPaint,
}

/// Read-only state threaded down the recursion. Cloned at every group
/// boundary; sibling subtrees never share mutable state.
#[derive(Debug, Clone)]
pub struct Context {
    pub inherited: Inherited,
    pub converter: Converter,
    pub clip: GeomRect,
}

/// Walks the root container. The target box dimensions are authoritative
/// for the root: its own `width`/`height`/`x`/`y` attributes only feed the
/// caller's defaulting, never the layout here.
pub fn walk_root(node: roxmltree::Node<'_, '_>, ctx: &Context, out: &mut Vec<ResolvedElement>) {
    let resolver = Resolver::new(node);
    let mut rotation = ctx.inherited.rotation;
    let mut converter = element_converter(&resolver, ctx, false, &mut rotation);

    let (mut width, mut height) = (ctx.inherited.width, ctx.inherited.height);
    if let Some(view) = parse_view_box(node.attribute("viewBox")) {
        let target = SvgBox {
            x: 0.0,
            y: 0.0,
            width,
            height,
        };
        let fitted = fit_box(
            view.width,
            view.height,
            target,
            parse_aspect_ratio(node.attribute("preserveAspectRatio")),
        );
        converter = converter.with_viewport(view, fitted);
        width = view.width;
        height = view.height;
    }

    let mut inherited = resolver.resolve_inherited(&ctx.inherited, &converter);
    inherited.width = width;
    inherited.height = height;
    inherited.rotation = rotation;

    let ctx = Context {
        inherited,
        converter,
        clip: ctx.clip,
    };
    for child in node.children().filter(|n| n.is_element()) {
        walk(child, &ctx, out);
    }
}

/// Depth-first step over one node. Comment and text nodes never reach
/// here (children are filtered to elements); `svg`/`g` recurse, leaves
/// yield one resolved element, unknown tags are a no-op.
pub fn walk(node: roxmltree::Node<'_, '_>, ctx: &Context, out: &mut Vec<ResolvedElement>) {
    let tag = node.tag_name().name();
    match tag {
        "svg" | "g" => walk_group(node, ctx, out),
        "text" => {
            if let Some(el) = resolve_text(node, ctx) {
                out.push(el);
            }
        }
        "line" => out.push(resolve_line(node, ctx)),
        "path" => {
            if let Some(el) = resolve_path(node, ctx) {
                out.push(el);
            }
        }
        "polyline" => {
            if let Some(el) = resolve_poly(node, ctx, false) {
                out.push(el);
            }
        }
        "polygon" => {
            if let Some(el) = resolve_poly(node, ctx, true) {
                out.push(el);
            }
        }
        "image" => {
            if let Some(el) = resolve_image(node, ctx) {
                out.push(el);
            }
        }
        "rect" => out.push(resolve_rect(node, ctx)),
        "ellipse" | "circle" => {
            if let Some(el) = resolve_ellipse(node, ctx) {
                out.push(el);
            }
        }
        other => {
            debug!(tag = other, "unsupported element, skipping");
        }
    }
}

fn walk_group(node: roxmltree::Node<'_, '_>, ctx: &Context, out: &mut Vec<ResolvedElement>) {
    let resolver = Resolver::new(node);
    let mut rotation = ctx.inherited.rotation;
    let converter = element_converter(&resolver, ctx, true, &mut rotation);

    let mut width = resolver
        .length("width", ctx.inherited.width)
        .unwrap_or(ctx.inherited.width);
    let mut height = resolver
        .length("height", ctx.inherited.height)
        .unwrap_or(ctx.inherited.height);

    let converter = if let Some(view) = parse_view_box(node.attribute("viewBox")) {
        let target = SvgBox {
            x: 0.0,
            y: 0.0,
            width,
            height,
        };
        let fitted = fit_box(
            view.width,
            view.height,
            target,
            parse_aspect_ratio(node.attribute("preserveAspectRatio")),
        );
        let composed = converter.with_viewport(view, fitted);
        width = view.width;
        height = view.height;
        composed
    } else {
        converter
    };

    let mut inherited = resolver.resolve_inherited(&ctx.inherited, &converter);
    inherited.width = width;
    inherited.height = height;
    inherited.rotation = rotation;

    let ctx = Context {
        inherited,
        converter,
        clip: ctx.clip,
    };
    for child in node.children().filter(|n| n.is_element()) {
        walk(child, &ctx, out);
    }
}

/// Extends the inherited converter with this element's transform
/// instructions: `x`/`y` become an implicit leading translate (groups
/// only — on leaves they are geometry), then the individual shorthand
/// attributes, then the `transform` attribute list, left to right.
fn element_converter(
    resolver: &Resolver<'_, '_>,
    ctx: &Context,
    include_xy: bool,
    rotation: &mut f32,
) -> Converter {
    let mut converter = ctx.converter;

    if include_xy {
        let dx = resolver.length("x", ctx.inherited.width).unwrap_or(0.0);
        let dy = resolver.length("y", ctx.inherited.height).unwrap_or(0.0);
        if dx != 0.0 || dy != 0.0 {
            converter = converter.apply(Transform::Translate { dx, dy });
        }
    }

    const SHORTHANDS: [&str; 9] = [
        "translate",
        "translateX",
        "translateY",
        "rotate",
        "scale",
        "scaleX",
        "scaleY",
        "skewX",
        "skewY",
    ];
    for name in SHORTHANDS {
        if let Some(raw) = resolver.raw(name) {
            let args = parse_number_list(raw);
            if let Some(t) = Transform::from_name_args(name, &args) {
                converter = converter.apply(t);
                note_rotation(&t, rotation);
            }
        }
    }

    if let Some(list) = resolver.raw("transform") {
        for t in parse_transform_list(list) {
            converter = converter.apply(t);
            note_rotation(&t, rotation);
        }
    }

    converter
}

fn note_rotation(t: &Transform, rotation: &mut f32) {
    if let Transform::Rotate { angle, .. } = t {
        *rotation += angle;
    }
}

/// Leaf preamble shared by every drawable: its own converter (without the
/// x/y shorthand) and the paint snapshot from its cascade.
fn leaf_parts<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ctx: &Context,
) -> (Resolver<'a, 'input>, Converter, ResolvedPaint) {
    let resolver = Resolver::new(node);
    let mut rotation = ctx.inherited.rotation;
    let converter = element_converter(&resolver, ctx, false, &mut rotation);
    let mut inherited = resolver.resolve_inherited(&ctx.inherited, &converter);
    inherited.rotation = rotation;
    let paint = inherited.paint();
    (resolver, converter, paint)
}

fn resolve_text(node: roxmltree::Node<'_, '_>, ctx: &Context) -> Option<ResolvedElement> {
    let (resolver, converter, paint) = leaf_parts(node, ctx);
    let text = node.text().map(str::trim).unwrap_or("");
    if text.is_empty() {
        return None;
    }
    let x = resolver.length("x", ctx.inherited.width).unwrap_or(0.0);
    let y = resolver.length("y", ctx.inherited.height).unwrap_or(0.0);
    let (px, py) = converter.point(x, y);
    let anchor = match resolver.raw("text-anchor").map(str::trim) {
        Some("middle") => TextAnchor::Middle,
        Some("end") => TextAnchor::End,
        _ => TextAnchor::Start,
    };
    Some(ResolvedElement {
        shape: Shape::Text {
            text: text.to_string(),
            x: px,
            y: py,
            anchor,
        },
        paint,
    })
}

fn resolve_line(node: roxmltree::Node<'_, '_>, ctx: &Context) -> ResolvedElement {
    let (resolver, converter, paint) = leaf_parts(node, ctx);
    let x1 = resolver.length("x1", ctx.inherited.width).unwrap_or(0.0);
    let y1 = resolver.length("y1", ctx.inherited.height).unwrap_or(0.0);
    let x2 = resolver.length("x2", ctx.inherited.width).unwrap_or(0.0);
    let y2 = resolver.length("y2", ctx.inherited.height).unwrap_or(0.0);
    let (x1, y1) = converter.point(x1, y1);
    let (x2, y2) = converter.point(x2, y2);
    ResolvedElement {
        shape: Shape::Line { x1, y1, x2, y2 },
        paint,
    }
}

fn resolve_path(node: roxmltree::Node<'_, '_>, ctx: &Context) -> Option<ResolvedElement> {
    let (_, converter, paint) = leaf_parts(node, ctx);
    let d = node.attribute("d")?;
    let data = path::rewrite(
        d,
        &converter,
        ctx.clip,
        ctx.inherited.width,
        ctx.inherited.height,
    );
    if data.is_empty() {
        return None;
    }
    Some(ResolvedElement {
        shape: Shape::Path {
            data,
            origin: converter.point(0.0, 0.0),
        },
        paint,
    })
}

fn resolve_poly(
    node: roxmltree::Node<'_, '_>,
    ctx: &Context,
    close: bool,
) -> Option<ResolvedElement> {
    let points = parse_number_list(node.attribute("points")?);
    if points.len() < 4 {
        return None;
    }
    // Point lists reuse the path pipeline so their segments clip like l/L.
    let mut d = String::new();
    for (idx, pair) in points.chunks_exact(2).enumerate() {
        let letter = if idx == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{letter}{} {} ", pair[0], pair[1]));
    }
    if close {
        d.push('Z');
    }

    let (_, converter, paint) = leaf_parts(node, ctx);
    let data = path::rewrite(
        &d,
        &converter,
        ctx.clip,
        ctx.inherited.width,
        ctx.inherited.height,
    );
    Some(ResolvedElement {
        shape: Shape::Path {
            data,
            origin: converter.point(0.0, 0.0),
        },
        paint,
    })
}

fn resolve_image(node: roxmltree::Node<'_, '_>, ctx: &Context) -> Option<ResolvedElement> {
    let (resolver, converter, paint) = leaf_parts(node, ctx);
    let source = node
        .attribute("href")
        .or_else(|| node.attribute(("http://www.w3.org/1999/xlink", "href")))?
        .to_string();
    let x = resolver.length("x", ctx.inherited.width).unwrap_or(0.0);
    let y = resolver.length("y", ctx.inherited.height).unwrap_or(0.0);
    let w = resolver
        .length("width", ctx.inherited.width)
        .unwrap_or(ctx.inherited.width);
    let h = resolver
        .length("height", ctx.inherited.height)
        .unwrap_or(ctx.inherited.height);
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let (px, py) = converter.point(x, y);
    let (pw, ph) = converter.size(w, h);
    Some(ResolvedElement {
        shape: Shape::Image {
            source,
            x: px,
            y: py,
            width: pw,
            height: ph,
            aspect: parse_aspect_ratio(node.attribute("preserveAspectRatio")),
        },
        paint,
    })
}

fn resolve_rect(node: roxmltree::Node<'_, '_>, ctx: &Context) -> ResolvedElement {
    let (resolver, converter, paint) = leaf_parts(node, ctx);
    let x = resolver.length("x", ctx.inherited.width).unwrap_or(0.0);
    let y = resolver.length("y", ctx.inherited.height).unwrap_or(0.0);
    let w = resolver.length("width", ctx.inherited.width).unwrap_or(0.0);
    let h = resolver.length("height", ctx.inherited.height).unwrap_or(0.0);
    let (px, py) = converter.point(x, y);
    let (pw, ph) = converter.size(w, h);
    ResolvedElement {
        shape: Shape::Rect {
            x: px,
            y: py,
            width: pw,
            height: ph,
        },
        paint,
    }
}

fn resolve_ellipse(node: roxmltree::Node<'_, '_>, ctx: &Context) -> Option<ResolvedElement> {
    let (resolver, converter, paint) = leaf_parts(node, ctx);
    let cx = resolver.length("cx", ctx.inherited.width).unwrap_or(0.0);
    let cy = resolver.length("cy", ctx.inherited.height).unwrap_or(0.0);

    let (rx, ry) = if node.tag_name().name() == "circle" {
        let r = resolver.length("r", ctx.inherited.width)?;
        (r, r)
    } else {
        // Either radius defaults to the other when only one is present.
        let rx = resolver.length("rx", ctx.inherited.width);
        let ry = resolver.length("ry", ctx.inherited.height);
        let rx = rx.or(ry)?;
        let ry = ry.unwrap_or(rx);
        (rx, ry)
    };
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }

    let (pcx, pcy) = converter.point(cx, cy);
    let (prx, pry) = converter.size(rx, ry);
    Some(ResolvedElement {
        shape: Shape::Ellipse {
            cx: pcx,
            cy: pcy,
            rx: prx.abs(),
            ry: pry.abs(),
        },
        paint,
    })
}

pub(crate) fn parse_view_box(input: Option<&str>) -> Option<SvgBox> {
    let values = parse_number_list(input?);
    if values.len() != 4 || values[2] <= 0.0 || values[3] <= 0.0 {
        return None;
    }
    Some(SvgBox {
        x: values[0],
        y: values[1],
        width: values[2],
        height: values[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Converter;
    use crate::types::Color;

    fn collect(markup: &str) -> Vec<ResolvedElement> {
        let doc = roxmltree::Document::parse(markup).expect("test markup parses");
        let root = doc.root_element();
        let ctx = Context {
            inherited: Inherited::root(100.0, 100.0),
            converter: Converter::page_root(0.0, 100.0),
            clip: GeomRect::from_corners(0.0, 0.0, 100.0, 100.0),
        };
        let mut out = Vec::new();
        walk_root(root, &ctx, &mut out);
        out
    }

    #[test]
    fn groups_never_become_drawables() {
        let out = collect(r#"<svg><g><rect width="10" height="10"/></g></svg>"#);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].shape, Shape::Rect { .. }));
    }

    #[test]
    fn document_order_is_preserved() {
        let out = collect(
            r#"<svg><rect width="1" height="1"/><g><line x2="5"/></g><circle r="2"/></svg>"#,
        );
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0].shape, Shape::Rect { .. }));
        assert!(matches!(out[1].shape, Shape::Line { .. }));
        assert!(matches!(out[2].shape, Shape::Ellipse { .. }));
    }

    #[test]
    fn unknown_tags_and_comments_yield_nothing() {
        let out = collect(r#"<svg><!-- note --><blink/><filter/>text</svg>"#);
        assert!(out.is_empty());
    }

    #[test]
    fn group_scale_and_translate_reach_the_circle() {
        let out = collect(
            r#"<svg><g transform="translate(10,10) scale(2)"><circle cx="0" cy="0" r="5" /></g></svg>"#,
        );
        let Shape::Ellipse { cx, cy, rx, ry } = &out[0].shape else {
            panic!("expected ellipse, got {:?}", out[0].shape);
        };
        // Radius 5 scaled by 2, center (10,10) through the page flip.
        assert!((cx - 10.0).abs() < 1e-3);
        assert!((cy - 90.0).abs() < 1e-3);
        assert!((rx - 10.0).abs() < 1e-3);
        assert!((ry - 10.0).abs() < 1e-3);
    }

    #[test]
    fn group_fill_is_inherited_and_overridable() {
        let out = collect(
            r#"<svg><g fill="red"><rect width="1" height="1"/><rect width="1" height="1" fill="blue"/></g></svg>"#,
        );
        assert_eq!(out[0].paint.fill, Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(out[1].paint.fill, Some(Color::rgb(0.0, 0.0, 1.0)));
    }

    #[test]
    fn circle_uses_r_for_both_radii_and_ellipse_defaults_ry_to_rx() {
        let out = collect(r#"<svg><ellipse cx="1" cy="1" rx="4"/></svg>"#);
        let Shape::Ellipse { rx, ry, .. } = &out[0].shape else {
            panic!("expected ellipse");
        };
        assert_eq!((*rx, *ry), (4.0, 4.0));
    }

    #[test]
    fn ellipse_without_radii_is_dropped() {
        let out = collect(r#"<svg><ellipse cx="1" cy="1"/></svg>"#);
        assert!(out.is_empty());
    }

    #[test]
    fn view_box_rescales_children() {
        let out = collect(
            r#"<svg viewBox="0 0 10 10"><rect x="0" y="0" width="10" height="10"/></svg>"#,
        );
        let Shape::Rect {
            x,
            y,
            width,
            height,
        } = &out[0].shape
        else {
            panic!("expected rect");
        };
        // 10x10 view box stretched over the 100x100 target (uniform here).
        assert!((x - 0.0).abs() < 1e-3);
        assert!((y - 100.0).abs() < 1e-3);
        assert!((width - 100.0).abs() < 1e-3);
        assert!((height + 100.0).abs() < 1e-3);
    }

    #[test]
    fn root_shorthand_attributes_reach_children() {
        let out = collect(r#"<svg translate="5 5"><rect width="1" height="1"/></svg>"#);
        let Shape::Rect { x, y, .. } = &out[0].shape else {
            panic!("expected rect");
        };
        assert!((x - 5.0).abs() < 1e-3);
        assert!((y - 95.0).abs() < 1e-3);

        let out = collect(r#"<svg rotate="30"><text x="1" y="1">hi</text></svg>"#);
        assert!((out[0].paint.rotation - 30.0).abs() < 1e-3);
    }

    #[test]
    fn group_x_y_become_a_leading_translate() {
        let out = collect(r#"<svg><g x="5" y="5"><rect width="1" height="1"/></g></svg>"#);
        let Shape::Rect { x, y, .. } = &out[0].shape else {
            panic!("expected rect");
        };
        assert!((x - 5.0).abs() < 1e-3);
        assert!((y - 95.0).abs() < 1e-3);
    }

    #[test]
    fn percent_geometry_resolves_against_the_reference_box() {
        let out = collect(r#"<svg><rect width="50%" height="25%"/></svg>"#);
        let Shape::Rect { width, height, .. } = &out[0].shape else {
            panic!("expected rect");
        };
        assert!((width - 50.0).abs() < 1e-3);
        assert!((height + 25.0).abs() < 1e-3);
    }

    #[test]
    fn path_data_is_rewritten_into_page_coordinates() {
        let out = collect(r#"<svg><path d="M0 0 L10 10"/></svg>"#);
        let Shape::Path { data, origin } = &out[0].shape else {
            panic!("expected path");
        };
        assert_eq!(data, "M0 100 L10 90");
        assert_eq!(*origin, (0.0, 100.0));
    }

    #[test]
    fn polygon_points_close_the_subpath() {
        let out = collect(r#"<svg><polygon points="0,0 10,0 10,10"/></svg>"#);
        let Shape::Path { data, .. } = &out[0].shape else {
            panic!("expected path");
        };
        assert!(data.ends_with('Z'));
        assert!(data.starts_with("M0 100"));
    }

    #[test]
    fn rotation_accumulates_for_text() {
        let out = collect(
            r#"<svg><g transform="rotate(30)"><text x="1" y="1" rotate="15">hi</text></g></svg>"#,
        );
        assert!((out[0].paint.rotation - 45.0).abs() < 1e-3);
    }
}
