//! The external page-drawing seam. The surrounding document library (page
//! content streams, font embedding, object serialization) implements
//! [`PageSurface`]; this crate only ever calls it.
//!
//! Page coordinates grow upward. All positions and extents handed to the
//! surface are already absolute page values; rectangle heights are negative
//! because the markup's top-left-origin space was flipped at the root.

use crate::types::{Color, LineCap, LineJoin, Position, Pt};

#[derive(Debug, Clone)]
pub struct TextOptions<F> {
    pub x: Pt,
    pub y: Pt,
    pub font: Option<F>,
    pub size: Pt,
    pub color: Option<Color>,
    pub opacity: f32,
    /// Degrees, counter-clockwise.
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct LineOptions {
    pub start: Position,
    pub end: Position,
    pub thickness: Pt,
    pub color: Option<Color>,
    pub opacity: f32,
    pub line_cap: LineCap,
}

#[derive(Debug, Clone, Copy)]
pub struct PathOptions {
    /// Mapped origin of the path element (its user-space `(0,0)`); the
    /// path data itself is in absolute page coordinates.
    pub x: Pt,
    pub y: Pt,
    pub border_color: Option<Color>,
    pub border_width: Pt,
    pub border_opacity: f32,
    pub border_line_cap: LineCap,
    pub border_line_join: LineJoin,
    pub fill_color: Option<Color>,
    pub fill_opacity: f32,
    pub scale: Option<f32>,
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
    pub opacity: f32,
    pub x_skew: f32,
    pub y_skew: f32,
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct RectangleOptions {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
    pub fill_color: Option<Color>,
    pub fill_opacity: f32,
    pub border_color: Option<Color>,
    pub border_width: Pt,
    pub border_opacity: f32,
    pub border_line_cap: LineCap,
    pub border_line_join: LineJoin,
}

#[derive(Debug, Clone, Copy)]
pub struct EllipseOptions {
    /// Center, page coordinates.
    pub x: Pt,
    pub y: Pt,
    /// Radii after transform application, absolute values.
    pub x_scale: Pt,
    pub y_scale: Pt,
    pub fill_color: Option<Color>,
    pub fill_opacity: f32,
    pub border_color: Option<Color>,
    pub border_width: Pt,
    pub border_opacity: f32,
}

/// One method per drawing primitive, mirroring a PDF page's content
/// operations. Implementations are expected to honor document order:
/// operations are issued back-to-front, later calls paint on top.
pub trait PageSurface {
    /// Opaque font handle understood by the surface, resolved through the
    /// font map in [`crate::SvgOptions`].
    type Font: Clone;

    fn draw_text(&mut self, text: &str, options: TextOptions<Self::Font>);
    fn draw_line(&mut self, options: LineOptions);
    fn draw_path(&mut self, data: &str, options: PathOptions);
    fn draw_image(&mut self, image: &image::DynamicImage, options: ImageOptions);
    fn draw_rectangle(&mut self, options: RectangleOptions);
    fn draw_ellipse(&mut self, options: EllipseOptions);
}
