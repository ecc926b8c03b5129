//! Coordinate conversion: affine transform instructions, their composition
//! into a point/size mapping pair, and viewport (viewBox) fitting.
//!
//! The converter is two 2x3 matrices instead of nested closures: `point`
//! carries translation, rotation, scale and skew; `size` carries only the
//! direction/magnitude part (no translation, and per the source semantics
//! no skew). New instructions post-multiply, so they apply to the input
//! before the previously accumulated mapping.

use crate::types::SvgBox;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn rotate(deg: f32) -> Self {
        let rad = deg.to_radians();
        let s = libm::sinf(rad);
        let c = libm::cosf(rad);
        Self {
            a: c,
            b: s,
            c: -s,
            d: c,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn skew_x(deg: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: libm::tanf(deg.to_radians()),
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn skew_y(deg: f32) -> Self {
        Self {
            a: 1.0,
            b: libm::tanf(deg.to_radians()),
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn mul(self, other: Self) -> Self {
        // [self] * [other]
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn linear(self) -> Self {
        Self {
            e: 0.0,
            f: 0.0,
            ..self
        }
    }
}

/// A single parsed transform instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
    Rotate { angle: f32, center: Option<(f32, f32)> },
    SkewX { angle: f32 },
    SkewY { angle: f32 },
}

impl Transform {
    /// Builds an instruction from its source name and numeric arguments.
    /// Returns `None` for unrecognized names or empty argument lists.
    pub fn from_name_args(name: &str, args: &[f32]) -> Option<Transform> {
        let first = args.first().copied();
        match name {
            "translate" => {
                let dx = first?;
                let dy = args.get(1).copied().unwrap_or(dx);
                Some(Transform::Translate { dx, dy })
            }
            "translateX" => Some(Transform::Translate { dx: first?, dy: 0.0 }),
            "translateY" => Some(Transform::Translate { dx: 0.0, dy: first? }),
            "scale" => {
                let sx = first?;
                let sy = args.get(1).copied().unwrap_or(sx);
                Some(Transform::Scale { sx, sy })
            }
            // Axis shorthands zero the other axis outright; the sy=sx
            // defaulting above applies only to an absent argument.
            "scaleX" => Some(Transform::Scale { sx: first?, sy: 0.0 }),
            "scaleY" => Some(Transform::Scale { sx: 0.0, sy: first? }),
            "rotate" => {
                let angle = first?;
                let center = args.get(1).copied().map(|cx| {
                    let cy = args.get(2).copied().unwrap_or(cx);
                    (cx, cy)
                });
                Some(Transform::Rotate { angle, center })
            }
            "skewX" => Some(Transform::SkewX { angle: first? }),
            "skewY" => Some(Transform::SkewY { angle: first? }),
            _ => None,
        }
    }

    /// Point and size matrices for this instruction. Translation never
    /// enters the size mapping; skew deliberately leaves it untouched.
    fn matrices(self) -> (Matrix, Matrix) {
        match self {
            Transform::Translate { dx, dy } => (Matrix::translate(dx, dy), Matrix::identity()),
            Transform::Scale { sx, sy } => (Matrix::scale(sx, sy), Matrix::scale(sx, sy)),
            Transform::Rotate { angle, center } => {
                let r = Matrix::rotate(angle);
                let point = match center {
                    Some((cx, cy)) => Matrix::translate(cx, cy)
                        .mul(r)
                        .mul(Matrix::translate(-cx, -cy)),
                    None => r,
                };
                (point, r.linear())
            }
            Transform::SkewX { angle } => (Matrix::skew_x(angle), Matrix::identity()),
            Transform::SkewY { angle } => (Matrix::skew_y(angle), Matrix::identity()),
        }
    }
}

/// Parses a `transform` attribute list left-to-right. Unrecognized
/// instruction names are reported and skipped, never fatal.
pub fn parse_transform_list(input: &str) -> Vec<Transform> {
    let mut out = Vec::new();
    let mut s = input.trim();

    while !s.is_empty() {
        let Some(open) = s.find('(') else { break };
        let name = s[..open].trim();
        let Some(close) = s[open + 1..].find(')') else {
            break;
        };
        let args = parse_number_list(&s[open + 1..open + 1 + close]);
        match Transform::from_name_args(name, &args) {
            Some(t) => out.push(t),
            None => warn!(instruction = name, "unsupported transform instruction, skipping"),
        }
        s = s[open + 1 + close + 1..].trim_start();
    }

    out
}

pub fn parse_number_list(input: &str) -> Vec<f32> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f32>().ok())
        .collect()
}

/// Accumulated coordinate mapping from user space into absolute page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    point: Matrix,
    size: Matrix,
}

impl Converter {
    pub fn identity() -> Self {
        Self {
            point: Matrix::identity(),
            size: Matrix::identity(),
        }
    }

    /// Outermost scope: anchors the fragment's top-left corner at page
    /// coordinates `(x, y)` and performs the vertical axis flip between
    /// the top-left-origin markup space and the page space. The flip
    /// happens here exactly once.
    pub fn page_root(x: f32, y: f32) -> Self {
        Self {
            point: Matrix {
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: -1.0,
                e: x,
                f: y,
            },
            size: Matrix::scale(1.0, -1.0),
        }
    }

    pub fn point(&self, x: f32, y: f32) -> (f32, f32) {
        self.point.apply(x, y)
    }

    /// Lengths are direction/magnitude, not anchored position: no
    /// translation is applied.
    pub fn size(&self, w: f32, h: f32) -> (f32, f32) {
        self.size.apply(w, h)
    }

    /// Composes one more instruction onto this converter. The instruction
    /// maps the input before the already-accumulated mapping.
    pub fn apply(&self, t: Transform) -> Self {
        let (pm, sm) = t.matrices();
        Self {
            point: self.point.mul(pm),
            size: self.size.mul(sm),
        }
    }

    /// Installs the inner viewBox scope: maps `view` onto `fitted` (the
    /// sub-rectangle chosen by the aspect-ratio policy), feeding into the
    /// outer mapping: `outer.point(inner.point(p))`.
    pub fn with_viewport(&self, view: SvgBox, fitted: SvgBox) -> Self {
        let sx = if view.width != 0.0 {
            fitted.width / view.width
        } else {
            1.0
        };
        let sy = if view.height != 0.0 {
            fitted.height / view.height
        } else {
            1.0
        };
        let inner = Matrix::translate(fitted.x, fitted.y)
            .mul(Matrix::scale(sx, sy))
            .mul(Matrix::translate(-view.x, -view.y));
        Self {
            point: self.point.mul(inner),
            size: self.size.mul(Matrix::scale(sx, sy)),
        }
    }
}

/// `preserveAspectRatio` policy. Unrecognized tokens fall back to the
/// centered default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectRatio {
    /// Non-uniform stretch onto the target box.
    None,
    /// Uniform "contain" fit with a 9-way alignment (fractions 0, 0.5, 1).
    Align { x: f32, y: f32 },
}

impl AspectRatio {
    pub const MID: AspectRatio = AspectRatio::Align { x: 0.5, y: 0.5 };
}

pub fn parse_aspect_ratio(input: Option<&str>) -> AspectRatio {
    let Some(token) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return AspectRatio::MID;
    };
    let align = token.split_whitespace().next().unwrap_or("");
    if align == "none" {
        return AspectRatio::None;
    }
    if align.len() != 8 {
        return AspectRatio::MID;
    }
    // Checked slicing: a multibyte character in the token must fall back,
    // not panic on a char boundary.
    let x = match align.get(0..4) {
        Some("xMin") => 0.0,
        Some("xMid") => 0.5,
        Some("xMax") => 1.0,
        _ => return AspectRatio::MID,
    };
    let y = match align.get(4..8) {
        Some("YMin") => 0.0,
        Some("YMid") => 0.5,
        Some("YMax") => 1.0,
        _ => return AspectRatio::MID,
    };
    AspectRatio::Align { x, y }
}

/// Fits an intrinsic box into a target box under the given policy and
/// returns the placed sub-rectangle.
pub fn fit_box(intrinsic_width: f32, intrinsic_height: f32, target: SvgBox, policy: AspectRatio) -> SvgBox {
    let AspectRatio::Align { x: ax, y: ay } = policy else {
        return target;
    };
    if intrinsic_width <= 0.0 || intrinsic_height <= 0.0 || target.height == 0.0 {
        return target;
    }

    let original_ratio = intrinsic_width / intrinsic_height;
    let target_ratio = target.width / target.height;
    let width = if target_ratio > original_ratio {
        original_ratio * target.height
    } else {
        target.width
    };
    let height = if target_ratio < original_ratio {
        target.width / original_ratio
    } else {
        target.height
    };

    SvgBox {
        x: target.x + (target.width - width) * ax,
        y: target.y + (target.height - height) * ay,
        width,
        height,
    }
}
