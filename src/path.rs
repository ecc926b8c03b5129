//! Path mini-language rewriting: tokenizes `d` data, remaps coordinates
//! through the active converter, and clips line segments against the
//! target rectangle.
//!
//! Only `m`/`M`/`l`/`L` (and the implicit line-tos after a move) receive
//! clipping. `h`, `v`, `c`, `s`, `q`, `t` and `a` are unit-converted —
//! absolute coordinates through the `point` mapping, relative deltas
//! through the `size` mapping — but pass through unclipped, so a curve
//! partially outside the target rectangle is drawn in full. Known
//! limitation, kept deliberately.

use crate::converter::Converter;
use crate::geometry::{GeomRect, Point, Segment, clip_segment};
use tracing::debug;

const COORD_EPSILON: f32 = 1e-3;

/// One tokenized command: a letter and its numeric parameters,
/// percentages already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCommand {
    pub letter: char,
    pub params: Vec<f32>,
}

struct PathScanner<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl<'a> PathScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            i: 0,
        }
    }

    fn skip_separators(&mut self) {
        while self.i < self.bytes.len()
            && (self.bytes[self.i].is_ascii_whitespace() || self.bytes[self.i] == b',')
        {
            self.i += 1;
        }
    }

    fn peek_command(&mut self) -> Option<char> {
        self.skip_separators();
        let b = *self.bytes.get(self.i)?;
        if b.is_ascii_alphabetic() {
            Some(b as char)
        } else {
            None
        }
    }

    fn next_command(&mut self) -> Option<char> {
        let c = self.peek_command()?;
        self.i += 1;
        Some(c)
    }

    /// Number plus a percent flag. Handles sign, decimals, exponents and
    /// run-together tokens like `10-5`.
    fn next_value(&mut self) -> Option<(f32, bool)> {
        self.skip_separators();
        if self.i >= self.bytes.len() {
            return None;
        }
        let start = self.i;
        let mut has = false;

        if matches!(self.bytes[self.i], b'+' | b'-') {
            self.i += 1;
        }
        while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
            self.i += 1;
            has = true;
        }
        if self.i < self.bytes.len() && self.bytes[self.i] == b'.' {
            self.i += 1;
            while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
                self.i += 1;
                has = true;
            }
        }
        if has && self.i < self.bytes.len() && matches!(self.bytes[self.i], b'e' | b'E') {
            let mark = self.i;
            self.i += 1;
            if self.i < self.bytes.len() && matches!(self.bytes[self.i], b'+' | b'-') {
                self.i += 1;
            }
            let mut exp_digits = false;
            while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
                self.i += 1;
                exp_digits = true;
            }
            if !exp_digits {
                self.i = mark;
            }
        }

        if !has {
            self.i = start;
            return None;
        }

        let value = std::str::from_utf8(&self.bytes[start..self.i])
            .ok()?
            .parse::<f32>()
            .ok()?;
        let percent = self.i < self.bytes.len() && self.bytes[self.i] == b'%';
        if percent {
            self.i += 1;
        }
        Some((value, percent))
    }

    fn at_end(&mut self) -> bool {
        self.skip_separators();
        self.i >= self.bytes.len()
    }
}

/// Splits path data into `(letter, params)` commands, resolving `%`
/// against the ambient reference box: x-axis parameters against the
/// width, y-axis parameters against the height, by position within the
/// command's parameter tuple.
pub fn tokenize(d: &str, ref_width: f32, ref_height: f32) -> Vec<PathCommand> {
    let mut out = Vec::new();
    let mut scanner = PathScanner::new(d);

    while !scanner.at_end() {
        let Some(letter) = scanner.next_command() else {
            // Stray number with no command in scope; skip it.
            if scanner.next_value().is_none() {
                break;
            }
            continue;
        };
        let mut params = Vec::new();
        while scanner.peek_command().is_none() {
            let Some((value, percent)) = scanner.next_value() else {
                break;
            };
            let value = if percent {
                let reference = percent_reference(letter, params.len(), ref_width, ref_height);
                value / 100.0 * reference
            } else {
                value
            };
            params.push(value);
        }
        out.push(PathCommand { letter, params });
    }

    out
}

fn percent_reference(letter: char, index: usize, width: f32, height: f32) -> f32 {
    match letter.to_ascii_lowercase() {
        'h' => width,
        'v' => height,
        _ => {
            if index % 2 == 0 {
                width
            } else {
                height
            }
        }
    }
}

/// Rewrites path data into absolute target-page coordinates, clipping
/// line-type segments against `clip`. Returns the rewritten string; the
/// logical current point after every command is the original (pre-clip)
/// endpoint so relative commands stay correctly anchored.
pub fn rewrite(
    d: &str,
    converter: &Converter,
    clip: GeomRect,
    ref_width: f32,
    ref_height: f32,
) -> String {
    let mut out = String::new();
    let mut cur = (0.0f32, 0.0f32);
    let mut subpath_start = cur;

    for cmd in tokenize(d, ref_width, ref_height) {
        let rel = cmd.letter.is_ascii_lowercase();
        match cmd.letter {
            'M' | 'm' => {
                let mut pairs = cmd.params.chunks_exact(2);
                if let Some(p) = pairs.next() {
                    cur = resolve_pair(cur, (p[0], p[1]), rel);
                    subpath_start = cur;
                    emit_move(&mut out, converter.point(cur.0, cur.1));
                }
                // Subsequent pairs are implicit line-tos and clip like l/L.
                for p in pairs {
                    let end = resolve_pair(cur, (p[0], p[1]), rel);
                    emit_line(&mut out, converter, clip, cur, end);
                    cur = end;
                }
            }
            'L' | 'l' => {
                for p in cmd.params.chunks_exact(2) {
                    let end = resolve_pair(cur, (p[0], p[1]), rel);
                    emit_line(&mut out, converter, clip, cur, end);
                    cur = end;
                }
            }
            'Z' | 'z' => {
                out.push_str("Z ");
                cur = subpath_start;
            }
            'H' | 'h' => {
                for p in cmd.params.chunks_exact(1) {
                    if rel {
                        let (dx, _) = converter.size(p[0], 0.0);
                        emit_cmd(&mut out, 'h', &[dx]);
                        cur.0 += p[0];
                    } else {
                        let (x, _) = converter.point(p[0], cur.1);
                        emit_cmd(&mut out, 'H', &[x]);
                        cur.0 = p[0];
                    }
                }
            }
            'V' | 'v' => {
                for p in cmd.params.chunks_exact(1) {
                    if rel {
                        let (_, dy) = converter.size(0.0, p[0]);
                        emit_cmd(&mut out, 'v', &[dy]);
                        cur.1 += p[0];
                    } else {
                        let (_, y) = converter.point(cur.0, p[0]);
                        emit_cmd(&mut out, 'V', &[y]);
                        cur.1 = p[0];
                    }
                }
            }
            'C' | 'c' => {
                for p in cmd.params.chunks_exact(6) {
                    emit_pairs(&mut out, cmd.letter, converter, rel, p);
                    cur = advance(cur, (p[4], p[5]), rel);
                }
            }
            'S' | 's' | 'Q' | 'q' => {
                for p in cmd.params.chunks_exact(4) {
                    emit_pairs(&mut out, cmd.letter, converter, rel, p);
                    cur = advance(cur, (p[2], p[3]), rel);
                }
            }
            'T' | 't' => {
                for p in cmd.params.chunks_exact(2) {
                    emit_pairs(&mut out, cmd.letter, converter, rel, p);
                    cur = advance(cur, (p[0], p[1]), rel);
                }
            }
            'A' | 'a' => {
                for p in cmd.params.chunks_exact(7) {
                    let (rxx, rxy) = converter.size(p[0], 0.0);
                    let (ryx, ryy) = converter.size(0.0, p[1]);
                    let rx = libm::hypotf(rxx, rxy);
                    let ry = libm::hypotf(ryx, ryy);
                    let end = if rel {
                        converter.size(p[5], p[6])
                    } else {
                        converter.point(p[5], p[6])
                    };
                    emit_cmd(
                        &mut out,
                        cmd.letter,
                        &[rx, ry, p[2], p[3], p[4], end.0, end.1],
                    );
                    cur = advance(cur, (p[5], p[6]), rel);
                }
            }
            other => {
                debug!(command = %other, "unsupported path command, passing through");
                emit_cmd(&mut out, other, &cmd.params);
            }
        }
    }

    out.trim_end().to_string()
}

fn resolve_pair(cur: (f32, f32), p: (f32, f32), rel: bool) -> (f32, f32) {
    if rel { (cur.0 + p.0, cur.1 + p.1) } else { p }
}

fn advance(cur: (f32, f32), end: (f32, f32), rel: bool) -> (f32, f32) {
    resolve_pair(cur, end, rel)
}

/// Curve-family emission: absolute coordinate pairs map through `point`,
/// relative deltas through `size`.
fn emit_pairs(out: &mut String, letter: char, converter: &Converter, rel: bool, params: &[f32]) {
    let mut mapped = Vec::with_capacity(params.len());
    for p in params.chunks_exact(2) {
        let (x, y) = if rel {
            converter.size(p[0], p[1])
        } else {
            converter.point(p[0], p[1])
        };
        mapped.push(x);
        mapped.push(y);
    }
    emit_cmd(out, letter, &mapped);
}

/// Line emission with clipping. The pen lifts over the invisible portion:
/// a leading move when the original start was outside, a trailing move
/// back to the original end when it was outside, so subsequent commands
/// resume from the correct location.
fn emit_line(out: &mut String, converter: &Converter, clip: GeomRect, cur: (f32, f32), end: (f32, f32)) {
    let p0 = to_point(converter.point(cur.0, cur.1));
    let p1 = to_point(converter.point(end.0, end.1));

    match clip_segment(Segment::new(p0, p1), clip) {
        None => {
            // Entirely outside: nothing drawn, pen relocates to the end.
            emit_move(out, (p1.x, p1.y));
        }
        Some(seg) => {
            if !points_close(seg.start, p0) {
                emit_move(out, (seg.start.x, seg.start.y));
            }
            emit_cmd(out, 'L', &[seg.end.x, seg.end.y]);
            if !points_close(seg.end, p1) {
                emit_move(out, (p1.x, p1.y));
            }
        }
    }
}

fn to_point(p: (f32, f32)) -> Point {
    Point::new(p.0, p.1)
}

fn points_close(a: Point, b: Point) -> bool {
    a.distance(b) <= COORD_EPSILON
}

fn emit_move(out: &mut String, p: (f32, f32)) {
    emit_cmd(out, 'M', &[p.0, p.1]);
}

fn emit_cmd(out: &mut String, letter: char, params: &[f32]) {
    out.push(letter);
    for (idx, v) in params.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        push_num(out, *v);
    }
    out.push(' ');
}

fn push_num(out: &mut String, v: f32) {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        out.push('0');
    } else {
        out.push_str(s);
    }
}
