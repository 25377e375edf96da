use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::buffer::{MaskBuffer, TRANSPARENT};
use crate::geometry::{PixelPoint, Rgb};

pub const DEFAULT_BRUSH_WIDTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    #[default]
    Draw,
    Erase,
}

impl fmt::Display for BrushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw => f.write_str("draw"),
            Self::Erase => f.write_str("erase"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown brush mode {0:?}; expected \"draw\" or \"erase\"")]
pub struct ParseBrushModeError(pub String);

impl FromStr for BrushMode {
    type Err = ParseBrushModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draw" => Ok(Self::Draw),
            "erase" => Ok(Self::Erase),
            other => Err(ParseBrushModeError(other.to_string())),
        }
    }
}

/// One straight piece of a stroke, between two consecutive pointer samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeSegment {
    pub from: PixelPoint,
    pub to: PixelPoint,
}

impl StrokeSegment {
    pub const fn new(from: PixelPoint, to: PixelPoint) -> Self {
        Self { from, to }
    }

    pub const fn dot(at: PixelPoint) -> Self {
        Self { from: at, to: at }
    }

    pub const fn is_dot(&self) -> bool {
        self.from.x == self.to.x && self.from.y == self.to.y
    }
}

/// Rasterizes `segment` into `buffer` and returns how many in-bounds pixels it covered.
///
/// Non-degenerate segments cover every pixel whose center lies strictly within
/// `width / 2` of the stroke axis, which gives round caps and joins between
/// consecutive segments. Even widths run the axis along pixel corners and odd
/// widths along pixel centers, so a straight horizontal or vertical segment is
/// exactly `width` pixels across. A dot covers exactly its own pixel. Coverage
/// is binary: `Draw` writes the opaque class color and `Erase` writes full
/// transparency, so replaying a segment never changes the result.
pub fn stroke(
    buffer: &mut MaskBuffer,
    segment: StrokeSegment,
    mode: BrushMode,
    color: Rgb,
    width: u32,
) -> u64 {
    let value = match mode {
        BrushMode::Draw => color.to_rgba(),
        BrushMode::Erase => TRANSPARENT,
    };

    if segment.is_dot() {
        return u64::from(buffer.put(segment.from, value));
    }

    let bounds = buffer.bounds();
    if bounds.width == 0 || bounds.height == 0 {
        return 0;
    }

    let width = width.max(1);
    let radius = f64::from(width) / 2.0;
    let axis_offset = if width % 2 == 1 { 0.5 } else { 0.0 };
    let from = (
        f64::from(segment.from.x) + axis_offset,
        f64::from(segment.from.y) + axis_offset,
    );
    let to = (
        f64::from(segment.to.x) + axis_offset,
        f64::from(segment.to.y) + axis_offset,
    );

    let min_x = ((from.0.min(to.0) - radius).floor() as i64).max(0);
    let min_y = ((from.1.min(to.1) - radius).floor() as i64).max(0);
    let max_x = ((from.0.max(to.0) + radius).ceil() as i64).min(i64::from(bounds.width) - 1);
    let max_y = ((from.1.max(to.1) + radius).ceil() as i64).min(i64::from(bounds.height) - 1);

    let radius_sq = radius * radius;
    let mut covered = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = (x as f64 + 0.5, y as f64 + 0.5);
            if distance_sq_to_segment(center, from, to) < radius_sq {
                // x/y were clamped into the buffer, so the casts are lossless.
                buffer.put(PixelPoint::new(x as i32, y as i32), value);
                covered += 1;
            }
        }
    }
    covered
}

fn distance_sq_to_segment(point: (f64, f64), from: (f64, f64), to: (f64, f64)) -> f64 {
    let (px, py) = point;
    let (ax, ay) = from;
    let (bx, by) = to;

    let (dx, dy) = (bx - ax, by - ay);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / length_sq).clamp(0.0, 1.0)
    };

    let (cx, cy) = (ax + dx * t, ay + dy * t);
    (px - cx) * (px - cx) + (py - cy) * (py - cy)
}
