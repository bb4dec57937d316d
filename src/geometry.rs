//! Point/box math used to attach relation lines to claim borders and to
//! build the arrowhead and cross marks drawn at their ends.

use serde::Serialize;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new(
            self.x + (other.x - self.x) / 2.0,
            self.y + (other.y - self.y) / 2.0,
        )
    }

    /// Moves the point `distance` along `angle` (radians).
    pub fn polar_offset(self, distance: f32, angle: f32) -> Point {
        Point::new(
            self.x + distance * angle.cos(),
            self.y + distance * angle.sin(),
        )
    }

    pub fn scaled(self, factor: f32) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }
}

/// Axis-aligned rectangle, `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict interior test; points on the border are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x > self.x && point.y > self.y && point.x < self.right() && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn inflate(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

/// A box described by its center, the shape `offset_position` works with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeom {
    pub center: Point,
    pub width: f32,
    pub height: f32,
}

impl BoxGeom {
    pub fn new(center: Point, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
        }
    }
}

/// Point on the border of `target` where the line from `source`'s center
/// leaves the box.
///
/// Starts on the left/right edge and switches to the top/bottom edge when the
/// line is steeper than the box. The second half of the switch condition
/// only applies when the source lies to the left, so the result is not
/// mirror-symmetric.
pub fn offset_position(source: BoxGeom, target: BoxGeom) -> Point {
    let d_x = source.center.x - target.center.x;
    let d_y = source.center.y - target.center.y;

    let side_x = if target.center.x > source.center.x { -0.5 } else { 0.5 };
    let mut point = Point::new(
        target.center.x + side_x * target.width,
        target.center.y + (d_y / d_x) * side_x * target.width,
    );

    let ratio = d_x / d_y;
    if ratio < target.width / target.height && !(ratio * target.height < -0.5 * target.width) {
        let side_y = if target.center.y > source.center.y { -0.5 } else { 0.5 };
        point = Point::new(
            target.center.x + ratio * side_y * target.height,
            target.center.y + side_y * target.height,
        );
    }

    point
}

/// A polyline path; `closed` paths get their last point joined to the first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub segments: Vec<Vec<Point>>,
    pub closed: bool,
}

impl Path {
    pub fn line(from: Point, to: Point) -> Self {
        Self {
            segments: vec![vec![from, to]],
            closed: false,
        }
    }

    pub fn scaled(&self, factor: f32) -> Path {
        Path {
            segments: self
                .segments
                .iter()
                .map(|segment| segment.iter().map(|p| p.scaled(factor)).collect())
                .collect(),
            closed: self.closed,
        }
    }
}

/// Angle of the direction from `from` to `to`.
pub fn direction(from: Point, to: Point) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Where the relation line itself stops, `radius` short of `to` so the
/// arrowhead or cross sits on the end.
pub fn retracted_end(radius: f32, from: Point, to: Point) -> Point {
    to.polar_offset(-radius, direction(from, to))
}

/// Filled arrowhead of radius `r` with its tip on `to`.
pub fn arrow_path(r: f32, from: Point, to: Point) -> Path {
    let mut angle = direction(from, to);
    let center = to.polar_offset(-r, angle);

    let mut points = Vec::with_capacity(3);
    for _ in 0..3 {
        points.push(center.polar_offset(r, angle));
        angle += 2.0 * PI / 3.0;
    }

    Path {
        segments: vec![points],
        closed: true,
    }
}

/// Two crossing strokes just before `to`, marking an attack.
pub fn cross_path(r: f32, from: Point, to: Point) -> Path {
    let angle = direction(from, to);
    let a = to.polar_offset(r, angle + 0.5 * PI);
    let b = to.polar_offset(r, angle - 0.5 * PI);

    Path {
        segments: vec![
            vec![
                a.polar_offset(-0.5 * r, angle),
                b.polar_offset(-2.5 * r, angle),
            ],
            vec![
                b.polar_offset(-0.5 * r, angle),
                a.polar_offset(-2.5 * r, angle),
            ],
        ],
        closed: false,
    }
}
