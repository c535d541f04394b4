use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

/// Axis-aligned rectangle in logical pixels. Positions grow right and down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn max_x(&self) -> f64 { self.x + self.width }

    #[inline]
    pub fn max_y(&self) -> f64 { self.y + self.height }

    #[inline]
    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    #[inline]
    pub fn size(&self) -> Size { Size::new(self.width, self.height) }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive of the top-left edge, exclusive of the bottom-right edge.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && self.max_x() > other.x
            && self.y < other.max_y()
            && self.max_y() > other.y
    }

    #[inline]
    pub fn with_origin(self, x: f64, y: f64) -> Self { Self { x, y, ..self } }

    #[inline]
    pub fn with_size(self, width: f64, height: f64) -> Self { Self { width, height, ..self } }
}
