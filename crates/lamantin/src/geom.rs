//! Engine-space geometry.
//!
//! Engine space uses points (1/72 inch) with the origin at the bottom-left corner of the root
//! graph and Y growing upward.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }
}

/// Axis-aligned box stored as lower-left / upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub ll: Point,
    pub ur: Point,
}

impl BoundingBox {
    pub fn from_center(center: Point, size: Size) -> Self {
        let hw = size.width / 2.0;
        let hh = size.height / 2.0;
        Self {
            ll: Point::new(center.x - hw, center.y - hh),
            ur: Point::new(center.x + hw, center.y + hh),
        }
    }

    pub fn width(&self) -> f64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> f64 {
        self.ur.y - self.ll.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.ll.x + self.ur.x) / 2.0,
            (self.ll.y + self.ur.y) / 2.0,
        )
    }

    pub fn contains(&self, other: &BoundingBox, eps: f64) -> bool {
        other.ll.x + eps >= self.ll.x
            && other.ll.y + eps >= self.ll.y
            && other.ur.x <= self.ur.x + eps
            && other.ur.y <= self.ur.y + eps
    }
}

/// Top-left anchored rectangle in the engine's internal top-down working space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn from_center(center: Point, size: Size) -> Self {
        Self {
            x: center.x - size.width / 2.0,
            y: center.y - size.height / 2.0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn union(&self, other: &Frame) -> Frame {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Frame {
            x,
            y,
            width: self.max_x().max(other.max_x()) - x,
            height: self.max_y().max(other.max_y()) - y,
        }
    }

    /// Grows the frame around its center to at least `width` x `height`.
    pub fn grown_to(&self, width: f64, height: f64) -> Frame {
        Frame::from_center(
            self.center(),
            Size::new(self.width.max(width), self.height.max(height)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_grow_around_their_center() {
        let a = Frame::from_center(Point::new(10.0, 10.0), Size::new(4.0, 4.0));
        let b = Frame::from_center(Point::new(20.0, 10.0), Size::new(4.0, 8.0));
        let u = a.union(&b);
        assert_eq!((u.x, u.y, u.width, u.height), (8.0, 6.0, 14.0, 8.0));

        let g = u.grown_to(20.0, 2.0);
        assert_eq!(g.center(), u.center());
        assert_eq!((g.width, g.height), (20.0, 8.0));
    }
}
