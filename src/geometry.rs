//! ## Geometry Primitives
//!
//! This module defines the 2D value types consumed by the index: a point and
//! an axis-aligned box given by two corner points. The box operations
//! (`area`, `union`, `enlargement`, `overlap`) are pure and total; `overlap`
//! treats box extents as closed intervals, so boxes that merely touch count
//! as overlapping. Coordinates must be finite; NaN and infinite values are
//! rejected when a point is constructed, so the index never ingests them.

use crate::exceptions::RindexError;

/// A 2D point. The coordinates are kept private so that [`Point2::new`] is
/// the only construction path and every point is known to be finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    x: f64,
    y: f64,
}

impl Point2 {
    /// Creates a new point.
    ///
    /// # Errors
    ///
    /// Returns `RindexError::InvalidCoordinate` if either coordinate is NaN
    /// or infinite.
    pub fn new(x: f64, y: f64) -> Result<Self, RindexError> {
        for value in [x, y] {
            if !value.is_finite() {
                return Err(RindexError::InvalidCoordinate { value });
            }
        }
        Ok(Point2 { x, y })
    }

    /// Returns the x coordinate.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Returns the y coordinate.
    pub fn y(&self) -> f64 {
        self.y
    }
}

/// An axis-aligned box stored as a pair of normalized corners, with
/// `lo.x <= hi.x` and `lo.y <= hi.y`. Boxes with zero width or height are
/// valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box2 {
    lo: Point2,
    hi: Point2,
}

impl Box2 {
    pub(crate) const ZERO: Box2 = Box2 {
        lo: Point2 { x: 0.0, y: 0.0 },
        hi: Point2 { x: 0.0, y: 0.0 },
    };

    /// Creates a box from any two opposite corners, normalizing them so that
    /// `lo` holds the minimum and `hi` the maximum of each coordinate.
    pub fn new(a: Point2, b: Point2) -> Self {
        Box2 {
            lo: Point2 {
                x: a.x.min(b.x),
                y: a.y.min(b.y),
            },
            hi: Point2 {
                x: a.x.max(b.x),
                y: a.y.max(b.y),
            },
        }
    }

    /// Creates a box directly from corner coordinates.
    ///
    /// # Errors
    ///
    /// Returns `RindexError::InvalidCoordinate` if any coordinate is NaN or
    /// infinite.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, RindexError> {
        Ok(Box2::new(Point2::new(x1, y1)?, Point2::new(x2, y2)?))
    }

    /// Returns the lower corner (minimum x and y).
    pub fn lo(&self) -> Point2 {
        self.lo
    }

    /// Returns the upper corner (maximum x and y).
    pub fn hi(&self) -> Point2 {
        self.hi
    }

    /// Returns the area of the box.
    pub fn area(&self) -> f64 {
        (self.hi.x - self.lo.x) * (self.hi.y - self.lo.y)
    }

    /// Returns the smallest box that contains both `self` and `other`.
    pub fn union(&self, other: &Box2) -> Box2 {
        Box2 {
            lo: Point2 {
                x: self.lo.x.min(other.lo.x),
                y: self.lo.y.min(other.lo.y),
            },
            hi: Point2 {
                x: self.hi.x.max(other.hi.x),
                y: self.hi.y.max(other.hi.y),
            },
        }
    }

    /// Returns the additional area required to enlarge `self` to include
    /// `other`. Non-negative by construction.
    pub fn enlargement(&self, other: &Box2) -> f64 {
        self.union(other).area() - self.area()
    }

    /// Returns true if `self` and `other` overlap. Extents are closed
    /// intervals, so boxes sharing only an edge or a corner overlap too.
    pub fn overlap(&self, other: &Box2) -> bool {
        self.hi.x >= other.lo.x
            && other.hi.x >= self.lo.x
            && self.hi.y >= other.lo.y
            && other.hi.y >= self.lo.y
    }

    /// Returns true if `other` lies fully inside `self`, boundary included.
    pub fn contains(&self, other: &Box2) -> bool {
        self.lo.x <= other.lo.x
            && self.lo.y <= other.lo.y
            && self.hi.x >= other.hi.x
            && self.hi.y >= other.hi.y
    }
}
