use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Integer lattice point. The derived ordering is lexicographic on `(x, y)`, which is what the
/// ordered pattern sets rely on.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

pub static FOUR_NEIGHBORS: [Point; 4] = [
    Point { x: 1, y: 0 },
    Point { x: -1, y: 0 },
    Point { x: 0, y: 1 },
    Point { x: 0, y: -1 },
];

pub static EIGHT_NEIGHBORS: [Point; 8] = [
    Point { x: -1, y: -1 },
    Point { x: 0, y: -1 },
    Point { x: 1, y: -1 },
    Point { x: -1, y: 0 },
    Point { x: 1, y: 0 },
    Point { x: -1, y: 1 },
    Point { x: 0, y: 1 },
    Point { x: 1, y: 1 },
];

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub const fn zero() -> Self {
        Point { x: 0, y: 0 }
    }

    pub fn manhattan(&self, other: &Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Coordinate along `axis` (0 is x, anything else is y).
    pub fn axis(&self, axis: usize) -> i32 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }

    pub fn signum(&self) -> Point {
        Point::new(self.x.signum(), self.y.signum())
    }

    pub fn neighbors4(self) -> impl Iterator<Item = Point> {
        FOUR_NEIGHBORS.iter().map(move |d| self + *d)
    }

    pub fn neighbors8(self) -> impl Iterator<Item = Point> {
        EIGHT_NEIGHBORS.iter().map(move |d| self + *d)
    }

    /// Per-axis minimum. Not the derived lexicographic `Ord::min`.
    pub fn component_min(&self, other: &Point) -> Point {
        Point::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Per-axis maximum.
    pub fn component_max(&self, other: &Point) -> Point {
        Point::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Offsets at Chebyshev distance exactly `radius`, clockwise from the top-left corner. Radius 0
    /// is the zero offset alone.
    pub fn ring(radius: i32) -> Vec<Point> {
        if radius <= 0 {
            return vec![Point::zero()];
        }

        let mut offsets = Vec::with_capacity(8 * radius as usize);
        for x in -radius..radius {
            offsets.push(Point::new(x, -radius));
        }
        for y in -radius..radius {
            offsets.push(Point::new(radius, y));
        }
        for x in ((-radius + 1)..=radius).rev() {
            offsets.push(Point::new(x, radius));
        }
        for y in ((-radius + 1)..=radius).rev() {
            offsets.push(Point::new(-radius, y));
        }

        offsets
    }

    /// Splits the point into the coordinate of the `size`-wide tile containing it and the local
    /// offset inside that tile. Works for negative coordinates.
    pub fn split_tile(&self, size: i32) -> (Point, Point) {
        (
            Point::new(self.x.div_euclid(size), self.y.div_euclid(size)),
            Point::new(self.x.rem_euclid(size), self.y.rem_euclid(size)),
        )
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}
