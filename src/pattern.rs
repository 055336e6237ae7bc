use crate::point::Point;

use fnv::FnvHashMap;
use rand::Rng;
use std::collections::{btree_set, BTreeSet};
use std::iter::FromIterator;

/// A set of cell offsets relative to an implicit origin. Ordered, so that iterating a pattern is
/// deterministic and seeded generation is reproducible.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pattern {
    cells: BTreeSet<Point>,
}

impl Pattern {
    pub fn new() -> Self {
        Pattern::default()
    }

    pub fn single(p: Point) -> Self {
        let mut pattern = Pattern::new();
        pattern.insert(p);

        pattern
    }

    /// Returns true iff `p` was not already in the pattern.
    pub fn insert(&mut self, p: Point) -> bool {
        self.cells.insert(p)
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.cells.contains(p)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Point> {
        self.cells.iter()
    }

    pub fn first(&self) -> Option<Point> {
        self.cells.iter().next().copied()
    }

    pub fn translated(&self, offset: Point) -> Pattern {
        self.iter().map(|p| *p + offset).collect()
    }

    /// Adds every cell of `other` shifted by `offset`.
    pub fn merge_translated(&mut self, other: &Pattern, offset: Point) {
        self.cells.extend(other.iter().map(|p| *p + offset));
    }

    /// Inclusive `(min, max)` corners of the bounding box, `None` for an empty pattern.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = self.first()?;

        Some(self.iter().fold((first, first), |(min, max), p| {
            (min.component_min(p), max.component_max(p))
        }))
    }

    /// Cells that are 4-adjacent to the pattern without being part of it.
    pub fn frontier(&self) -> Frontier {
        let mut frontier = Frontier::default();
        for p in self.iter() {
            for n in p.neighbors4() {
                if !self.contains(&n) {
                    frontier.insert(n);
                }
            }
        }

        frontier
    }
}

impl FromIterator<Point> for Pattern {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Pattern {
            cells: BTreeSet::from_iter(iter),
        }
    }
}

impl Extend<Point> for Pattern {
    fn extend<I: IntoIterator<Item = Point>>(&mut self, iter: I) {
        self.cells.extend(iter)
    }
}

impl<'a> IntoIterator for &'a Pattern {
    type Item = &'a Point;
    type IntoIter = btree_set::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

/// Growth frontier of a pattern with O(1) uniform sampling and removal.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    cells: Vec<Point>,
    index: FnvHashMap<Point, usize>,
}

impl Frontier {
    pub fn insert(&mut self, p: Point) {
        if self.index.contains_key(&p) {
            return;
        }
        self.index.insert(p, self.cells.len());
        self.cells.push(p);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.index.contains_key(p)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.cells.iter()
    }

    /// Removes and returns a uniformly random frontier cell.
    pub fn take_random(&mut self, rng: &mut impl Rng) -> Option<Point> {
        if self.cells.is_empty() {
            return None;
        }
        let i = rng.gen_range(0, self.cells.len());
        let taken = self.cells.swap_remove(i);
        self.index.remove(&taken);
        if let Some(moved) = self.cells.get(i) {
            self.index.insert(*moved, i);
        }

        Some(taken)
    }

    /// Moves a random frontier cell into `pattern` and adds its free neighbors to the frontier.
    pub fn commit_random(&mut self, pattern: &mut Pattern, rng: &mut impl Rng) -> Option<Point> {
        let p = self.take_random(rng)?;
        pattern.insert(p);
        for n in p.neighbors4() {
            if !pattern.contains(&n) {
                self.insert(n);
            }
        }

        Some(p)
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
