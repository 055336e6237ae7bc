//! Static 2D k-d tree answering "is any point within Manhattan distance `r` of `q`".

use crate::{pattern::Pattern, point::Point};

#[derive(Clone, Debug)]
struct KdNode {
    point: Point,
    left: Option<usize>,
    right: Option<usize>,
}

/// Immutable once built. Splits on x at even depth and y at odd depth.
#[derive(Clone, Debug, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl KdTree {
    pub fn new(points: &[Point]) -> Self {
        let mut scratch = points.to_vec();
        let mut tree = KdTree {
            nodes: Vec::with_capacity(points.len()),
            root: None,
        };
        tree.root = tree.build(&mut scratch, 0);

        tree
    }

    pub fn from_pattern(pattern: &Pattern) -> Self {
        let points: Vec<Point> = pattern.iter().copied().collect();

        Self::new(&points)
    }

    fn build(&mut self, points: &mut [Point], depth: usize) -> Option<usize> {
        if points.is_empty() {
            return None;
        }

        let axis = depth % 2;
        let mid = points.len() / 2;
        points.select_nth_unstable_by_key(mid, |p| (p.axis(axis), p.axis(1 - axis)));
        let point = points[mid];

        let (lower, upper) = points.split_at_mut(mid);
        let left = self.build(lower, depth + 1);
        let right = self.build(&mut upper[1..], depth + 1);

        self.nodes.push(KdNode { point, left, right });

        Some(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True iff some indexed point is within Manhattan distance `radius` of `query`. Exact.
    pub fn close_to(&self, query: &Point, radius: i32) -> bool {
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push((root, 0));
        }

        while let Some((i, depth)) = stack.pop() {
            let node = &self.nodes[i];
            if node.point.manhattan(query) <= radius {
                return true;
            }

            let axis = depth % 2;
            let diff = query.axis(axis) - node.point.axis(axis);
            let (near, far) = if diff < 0 {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            // Manhattan distance is at least the distance along one axis.
            if diff.abs() <= radius {
                if let Some(far) = far {
                    stack.push((far, depth + 1));
                }
            }
            if let Some(near) = near {
                stack.push((near, depth + 1));
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sampling::small_rng;
    use crate::shape::cave;
    use proptest::prelude::*;

    fn brute_force_close(points: &[Point], q: &Point, r: i32) -> bool {
        points.iter().any(|p| p.manhattan(q) <= r)
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new(&[]);

        assert!(tree.is_empty());
        assert!(!tree.close_to(&Point::zero(), 100));
    }

    #[test]
    fn test_every_inserted_point_is_close_at_zero() {
        let mut rng = small_rng(4);
        let pattern = cave(200, &mut rng);
        let tree = KdTree::from_pattern(&pattern);

        assert_eq!(tree.len(), pattern.len());
        for p in pattern.iter() {
            assert!(tree.close_to(p, 0));
        }
        for p in pattern.frontier().iter() {
            assert!(!tree.close_to(p, 0));
            assert!(tree.close_to(p, 1));
        }
    }

    #[test]
    fn test_duplicate_points() {
        let points = vec![Point::new(1, 1); 5];
        let tree = KdTree::new(&points);

        assert!(tree.close_to(&Point::new(1, 1), 0));
        assert!(!tree.close_to(&Point::new(1, 2), 0));
        assert!(tree.close_to(&Point::new(1, 3), 2));
    }

    proptest! {
        #[test]
        fn matches_brute_force(
            raw in prop::collection::vec((-30i32..30, -30i32..30), 0..80),
            qx in -40i32..40,
            qy in -40i32..40,
            r in 0i32..12,
        ) {
            let points: Vec<Point> = raw.into_iter().map(Point::from).collect();
            let tree = KdTree::new(&points);
            let q = Point::new(qx, qy);

            prop_assert_eq!(tree.close_to(&q, r), brute_force_close(&points, &q, r));
        }
    }
}
