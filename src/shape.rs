//! Pattern synthesis: every room and corridor shape starts here.

use crate::{
    pattern::{Frontier, Pattern},
    point::{Point, FOUR_NEIGHBORS},
    sampling::aspect_ratio_dist,
};

use rand::{seq::SliceRandom, Rng};
use rand_distr::Distribution;

/// Every cell of a `width` x `height` block, shifted so the block straddles the origin.
pub fn rectangle(width: i32, height: i32) -> Pattern {
    assert!(
        width > 0 && height > 0,
        "Rectangle dimensions must be positive, got {}x{}",
        width,
        height
    );

    let offset = Point::new(width / 2, height / 2);
    let mut pattern = Pattern::new();
    for y in 0..height {
        for x in 0..width {
            pattern.insert(Point::new(x, y) - offset);
        }
    }

    pattern
}

/// Rectangle of roughly `target_area` cells with a random aspect ratio in `[2/3, 4/3]`. Both sides
/// are at least 2.
pub fn rectangle_with_area(target_area: i32, rng: &mut impl Rng) -> Pattern {
    let (width, height) = rectangle_dims(target_area, rng);

    rectangle(width, height)
}

fn rectangle_dims(target_area: i32, rng: &mut impl Rng) -> (i32, i32) {
    let area = target_area.max(4);
    let ratio = aspect_ratio_dist().sample(rng);
    let width = ((area as f64).sqrt() * ratio) as i32;
    let width = width.max(2);
    let height = (area / width).max(2);

    (width, height)
}

/// Random flood growth from the origin: `size - 1` times, a uniformly random frontier cell joins
/// the pattern. `size < 1` is treated as 1.
pub fn cave(size: i32, rng: &mut impl Rng) -> Pattern {
    let mut pattern = Pattern::single(Point::zero());
    let mut frontier = pattern.frontier();
    for _ in 1..size.max(1) {
        frontier.commit_random(&mut pattern, rng);
    }

    pattern
}

/// A perfect maze with 1-cell-wide corridors, built by a randomized depth-first search over a
/// `(width / 2) x (height / 2)` grid of junctions. Each junction sits at doubled coordinates and
/// each tree edge contributes the cell between its junctions. The result is centered on the
/// origin.
///
/// # Panics
/// If either dimension is even or smaller than 3.
pub fn maze(width: i32, height: i32, rng: &mut impl Rng) -> Pattern {
    assert!(
        width % 2 == 1 && height % 2 == 1 && width >= 3 && height >= 3,
        "Maze dimensions must be odd and at least 3, got {}x{}",
        width,
        height
    );

    let cols = width / 2;
    let rows = height / 2;
    let in_grid = |c: Point| c.x >= 0 && c.y >= 0 && c.x < cols && c.y < rows;

    let mut visited = vec![false; (cols * rows) as usize];
    let visit_index = |c: Point| (c.y * cols + c.x) as usize;

    let mut pattern = Pattern::new();
    let start = Point::zero();
    visited[visit_index(start)] = true;
    pattern.insert(start);

    let mut stack = vec![start];
    while let Some(&current) = stack.last() {
        let mut directions = FOUR_NEIGHBORS;
        directions.shuffle(rng);
        let next = directions
            .iter()
            .map(|d| current + *d)
            .find(|c| in_grid(*c) && !visited[visit_index(*c)]);

        match next {
            Some(next) => {
                visited[visit_index(next)] = true;
                let a = Point::new(current.x * 2, current.y * 2);
                let b = Point::new(next.x * 2, next.y * 2);
                pattern.insert(b);
                pattern.insert(Point::new((a.x + b.x) / 2, (a.y + b.y) / 2));
                stack.push(next);
            }
            None => {
                stack.pop();
            }
        }
    }

    let span = Point::new(2 * (cols - 1), 2 * (rows - 1));

    pattern.translated(Point::new(-span.x / 2, -span.y / 2))
}

/// Manhattan walk from `from` to `to`, stepping along whichever axis has more distance left (x on
/// ties). Every visited cell stamps a 2x2 block so the corridor never connects only diagonally.
pub fn hallway(from: Point, to: Point) -> Pattern {
    let mut pattern = Pattern::new();
    let mut current = from;
    loop {
        stamp_block(&mut pattern, current);
        if current == to {
            break;
        }

        let remaining = to - current;
        if remaining.x.abs() >= remaining.y.abs() {
            current.x += remaining.x.signum();
        } else {
            current.y += remaining.y.signum();
        }
    }

    pattern
}

fn stamp_block(pattern: &mut Pattern, p: Point) {
    for (dx, dy) in &[(0, 0), (1, 0), (0, 1), (1, 1)] {
        pattern.insert(p + Point::new(*dx, *dy));
    }
}

/// Grows `pattern` by `n` random frontier cells, keeping `frontier` up to date. Used to turn
/// straight corridors into organic ones.
pub fn cavestyle_patch(
    pattern: &mut Pattern,
    frontier: &mut Frontier,
    n: usize,
    rng: &mut impl Rng,
) {
    for _ in 0..n {
        if frontier.commit_random(pattern, rng).is_none() {
            break;
        }
    }
}

/// Odd maze dimensions whose corridors cover about `target_area` cells.
pub fn maze_dims(target_area: i32, rng: &mut impl Rng) -> (i32, i32) {
    // Corridors fill about half of the bounding box.
    let (width, height) = rectangle_dims(target_area.max(4) * 2, rng);
    let make_odd = |d: i32| if d % 2 == 0 { d + 1 } else { d };

    (make_odd(width.max(3)), make_odd(height.max(3)))
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
