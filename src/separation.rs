use crate::{
    error::{GenerationError, Result},
    point::Point,
    room::{bounds_gap, spaced, Room},
    sampling::unit_kick,
};

use rand::Rng;
use std::ops::Range;

pub const MAX_SEPARATION_STEPS: usize = 10_000;

/// How far `r2` should move away from `r1` this step. Only axes along which the rooms are actually
/// offset get pushed, by a third of the missing gap (at least one cell), so a conflicting pair
/// settles in about three steps.
pub fn push_vector(r1: &Room, r2: &Room, margin: i32) -> Point {
    let direction = (r2.position - r1.position).signum();
    let missing = Point::new(margin, margin) - bounds_gap(r1, r2);
    let step = |missing: i32| (missing / 3).max(1);

    Point::new(direction.x * step(missing.x), direction.y * step(missing.y))
}

/// Pushes rooms apart until every pair is `spaced` by `margin`. Only rooms in `movable` move; the
/// others are obstacles. Room 0 never moves, so whatever was built around it stays valid.
///
/// Returns the number of relaxation steps taken.
pub fn separate_rooms(
    rooms: &mut [Room],
    margin: i32,
    movable: Range<usize>,
    rng: &mut impl Rng,
) -> Result<usize> {
    separate_rooms_within(rooms, margin, movable, MAX_SEPARATION_STEPS, rng)
}

/// `separate_rooms` giving up after `max_steps`.
pub fn separate_rooms_within(
    rooms: &mut [Room],
    margin: i32,
    movable: Range<usize>,
    max_steps: usize,
    rng: &mut impl Rng,
) -> Result<usize> {
    assert!(margin >= 0, "Room margin must be non-negative, got {}", margin);

    let num_rooms = rooms.len();
    let movable = movable.start.max(1)..movable.end.min(num_rooms);
    let mut pushes = vec![Point::zero(); num_rooms];
    let mut conflicted = vec![false; num_rooms];
    for step in 0..max_steps {
        let mut conflicts = 0;
        for j in movable.clone() {
            // Every pair with at least one movable room, visited once.
            for i in (0..num_rooms).filter(|i| *i < j || !movable.contains(i)) {
                let i_moves = movable.contains(&i);
                let (r1, r2) = (&rooms[i], &rooms[j]);
                if r1.position == r2.position {
                    conflicts += 1;
                    pushes[j] += unit_kick(rng);
                    continue;
                }
                if spaced(r1, r2, margin) {
                    continue;
                }

                conflicts += 1;
                conflicted[i] = true;
                conflicted[j] = true;
                let push = push_vector(r1, r2, margin);
                if i_moves {
                    pushes[i] -= push;
                    pushes[j] += push;
                } else {
                    pushes[j] += push + push;
                }
            }
        }

        if conflicts == 0 {
            log::debug!("Separated {} rooms in {} steps", num_rooms, step);
            return Ok(step);
        }

        for i in movable.clone() {
            // Opposite pushes can cancel out when a room is wedged between obstacles.
            if conflicted[i] && pushes[i] == Point::zero() {
                pushes[i] = unit_kick(rng);
            }
            rooms[i].position += pushes[i];
            pushes[i] = Point::zero();
            conflicted[i] = false;
        }
    }

    Err(GenerationError::LayoutDidNotConverge {
        rooms: num_rooms,
        steps: max_steps,
    })
}

/// Moves each movable room, in order, to the nearest position around where it stands (ring by
/// ring, at most `max_radius` away) that is spaced from every room outside `movable` and every
/// movable room settled before it. Room 0 never moves.
///
/// Unlike `separate_rooms` this cannot oscillate between obstacles, so it is the fallback when
/// pushing rooms around a crowd of frozen ones stalls.
pub fn settle_rooms(
    rooms: &mut [Room],
    margin: i32,
    movable: Range<usize>,
    max_radius: i32,
) -> Result<()> {
    assert!(margin >= 0, "Room margin must be non-negative, got {}", margin);

    let num_rooms = rooms.len();
    let movable = movable.start.max(1)..movable.end.min(num_rooms);
    for j in movable.clone() {
        let obstacles: Vec<usize> = (0..num_rooms)
            .filter(|i| *i < j || !movable.contains(i))
            .collect();
        let start = rooms[j].position;
        // Whichever obstacle rejected the last candidate is likely to reject the next one too.
        let mut blocker = 0;
        let mut settled = false;
        'search: for radius in 0..=max_radius {
            for offset in Point::ring(radius) {
                rooms[j].position = start + offset;
                if let Some(b) = obstacles.get(blocker) {
                    if !spaced(&rooms[*b], &rooms[j], margin) {
                        continue;
                    }
                }
                match obstacles
                    .iter()
                    .position(|i| !spaced(&rooms[*i], &rooms[j], margin))
                {
                    Some(b) => blocker = b,
                    None => {
                        settled = true;
                        break 'search;
                    }
                }
            }
        }

        if !settled {
            rooms[j].position = start;
            return Err(GenerationError::LayoutDidNotConverge {
                rooms: num_rooms,
                steps: max_radius.max(0) as usize,
            });
        }
        log::trace!("Settled room {} at {:?}", j, rooms[j].position);
    }

    Ok(())
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
