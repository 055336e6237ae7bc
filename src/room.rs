use crate::{
    entity::{Entity, ALL_ORIENTATIONS},
    kdtree::KdTree,
    map::CellType,
    pattern::Pattern,
    point::Point,
    sampling::fractional_count,
    shape::{cave, cavestyle_patch, hallway, maze, maze_dims, rectangle_with_area},
    CellEncoder,
};

use fnv::FnvHashSet;
use rand::{seq::SliceRandom, Rng};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoomKind {
    Chamber,
    Maze,
    Cave,
    Corridor,
    /// Floor cells of a chunk read back from a save, standing in for the rooms that made them.
    Restored,
    /// A whole frozen chunk, kept in the way while new rooms are laid out around it.
    Blocked,
}

/// A shape placed at `position`. Cells and nodes are relative to `position` and never change after
/// construction, which lets the room keep a spatial index over its cells.
#[derive(Clone, Debug)]
pub struct Room {
    pub position: Point,
    pub entities: Vec<Entity>,
    kind: RoomKind,
    cells: Pattern,
    nodes: Pattern,
    index: KdTree,
    bounds: (Point, Point),
}

impl Room {
    pub fn new(kind: RoomKind, cells: Pattern, nodes: Pattern) -> Self {
        let bounds = cells.bounds().expect("Room must have at least one cell");
        assert!(!nodes.is_empty(), "Room must have at least one node");
        debug_assert!(nodes.iter().all(|n| cells.contains(n)));

        Room {
            position: Point::zero(),
            entities: Vec::new(),
            kind,
            index: KdTree::from_pattern(&cells),
            cells,
            nodes,
            bounds,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;

        self
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn is_corridor(&self) -> bool {
        self.kind == RoomKind::Corridor
    }

    pub fn cells(&self) -> &Pattern {
        &self.cells
    }

    pub fn nodes(&self) -> &Pattern {
        &self.nodes
    }

    pub fn index(&self) -> &KdTree {
        &self.index
    }

    /// Inclusive bounding box in absolute coordinates.
    pub fn absolute_bounds(&self) -> (Point, Point) {
        (self.bounds.0 + self.position, self.bounds.1 + self.position)
    }

    pub fn absolute_cells(&self) -> impl Iterator<Item = Point> + '_ {
        self.cells.iter().map(move |c| *c + self.position)
    }

    pub fn absolute_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().map(move |e| e.translated(self.position))
    }

    fn is_occupied(&self, cell: &Point) -> bool {
        self.entities.iter().any(|e| e.position == *cell)
    }

    fn free_cells(&self) -> Vec<Point> {
        self.cells
            .iter()
            .filter(|c| !self.is_occupied(c))
            .copied()
            .collect()
    }
}

/// Rectangular room, connected through its center.
pub fn chamber(target_area: i32, rng: &mut impl Rng) -> Room {
    let cells = rectangle_with_area(target_area, rng);
    let nodes = Pattern::single(Point::zero());

    Room::new(RoomKind::Chamber, cells, nodes)
}

/// Maze room. Any cell on the maze's outer frame can take a corridor.
pub fn maze_room(target_area: i32, rng: &mut impl Rng) -> Room {
    let (width, height) = maze_dims(target_area, rng);
    let cells = maze(width, height, rng);
    let (min, max) = cells.bounds().expect("Maze must have at least one cell");
    let nodes = cells
        .iter()
        .filter(|c| c.x == min.x || c.x == max.x || c.y == min.y || c.y == max.y)
        .copied()
        .collect();

    Room::new(RoomKind::Maze, cells, nodes)
}

/// Cave room grown from its origin, connected through the origin.
pub fn cave_room(target_area: i32, rng: &mut impl Rng) -> Room {
    let cells = cave(target_area, rng);
    let nodes = Pattern::single(Point::zero());

    Room::new(RoomKind::Cave, cells, nodes)
}

/// Most nodes kept by rooms whose every cell could serve as one (corridors, restored chunks).
pub const MAX_SPARSE_NODES: usize = 16;

/// At most `MAX_SPARSE_NODES` cells, evenly strided through `cells`.
pub fn sparse_nodes(cells: &Pattern) -> Pattern {
    let stride = ((cells.len() + MAX_SPARSE_NODES - 1) / MAX_SPARSE_NODES).max(1);

    cells.iter().step_by(stride).copied().collect()
}

/// Corridor between two absolute points, positioned at the center of its bounding box. With
/// `organic`, the straight hallway is roughened with cave-style growth. Both endpoints are nodes,
/// plus up to `MAX_SPARSE_NODES` cells spread along the way.
pub fn corridor(from: Point, to: Point, organic: bool, rng: &mut impl Rng) -> Room {
    let mut cells = hallway(from, to);
    if organic {
        let mut frontier = cells.frontier();
        let extra = cells.len() / 4;
        cavestyle_patch(&mut cells, &mut frontier, extra, rng);
    }
    let (min, max) = cells.bounds().expect("Hallway always has both endpoints");
    let center = Point::new((min.x + max.x).div_euclid(2), (min.y + max.y).div_euclid(2));

    let mut nodes = sparse_nodes(&cells).translated(-center);
    nodes.insert(from - center);
    nodes.insert(to - center);

    Room::new(RoomKind::Corridor, cells.translated(-center), nodes).at(center)
}

/// Nearest pair of nodes between two rooms, in absolute coordinates, with their Manhattan
/// distance. Brute force, since node sets are small.
pub fn closest_nodes(r1: &Room, r2: &Room) -> (Point, Point, i32) {
    let (_, n1, n2, d) = closest_open_nodes(r1, r2, |_| true);

    (n1, n2, d)
}

/// Like `closest_nodes`, but pairs with both ends passing `open` win over any other pair. The flag
/// is true when no such pair exists and the returned one is blocked.
pub fn closest_open_nodes(
    r1: &Room,
    r2: &Room,
    open: impl Fn(&Point) -> bool,
) -> (bool, Point, Point, i32) {
    let open = &open;
    r1.nodes
        .iter()
        .map(|n| *n + r1.position)
        .flat_map(move |n1| {
            r2.nodes.iter().map(move |n2| {
                let n2 = *n2 + r2.position;
                (!(open(&n1) && open(&n2)), n1, n2, n1.manhattan(&n2))
            })
        })
        .min_by_key(|(blocked, _, _, d)| (*blocked, *d))
        .expect("Rooms must have at least one node")
}

/// Smallest gap between the bounding boxes of two rooms along each axis. Negative when they
/// overlap on that axis.
pub fn bounds_gap(r1: &Room, r2: &Room) -> Point {
    let (min1, max1) = r1.absolute_bounds();
    let (min2, max2) = r2.absolute_bounds();

    Point::new(
        (min2.x - max1.x).max(min1.x - max2.x),
        (min2.y - max1.y).max(min1.y - max2.y),
    )
}

/// True iff no cell of `r1` is closer than `margin` (Manhattan) to a cell of `r2`.
pub fn spaced(r1: &Room, r2: &Room, margin: i32) -> bool {
    if margin <= 0 {
        return true;
    }

    let gap = bounds_gap(r1, r2);
    if gap.x >= margin || gap.y >= margin {
        return true;
    }

    let (small, large) = if r1.cells.len() <= r2.cells.len() {
        (r1, r2)
    } else {
        (r2, r1)
    };
    let offset = small.position - large.position;

    !small
        .cells
        .iter()
        .any(|c| large.index.close_to(&(*c + offset), margin - 1))
}

/// Scatters `floor(cells * load / 100)` monsters over free cells of the room, plus one more with
/// probability equal to the fractional remainder. Never stacks on another entity.
pub fn add_monsters(room: &mut Room, load: f64, rng: &mut impl Rng) -> usize {
    let expected = room.cells.len() as f64 * load / 100.0;
    let count = fractional_count(rng, expected);

    let mut candidates = room.free_cells();
    candidates.shuffle(rng);
    let placed = count.min(candidates.len());
    for cell in candidates.into_iter().take(placed) {
        let orientation = *ALL_ORIENTATIONS
            .choose(rng)
            .expect("Must have at least one orientation");
        room.entities.push(Entity::monster(cell, orientation));
    }

    placed
}

/// Puts stairs on a random free cell. Returns false if the room is full.
pub fn place_stairs(room: &mut Room, rng: &mut impl Rng) -> bool {
    match room.free_cells().choose(rng) {
        Some(cell) => {
            room.entities.push(Entity::stairs(*cell));
            true
        }
        None => false,
    }
}

/// Puts the hero on the room's first node.
pub fn place_hero(room: &mut Room) {
    let node = room.nodes.first().expect("Room must have at least one node");
    room.entities.push(Entity::hero(node));
}

/// Index of the room whose position is farthest from room 0. Ties go to the larger `(y, x)`.
pub fn farthest_room(rooms: &[Room]) -> Option<usize> {
    let origin = rooms.first()?.position;

    rooms
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_corridor())
        .max_by_key(|(_, r)| {
            (
                r.position.manhattan(&origin),
                r.position.y,
                r.position.x,
            )
        })
        .map(|(i, _)| i)
}

/// Union of every room's cells in absolute coordinates.
pub fn merged_patterns(rooms: &[Room]) -> Pattern {
    let mut merged = Pattern::new();
    for r in rooms.iter() {
        merged.merge_translated(&r.cells, r.position);
    }

    merged
}

/// Every pattern cell becomes floor, then every empty cell touching a floor (8-connectivity)
/// becomes wall.
pub fn fill_map_with_pattern(pattern: &Pattern, encoder: &mut impl CellEncoder) {
    for p in pattern.iter() {
        encoder.encode_cell(p, CellType::Floor);
    }

    let mut walls = FnvHashSet::default();
    for p in pattern.iter() {
        for n in p.neighbors8() {
            if encoder.cell_at(&n) == CellType::Empty {
                walls.insert(n);
            }
        }
    }
    for w in walls.iter() {
        encoder.encode_cell(w, CellType::Wall);
    }
}

pub fn fill_map_with_rooms(rooms: &[Room], encoder: &mut impl CellEncoder) {
    fill_map_with_pattern(&merged_patterns(rooms), encoder);
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{entity::EntityKind, map::ChunkMap, sampling::small_rng, shape::rectangle};

    fn block(w: i32, h: i32, at: Point) -> Room {
        Room::new(RoomKind::Chamber, rectangle(w, h), Pattern::single(Point::zero())).at(at)
    }

    #[test]
    fn test_spaced_uses_margin() {
        // 3x3 blocks centered 5 apart leave a gap of 2 empty columns: distance 3.
        let a = block(3, 3, Point::zero());
        let b = block(3, 3, Point::new(5, 0));

        assert!(spaced(&a, &b, 3));
        assert!(!spaced(&a, &b, 4));
        assert!(spaced(&a, &b, 0));
    }

    #[test]
    fn test_spaced_diagonal_uses_manhattan() {
        let a = block(3, 3, Point::zero());
        let b = block(3, 3, Point::new(3, 3));

        // Corners at (1,1) and (2,2) are 2 apart.
        assert!(spaced(&a, &b, 2));
        assert!(!spaced(&a, &b, 3));
    }

    #[test]
    fn test_closest_nodes_is_absolute() {
        let a = block(3, 3, Point::new(10, 0));
        let b = block(3, 3, Point::new(0, 4));

        assert_eq!(
            closest_nodes(&a, &b),
            (Point::new(10, 0), Point::new(0, 4), 14)
        );
    }

    #[test]
    #[should_panic]
    fn test_room_without_nodes_panics() {
        Room::new(RoomKind::Chamber, rectangle(2, 2), Pattern::new());
    }

    #[test]
    fn test_monsters_never_stack_or_overflow() {
        let mut rng = small_rng(8);
        let mut room = block(3, 3, Point::zero());
        place_hero(&mut room);
        let placed = add_monsters(&mut room, 100.0, &mut rng);

        assert_eq!(placed, 8);
        let mut positions: Vec<Point> = room.entities.iter().map(|e| e.position).collect();
        positions.sort();
        positions.dedup();
        assert_eq!(positions.len(), 9);
        for e in room.entities.iter() {
            assert!(room.cells().contains(&e.position));
        }
    }

    #[test]
    fn test_monster_load_zero() {
        let mut rng = small_rng(8);
        let mut room = block(5, 5, Point::zero());

        assert_eq!(add_monsters(&mut room, 0.0, &mut rng), 0);
        assert!(room.entities.is_empty());
    }

    #[test]
    fn test_stairs_land_on_room_cells() {
        let mut rng = small_rng(2);
        let mut room = block(4, 4, Point::new(7, 7));
        assert!(place_stairs(&mut room, &mut rng));
        let stairs: Vec<Entity> = room.absolute_entities().collect();

        assert_eq!(stairs.len(), 1);
        assert_eq!(stairs[0].kind, EntityKind::Stairs);
        assert!(room.absolute_cells().any(|c| c == stairs[0].position));
    }

    #[test]
    fn test_maze_room_nodes_are_on_the_frame() {
        let mut rng = small_rng(31);
        let room = maze_room(40, &mut rng);
        let (min, max) = room.cells().bounds().unwrap();

        assert!(!room.nodes().is_empty());
        for n in room.nodes().iter() {
            assert!(n.x == min.x || n.x == max.x || n.y == min.y || n.y == max.y);
        }
    }

    #[test]
    fn test_corridor_spans_its_endpoints() {
        let mut rng = small_rng(3);
        let c = corridor(Point::new(-4, 2), Point::new(6, 9), true, &mut rng);
        let cells: Pattern = c.absolute_cells().collect();

        assert!(c.is_corridor());
        assert!(cells.contains(&Point::new(-4, 2)));
        assert!(cells.contains(&Point::new(6, 9)));
    }

    #[test]
    fn test_long_corridor_is_centered_with_few_nodes() {
        let mut rng = small_rng(4);
        let from = Point::new(-50, 10);
        let to = Point::new(70, -30);
        let c = corridor(from, to, false, &mut rng);

        // The hallway stamps 2x2 blocks, so its box runs one past the far corner.
        assert_eq!(c.position, Point::new(10, -10));
        assert!(c.nodes().len() <= MAX_SPARSE_NODES + 2);
        let nodes: Vec<Point> = c.nodes().iter().map(|n| *n + c.position).collect();
        assert!(nodes.contains(&from));
        assert!(nodes.contains(&to));
        for n in c.nodes().iter() {
            assert!(c.cells().contains(n));
        }
    }

    #[test]
    fn test_open_nodes_win_over_closer_blocked_ones() {
        let a = Room::new(RoomKind::Chamber, rectangle(1, 1), Pattern::single(Point::zero()));
        let b = Room::new(
            RoomKind::Restored,
            [Point::new(2, 0), Point::new(9, 0)].iter().copied().collect(),
            [Point::new(2, 0), Point::new(9, 0)].iter().copied().collect(),
        );

        assert_eq!(closest_nodes(&a, &b), (Point::zero(), Point::new(2, 0), 2));
        assert_eq!(
            closest_open_nodes(&a, &b, |p| p.x != 2),
            (false, Point::zero(), Point::new(9, 0), 9)
        );
        assert!(closest_open_nodes(&a, &b, |p| p.x > 100).0);
    }

    #[test]
    fn test_fill_surrounds_floor_with_walls() {
        let mut map = ChunkMap::default();
        fill_map_with_pattern(&Pattern::single(Point::new(-1, -1)), &mut map);

        assert_eq!(map.cell_at(&Point::new(-1, -1)), CellType::Floor);
        for n in Point::new(-1, -1).neighbors8() {
            assert_eq!(map.cell_at(&n), CellType::Wall);
        }
        assert_eq!(map.cell_at(&Point::new(1, 1)), CellType::Empty);
    }

    #[test]
    fn test_fill_never_turns_floor_into_wall() {
        let mut map = ChunkMap::default();
        fill_map_with_pattern(&Pattern::single(Point::zero()), &mut map);
        fill_map_with_pattern(&Pattern::single(Point::new(1, 0)), &mut map);

        assert_eq!(map.cell_at(&Point::zero()), CellType::Floor);
        assert_eq!(map.cell_at(&Point::new(1, 0)), CellType::Floor);
        assert_eq!(map.cell_at(&Point::new(2, 0)), CellType::Wall);
    }
}
