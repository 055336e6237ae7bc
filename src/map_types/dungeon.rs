use crate::{
    config::{DungeonType, GenerationMode},
    entity::Entity,
    error::{GenerationError, Result},
    graph::{connect_rooms, is_connected, room_graph},
    map::DenseMap,
    pattern::Pattern,
    point::Point,
    room::{
        add_monsters, cave_room, chamber, farthest_room, fill_map_with_pattern, maze_room,
        merged_patterns, place_hero, place_stairs, Room,
    },
    separation::separate_rooms,
    symmetric_map::SymmetricMap,
};

use rand::prelude::*;

pub const MAX_GENERATE_TRIES: usize = 20;

/// Cells kept empty between the level and the top-left edge of its map.
pub const LEVEL_MARGIN: i32 = 1;

/// A finished finite level. Entity positions are absolute map coordinates.
#[derive(Clone, Debug)]
pub struct Level {
    pub map: DenseMap,
    pub entities: Vec<Entity>,
}

/// One room as the mode asks for it, centered on the origin.
pub fn make_room(mode: &GenerationMode, rng: &mut impl Rng) -> Room {
    let area = mode.room_size().make().sample(rng);
    match mode.kind {
        DungeonType::Flat => {
            if rng.gen_bool(mode.maze_density) {
                maze_room(area, rng)
            } else {
                chamber(area, rng)
            }
        }
        DungeonType::Cave => cave_room(area, rng),
    }
}

/// Hero on room 0, stairs in the room farthest from it, monsters everywhere else. Only rooms from
/// `first_new` on are touched, and corridors stay empty.
pub fn place_entities(
    rooms: &mut [Room],
    first_new: usize,
    monster_load: f64,
    rng: &mut impl Rng,
) {
    if first_new == 0 {
        if let Some(first) = rooms.first_mut() {
            place_hero(first);
        }
        if let Some(far) = farthest_room(rooms) {
            if !place_stairs(&mut rooms[far], rng) {
                log::warn!("No free cell for the stairs in room {}", far);
            }
        }
    }

    let mut monsters = 0;
    for (i, room) in rooms.iter_mut().enumerate().skip(first_new) {
        if i == 0 || room.is_corridor() {
            continue;
        }
        monsters += add_monsters(room, monster_load, rng);
    }
    log::debug!("Placed {} monsters", monsters);
}

/// Shifts the pattern and entities so the smallest coordinate on each axis is `LEVEL_MARGIN`.
pub fn normalized(pattern: &Pattern, entities: &[Entity]) -> (Pattern, Vec<Entity>) {
    let offset = match pattern.bounds() {
        Some((min, _)) => Point::new(LEVEL_MARGIN, LEVEL_MARGIN) - min,
        None => return (Pattern::new(), entities.to_vec()),
    };

    (
        pattern.translated(offset),
        entities.iter().map(|e| e.translated(offset)).collect(),
    )
}

/// Rasterizes a normalized pattern into a map just large enough to hold it and its walls.
pub fn map_of_pattern(pattern: &Pattern) -> DenseMap {
    let (width, height) = match pattern.bounds() {
        Some((_, max)) => (max.x + 1 + LEVEL_MARGIN, max.y + 1 + LEVEL_MARGIN),
        None => (0, 0),
    };
    let mut map = DenseMap::new(width, height);
    fill_map_with_pattern(pattern, &mut map);

    map
}

/// One attempt at a whole level. Fails only when the rooms cannot be spread apart.
pub fn try_generate(mode: &GenerationMode, rng: &mut impl Rng) -> Result<Level> {
    let num_rooms = mode.nb_rooms as usize;
    log::debug!("Generating a level of {} rooms", num_rooms);

    let mut rooms: Vec<Room> = (0..num_rooms).map(|_| make_room(mode, rng)).collect();
    let steps = separate_rooms(&mut rooms, mode.room_margin, 0..num_rooms, rng)?;
    log::debug!("Room layout settled after {} steps", steps);

    let mut links = SymmetricMap::new();
    let corridors = connect_rooms(
        &mut rooms,
        &mut links,
        0,
        mode.kind == DungeonType::Cave,
        |_| true,
        rng,
    );
    log::debug!("Dug {} corridors", corridors.len());
    debug_assert!(is_connected(&room_graph(rooms.len(), &links)));

    place_entities(&mut rooms, 0, mode.monster_load, rng);

    let merged = merged_patterns(&rooms);
    let entities: Vec<Entity> = rooms.iter().flat_map(|r| r.absolute_entities()).collect();
    let (pattern, entities) = normalized(&merged, &entities);
    let map = map_of_pattern(&pattern);
    log::debug!(
        "Level is {}x{} with {} floor cells and {} entities",
        map.width(),
        map.height(),
        pattern.len(),
        entities.len()
    );

    Ok(Level { map, entities })
}

/// Generates a level, retrying with fresh rooms when a layout does not converge.
pub fn generate_level(mode: &GenerationMode, rng: &mut impl Rng) -> Result<Level> {
    mode.validate()?;

    let mut last_error = None;
    for attempt in 0..MAX_GENERATE_TRIES {
        match try_generate(mode, rng) {
            Ok(level) => return Ok(level),
            Err(e @ GenerationError::LayoutDidNotConverge { .. }) => {
                log::warn!("Attempt {} failed: {}", attempt, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.expect("Must have attempted at least once"))
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

    use crate::{entity::EntityKind, map::CellType, sampling::small_rng, CellEncoder};

    #[test]
    fn test_normalized_starts_at_margin() {
        let pattern: Pattern = vec![Point::new(-5, 3), Point::new(2, -7)]
            .into_iter()
            .collect();
        let entities = vec![Entity::hero(Point::new(-5, 3))];
        let (pattern, entities) = normalized(&pattern, &entities);

        assert_eq!(
            pattern.bounds(),
            Some((Point::new(1, 1), Point::new(8, 11)))
        );
        assert_eq!(entities[0].position, Point::new(1, 11));
    }

    #[test]
    fn test_map_of_pattern_leaves_room_for_walls() {
        let map = map_of_pattern(&Pattern::single(Point::new(1, 1)));

        assert_eq!((map.width(), map.height()), (3, 3));
        assert_eq!(map.cell_at(&Point::new(1, 1)), CellType::Floor);
        assert_eq!(map.cell_at(&Point::new(0, 0)), CellType::Wall);
        assert_eq!(map.cell_at(&Point::new(2, 2)), CellType::Wall);
    }

    #[test]
    fn test_level_has_one_hero_and_one_stairs() {
        let mut rng = small_rng(42);
        let level = generate_level(&GenerationMode::default(), &mut rng).unwrap();
        let count = |kind| level.entities.iter().filter(|e| e.kind == kind).count();

        assert_eq!(count(EntityKind::Hero), 1);
        assert_eq!(count(EntityKind::Stairs), 1);
        for e in level.entities.iter() {
            assert_eq!(level.map.cell_at(&e.position), CellType::Floor);
        }
    }

    #[test]
    fn test_single_room_level() {
        let mut rng = small_rng(7);
        let mode = GenerationMode {
            nb_rooms: 1,
            monster_load: 100.0,
            ..GenerationMode::default()
        };
        let level = generate_level(&mode, &mut rng).unwrap();

        // Room 0 never gets monsters.
        assert!(level
            .entities
            .iter()
            .all(|e| e.kind != EntityKind::Monster));
        assert_eq!(level.entities.len(), 2);
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let mut rng = small_rng(0);
        let mode = GenerationMode {
            room_margin: 0,
            ..GenerationMode::default()
        };

        assert!(matches!(
            generate_level(&mode, &mut rng),
            Err(GenerationError::InvalidParameter(_))
        ));
    }
}
