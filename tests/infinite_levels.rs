use dungeon_procgen::{
    map::ChunkMap, persist::SaveData, CellType, DungeonType, Entity, EntityKind, ExplorationMap,
    GenerationMode, Generator, Point, StreamingSettings, CHUNK_SIZE,
};

use fnv::FnvHashSet;
use std::collections::VecDeque;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Full-size rooms, no prefetch, so every run is reproducible.
fn default_infinite_mode() -> GenerationMode {
    GenerationMode {
        infinite: true,
        streaming: StreamingSettings {
            prefetch_radius: 0,
            wait_timeout_ms: 120_000,
            ..StreamingSettings::default()
        },
        ..GenerationMode::default()
    }
}

fn saved(generator: &Generator) -> SaveData {
    let mut bytes = Vec::new();
    generator
        .save(&mut bytes, &ExplorationMap::default())
        .unwrap();

    SaveData::read(&mut bytes.as_slice()).unwrap()
}

/// Floor cells reachable from the hero, 4-connected, against all floor cells.
fn reachable_floor(cells: &ChunkMap, entities: &[Entity]) -> (usize, usize) {
    let floors: FnvHashSet<Point> = cells
        .iter()
        .flat_map(|(coord, chunk)| {
            let origin = Point::new(coord.x * CHUNK_SIZE, coord.y * CHUNK_SIZE);
            chunk
                .positions_of(CellType::Floor)
                .map(move |p| p + origin)
                .collect::<Vec<_>>()
        })
        .collect();
    let hero = entities
        .iter()
        .find(|e| e.kind == EntityKind::Hero)
        .expect("The world must have a hero");
    assert!(floors.contains(&hero.position));

    let mut seen = FnvHashSet::default();
    seen.insert(hero.position);
    let mut queue = VecDeque::new();
    queue.push_back(hero.position);
    while let Some(p) = queue.pop_front() {
        for n in p.neighbors4() {
            if floors.contains(&n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }

    (seen.len(), floors.len())
}

fn streaming_mode(kind: DungeonType, prefetch_radius: i32) -> GenerationMode {
    GenerationMode {
        infinite: true,
        nb_rooms: 3,
        room_min_size: 12,
        room_max_size: 36,
        room_margin: 2,
        monster_load: 5.0,
        maze_density: 0.3,
        kind,
        streaming: StreamingSettings {
            border: 1,
            prefetch_radius,
            wait_timeout_ms: 60_000,
        },
    }
}

const WALK: [(i32, i32); 5] = [(0, 0), (1, 0), (1, 1), (-1, 2), (0, 0)];

#[test]
fn chunks_never_change_once_handed_out() {
    init_logging();

    let generator = Generator::new(streaming_mode(DungeonType::Flat, 1), 8).unwrap();
    let first = generator.chunk_cells(0, 0).unwrap();
    let entities = generator.chunk_entities(0, 0).unwrap();
    for (x, y) in WALK.iter() {
        generator.chunk_cells(*x, *y).unwrap();
    }

    assert_eq!(generator.chunk_cells(0, 0).unwrap(), first);
    assert_eq!(generator.chunk_entities(0, 0).unwrap(), entities);
}

#[test]
fn same_seed_same_requests_same_world() {
    init_logging();

    for kind in [DungeonType::Flat, DungeonType::Cave].iter() {
        let a = Generator::new(streaming_mode(*kind, 0), 1234).unwrap();
        let b = Generator::new(streaming_mode(*kind, 0), 1234).unwrap();
        for (x, y) in WALK.iter() {
            assert_eq!(a.chunk_cells(*x, *y).unwrap(), b.chunk_cells(*x, *y).unwrap());
            assert_eq!(
                a.chunk_entities(*x, *y).unwrap(),
                b.chunk_entities(*x, *y).unwrap()
            );
        }
    }
}

#[test]
fn entities_stand_on_floor() {
    init_logging();

    let generator = Generator::new(streaming_mode(DungeonType::Cave, 0), 31).unwrap();
    let mut heroes = 0;
    for (x, y) in WALK.iter() {
        let cells = generator.chunk_cells(*x, *y).unwrap();
        for e in generator.chunk_entities(*x, *y).unwrap() {
            let (chunk, local) = e.position.split_tile(CHUNK_SIZE);
            assert_eq!(chunk, Point::new(*x, *y));
            assert_eq!(cells.get(local.x, local.y), CellType::Floor);
            if e.kind == EntityKind::Hero {
                heroes += 1;
            }
        }
    }

    // The walk comes back to the origin, where the hero is.
    assert_eq!(heroes, 2);
}

#[test]
fn save_then_load_keeps_the_world() {
    init_logging();

    let mode = streaming_mode(DungeonType::Flat, 0);
    let generator = Generator::new(mode.clone(), 55).unwrap();
    let mut served = Vec::new();
    for (x, y) in WALK.iter() {
        served.push((
            generator.chunk_cells(*x, *y).unwrap(),
            generator.chunk_entities(*x, *y).unwrap(),
        ));
    }
    let mut explored = ExplorationMap::default();
    explored.mark(&Point::new(3, 4));
    explored.mark(&Point::new(-40, 70));

    let mut saved = Vec::new();
    generator.save(&mut saved, &explored).unwrap();
    let (loaded, loaded_explored) = Generator::load(mode, 55, &mut saved.as_slice()).unwrap();

    assert_eq!(loaded_explored, explored);
    for ((x, y), (cells, entities)) in WALK.iter().zip(served.iter()) {
        assert_eq!(&loaded.chunk_cells(*x, *y).unwrap(), cells);
        assert_eq!(&loaded.chunk_entities(*x, *y).unwrap(), entities);
    }

    let mut resaved = Vec::new();
    loaded.save(&mut resaved, &loaded_explored).unwrap();
    assert_eq!(resaved, saved);
}

#[test]
fn default_rooms_fill_a_long_walk() {
    init_logging();

    for seed in 0..2 {
        let generator = Generator::new(default_infinite_mode(), seed).unwrap();
        for i in 0..4 {
            let (x, y) = (i, (3 * i) % 5 - 2);
            generator
                .chunk_cells(x, y)
                .unwrap_or_else(|e| panic!("Seed {}, chunk ({}, {}): {}", seed, x, y, e));
        }
    }
}

#[test]
fn crowded_caves_keep_generating() {
    init_logging();

    let mut mode = GenerationMode::from_ron(include_str!("../configs/infinite_caves.ron")).unwrap();
    mode.nb_rooms = 8;
    mode.streaming.prefetch_radius = 0;
    mode.streaming.wait_timeout_ms = 120_000;
    let generator = Generator::new(mode, 17).unwrap();
    for (x, y) in WALK.iter() {
        generator.chunk_cells(*x, *y).unwrap();
    }
}

#[test]
fn world_stays_connected_across_save_and_load() {
    init_logging();

    for seed in 0..3 {
        let mode = GenerationMode {
            nb_rooms: 6,
            ..default_infinite_mode()
        };
        let generator = Generator::new(mode.clone(), seed).unwrap();
        generator.chunk_cells(0, 0).unwrap();
        let before = saved(&generator);
        let (reached, floors) = reachable_floor(&before.cells, &before.entities);
        assert_eq!(reached, floors, "Seed {}: disconnected before saving", seed);

        let mut bytes = Vec::new();
        before.write(&mut bytes).unwrap();
        let (loaded, _) = Generator::load(mode, seed, &mut bytes.as_slice()).unwrap();
        loaded.chunk_cells(4, 0).unwrap();
        let after = saved(&loaded);
        assert!(after.cells.len() > before.cells.len());
        let (reached, floors) = reachable_floor(&after.cells, &after.entities);
        assert_eq!(reached, floors, "Seed {}: disconnected after loading", seed);
    }
}

#[test]
fn finite_save_then_load() {
    init_logging();

    let mode = GenerationMode::default();
    let generator = Generator::new(mode.clone(), 3).unwrap();
    let mut saved = Vec::new();
    generator
        .save(&mut saved, &ExplorationMap::default())
        .unwrap();
    let (loaded, _) = Generator::load(mode, 3, &mut saved.as_slice()).unwrap();

    for y in -1..3 {
        for x in -1..3 {
            assert_eq!(
                loaded.chunk_cells(x, y).unwrap(),
                generator.chunk_cells(x, y).unwrap()
            );
            assert_eq!(
                loaded.chunk_entities(x, y).unwrap(),
                generator.chunk_entities(x, y).unwrap()
            );
        }
    }
}

#[test]
fn sample_config_drives_an_infinite_world() {
    init_logging();

    let mode = GenerationMode::from_ron(include_str!("../configs/infinite_caves.ron")).unwrap();
    assert!(mode.infinite);
    assert_eq!(mode.kind, DungeonType::Cave);

    let generator = Generator::new(mode, 0).unwrap();
    let cells = generator.chunk_cells(0, 0).unwrap();
    assert!(cells.positions_of(CellType::Floor).count() > 0);
    assert_eq!(
        generator.cell_at(&Point::new(-1000, -1000)).unwrap(),
        CellType::Empty
    );
}

#[test]
fn broken_config_is_rejected() {
    let err = GenerationMode::from_ron("(infinite: maybe)").unwrap_err();
    assert!(err.to_string().starts_with("Config error"));

    let bad = GenerationMode {
        room_max_size: 0,
        ..GenerationMode::default()
    };
    assert!(Generator::new(bad, 0).is_err());
}
