//! Infinite levels, generated one chunk at a time by a background worker.
//!
//! The worker thread owns every room and corridor laid out so far. Callers only ever see the
//! shared bookkeeping: which chunks are queued or done, and the cache of rasterized cells and
//! entities. A chunk is handed out once every chunk within `border` of it is filled, and from
//! then on it is frozen: later generation may not write into it.

use crate::{
    config::{DungeonType, GenerationMode, StreamingSettings},
    entity::Entity,
    error::{GenerationError, Result},
    graph::connect_rooms,
    map::{CellType, Chunk, ChunkMap, CHUNK_SIZE},
    map_types::dungeon::{make_room, place_entities},
    pattern::Pattern,
    point::Point,
    room::{fill_map_with_pattern, merged_patterns, sparse_nodes, Room, RoomKind},
    sampling::{chunk_rng, jitter},
    separation::{separate_rooms_within, settle_rooms},
    shape::rectangle,
    symmetric_map::SymmetricMap,
    CellEncoder,
};

use fnv::{FnvHashMap, FnvHashSet};
use rand::Rng;
use std::collections::VecDeque;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkStatus {
    Unrequested,
    Queued,
    Generating,
    Filled,
    Failed(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Priority {
    /// Someone is waiting for it.
    High,
    /// Prefetch.
    Background,
}

/// Center of the chunk, in cell coordinates.
pub fn chunk_center(chunk: Point) -> Point {
    Point::new(
        chunk.x * CHUNK_SIZE + CHUNK_SIZE / 2,
        chunk.y * CHUNK_SIZE + CHUNK_SIZE / 2,
    )
}

/// Every chunk within Chebyshev distance `radius` of `center`, ring by ring from the center out.
pub fn spiral(center: Point, radius: i32) -> Vec<Point> {
    (0..=radius.max(0))
        .flat_map(Point::ring)
        .map(|offset| center + offset)
        .collect()
}

#[derive(Default)]
struct State {
    queue: VecDeque<Point>,
    status: FnvHashMap<Point, ChunkStatus>,
    /// Chunks a caller asked for directly.
    locked: FnvHashSet<Point>,
    /// Chunks already handed out.
    frozen: FnvHashSet<Point>,
    cache: ChunkMap,
    entities: FnvHashMap<Point, Vec<Entity>>,
    shutdown: bool,
    worker_died: bool,
}

impl State {
    fn status(&self, chunk: &Point) -> ChunkStatus {
        self.status
            .get(chunk)
            .cloned()
            .unwrap_or(ChunkStatus::Unrequested)
    }

    fn enqueue(&mut self, chunks: Vec<Point>, priority: Priority) -> usize {
        let mut queued = 0;
        match priority {
            Priority::High => {
                // Pushed in reverse so the first chunk ends up at the front. Failed chunks get
                // another go, against whatever the world looks like now.
                for chunk in chunks.into_iter().rev() {
                    match self.status(&chunk) {
                        ChunkStatus::Unrequested
                        | ChunkStatus::Queued
                        | ChunkStatus::Failed(_) => {
                            self.status.insert(chunk, ChunkStatus::Queued);
                            self.queue.push_front(chunk);
                            queued += 1;
                        }
                        _ => {}
                    }
                }
            }
            Priority::Background => {
                for chunk in chunks.into_iter() {
                    if self.status(&chunk) == ChunkStatus::Unrequested {
                        self.status.insert(chunk, ChunkStatus::Queued);
                        self.queue.push_back(chunk);
                        queued += 1;
                    }
                }
            }
        }

        queued
    }

    /// Next chunk that still needs generating. Stale queue entries (already generated through a
    /// duplicate entry) are skipped.
    fn pop_work(&mut self) -> Option<Point> {
        while let Some(chunk) = self.queue.pop_front() {
            if self.status(&chunk) == ChunkStatus::Queued {
                return Some(chunk);
            }
        }

        None
    }

    /// Rasterizes freshly laid out rooms into the cache. Nothing lands in a frozen chunk.
    fn commit(&mut self, rooms: &[Room]) {
        let pattern = merged_patterns(rooms);
        let mut encoder = ClippedCache {
            cache: &mut self.cache,
            frozen: &self.frozen,
            clipped: 0,
        };
        fill_map_with_pattern(&pattern, &mut encoder);
        if encoder.clipped > 0 {
            log::warn!("Clipped {} cells landing in frozen chunks", encoder.clipped);
        }

        for entity in rooms.iter().flat_map(|r| r.absolute_entities()) {
            let (chunk, _) = entity.position.split_tile(CHUNK_SIZE);
            if self.frozen.contains(&chunk) {
                log::warn!("Dropped {:?} landing in frozen chunk {:?}", entity.kind, chunk);
                continue;
            }
            self.entities.entry(chunk).or_insert_with(Vec::new).push(entity);
        }
    }
}

/// Cache view that refuses writes into frozen chunks.
struct ClippedCache<'a> {
    cache: &'a mut ChunkMap,
    frozen: &'a FnvHashSet<Point>,
    clipped: usize,
}

impl<'a> CellEncoder for ClippedCache<'a> {
    fn encode_cell(&mut self, point: &Point, cell: CellType) {
        let (chunk, _) = point.split_tile(CHUNK_SIZE);
        if self.frozen.contains(&chunk) {
            self.clipped += 1;
        } else {
            self.cache.encode_cell(point, cell);
        }
    }

    fn cell_at(&self, point: &Point) -> CellType {
        self.cache.cell_at(point)
    }
}

struct Shared {
    state: Mutex<State>,
    work_ready: Condvar,
    chunk_ready: Condvar,
}

/// Relaxation attempts, each on a fresh scatter of the chunk's rooms, before settling them one by
/// one.
const MAX_CHUNK_LAYOUT_TRIES: usize = 2;

/// Separation steps per attempt.
const CHUNK_SEPARATION_STEPS: usize = 200;

/// How far settling may carry a room from where it was dropped.
const MAX_SETTLE_RADIUS: i32 = 8 * CHUNK_SIZE;

/// Generation state owned by the worker thread.
struct World {
    mode: GenerationMode,
    seed: u64,
    rooms: Vec<Room>,
    links: SymmetricMap<i32>,
    separation_steps: usize,
    settle_radius: i32,
}

impl World {
    fn new(mode: GenerationMode, seed: u64, rooms: Vec<Room>, links: SymmetricMap<i32>) -> Self {
        World {
            mode,
            seed,
            rooms,
            links,
            separation_steps: CHUNK_SEPARATION_STEPS,
            settle_radius: MAX_SETTLE_RADIUS,
        }
    }

    /// Lays out and connects the rooms of one chunk, keeping clear of `frozen` chunks. Returns the
    /// range of rooms it appended.
    fn generate_chunk(
        &mut self,
        chunk: Point,
        frozen: &FnvHashSet<Point>,
    ) -> Result<Range<usize>> {
        let mut rng = chunk_rng(self.seed, chunk);
        let first_new = self.rooms.len();
        let center = chunk_center(chunk);
        for _ in 0..self.mode.nb_rooms {
            let room = make_room(&self.mode, &mut rng);
            self.rooms.push(room.at(center));
        }
        let num_rooms = self.rooms.len();

        if let Err(e) = self.lay_out(chunk, first_new..num_rooms, frozen, &mut rng) {
            self.rooms.truncate(first_new);
            return Err(e);
        }

        let open = |p: &Point| !frozen.contains(&p.split_tile(CHUNK_SIZE).0);
        let corridors = connect_rooms(
            &mut self.rooms,
            &mut self.links,
            first_new,
            self.mode.kind == DungeonType::Cave,
            open,
            &mut rng,
        );
        place_entities(&mut self.rooms, first_new, self.mode.monster_load, &mut rng);
        log::debug!(
            "Chunk {:?}: {} rooms, {} corridors, {} rooms in the world",
            chunk,
            self.mode.nb_rooms,
            corridors.len(),
            self.rooms.len()
        );

        Ok(first_new..self.rooms.len())
    }

    /// Positions the `new` rooms around the chunk center. Relaxation gets a few scatters; if it
    /// keeps stalling against the rooms already there, the rooms are settled into free space.
    fn lay_out(
        &mut self,
        chunk: Point,
        new: Range<usize>,
        frozen: &FnvHashSet<Point>,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let center = chunk_center(chunk);
        let margin = self.mode.room_margin;

        // Nearby frozen chunks stand in as obstacles, so no new room lands in one.
        let reach = self.settle_radius / CHUNK_SIZE + 2;
        let mut blocked: Vec<Point> = frozen
            .iter()
            .filter(|c| (c.x - chunk.x).abs().max((c.y - chunk.y).abs()) <= reach)
            .copied()
            .collect();
        blocked.sort();
        let num_rooms = self.rooms.len();
        self.rooms.extend(blocked.into_iter().map(frozen_block));

        let mut laid_out = false;
        for attempt in 0..MAX_CHUNK_LAYOUT_TRIES {
            self.scatter(new.clone(), center, rng);
            match separate_rooms_within(
                &mut self.rooms,
                margin,
                new.clone(),
                self.separation_steps,
                rng,
            ) {
                Ok(_) => {
                    laid_out = true;
                    break;
                }
                Err(e) => log::debug!("Chunk {:?}, layout attempt {}: {}", chunk, attempt, e),
            }
        }
        let outcome = if laid_out {
            Ok(())
        } else {
            log::debug!("Chunk {:?}: settling rooms into free space", chunk);
            self.scatter(new.clone(), center, rng);
            settle_rooms(&mut self.rooms, margin, new, self.settle_radius)
        };
        self.rooms.truncate(num_rooms);

        outcome
    }

    fn scatter(&mut self, rooms: Range<usize>, center: Point, rng: &mut impl Rng) {
        for room in self.rooms[rooms].iter_mut() {
            room.position = center + jitter(rng, CHUNK_SIZE / 4);
        }
    }
}

/// Obstacle covering every cell of a frozen chunk.
fn frozen_block(chunk: Point) -> Room {
    Room::new(
        RoomKind::Blocked,
        rectangle(CHUNK_SIZE, CHUNK_SIZE),
        Pattern::single(Point::zero()),
    )
    .at(chunk_center(chunk))
}

fn run_worker(shared: Arc<Shared>, mut world: World) {
    loop {
        let (chunk, frozen) = {
            let mut state = match shared.state.lock() {
                Ok(s) => s,
                Err(_) => return,
            };
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(chunk) = state.pop_work() {
                    state.status.insert(chunk, ChunkStatus::Generating);
                    break (chunk, state.frozen.clone());
                }
                state = match shared.work_ready.wait(state) {
                    Ok(s) => s,
                    Err(_) => return,
                };
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| world.generate_chunk(chunk, &frozen)));

        let mut state = match shared.state.lock() {
            Ok(s) => s,
            Err(_) => return,
        };
        match outcome {
            Ok(Ok(new_rooms)) => {
                state.commit(&world.rooms[new_rooms]);
                // A filled chunk is always cached, even if nothing landed in it.
                if state.cache.get(&chunk).is_none() {
                    state.cache.insert(chunk, Chunk::default());
                }
                state.status.insert(chunk, ChunkStatus::Filled);
            }
            Ok(Err(e)) => {
                log::error!("Failed to generate chunk {:?}: {}", chunk, e);
                state.status.insert(chunk, ChunkStatus::Failed(e.to_string()));
            }
            Err(_) => {
                log::error!("Generation worker panicked on chunk {:?}", chunk);
                state
                    .status
                    .insert(chunk, ChunkStatus::Failed("worker panicked".to_string()));
                state.worker_died = true;
                shared.chunk_ready.notify_all();
                return;
            }
        }
        shared.chunk_ready.notify_all();
    }
}

/// Rooms standing in for the already generated parts of a restored world, one per chunk with
/// any floor. They are chained in `links` so the restored world counts as connected.
fn restored_rooms(cache: &ChunkMap, links: &mut SymmetricMap<i32>) -> Vec<Room> {
    let mut rooms = Vec::new();
    for coord in cache.sorted_coords() {
        let chunk = match cache.get(&coord) {
            Some(c) => c,
            None => continue,
        };
        let cells: Pattern = chunk.positions_of(CellType::Floor).collect();
        if cells.is_empty() {
            continue;
        }

        let nodes = sparse_nodes(&cells);
        let origin = Point::new(coord.x * CHUNK_SIZE, coord.y * CHUNK_SIZE);
        let i = rooms.len();
        rooms.push(Room::new(RoomKind::Restored, cells, nodes).at(origin));
        if i > 0 {
            links.insert(i - 1, i, 0);
        }
    }

    rooms
}

/// Saved chunks that were surely handed out: a chunk is only served once its whole border is
/// filled, and every filled chunk is saved. The rim of the saved area stays writable, so new
/// corridors can reach into it.
fn handed_out_chunks(cache: &ChunkMap, border: i32) -> FnvHashSet<Point> {
    cache
        .coords()
        .filter(|c| spiral(*c, border).iter().all(|n| cache.get(n).is_some()))
        .collect()
}

pub struct ChunkedGenerator {
    shared: Arc<Shared>,
    settings: StreamingSettings,
    worker: Option<JoinHandle<()>>,
}

impl ChunkedGenerator {
    pub fn new(mode: GenerationMode, seed: u64) -> Result<Self> {
        let world = World::new(mode, seed, Vec::new(), SymmetricMap::new());

        Self::start(world, State::default())
    }

    /// Resumes a world from saved cells and entities. Every saved chunk counts as filled; the ones
    /// that must have been handed out are frozen again.
    pub fn restore(
        mode: GenerationMode,
        seed: u64,
        cache: ChunkMap,
        entities: Vec<Entity>,
    ) -> Result<Self> {
        let mut links = SymmetricMap::new();
        let rooms = restored_rooms(&cache, &mut links);
        log::debug!(
            "Restored {} chunks as {} rooms",
            cache.len(),
            rooms.len()
        );

        let mut state = State::default();
        state.frozen = handed_out_chunks(&cache, mode.streaming.border);
        log::debug!("Froze {} chunks that were handed out", state.frozen.len());
        for coord in cache.coords() {
            state.status.insert(coord, ChunkStatus::Filled);
        }
        for entity in entities.into_iter() {
            let (chunk, _) = entity.position.split_tile(CHUNK_SIZE);
            state.entities.entry(chunk).or_insert_with(Vec::new).push(entity);
        }
        state.cache = cache;

        Self::start(World::new(mode, seed, rooms, links), state)
    }

    fn start(world: World, state: State) -> Result<Self> {
        world.mode.validate()?;

        let settings = world.mode.streaming.clone();
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            work_ready: Condvar::new(),
            chunk_ready: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("chunk-generator".to_string())
            .spawn(move || run_worker(worker_shared, world))?;

        Ok(ChunkedGenerator {
            shared,
            settings,
            worker: Some(worker),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.shared
            .state
            .lock()
            .map_err(|_| GenerationError::WorkerStopped)
    }

    /// Queues every chunk within `radius + border` of `(x, y)`.
    pub fn pre_generate_radius(
        &self,
        x: i32,
        y: i32,
        radius: i32,
        priority: Priority,
    ) -> Result<()> {
        let chunks = spiral(Point::new(x, y), radius + self.settings.border);
        let queued = self.lock()?.enqueue(chunks, priority);
        if queued > 0 {
            log::trace!("Queued {} chunks around ({}, {})", queued, x, y);
            self.shared.work_ready.notify_one();
        }

        Ok(())
    }

    pub fn chunk_status(&self, x: i32, y: i32) -> Result<ChunkStatus> {
        Ok(self.lock()?.status(&Point::new(x, y)))
    }

    /// Blocks until the chunk and its border are filled, then freezes the chunk.
    fn wait_for(&self, chunk: Point) -> Result<MutexGuard<'_, State>> {
        let deadline = Instant::now() + self.settings.wait_timeout();
        let square = spiral(chunk, self.settings.border);

        let mut state = self.lock()?;
        state.locked.insert(chunk);
        let queued = state.enqueue(square.clone(), Priority::High);
        if queued > 0 {
            self.shared.work_ready.notify_one();
        }

        loop {
            if state.worker_died || state.shutdown {
                return Err(GenerationError::WorkerStopped);
            }

            let mut pending = false;
            for c in square.iter() {
                match state.status(c) {
                    ChunkStatus::Filled => {}
                    ChunkStatus::Failed(reason) => {
                        return Err(GenerationError::ChunkFailed { chunk: *c, reason });
                    }
                    _ => pending = true,
                }
            }
            if !pending {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(GenerationError::ChunkTimeout(chunk));
            }
            state = self
                .shared
                .chunk_ready
                .wait_timeout(state, deadline - now)
                .map_err(|_| GenerationError::WorkerStopped)?
                .0;
        }
        state.frozen.insert(chunk);

        Ok(state)
    }

    fn prefetch(&self, chunk: Point) -> Result<()> {
        if self.settings.prefetch_radius > 0 {
            self.pre_generate_radius(
                chunk.x,
                chunk.y,
                self.settings.prefetch_radius,
                Priority::Background,
            )?;
        }

        Ok(())
    }

    pub fn chunk_cells(&self, x: i32, y: i32) -> Result<Chunk> {
        let chunk = Point::new(x, y);
        let cells = {
            let state = self.wait_for(chunk)?;
            state.cache.get(&chunk).cloned().unwrap_or_default()
        };
        self.prefetch(chunk)?;

        Ok(cells)
    }

    pub fn chunk_entities(&self, x: i32, y: i32) -> Result<Vec<Entity>> {
        let chunk = Point::new(x, y);
        let entities = {
            let state = self.wait_for(chunk)?;
            state.entities.get(&chunk).cloned().unwrap_or_default()
        };
        self.prefetch(chunk)?;

        Ok(entities)
    }

    /// Cell at an absolute position, from whatever is cached. Never waits.
    pub fn cell_at(&self, point: &Point) -> Result<CellType> {
        Ok(self.lock()?.cache.cell_at(point))
    }

    /// Copy of every cached chunk and entity, entities ordered by chunk.
    pub fn snapshot(&self) -> Result<(ChunkMap, Vec<Entity>)> {
        let state = self.lock()?;
        let mut coords: Vec<&Point> = state.entities.keys().collect();
        coords.sort();
        let entities = coords
            .into_iter()
            .flat_map(|c| state.entities[c].iter().copied())
            .collect();

        Ok((state.cache.clone(), entities))
    }
}

impl Drop for ChunkedGenerator {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.shutdown = true;
        }
        self.shared.work_ready.notify_all();
        self.shared.chunk_ready.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Generation worker panicked while shutting down");
            }
        }
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
