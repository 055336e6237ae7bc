use crate::{point::Point, CellEncoder};

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Side length of a chunk, in cells.
pub const CHUNK_SIZE: i32 = 32;
pub const CHUNK_CELLS: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CellType {
    Empty,
    Wall,
    Floor,
}

impl Default for CellType {
    fn default() -> Self {
        CellType::Empty
    }
}

impl CellType {
    pub fn to_byte(self) -> u8 {
        match self {
            CellType::Empty => 0,
            CellType::Wall => 1,
            CellType::Floor => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CellType::Empty),
            1 => Some(CellType::Wall),
            2 => Some(CellType::Floor),
            _ => None,
        }
    }
}

/// 32x32 tile of cells, row-major.
#[derive(Clone, Eq, PartialEq)]
pub struct Chunk {
    cells: Box<[CellType]>,
}

impl Default for Chunk {
    fn default() -> Self {
        Chunk {
            cells: vec![CellType::Empty; CHUNK_CELLS].into_boxed_slice(),
        }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let c = match self.get(x, y) {
                    CellType::Empty => ' ',
                    CellType::Wall => '#',
                    CellType::Floor => '.',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl Chunk {
    fn index(x: i32, y: i32) -> usize {
        debug_assert!((0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&y));

        (y * CHUNK_SIZE + x) as usize
    }

    pub fn get(&self, x: i32, y: i32) -> CellType {
        self.cells[Self::index(x, y)]
    }

    pub fn set(&mut self, x: i32, y: i32, cell: CellType) {
        self.cells[Self::index(x, y)] = cell;
    }

    /// Row-major cells.
    pub fn cells(&self) -> &[CellType] {
        &self.cells
    }

    pub fn from_cells(cells: Vec<CellType>) -> Option<Self> {
        if cells.len() != CHUNK_CELLS {
            return None;
        }

        Some(Chunk {
            cells: cells.into_boxed_slice(),
        })
    }

    /// Local coordinates of every cell of the given type.
    pub fn positions_of(&self, cell: CellType) -> impl Iterator<Item = Point> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == cell)
            .map(|(i, _)| Point::new(i as i32 % CHUNK_SIZE, i as i32 / CHUNK_SIZE))
    }
}

/// Rectangular map with non-negative coordinates, used for finite levels.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DenseMap {
    width: i32,
    height: i32,
    cells: Vec<CellType>,
}

impl DenseMap {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width >= 0 && height >= 0, "Map dimensions must be non-negative");

        DenseMap {
            width,
            height,
            cells: vec![CellType::Empty; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, p: &Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return None;
        }

        Some((p.y * self.width + p.x) as usize)
    }

    /// The chunk-sized window whose top-left corner is `chunk * CHUNK_SIZE`.
    pub fn chunk(&self, chunk: Point) -> Chunk {
        let origin = Point::new(chunk.x * CHUNK_SIZE, chunk.y * CHUNK_SIZE);
        let mut tile = Chunk::default();
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                tile.set(x, y, self.cell_at(&(origin + Point::new(x, y))));
            }
        }

        tile
    }

    /// Coordinates of every chunk overlapping the map.
    pub fn chunk_coords(&self) -> impl Iterator<Item = Point> {
        let cols = (self.width + CHUNK_SIZE - 1) / CHUNK_SIZE;
        let rows = (self.height + CHUNK_SIZE - 1) / CHUNK_SIZE;

        (0..rows).flat_map(move |y| (0..cols).map(move |x| Point::new(x, y)))
    }

    /// Copies the given chunks into a map just large enough to hold them. Chunks at negative
    /// coordinates cannot be represented and are ignored.
    pub fn from_chunks(chunks: &ChunkMap) -> Self {
        let (mut cols, mut rows) = (0, 0);
        for coord in chunks.coords() {
            if coord.x >= 0 && coord.y >= 0 {
                cols = cols.max(coord.x + 1);
                rows = rows.max(coord.y + 1);
            }
        }

        let mut map = DenseMap::new(cols * CHUNK_SIZE, rows * CHUNK_SIZE);
        for (coord, chunk) in chunks.iter() {
            if coord.x < 0 || coord.y < 0 {
                continue;
            }
            let origin = Point::new(coord.x * CHUNK_SIZE, coord.y * CHUNK_SIZE);
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    map.encode_cell(&(origin + Point::new(x, y)), chunk.get(x, y));
                }
            }
        }

        map
    }

    pub fn to_chunks(&self) -> ChunkMap {
        let mut chunks = ChunkMap::default();
        for coord in self.chunk_coords() {
            chunks.insert(coord, self.chunk(coord));
        }

        chunks
    }

    pub fn positions_of(&self, cell: CellType) -> impl Iterator<Item = Point> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == cell)
            .map(move |(i, _)| Point::new(i as i32 % width, i as i32 / width))
    }
}

impl CellEncoder for DenseMap {
    fn encode_cell(&mut self, point: &Point, cell: CellType) {
        match self.index(point) {
            Some(i) => self.cells[i] = cell,
            None => log::warn!(
                "Dropped write outside of the {}x{} map at {:?}",
                self.width,
                self.height,
                point
            ),
        }
    }

    fn cell_at(&self, point: &Point) -> CellType {
        self.index(point)
            .map(|i| self.cells[i])
            .unwrap_or(CellType::Empty)
    }
}

/// Sparse map from chunk coordinate to chunk, used for infinite levels.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChunkMap {
    chunks: FnvHashMap<Point, Chunk>,
}

impl ChunkMap {
    pub fn get(&self, chunk: &Point) -> Option<&Chunk> {
        self.chunks.get(chunk)
    }

    pub fn insert(&mut self, chunk: Point, cells: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk, cells)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = Point> + '_ {
        self.chunks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point, &Chunk)> + '_ {
        self.chunks.iter().map(|(k, v)| (*k, v))
    }

    /// Coordinates in ascending order, for output that must not depend on hashing.
    pub fn sorted_coords(&self) -> Vec<Point> {
        let mut coords: Vec<Point> = self.coords().collect();
        coords.sort();

        coords
    }
}

impl CellEncoder for ChunkMap {
    fn encode_cell(&mut self, point: &Point, cell: CellType) {
        let (chunk, local) = point.split_tile(CHUNK_SIZE);
        self.chunks
            .entry(chunk)
            .or_insert_with(Chunk::default)
            .set(local.x, local.y, cell);
    }

    fn cell_at(&self, point: &Point) -> CellType {
        let (chunk, local) = point.split_tile(CHUNK_SIZE);
        self.chunks
            .get(&chunk)
            .map(|c| c.get(local.x, local.y))
            .unwrap_or(CellType::Empty)
    }
}

/// Which cells the player has seen. One bit per cell, 32 bits per chunk row.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExplorationMap {
    chunks: FnvHashMap<Point, [u32; CHUNK_SIZE as usize]>,
}

impl ExplorationMap {
    pub fn mark(&mut self, p: &Point) {
        let (chunk, local) = p.split_tile(CHUNK_SIZE);
        let rows = self
            .chunks
            .entry(chunk)
            .or_insert([0; CHUNK_SIZE as usize]);
        rows[local.y as usize] |= 1u32 << local.x;
    }

    pub fn is_explored(&self, p: &Point) -> bool {
        let (chunk, local) = p.split_tile(CHUNK_SIZE);
        self.chunks
            .get(&chunk)
            .map_or(false, |rows| rows[local.y as usize] & (1u32 << local.x) != 0)
    }

    pub fn chunk_rows(&self, chunk: &Point) -> Option<&[u32; CHUNK_SIZE as usize]> {
        self.chunks.get(chunk)
    }

    pub fn insert_chunk_rows(&mut self, chunk: Point, rows: [u32; CHUNK_SIZE as usize]) {
        self.chunks.insert(chunk, rows);
    }

    pub fn sorted_coords(&self) -> Vec<Point> {
        let mut coords: Vec<Point> = self.chunks.keys().copied().collect();
        coords.sort();

        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpopulated_cells_are_empty() {
        let sparse = ChunkMap::default();
        let dense = DenseMap::new(3, 3);

        assert_eq!(sparse.cell_at(&Point::new(-100, 7)), CellType::Empty);
        assert_eq!(dense.cell_at(&Point::new(-1, 0)), CellType::Empty);
        assert_eq!(dense.cell_at(&Point::new(3, 0)), CellType::Empty);
    }

    #[test]
    fn test_chunk_map_negative_coordinates() {
        let mut sparse = ChunkMap::default();
        sparse.encode_cell(&Point::new(-1, -33), CellType::Floor);

        assert_eq!(sparse.cell_at(&Point::new(-1, -33)), CellType::Floor);
        assert_eq!(
            sparse.get(&Point::new(-1, -2)).unwrap().get(31, 31),
            CellType::Floor
        );
    }

    #[test]
    fn test_dense_chunk_window() {
        let mut dense = DenseMap::new(40, 10);
        dense.encode_cell(&Point::new(33, 2), CellType::Wall);

        assert_eq!(dense.chunk(Point::new(1, 0)).get(1, 2), CellType::Wall);
        assert_eq!(dense.chunk_coords().count(), 2);
        assert_eq!(
            DenseMap::from_chunks(&dense.to_chunks()).cell_at(&Point::new(33, 2)),
            CellType::Wall
        );
    }

    #[test]
    fn test_exploration_bits() {
        let mut explored = ExplorationMap::default();
        explored.mark(&Point::new(31, -1));

        assert!(explored.is_explored(&Point::new(31, -1)));
        assert!(!explored.is_explored(&Point::new(30, -1)));
        assert!(!explored.is_explored(&Point::new(31, 0)));
    }

    #[test]
    fn test_cell_bytes() {
        for cell in &[CellType::Empty, CellType::Wall, CellType::Floor] {
            assert_eq!(CellType::from_byte(cell.to_byte()), Some(*cell));
        }
        assert_eq!(CellType::from_byte(7), None);
    }
}
