//! Binary save format. Three sections, in order: cells, entities, exploration. All integers are
//! little-endian and chunks are written in ascending coordinate order.

use crate::{
    entity::{Entity, EntityKind, Interaction, Orientation},
    map::{CellType, Chunk, ChunkMap, ExplorationMap, CHUNK_CELLS, CHUNK_SIZE},
    point::Point,
};

use std::io::{self, Read, Write};

const EXPLORATION_BYTES: usize = CHUNK_CELLS / 8;

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_u8(reader: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(reader: &mut impl Read) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_point(reader: &mut impl Read) -> io::Result<Point> {
    let x = read_i32(reader)?;
    let y = read_i32(reader)?;
    Ok(Point::new(x, y))
}

fn write_point(writer: &mut impl Write, p: Point) -> io::Result<()> {
    writer.write_all(&p.x.to_le_bytes())?;
    writer.write_all(&p.y.to_le_bytes())
}

fn write_count(writer: &mut impl Write, count: usize) -> io::Result<()> {
    if count > u32::MAX as usize {
        return Err(invalid_data(format!("Too many records to save: {}", count)));
    }
    writer.write_all(&(count as u32).to_le_bytes())
}

pub fn write_cells(writer: &mut impl Write, chunks: &ChunkMap) -> io::Result<()> {
    let coords = chunks.sorted_coords();
    write_count(writer, coords.len())?;
    for coord in coords {
        let chunk = match chunks.get(&coord) {
            Some(c) => c,
            None => continue,
        };
        write_point(writer, coord)?;
        let bytes: Vec<u8> = chunk.cells().iter().map(|c| c.to_byte()).collect();
        writer.write_all(&bytes)?;
    }

    Ok(())
}

pub fn read_cells(reader: &mut impl Read) -> io::Result<ChunkMap> {
    let count = read_u32(reader)?;
    let mut chunks = ChunkMap::default();
    let mut bytes = vec![0u8; CHUNK_CELLS];
    for _ in 0..count {
        let coord = read_point(reader)?;
        reader.read_exact(&mut bytes)?;
        let cells = bytes
            .iter()
            .map(|b| {
                CellType::from_byte(*b)
                    .ok_or_else(|| invalid_data(format!("Bad cell byte {} in chunk {:?}", b, coord)))
            })
            .collect::<io::Result<Vec<_>>>()?;
        let chunk = Chunk::from_cells(cells).expect("Read exactly one chunk of cells");
        if chunks.insert(coord, chunk).is_some() {
            return Err(invalid_data(format!("Chunk {:?} saved twice", coord)));
        }
    }

    Ok(chunks)
}

fn kind_to_byte(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Monster => 0,
        EntityKind::Stairs => 1,
        EntityKind::Item => 2,
        EntityKind::Hero => 3,
    }
}

fn kind_from_byte(byte: u8) -> Option<EntityKind> {
    match byte {
        0 => Some(EntityKind::Monster),
        1 => Some(EntityKind::Stairs),
        2 => Some(EntityKind::Item),
        3 => Some(EntityKind::Hero),
        _ => None,
    }
}

fn interaction_to_byte(interaction: Interaction) -> u8 {
    match interaction {
        Interaction::None => 0,
        Interaction::Fight => 1,
        Interaction::Descend => 2,
        Interaction::PickUp => 3,
    }
}

fn interaction_from_byte(byte: u8) -> Option<Interaction> {
    match byte {
        0 => Some(Interaction::None),
        1 => Some(Interaction::Fight),
        2 => Some(Interaction::Descend),
        3 => Some(Interaction::PickUp),
        _ => None,
    }
}

fn orientation_to_byte(orientation: Orientation) -> u8 {
    match orientation {
        Orientation::North => 0,
        Orientation::East => 1,
        Orientation::South => 2,
        Orientation::West => 3,
    }
}

fn orientation_from_byte(byte: u8) -> Option<Orientation> {
    match byte {
        0 => Some(Orientation::North),
        1 => Some(Orientation::East),
        2 => Some(Orientation::South),
        3 => Some(Orientation::West),
        _ => None,
    }
}

pub fn write_entities(writer: &mut impl Write, entities: &[Entity]) -> io::Result<()> {
    write_count(writer, entities.len())?;
    for e in entities.iter() {
        writer.write_all(&[
            kind_to_byte(e.kind),
            interaction_to_byte(e.interaction),
            orientation_to_byte(e.orientation),
        ])?;
        write_point(writer, e.position)?;
    }

    Ok(())
}

pub fn read_entities(reader: &mut impl Read) -> io::Result<Vec<Entity>> {
    let count = read_u32(reader)?;
    let mut entities = Vec::new();
    for _ in 0..count {
        let kind = read_u8(reader)?;
        let interaction = read_u8(reader)?;
        let orientation = read_u8(reader)?;
        let position = read_point(reader)?;
        entities.push(Entity {
            kind: kind_from_byte(kind)
                .ok_or_else(|| invalid_data(format!("Bad entity kind {}", kind)))?,
            interaction: interaction_from_byte(interaction)
                .ok_or_else(|| invalid_data(format!("Bad interaction {}", interaction)))?,
            orientation: orientation_from_byte(orientation)
                .ok_or_else(|| invalid_data(format!("Bad orientation {}", orientation)))?,
            position,
        });
    }

    Ok(entities)
}

/// Each row is 32 bits, split into 4 bytes, lowest x first.
pub fn write_exploration(writer: &mut impl Write, explored: &ExplorationMap) -> io::Result<()> {
    let coords = explored.sorted_coords();
    write_count(writer, coords.len())?;
    for coord in coords {
        let rows = match explored.chunk_rows(&coord) {
            Some(r) => r,
            None => continue,
        };
        write_point(writer, coord)?;
        for row in rows.iter() {
            writer.write_all(&row.to_le_bytes())?;
        }
    }

    Ok(())
}

pub fn read_exploration(reader: &mut impl Read) -> io::Result<ExplorationMap> {
    let count = read_u32(reader)?;
    let mut explored = ExplorationMap::default();
    let mut bytes = [0u8; EXPLORATION_BYTES];
    for _ in 0..count {
        let coord = read_point(reader)?;
        reader.read_exact(&mut bytes)?;
        let mut rows = [0u32; CHUNK_SIZE as usize];
        for (row, b) in rows.iter_mut().zip(bytes.chunks_exact(4)) {
            *row = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        }
        explored.insert_chunk_rows(coord, rows);
    }

    Ok(explored)
}

/// Everything a save holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveData {
    pub cells: ChunkMap,
    pub entities: Vec<Entity>,
    pub explored: ExplorationMap,
}

impl SaveData {
    pub fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        write_cells(writer, &self.cells)?;
        write_entities(writer, &self.entities)?;
        write_exploration(writer, &self.explored)?;
        writer.flush()
    }

    pub fn read(reader: &mut impl Read) -> io::Result<Self> {
        let cells = read_cells(reader)?;
        let entities = read_entities(reader)?;
        let explored = read_exploration(reader)?;

        Ok(SaveData {
            cells,
            entities,
            explored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::CellEncoder;

    #[test]
    fn test_cell_section_layout() {
        let mut chunks = ChunkMap::default();
        chunks.encode_cell(&Point::new(-1, 0), CellType::Floor);
        chunks.encode_cell(&Point::new(1, 0), CellType::Wall);
        let mut bytes = Vec::new();
        write_cells(&mut bytes, &chunks).unwrap();

        assert_eq!(bytes.len(), 4 + 2 * (8 + CHUNK_CELLS));
        assert_eq!(&bytes[0..4], &[2, 0, 0, 0]);
        // (-1, 0) sorts first.
        assert_eq!(&bytes[4..12], &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]);
        assert_eq!(bytes[12 + 31], 2);
        let second = 12 + CHUNK_CELLS;
        assert_eq!(bytes[second + 8 + 1], 1);

        assert_eq!(read_cells(&mut bytes.as_slice()).unwrap(), chunks);
    }

    #[test]
    fn test_entity_layout() {
        let entities = vec![Entity::monster(Point::new(3, -2), Orientation::West)];
        let mut bytes = Vec::new();
        write_entities(&mut bytes, &entities).unwrap();

        assert_eq!(
            bytes,
            vec![1, 0, 0, 0, 0, 1, 3, 3, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]
        );
        assert_eq!(read_entities(&mut bytes.as_slice()).unwrap(), entities);
    }

    #[test]
    fn test_exploration_bits_are_lsb_first() {
        let mut explored = ExplorationMap::default();
        explored.mark(&Point::new(0, 0));
        explored.mark(&Point::new(9, 0));
        let mut bytes = Vec::new();
        write_exploration(&mut bytes, &explored).unwrap();

        assert_eq!(bytes.len(), 4 + 8 + EXPLORATION_BYTES);
        assert_eq!(bytes[12], 0b0000_0001);
        assert_eq!(bytes[13], 0b0000_0010);
        assert_eq!(read_exploration(&mut bytes.as_slice()).unwrap(), explored);
    }

    #[test]
    fn test_bad_cell_byte_is_invalid_data() {
        let mut bytes = vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend(vec![9u8; CHUNK_CELLS]);
        let err = read_cells(&mut bytes.as_slice()).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_stream_fails() {
        let bytes = vec![3, 0, 0, 0, 1, 2];
        let err = SaveData::read(&mut bytes.as_slice()).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
