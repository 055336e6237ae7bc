use crate::point::Point;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum EntityKind {
    Monster,
    Stairs,
    Item,
    Hero,
}

/// What happens when the hero bumps into the entity.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Interaction {
    None,
    Fight,
    Descend,
    PickUp,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

pub const ALL_ORIENTATIONS: [Orientation; 4] = [
    Orientation::North,
    Orientation::East,
    Orientation::South,
    Orientation::West,
];

/// Placement record handed to the game. The position is relative to the owning room until the
/// room is merged into a map, absolute afterwards.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub interaction: Interaction,
    pub position: Point,
    pub orientation: Orientation,
}

impl Entity {
    pub fn monster(position: Point, orientation: Orientation) -> Self {
        Entity {
            kind: EntityKind::Monster,
            interaction: Interaction::Fight,
            position,
            orientation,
        }
    }

    pub fn stairs(position: Point) -> Self {
        Entity {
            kind: EntityKind::Stairs,
            interaction: Interaction::Descend,
            position,
            orientation: Orientation::South,
        }
    }

    pub fn hero(position: Point) -> Self {
        Entity {
            kind: EntityKind::Hero,
            interaction: Interaction::None,
            position,
            orientation: Orientation::South,
        }
    }

    pub fn translated(&self, offset: Point) -> Self {
        Entity {
            position: self.position + offset,
            ..*self
        }
    }
}
