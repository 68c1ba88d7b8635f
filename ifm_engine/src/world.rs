//! The resolved world and its arena identifiers.
//!
//! A [`World`] is built once from a declaration and is immutable while the
//! solver runs; everything that changes during solving lives in the
//! planner's own state records. Objects refer to each other by arena index
//! so the inevitable reference cycles (tasks that need items that sit in
//! rooms that need tasks) stay plain data.

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::link::{Join, Link};
use crate::room::Room;
use crate::task::Task;
use ifm_data::Vars;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a room in [`World::rooms`], in declaration order.
    RoomId
);
arena_id!(
    /// Index of an item in [`World::items`].
    ItemId
);
arena_id!(
    /// Index of a link in [`World::links`].
    LinkId
);
arena_id!(
    /// Index of a join in [`World::joins`].
    JoinId
);
arena_id!(
    /// Index of a task in [`World::tasks`].
    TaskId
);
arena_id!(
    /// Index of a map section in [`World::sections`].
    SectionId
);
arena_id!(
    /// Index of a reach record in the reach graph.
    ReachId
);

/// A connected cluster of rooms sharing one map grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: Option<String>,
    /// Rooms of the section, in declaration order.
    pub rooms: Vec<RoomId>,
    /// Links lying inside the section, in declaration order.
    pub links: Vec<LinkId>,
    /// Grid extent after normalization: max x + 1.
    pub xlen: i32,
    /// Grid extent after normalization: max y + 1.
    pub ylen: i32,
}

/// The resolved, placed world a declaration describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub title: Option<String>,
    pub rooms: Vec<Room>,
    pub items: Vec<Item>,
    pub links: Vec<Link>,
    pub joins: Vec<Join>,
    pub tasks: Vec<Task>,
    pub sections: Vec<Section>,
    /// Where the player begins; `None` only for a world with no rooms.
    pub start: Option<RoomId>,
    pub vars: Vars,
}

impl World {
    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.0]
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn join(&self, id: JoinId) -> &Join {
        &self.joins[id.0]
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }

    pub fn room_ids(&self) -> impl Iterator<Item = RoomId> {
        (0..self.rooms.len()).map(RoomId)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> {
        (0..self.items.len()).map(ItemId)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> {
        (0..self.tasks.len()).map(TaskId)
    }
}
