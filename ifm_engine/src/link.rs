//! Links and joins: the connections between rooms.
//!
//! A link lies on the map grid and is traced into a polyline; a join
//! connects rooms with no grid path, possibly across sections. Both feed
//! the reach graph unless flagged `nopath`.

use serde::{Deserialize, Serialize};

use crate::world::{ItemId, JoinId, LinkId, RoomId, SectionId, TaskId};
use ifm_data::Direction;

/// A grid connection between two rooms of one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub tag: Option<String>,
    pub from: RoomId,
    pub to: RoomId,
    /// Declared grid directions from `from` towards `to`.
    pub dir: Vec<Direction>,
    /// Travel verb (up/down/in/out) used for default commands.
    pub go: Option<Direction>,
    pub oneway: bool,
    /// Placed but not traced into a polyline.
    pub hidden: bool,
    /// Excluded from the map grid and the reach graph.
    pub nolink: bool,
    /// Excluded from the reach graph.
    pub nopath: bool,
    /// Traversal cost; 1 when unspecified.
    pub len: Option<u32>,
    pub cmd_to: Option<Vec<String>>,
    pub cmd_from: Option<Vec<String>>,
    pub need: Vec<ItemId>,
    pub before: Vec<TaskId>,
    pub after: Vec<TaskId>,
    pub leave: Vec<ItemId>,
    pub leave_all: bool,
    pub notes: Vec<String>,
    pub styles: Vec<String>,
    /// Section the link lies in; derived by the map builder.
    pub section: Option<SectionId>,
    /// Polyline x coordinates, source room first.
    pub xs: Vec<i32>,
    /// Polyline y coordinates, source room first.
    pub ys: Vec<i32>,
    /// First direction leaving the source room.
    pub to_dir: Option<Direction>,
    /// Direction arriving at the source room on the way back.
    pub from_dir: Option<Direction>,
}

impl Link {
    pub fn cost(&self) -> u32 {
        self.len.unwrap_or(1).max(1)
    }
}

/// A sectionless connection between two rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Join {
    pub id: JoinId,
    pub tag: Option<String>,
    pub from: RoomId,
    pub to: RoomId,
    pub go: Option<Direction>,
    pub oneway: bool,
    /// Not marked on room display names.
    pub hidden: bool,
    pub nopath: bool,
    pub len: Option<u32>,
    pub cmd_to: Option<Vec<String>>,
    pub cmd_from: Option<Vec<String>>,
    pub need: Vec<ItemId>,
    pub before: Vec<TaskId>,
    pub after: Vec<TaskId>,
    pub leave: Vec<ItemId>,
    pub leave_all: bool,
    pub notes: Vec<String>,
    pub styles: Vec<String>,
}

impl Join {
    pub fn cost(&self) -> u32 {
        self.len.unwrap_or(1).max(1)
    }
}
