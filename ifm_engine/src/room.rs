//! Rooms: the locations the player moves between.

use serde::{Deserialize, Serialize};

use crate::world::{ItemId, LinkId, RoomId, SectionId, TaskId};
use ifm_data::Direction;

/// One room, with its grid placement and entry requirements.
///
/// `pos` is filled in by the map builder; afterwards it is the room's
/// normalized (x, y) within its section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub tag: Option<String>,
    pub desc: String,
    pub section: SectionId,
    /// Normalized grid position within the section.
    pub pos: Option<(i32, i32)>,
    /// Room this one was placed relative to.
    pub near: Option<RoomId>,
    /// Placement directions from `near`.
    pub dir: Vec<Direction>,
    /// The link implied by declaring this room with a direction list.
    pub implicit_link: Option<LinkId>,
    /// Declared exit directions with no target room.
    pub exits: Vec<Direction>,
    /// Unit offsets of exit stubs left unused by any link; derived.
    pub exit_stubs: Vec<(i32, i32)>,
    /// Items required to enter.
    pub need: Vec<ItemId>,
    /// Tasks that, once done, close this room off.
    pub before: Vec<TaskId>,
    /// Tasks that must be done before entry.
    pub after: Vec<TaskId>,
    /// Items that must be left behind before entering.
    pub leave: Vec<ItemId>,
    pub leave_all: bool,
    /// The solver will not drop unneeded items here.
    pub nodrop: bool,
    pub score: u32,
    pub finish: bool,
    pub notes: Vec<String>,
    pub styles: Vec<String>,
}

impl Room {
    /// Grid position, defaulting to the section origin while unplaced.
    pub fn at(&self) -> (i32, i32) {
        self.pos.unwrap_or((0, 0))
    }
}
