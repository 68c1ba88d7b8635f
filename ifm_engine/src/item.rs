//! Items: things the player picks up, carries and leaves behind.

use serde::{Deserialize, Serialize};

use crate::world::{ItemId, RoomId, TaskId};

/// One item as declared. Where the item currently *is* during a solve is
/// planner state, not part of this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub tag: Option<String>,
    pub desc: String,
    /// Starting room; `None` means carried from the outset.
    pub start_room: Option<RoomId>,
    pub score: u32,
    /// Picking this up finishes the game.
    pub finish: bool,
    pub hidden: bool,
    /// Only ever obtained through a task, never an explicit GET.
    pub given: bool,
    /// Only ever removed by a task, never an explicit DROP.
    pub lost: bool,
    pub ignore: bool,
    /// Never dropped as unneeded.
    pub keep: bool,
    /// Kept while any of these is still held.
    pub keep_with: Vec<ItemId>,
    /// Kept until all of these tasks are done.
    pub keep_until: Vec<TaskId>,
    /// Items required before picking this up.
    pub need: Vec<ItemId>,
    pub before: Vec<TaskId>,
    pub after: Vec<TaskId>,
    pub notes: Vec<String>,
    pub styles: Vec<String>,
}
