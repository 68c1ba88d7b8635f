//! Player tasks and everything a task can do to the world.

use serde::{Deserialize, Serialize};

use crate::world::{ItemId, RoomId, TaskId};

/// One declared task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub tag: Option<String>,
    pub desc: String,
    /// Room the task happens in; `None` means anywhere.
    pub room: Option<RoomId>,
    /// Commands performing the task; `None` prints the description,
    /// an empty list is an explicit no-action task.
    pub cmds: Option<Vec<String>>,
    pub score: u32,
    /// Doing this finishes the game.
    pub finish: bool,
    /// User assertion that this task closes nothing off.
    pub safe: bool,
    pub ignore: bool,
    /// Tasks that must be done first.
    pub after: Vec<TaskId>,
    /// Items that must be carried when the task's follow-chain starts.
    pub need: Vec<ItemId>,
    /// Items picked up from the task room as part of the task.
    pub get: Vec<ItemId>,
    /// Items that simply appear in inventory afterwards.
    pub give: Vec<ItemId>,
    /// Items destroyed by the task.
    pub lose: Vec<ItemId>,
    /// Items put down when the task runs.
    pub drop: Vec<ItemId>,
    /// Drop everything carried except the `drop` list.
    pub drop_all: bool,
    /// Tasks gating recovery of the dropped items.
    pub drop_until: Vec<TaskId>,
    /// Where the dropped items land (default: wherever the task is done).
    pub drop_room: Option<RoomId>,
    /// Tasks performed as a side effect, recursively.
    pub do_tasks: Vec<TaskId>,
    /// Teleport destination after the task.
    pub goto: Option<RoomId>,
    /// Task this one must immediately follow.
    pub follow: Option<TaskId>,
    pub notes: Vec<String>,
    pub styles: Vec<String>,
}
