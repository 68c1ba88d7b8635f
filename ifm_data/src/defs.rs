//! Declaration structures handed to the engine by a parser.
//!
//! Every cross-reference here is a symbolic tag string; the engine's loader
//! resolves tags into arena ids and reports the ones that don't exist.
//! All structs default to the "nothing declared" state so parsers (and
//! tests) only fill in what a declaration actually says.

use crate::direction::Direction;
use serde::{Deserialize, Serialize};

use crate::vars::Vars;

/// Symbolic tag naming another declared object.
pub type Tag = String;

/// A complete parsed world: the five object kinds plus variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldDef {
    /// Map title.
    #[serde(default)]
    pub title: Option<String>,
    /// Titles assigned to map sections, in section order.
    #[serde(default)]
    pub section_titles: Vec<String>,
    #[serde(default)]
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
    #[serde(default)]
    pub joins: Vec<JoinDef>,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
    #[serde(default)]
    pub vars: Vars,
}

/// One declared room.
///
/// A room declared with a `dir` list is placed relative to `near` (the
/// previously declared room when `near` is omitted) and implies a link from
/// that room; the `link_*` fields and travel attributes describe that
/// implicit link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomDef {
    #[serde(default)]
    pub tag: Option<Tag>,
    pub desc: String,
    /// Placement directions from the `near` room.
    #[serde(default)]
    pub dir: Vec<Direction>,
    /// Room this one is placed relative to.
    #[serde(default)]
    pub near: Option<Tag>,
    /// Travel verb for the implicit link (up/down/in/out).
    #[serde(default)]
    pub go: Option<Direction>,
    #[serde(default)]
    pub oneway: bool,
    /// Implicit link is not drawn on the map.
    #[serde(default)]
    pub nolink: bool,
    /// Implicit link is not usable by the solver.
    #[serde(default)]
    pub nopath: bool,
    /// Implicit link cost.
    #[serde(default)]
    pub len: Option<u32>,
    /// Commands to traverse the implicit link, forwards and backwards.
    #[serde(default)]
    pub cmd_to: Option<Vec<String>>,
    #[serde(default)]
    pub cmd_from: Option<Vec<String>>,
    #[serde(default)]
    pub link_need: Vec<Tag>,
    #[serde(default)]
    pub link_before: Vec<Tag>,
    #[serde(default)]
    pub link_after: Vec<Tag>,
    #[serde(default)]
    pub link_leave: Vec<Tag>,
    #[serde(default)]
    pub link_leave_all: bool,
    /// Declared exit stubs with no target room.
    #[serde(default)]
    pub exits: Vec<Direction>,
    /// Items required to enter.
    #[serde(default)]
    pub need: Vec<Tag>,
    /// Tasks that must not yet be done on entry.
    #[serde(default)]
    pub before: Vec<Tag>,
    /// Tasks that must already be done on entry.
    #[serde(default)]
    pub after: Vec<Tag>,
    /// Items that must be left behind before entering.
    #[serde(default)]
    pub leave: Vec<Tag>,
    #[serde(default)]
    pub leave_all: bool,
    /// The solver will not drop unneeded items here.
    #[serde(default)]
    pub nodrop: bool,
    #[serde(default)]
    pub score: u32,
    /// Marks the starting room.
    #[serde(default)]
    pub start: bool,
    /// Entering this room finishes the game.
    #[serde(default)]
    pub finish: bool,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}

/// One declared item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDef {
    #[serde(default)]
    pub tag: Option<Tag>,
    pub desc: String,
    /// Starting room; `None` means carried from the outset.
    #[serde(default)]
    pub in_room: Option<Tag>,
    #[serde(default)]
    pub score: u32,
    /// Picking this up finishes the game.
    #[serde(default)]
    pub finish: bool,
    /// Not shown in the item table.
    #[serde(default)]
    pub hidden: bool,
    /// Obtained via a task, so the walkthrough never prints a GET line.
    #[serde(default)]
    pub given: bool,
    /// Removed by a task, so the walkthrough never prints a DROP line.
    #[serde(default)]
    pub lost: bool,
    #[serde(default)]
    pub ignore: bool,
    /// Never dropped as unneeded.
    #[serde(default)]
    pub keep: bool,
    /// Kept while any of these items is still held.
    #[serde(default)]
    pub keep_with: Vec<Tag>,
    /// Kept until all of these tasks are done.
    #[serde(default)]
    pub keep_until: Vec<Tag>,
    /// Items required before picking this up.
    #[serde(default)]
    pub need: Vec<Tag>,
    #[serde(default)]
    pub before: Vec<Tag>,
    #[serde(default)]
    pub after: Vec<Tag>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}

/// One declared link between two rooms in the same map section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkDef {
    #[serde(default)]
    pub tag: Option<Tag>,
    pub from: Tag,
    pub to: Tag,
    /// Grid directions traced from `from` towards `to`.
    #[serde(default)]
    pub dir: Vec<Direction>,
    #[serde(default)]
    pub go: Option<Direction>,
    #[serde(default)]
    pub oneway: bool,
    /// Placed but drawn without a path.
    #[serde(default)]
    pub hidden: bool,
    /// Excluded from the map grid entirely.
    #[serde(default)]
    pub nolink: bool,
    /// Excluded from the reach graph.
    #[serde(default)]
    pub nopath: bool,
    #[serde(default)]
    pub len: Option<u32>,
    #[serde(default)]
    pub cmd_to: Option<Vec<String>>,
    #[serde(default)]
    pub cmd_from: Option<Vec<String>>,
    #[serde(default)]
    pub need: Vec<Tag>,
    #[serde(default)]
    pub before: Vec<Tag>,
    #[serde(default)]
    pub after: Vec<Tag>,
    #[serde(default)]
    pub leave: Vec<Tag>,
    #[serde(default)]
    pub leave_all: bool,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}

/// One declared join: a connection between rooms with no grid path,
/// possibly across map sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinDef {
    #[serde(default)]
    pub tag: Option<Tag>,
    pub from: Tag,
    pub to: Tag,
    #[serde(default)]
    pub go: Option<Direction>,
    #[serde(default)]
    pub oneway: bool,
    /// Not marked on the map.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub nopath: bool,
    #[serde(default)]
    pub len: Option<u32>,
    #[serde(default)]
    pub cmd_to: Option<Vec<String>>,
    #[serde(default)]
    pub cmd_from: Option<Vec<String>>,
    #[serde(default)]
    pub need: Vec<Tag>,
    #[serde(default)]
    pub before: Vec<Tag>,
    #[serde(default)]
    pub after: Vec<Tag>,
    #[serde(default)]
    pub leave: Vec<Tag>,
    #[serde(default)]
    pub leave_all: bool,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}

/// One declared player task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDef {
    #[serde(default)]
    pub tag: Option<Tag>,
    pub desc: String,
    /// Room the task happens in; `None` means anywhere.
    #[serde(default)]
    pub in_room: Option<Tag>,
    /// Commands to perform the task. `None` prints the description;
    /// `Some(vec![])` is an explicit no-action task.
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    #[serde(default)]
    pub score: u32,
    /// Doing this task finishes the game.
    #[serde(default)]
    pub finish: bool,
    /// User assertion that the task never closes anything off.
    #[serde(default)]
    pub safe: bool,
    #[serde(default)]
    pub ignore: bool,
    /// Tasks that must be done first.
    #[serde(default)]
    pub after: Vec<Tag>,
    /// Items that must be carried.
    #[serde(default)]
    pub need: Vec<Tag>,
    /// Items picked up from the task room by doing the task.
    #[serde(default)]
    pub get: Vec<Tag>,
    /// Items obtained out of thin air by doing the task.
    #[serde(default)]
    pub give: Vec<Tag>,
    /// Items destroyed by doing the task.
    #[serde(default)]
    pub lose: Vec<Tag>,
    /// Items dropped when the task is done.
    #[serde(default)]
    pub drop: Vec<Tag>,
    /// Drop everything carried except the `drop` list.
    #[serde(default)]
    pub drop_all: bool,
    /// Tasks that must be done before dropped items may be recovered.
    #[serde(default)]
    pub drop_until: Vec<Tag>,
    /// Where dropped items end up (default: where the task is done).
    #[serde(default)]
    pub drop_room: Option<Tag>,
    /// Other tasks performed as a side effect, recursively.
    #[serde(default, rename = "do")]
    pub do_tasks: Vec<Tag>,
    /// Room the player is teleported to afterwards.
    #[serde(default)]
    pub goto: Option<Tag>,
    /// Task this one must immediately follow.
    #[serde(default)]
    pub follow: Option<Tag>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}
