//! Planner steps: the atoms a walkthrough is made of.
//!
//! Steps live in one arena and refer to each other by index, which keeps
//! the precedence graph (ALLOW/DEPEND), follow-chains and the step list
//! free of reference cycles. A step is created once and mutated only
//! through the solver.

use serde::{Deserialize, Serialize};

use crate::world::{ItemId, ReachId, RoomId, TaskId};

/// Index of a step in the planner's arena, in creation order. Creation
/// order doubles as the tie-breaker when sorting by distance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);

/// What kind of work a step is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Walk into a room.
    Move(RoomId),
    /// Pick an item up.
    Get(ItemId),
    /// Put an item down.
    Drop(ItemId),
    /// Visit a room for its own sake.
    Goto(RoomId),
    /// Perform a declared task.
    User(TaskId),
}

/// One unit of planner work.
///
/// User steps carry mutable copies of their task's attribute lists: the
/// solver rewrites them (drop-all inversion, command suppression for
/// triggered tasks) without touching the declared world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    pub desc: String,
    /// Where the step happens; `None` means wherever the player is.
    pub room: Option<RoomId>,
    pub score: u32,
    pub cmds: Option<Vec<String>>,
    pub notes: Vec<String>,
    /// User-asserted safety; trumps any unsafe marking.
    pub safe: bool,
    pub finish: bool,
    pub ignore: bool,
    /// Why doing this step closes something off, when it does.
    pub unsafe_reason: Option<String>,
    /// Executing this step can change which paths are admissible, so it
    /// must never be silently filtered as redundant.
    pub affects_paths: bool,
    /// Next step in this step's follow-chain.
    pub next: Option<StepId>,
    /// Previous step in this step's follow-chain.
    pub prev: Option<StepId>,
    /// Steps this one unblocks; mirror of `depend`.
    pub allow: Vec<StepId>,
    /// Steps that must be done before this one.
    pub depend: Vec<StepId>,

    // Task payload, copied so the solver may rewrite it.
    pub need: Vec<ItemId>,
    pub get: Vec<ItemId>,
    pub give: Vec<ItemId>,
    pub lose: Vec<ItemId>,
    pub drop: Vec<ItemId>,
    pub drop_until: Vec<TaskId>,
    pub drop_room: Option<RoomId>,
    pub do_tasks: Vec<TaskId>,
    pub goto: Option<RoomId>,

    // Live solver state.
    pub done: bool,
    pub ignored: bool,
    /// Member of the active step list.
    pub in_list: bool,
    /// Optional steps never count as work left to do.
    pub optional: bool,
    /// This step's path queries must avoid leaving its needed items.
    pub block: bool,
    /// Route kept from the admissibility-restricted query.
    pub stored_path: Option<Vec<ReachId>>,
    /// Sort key: twice the distance, plus one for GET steps.
    pub sort: i64,
    /// Distance from the player at the last path update.
    pub dist: i64,
}

impl Step {
    pub fn new(id: StepId, kind: StepKind, desc: String) -> Self {
        Self {
            id,
            kind,
            desc,
            room: None,
            score: 0,
            cmds: None,
            notes: Vec::new(),
            safe: false,
            finish: false,
            ignore: false,
            unsafe_reason: None,
            affects_paths: false,
            next: None,
            prev: None,
            allow: Vec::new(),
            depend: Vec::new(),
            need: Vec::new(),
            get: Vec::new(),
            give: Vec::new(),
            lose: Vec::new(),
            drop: Vec::new(),
            drop_until: Vec::new(),
            drop_room: None,
            do_tasks: Vec::new(),
            goto: None,
            done: false,
            ignored: false,
            in_list: false,
            optional: false,
            block: false,
            stored_path: None,
            sort: 0,
            dist: 0,
        }
    }
}
