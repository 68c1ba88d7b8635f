//! The reach graph: which rooms can be entered from which, and under what
//! conditions.
//!
//! Nodes are rooms; a directed edge carries one reach record per link or
//! join direction that connects the pair. All records on one edge must
//! agree on length -- a limitation inherited from the path engine, which
//! weighs edges, not records.

use serde::{Deserialize, Serialize};

use crate::diag::Diagnostics;
use crate::world::{ItemId, ReachId, RoomId, TaskId, World};
use ifm_data::Direction;

/// One way a directed room-to-room move may currently be possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reach {
    pub id: ReachId,
    pub from: RoomId,
    pub to: RoomId,
    /// Commands that perform the move.
    pub cmds: Vec<String>,
    /// Items that must be carried.
    pub need: Vec<ItemId>,
    /// Tasks that, once done, block the move.
    pub before: Vec<TaskId>,
    /// Tasks that must be done before the move.
    pub after: Vec<TaskId>,
    /// Items that must be left behind.
    pub leave: Vec<ItemId>,
    pub leave_all: bool,
    /// Traversal cost.
    pub len: u32,
}

/// A directed edge: all reach records leading to one neighbouring room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub to: RoomId,
    pub records: Vec<ReachId>,
}

/// Directed multigraph over rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachGraph {
    pub reaches: Vec<Reach>,
    adj: Vec<Vec<Edge>>,
}

impl ReachGraph {
    pub fn reach(&self, id: ReachId) -> &Reach {
        &self.reaches[id.0]
    }

    /// Outgoing edges of a room, in insertion order.
    pub fn edges_from(&self, room: RoomId) -> &[Edge] {
        &self.adj[room.0]
    }

    /// Every reach record leaving a room, in insertion order.
    pub fn records_from(&self, room: RoomId) -> impl Iterator<Item = ReachId> + '_ {
        self.adj[room.0]
            .iter()
            .flat_map(|edge| edge.records.iter().copied())
    }

    fn add(&mut self, world: &World, diag: &mut Diagnostics, mut reach: Reach) -> ReachId {
        let id = ReachId(self.reaches.len());
        reach.id = id;

        let pos = {
            let edges = &mut self.adj[reach.from.0];
            edges
                .iter()
                .position(|e| e.to == reach.to)
                .unwrap_or_else(|| {
                    edges.push(Edge {
                        to: reach.to,
                        records: Vec::new(),
                    });
                    edges.len() - 1
                })
        };

        for &other in &self.adj[reach.from.0][pos].records {
            if self.reaches[other.0].len != reach.len {
                diag.error(format!(
                    "links between '{}' and '{}' have differing lengths",
                    world.room(reach.from).desc,
                    world.room(reach.to).desc
                ));
            }
        }

        self.adj[reach.from.0][pos].records.push(id);
        self.reaches.push(reach);
        id
    }
}

/// Default command list for one traversal direction.
///
/// An explicit command wins; otherwise the travel verb, the grid
/// direction, and finally a placeholder.
fn default_cmds(
    explicit: Option<&Vec<String>>,
    copied: Option<&Vec<String>>,
    go: Option<Direction>,
    dir: Option<Direction>,
) -> Vec<String> {
    if let Some(cmds) = explicit {
        return cmds.clone();
    }
    if let Some(cmds) = copied {
        return cmds.clone();
    }
    let name = go
        .map(Direction::short_name)
        .or_else(|| dir.map(Direction::short_name))
        .unwrap_or("?");
    vec![name.to_string()]
}

/// Build the reach graph from the world's links and joins.
pub fn connect(world: &World, diag: &mut Diagnostics) -> ReachGraph {
    let mut graph = ReachGraph {
        reaches: Vec::new(),
        adj: vec![Vec::new(); world.rooms.len()],
    };

    diag.solver(0, "Connecting rooms...");

    for link in &world.links {
        if link.nolink || link.nopath {
            continue;
        }

        let forward = Reach {
            id: ReachId(0),
            from: link.from,
            to: link.to,
            cmds: default_cmds(link.cmd_to.as_ref(), None, link.go, link.to_dir),
            need: link.need.clone(),
            before: link.before.clone(),
            after: link.after.clone(),
            leave: link.leave.clone(),
            leave_all: link.leave_all,
            len: link.cost(),
        };
        trace_connection(world, diag, "link", &forward);
        graph.add(world, diag, forward);

        if !link.oneway {
            let reverse = Reach {
                id: ReachId(0),
                from: link.to,
                to: link.from,
                cmds: default_cmds(
                    link.cmd_from.as_ref(),
                    link.cmd_to.as_ref(),
                    link.go.map(Direction::opposite),
                    link.from_dir,
                ),
                need: link.need.clone(),
                before: link.before.clone(),
                after: link.after.clone(),
                leave: link.leave.clone(),
                leave_all: link.leave_all,
                len: link.cost(),
            };
            trace_connection(world, diag, "link", &reverse);
            graph.add(world, diag, reverse);
        }
    }

    for join in &world.joins {
        if join.nopath {
            continue;
        }

        let forward = Reach {
            id: ReachId(0),
            from: join.from,
            to: join.to,
            cmds: default_cmds(join.cmd_to.as_ref(), None, join.go, None),
            need: join.need.clone(),
            before: join.before.clone(),
            after: join.after.clone(),
            leave: join.leave.clone(),
            leave_all: join.leave_all,
            len: join.cost(),
        };
        trace_connection(world, diag, "join", &forward);
        graph.add(world, diag, forward);

        if !join.oneway {
            let reverse = Reach {
                id: ReachId(0),
                from: join.to,
                to: join.from,
                cmds: default_cmds(
                    join.cmd_from.as_ref(),
                    join.cmd_to.as_ref(),
                    join.go.map(Direction::opposite),
                    None,
                ),
                need: join.need.clone(),
                before: join.before.clone(),
                after: join.after.clone(),
                leave: join.leave.clone(),
                leave_all: join.leave_all,
                len: join.cost(),
            };
            trace_connection(world, diag, "join", &reverse);
            graph.add(world, diag, reverse);
        }
    }

    graph
}

fn trace_connection(world: &World, diag: &mut Diagnostics, kind: &str, reach: &Reach) {
    if !diag.solver_verbose() {
        return;
    }
    let mut line = format!(
        "{kind} '{}' to '{}' ({})",
        world.room(reach.from).desc,
        world.room(reach.to).desc,
        reach.cmds.join(". ")
    );
    if reach.len > 1 {
        line.push_str(&format!(" (dist {})", reach.len));
    }
    diag.solver(1, line);
}
