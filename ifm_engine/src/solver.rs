//! The task planner: step setup, cycle checking and the solve loop.
//!
//! Setup turns every declared relationship into precedence edges on a step
//! arena. The solve loop then repeatedly picks the nearest feasible step
//! that doesn't close anything off, walks there, performs it, and keeps
//! going until the game is finished, nothing is left, or it is provably
//! stuck.
//!
//! The path cache's generation counter is bumped on every mutation that
//! can change admissibility -- an item changing hands, a step being done
//! or ignored -- so distance queries are never served from a stale sweep.

use textwrap::fill;

use crate::diag::{Diagnostics, WorldError};
use crate::output::{PlayStep, Walkthrough};
use crate::path::{PathEngine, PathView};
use crate::reach::ReachGraph;
use crate::step::{Step, StepId, StepKind};
use crate::world::{ItemId, ReachId, RoomId, TaskId, World};

/// Stand-in distance for unreachable step rooms.
const BIG: i64 = 1000;

/// Planner annotations per item, fixed once setup has run.
#[derive(Debug, Clone, Default)]
struct ItemMeta {
    /// Referenced by some need list somewhere.
    used: bool,
    /// Needed to move around: required by a room or reach record.
    needed: bool,
    /// Some room or reach record may force leaving it behind.
    leavable: bool,
    /// Steps that need this item in hand.
    tasks: Vec<StepId>,
    /// Rooms that need this item to enter.
    nrooms: Vec<RoomId>,
    /// Reach records that need this item.
    nlinks: Vec<ReachId>,
}

/// Live player/world state during one solve.
#[derive(Debug, Clone)]
struct SolveState {
    taken: Vec<bool>,
    ever_taken: Vec<bool>,
    item_room: Vec<Option<RoomId>>,
    item_block: Vec<Option<StepId>>,
    task_done: Vec<bool>,
    room_visited: Vec<bool>,
}

/// Execution context threaded through the solve loop.
struct Ctx<'a> {
    world: &'a World,
    graph: &'a ReachGraph,
    engine: PathEngine,
    location: Option<RoomId>,
    /// Executed steps, in order.
    order: Vec<StepId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Status {
    Invalid,
    Ignored,
    Safe,
    Unsafe,
}

/// The step arena plus everything needed to solve the game once.
pub struct Plan {
    steps: Vec<Step>,
    /// Active steps, kept sorted by (sort key, id).
    list: Vec<StepId>,
    meta: Vec<ItemMeta>,
    state: SolveState,
    item_step: Vec<StepId>,
    task_step: Vec<StepId>,
}

fn make_view<'s>(
    plan: &'s Plan,
    world: &'s World,
    graph: &'s ReachGraph,
    path_step: Option<StepId>,
) -> PathView<'s> {
    PathView {
        world,
        graph,
        taken: &plan.state.taken,
        task_done: &plan.state.task_done,
        item_block: &plan.state.item_block,
        path_step,
    }
}

impl Plan {
    /// Run planner setup: create steps and translate every declared list
    /// into precedence edges and step annotations.
    ///
    /// # Errors
    /// Returns [`WorldError::TooManyErrors`] past the diagnostics threshold.
    pub fn build(
        world: &World,
        graph: &ReachGraph,
        diag: &mut Diagnostics,
    ) -> Result<Plan, WorldError> {
        diag.solver(0, "Setting up tasks...");

        let mut plan = Plan {
            steps: Vec::new(),
            list: Vec::new(),
            meta: vec![ItemMeta::default(); world.items.len()],
            state: SolveState {
                taken: vec![false; world.items.len()],
                ever_taken: vec![false; world.items.len()],
                item_room: world.items.iter().map(|i| i.start_room).collect(),
                item_block: vec![None; world.items.len()],
                task_done: vec![false; world.tasks.len()],
                room_visited: vec![false; world.rooms.len()],
            },
            item_step: Vec::with_capacity(world.items.len()),
            task_step: Vec::with_capacity(world.tasks.len()),
        };

        // One step per room, item and task. Rooms and items only join the
        // active list when they are worth visiting for their own sake.
        for room in &world.rooms {
            let step = plan.new_step(world, StepKind::Goto(room.id));
            if room.score > 0 || room.finish {
                plan.add_task(step);
            }
        }
        for item in &world.items {
            let step = plan.new_step(world, StepKind::Get(item.id));
            plan.item_step.push(step);
            if item.score > 0 || item.finish {
                plan.add_task(step);
            }
        }
        for task in &world.tasks {
            let step = plan.new_step(world, StepKind::User(task.id));
            plan.task_step.push(step);
            plan.add_task(step);
        }

        diag.solver(1, "Adding dependencies for task 'follow' entries");
        for task in &world.tasks {
            let Some(anchor) = task.follow else { continue };
            let astep = plan.task_step[anchor.0];
            let tstep = plan.task_step[task.id.0];
            if let Some(already) = plan.steps[astep.0].next
                && already != tstep
            {
                diag.error(format!(
                    "more than one task needs to follow '{}' immediately",
                    world.task(anchor).desc
                ));
            }
            plan.order_tasks(diag, astep, tstep);
            plan.steps[astep.0].next = Some(tstep);
            plan.steps[tstep.0].prev = Some(astep);
        }

        // Rooms and their outgoing reach records.
        for room in &world.rooms {
            for &t in &room.before {
                let s = plan.task_step[t.0];
                plan.steps[s.0].affects_paths = true;
                plan.steps[s.0].unsafe_reason = Some("closes off room".to_string());
            }
            for &t in &room.after {
                let s = plan.task_step[t.0];
                plan.steps[s.0].affects_paths = true;
                plan.add_task(s);
            }
            for &i in &room.leave {
                plan.meta[i.0].leavable = true;
                let s = plan.item_step[i.0];
                plan.steps[s.0].affects_paths = true;
            }
            for &i in &room.need {
                plan.meta[i.0].used = true;
                plan.meta[i.0].needed = true;
                if plan.state.item_room[i.0].is_some() {
                    let s = plan.item_step[i.0];
                    plan.steps[s.0].affects_paths = true;
                    plan.add_task(s);
                    plan.meta[i.0].nrooms.push(room.id);
                }
            }

            let records: Vec<ReachId> = graph.records_from(room.id).collect();
            for rec in records {
                let reach = graph.reach(rec);
                for &i in &reach.leave {
                    plan.meta[i.0].leavable = true;
                    let s = plan.item_step[i.0];
                    plan.steps[s.0].affects_paths = true;
                }
                for &t in &reach.before {
                    let s = plan.task_step[t.0];
                    plan.steps[s.0].affects_paths = true;
                    plan.steps[s.0].unsafe_reason = Some("closes off link".to_string());
                }
                for &t in &reach.after {
                    let s = plan.task_step[t.0];
                    plan.steps[s.0].affects_paths = true;
                    plan.add_task(s);
                }
                for &i in &reach.need {
                    plan.meta[i.0].used = true;
                    plan.meta[i.0].needed = true;
                    let s = plan.item_step[i.0];
                    plan.steps[s.0].affects_paths = true;
                    plan.add_task(s);
                    plan.meta[i.0].nlinks.push(rec);
                }
            }
        }

        diag.solver(1, "Adding dependencies for item 'before/after' lists");
        for item in &world.items {
            let istep = plan.item_step[item.id.0];

            if plan.state.item_room[item.id.0].is_none() {
                plan.state.taken[item.id.0] = true;
                plan.state.ever_taken[item.id.0] = true;
            }

            for &oi in &item.need {
                plan.meta[oi.0].used = true;
                if plan.state.item_room[oi.0].is_some() {
                    let get = plan.item_step[oi.0];
                    plan.order_tasks(diag, get, istep);
                }
                plan.meta[oi.0].tasks.push(istep);
            }
            for &t in &item.after {
                let s = plan.task_step[t.0];
                plan.order_tasks(diag, s, istep);
            }
            for &t in &item.before {
                let s = plan.task_step[t.0];
                plan.order_tasks(diag, istep, s);
            }
        }

        diag.solver(1, "Adding dependencies for task 'need/get/give/after' lists");
        for task in &world.tasks {
            let tstep = plan.task_step[task.id.0];
            let first = plan.first_in_chain(tstep);

            for &i in &task.need {
                plan.meta[i.0].used = true;
                if plan.state.item_room[i.0].is_some() {
                    let get = plan.item_step[i.0];
                    plan.order_tasks(diag, get, tstep);
                }
                plan.meta[i.0].tasks.push(first);
            }
            for &i in &task.get {
                if plan.state.item_room[i.0].is_some() {
                    let get = plan.item_step[i.0];
                    plan.order_tasks(diag, tstep, get);
                }
            }
            for &i in &task.give {
                if plan.state.item_room[i.0].is_some() {
                    let get = plan.item_step[i.0];
                    plan.order_tasks(diag, tstep, get);
                }
            }
            for &t in &task.after {
                let s = plan.task_step[t.0];
                plan.order_tasks(diag, s, tstep);
            }
        }

        diag.solver(1, "Adding dependencies for task 'lose' lists");
        for task in &world.tasks {
            let tstep = plan.task_step[task.id.0];
            for i in plan.steps[tstep.0].lose.clone() {
                for s in plan.meta[i.0].tasks.clone() {
                    plan.order_tasks(diag, s, tstep);
                }
                if plan.meta[i.0].needed {
                    plan.steps[tstep.0].unsafe_reason =
                        Some("loses item needed for paths".to_string());
                }
            }
        }

        // An unsafe step taints every predecessor in its follow-chain:
        // starting the chain commits the player to finishing it.
        for task in &world.tasks {
            let tstep = plan.task_step[task.id.0];
            if plan.steps[tstep.0].prev.is_none()
                || plan.steps[tstep.0].unsafe_reason.is_none()
                || plan.steps[tstep.0].safe
            {
                continue;
            }
            let msg = plan.steps[tstep.0]
                .unsafe_reason
                .clone()
                .unwrap_or_default();
            let mut cur = plan.steps[tstep.0].prev;
            while let Some(s) = cur {
                plan.steps[s.0].unsafe_reason = Some(msg.clone());
                cur = plan.steps[s.0].prev;
            }
        }

        // Triggering an unsafe task is itself unsafe, transitively.
        loop {
            let mut flagged = false;
            for task in &world.tasks {
                let tstep = plan.task_step[task.id.0];
                if plan.steps[tstep.0].unsafe_reason.is_some() {
                    continue;
                }
                let triggers = plan.steps[tstep.0].do_tasks.clone();
                if triggers.is_empty() {
                    continue;
                }
                for t in triggers {
                    let other = plan.task_step[t.0];
                    if plan.steps[other.0].unsafe_reason.is_some() {
                        plan.steps[tstep.0].unsafe_reason =
                            Some("does unsafe task".to_string());
                        flagged = true;
                        break;
                    }
                }
            }
            if !flagged {
                break;
            }
        }

        diag.checkpoint()?;
        Ok(plan)
    }

    /// Create one step, copying the data object's attributes the way each
    /// kind needs them.
    fn new_step(&mut self, world: &World, kind: StepKind) -> StepId {
        let id = StepId(self.steps.len());
        let mut step = match kind {
            StepKind::Move(room) => {
                let r = world.room(room);
                let mut s = Step::new(id, kind, format!("Move to {}", r.desc));
                s.room = Some(room);
                s.score = r.score;
                s.finish = r.finish;
                s.notes = r.notes.clone();
                s
            }
            StepKind::Goto(room) => {
                let r = world.room(room);
                let mut s = Step::new(id, kind, format!("Go to {}", r.desc));
                s.room = Some(room);
                s.score = r.score;
                s.finish = r.finish;
                s.notes = r.notes.clone();
                s
            }
            StepKind::Get(item) => {
                let i = world.item(item);
                let mut s = Step::new(id, kind, format!("Get {}", i.desc));
                s.room = self.state.item_room[item.0];
                s.score = i.score;
                s.finish = i.finish;
                s.ignore = i.ignore;
                s.notes = i.notes.clone();
                s
            }
            StepKind::Drop(item) => {
                let i = world.item(item);
                let mut s = Step::new(id, kind, format!("Drop {}", i.desc));
                s.finish = i.finish;
                s.ignore = i.ignore;
                s
            }
            StepKind::User(task) => {
                let t = world.task(task);
                let mut s = Step::new(id, kind, t.desc.clone());
                s.room = t.room;
                s.score = t.score;
                s.finish = t.finish;
                s.safe = t.safe;
                s.ignore = t.ignore;
                s.notes = t.notes.clone();
                s.cmds = t.cmds.clone();
                s.need = t.need.clone();
                s.get = t.get.clone();
                s.give = t.give.clone();
                s.lose = t.lose.clone();
                s.drop = if t.drop_all {
                    // Drop-all means everything carried except the list.
                    world
                        .item_ids()
                        .filter(|i| !t.drop.contains(i))
                        .collect()
                } else {
                    t.drop.clone()
                };
                s.drop_until = t.drop_until.clone();
                s.drop_room = t.drop_room;
                s.do_tasks = t.do_tasks.clone();
                s.goto = t.goto;
                s
            }
        };
        step.id = id;
        self.steps.push(step);
        id
    }

    /// Put a step on the active list, once.
    fn add_task(&mut self, step: StepId) {
        if !self.steps[step.0].in_list {
            self.steps[step.0].in_list = true;
            self.list.push(step);
        }
    }

    /// Record that `before` must be done before `after` -- and before
    /// every earlier step of `after`'s follow-chain, since starting the
    /// chain commits to all of it.
    fn order_tasks(&mut self, diag: &mut Diagnostics, before: StepId, after: StepId) {
        self.add_task(before);
        self.add_task(after);
        if before == after {
            return;
        }

        let mut cur = Some(after);
        let mut passes = 0;
        while let Some(step) = cur {
            if step != before {
                self.steps[before.0].allow.push(step);
                self.steps[step.0].depend.push(before);
                diag.solver(
                    2,
                    format!(
                        "task order: do '{}' before '{}'",
                        self.steps[before.0].desc, self.steps[step.0].desc
                    ),
                );
            }
            if step == after {
                passes += 1;
                if passes > 1 {
                    break;
                }
            }
            cur = self.steps[step.0].prev;
        }
    }

    fn first_in_chain(&self, step: StepId) -> StepId {
        let mut first = step;
        while let Some(prev) = self.steps[first.0].prev {
            first = prev;
        }
        first
    }

    /// First unmet dependency of a step, if any.
    fn require_step(&self, step: StepId) -> Option<StepId> {
        self.steps[step.0]
            .depend
            .iter()
            .copied()
            .find(|d| !self.steps[d.0].done)
    }

    /// Verify the precedence graph is acyclic; on failure, enumerate every
    /// cycle by step descriptions and fail the run.
    ///
    /// # Errors
    /// Returns [`WorldError::CyclicTasks`] when any dependency cycle exists.
    pub fn check_cycles(&self, diag: &mut Diagnostics) -> Result<(), WorldError> {
        if self.list.is_empty() {
            return Ok(());
        }

        let mut indeg: Vec<usize> = self.steps.iter().map(|s| s.depend.len()).collect();
        let mut queue: Vec<StepId> = self
            .list
            .iter()
            .copied()
            .filter(|s| indeg[s.0] == 0)
            .collect();
        let mut processed = 0;
        let mut head = 0;
        while head < queue.len() {
            let step = queue[head];
            head += 1;
            processed += 1;
            for &next in &self.steps[step.0].allow {
                indeg[next.0] -= 1;
                if indeg[next.0] == 0 {
                    queue.push(next);
                }
            }
        }
        if processed == self.list.len() {
            return Ok(());
        }

        // The leftovers are exactly the steps on cycles.
        let stuck: Vec<StepId> = self
            .list
            .iter()
            .copied()
            .filter(|s| indeg[s.0] > 0)
            .collect();
        let cycles = self.cycle_chains(&stuck);

        let mut body = String::new();
        for chain in &cycles {
            body.push_str("   cycle:\n");
            let line = chain
                .iter()
                .map(|s| self.steps[s.0].desc.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            for wrapped in fill(&line, 65).lines() {
                body.push_str("      ");
                body.push_str(wrapped);
                body.push('\n');
            }
        }

        let count = cycles.len();
        let message = format!(
            "can't solve game ({count} cyclic task dependenc{})\n{body}",
            if count == 1 { "y" } else { "ies" }
        );
        diag.error(message.clone());
        Err(WorldError::CyclicTasks { count, message })
    }

    /// Group the stuck steps into strongly connected components and order
    /// each one as a followable chain.
    fn cycle_chains(&self, stuck: &[StepId]) -> Vec<Vec<StepId>> {
        let in_stuck = |s: StepId| stuck.contains(&s);

        // Tarjan's algorithm, iterative to keep the stack shallow.
        let mut index_of: std::collections::HashMap<StepId, usize> = Default::default();
        let mut lowlink: std::collections::HashMap<StepId, usize> = Default::default();
        let mut on_stack: std::collections::HashSet<StepId> = Default::default();
        let mut stack: Vec<StepId> = Vec::new();
        let mut counter = 0;
        let mut sccs: Vec<Vec<StepId>> = Vec::new();

        for &root in stuck {
            if index_of.contains_key(&root) {
                continue;
            }
            let mut work: Vec<(StepId, usize)> = vec![(root, 0)];
            while let Some((v, edge)) = work.last().copied() {
                if !index_of.contains_key(&v) {
                    index_of.insert(v, counter);
                    lowlink.insert(v, counter);
                    counter += 1;
                    stack.push(v);
                    on_stack.insert(v);
                }
                let succs: Vec<StepId> = self.steps[v.0]
                    .allow
                    .iter()
                    .copied()
                    .filter(|&s| in_stuck(s))
                    .collect();
                if edge < succs.len() {
                    if let Some(top) = work.last_mut() {
                        top.1 += 1;
                    }
                    let w = succs[edge];
                    if !index_of.contains_key(&w) {
                        work.push((w, 0));
                    } else if on_stack.contains(&w) {
                        let low = lowlink[&v].min(index_of[&w]);
                        lowlink.insert(v, low);
                    }
                } else {
                    work.pop();
                    if let Some(&(parent, _)) = work.last() {
                        let low = lowlink[&parent].min(lowlink[&v]);
                        lowlink.insert(parent, low);
                    }
                    if lowlink[&v] == index_of[&v] {
                        let mut scc = Vec::new();
                        while let Some(w) = stack.pop() {
                            on_stack.remove(&w);
                            scc.push(w);
                            if w == v {
                                break;
                            }
                        }
                        if scc.len() > 1 {
                            scc.sort();
                            sccs.push(scc);
                        }
                    }
                }
            }
        }

        sccs.sort_by_key(|scc| scc[0]);

        // Order each component as a chain by walking allow edges.
        sccs.into_iter()
            .map(|scc| {
                let mut chain = vec![scc[0]];
                let mut seen: std::collections::HashSet<StepId> = scc.iter().copied().collect();
                seen.remove(&scc[0]);
                let mut cur = scc[0];
                while let Some(&next) = self.steps[cur.0]
                    .allow
                    .iter()
                    .find(|s| seen.contains(*s))
                {
                    seen.remove(&next);
                    chain.push(next);
                    cur = next;
                }
                // Anything unreachable by a simple walk still belongs to
                // the cycle; append it in id order.
                let mut rest: Vec<StepId> = seen.into_iter().collect();
                rest.sort();
                chain.extend(rest);
                chain
            })
            .collect()
    }

    /// Rooms and reach records that require an item to enter or traverse.
    /// Diagnostics surface, filled in during setup.
    pub fn item_requirers(&self, item: ItemId) -> (&[RoomId], &[ReachId]) {
        let meta = &self.meta[item.0];
        (&meta.nrooms, &meta.nlinks)
    }

    /// Whether the planner still wants this item in hand: needed for
    /// movement, kept outright, kept with a held item, kept until an
    /// unfinished task, or needed by an undone step.
    fn want_item(&self, world: &World, item: ItemId) -> bool {
        if self.meta[item.0].needed {
            return true;
        }
        let decl = world.item(item);
        if decl.keep {
            return true;
        }
        if decl
            .keep_with
            .iter()
            .any(|&k| !self.state.ever_taken[k.0] || self.state.taken[k.0])
        {
            return true;
        }
        if decl
            .keep_until
            .iter()
            .any(|&t| !self.steps[self.task_step[t.0].0].done)
        {
            return true;
        }
        self.meta[item.0]
            .tasks
            .iter()
            .any(|&s| !self.steps[s.0].done)
    }

    /// Solve the game, consuming the plan: a plan may only run once, so a
    /// rerun always starts from freshly built state.
    ///
    /// # Errors
    /// Returns [`WorldError::StepLimit`] when the iteration budget runs out.
    pub fn solve(
        mut self,
        world: &World,
        graph: &ReachGraph,
        diag: &mut Diagnostics,
    ) -> Result<Walkthrough, WorldError> {
        if self.list.is_empty() {
            return Ok(Walkthrough::default());
        }

        let all_tasks_safe = world.vars.all_tasks_safe;
        let keep_unused = world.vars.keep_unused_items;
        let limit = world.vars.solver_step_limit;

        // Anything without a starting room is carried from the outset.
        for i in 0..self.state.item_room.len() {
            if self.state.item_room[i].is_none() {
                self.state.taken[i] = true;
                self.state.ever_taken[i] = true;
            }
        }

        let mut ctx = Ctx {
            world,
            graph,
            engine: PathEngine::new(),
            location: world.start,
            order: Vec::new(),
        };
        let mut next: Option<StepId> = None;
        let mut ignored_count = 0usize;
        let mut iterations = 0u32;

        diag.solver(0, "Solving game...");

        loop {
            iterations += 1;
            if iterations > limit {
                let _ = diag.fatal(format!(
                    "can't solve game (stopped after {limit} solver iterations)"
                ));
                return Err(WorldError::StepLimit { limit });
            }

            diag.solver(
                1,
                format!(
                    "Location: {}",
                    ctx.location
                        .map_or("nowhere", |r| world.room(r).desc.as_str())
                ),
            );

            if let Some(loc) = ctx.location {
                self.init_path(&mut ctx, diag, loc);
            }

            // Drop whatever is no longer wanted, unless mid follow-chain
            // or standing somewhere dropping is forbidden.
            if next.is_none() && ctx.location.is_none_or(|l| !world.room(l).nodrop) {
                loop {
                    let mut count = 0;
                    for item in world.item_ids() {
                        if !self.state.taken[item.0] {
                            continue;
                        }
                        if keep_unused && !self.meta[item.0].used {
                            continue;
                        }
                        if self.want_item(world, item) {
                            continue;
                        }
                        let step = self.new_step(world, StepKind::Drop(item));
                        self.do_step(&mut ctx, diag, step, true, false);
                        count += 1;
                    }
                    if count == 0 {
                        break;
                    }
                }
            }

            // Scan for the next step: the first safe one wins outright,
            // the nearest unsafe one is the fallback.
            let mut chosen: Option<StepId> = None;
            let mut tasksleft = false;

            for idx in 0..self.list.len() {
                let try_step = self.list[idx];
                if self.steps[try_step.0].done {
                    continue;
                }
                if !self.steps[try_step.0].optional {
                    tasksleft = true;
                }
                if let Some(forced) = next
                    && try_step != forced
                {
                    continue;
                }
                match self.task_status(&mut ctx, diag, try_step) {
                    Status::Invalid => continue,
                    Status::Ignored => {
                        ignored_count += 1;
                        continue;
                    }
                    Status::Safe => {
                        chosen = Some(try_step);
                        break;
                    }
                    Status::Unsafe => {
                        if all_tasks_safe {
                            chosen = Some(try_step);
                            break;
                        }
                        if chosen.is_none() {
                            chosen = Some(try_step);
                        }
                    }
                }
            }

            if let Some(step) = chosen {
                self.goto_room(&mut ctx, diag, step);
                tasksleft = self.do_step(&mut ctx, diag, step, true, false);
                next = self.steps[step.0].next;
            } else if tasksleft {
                self.warn_failure(&ctx, diag);
                if ignored_count > 0 {
                    diag.solver(2, format!("{ignored_count} ignored tasks"));
                }
                break;
            } else {
                diag.solver(2, "no more tasks");
            }

            if !tasksleft {
                break;
            }
        }

        let steps = ctx
            .order
            .iter()
            .map(|&sid| {
                let s = &self.steps[sid.0];
                PlayStep {
                    kind: s.kind,
                    desc: s.desc.clone(),
                    cmds: s.cmds.clone().unwrap_or_default(),
                    room: s.room,
                    score: s.score,
                    notes: s.notes.clone(),
                }
            })
            .collect();

        Ok(Walkthrough {
            steps,
            ..Walkthrough::default()
        }
        .tally())
    }

    /// Refresh distances and sort order from the current location, unless
    /// the cache already covers it.
    fn init_path(&mut self, ctx: &mut Ctx<'_>, diag: &mut Diagnostics, loc: RoomId) {
        if ctx.engine.cache_valid(loc) {
            return;
        }

        for step in &mut self.steps {
            step.block = false;
        }

        // Steps whose needed items might have to be left behind get their
        // own restricted path query.
        for idx in 0..self.list.len() {
            let sid = self.list[idx];
            if self.steps[sid.0].done || self.steps[sid.0].need.is_empty() {
                continue;
            }
            let Some(taskroom) = self.steps[sid.0].room else {
                continue;
            };

            let mut blockable = None;
            for i in self.steps[sid.0].need.clone() {
                if !self.state.taken[i.0] || !self.meta[i.0].leavable {
                    continue;
                }
                self.state.item_block[i.0] = Some(sid);
                blockable = Some(i);
            }

            if let Some(item) = blockable {
                self.steps[sid.0].block = true;
                diag.solver(2, format!("update path: {}", self.steps[sid.0].desc));
                diag.solver(
                    2,
                    format!(
                        "possible block: {} may need dropping",
                        ctx.world.item(item).desc
                    ),
                );
                let len = self.find_path(ctx, Some(sid), loc, taskroom);
                self.steps[sid.0].dist = len.map_or(BIG, |l| l as i64);
            }
        }

        diag.solver(2, "updating path cache");
        let max = ctx
            .engine
            .prime(&make_view(self, ctx.world, ctx.graph, None), loc);
        diag.solver(2, format!("updated path cache (max dist {max})"));

        for idx in 0..self.list.len() {
            let sid = self.list[idx];
            let len = if self.steps[sid.0].block {
                self.steps[sid.0].dist
            } else if let Some(room) = self.steps[sid.0].room {
                ctx.engine
                    .path_length(&make_view(self, ctx.world, ctx.graph, None), loc, room)
                    .map_or(BIG, |l| l as i64)
            } else {
                0
            };
            // Moving beats collecting at equal distance.
            let offset = i64::from(matches!(self.steps[sid.0].kind, StepKind::Get(_)));
            self.steps[sid.0].sort = 2 * len + offset;
            self.steps[sid.0].dist = len;
        }

        let steps = &self.steps;
        self.list.sort_by_key(|s| (steps[s.0].sort, s.0));

        if diag.solver_verbose() {
            for &sid in &self.list {
                let step = &self.steps[sid.0];
                if step.done || step.ignored || step.dist >= BIG {
                    continue;
                }
                if self.require_step(sid).is_some() {
                    continue;
                }
                let mut line = format!("dist {}: {}", step.dist, step.desc);
                if step.dist > 0
                    && let Some(room) = step.room
                {
                    line.push_str(&format!(" ({})", ctx.world.room(room).desc));
                }
                diag.solver(3, line);
            }
        }
    }

    /// Path length between two rooms under the step's restrictions.
    ///
    /// Blocked steps get an uncached query that also avoids rooms and
    /// edges forcing their needed items to be left, and keep the route
    /// for later walking. Everyone else reads the single-source cache.
    fn find_path(
        &mut self,
        ctx: &mut Ctx<'_>,
        step: Option<StepId>,
        from: RoomId,
        to: RoomId,
    ) -> Option<u64> {
        if from == to {
            return Some(0);
        }

        if let Some(sid) = step
            && self.steps[sid.0].block
        {
            self.steps[sid.0].stored_path = None;
            let result = ctx.engine.path_info(
                &make_view(self, ctx.world, ctx.graph, Some(sid)),
                from,
                to,
            );
            let (len, route) = result?;
            self.steps[sid.0].stored_path = Some(route);
            Some(len)
        } else {
            ctx.engine
                .path_length(&make_view(self, ctx.world, ctx.graph, None), from, to)
        }
    }

    /// Classify a step: impossible, ignored, safe, or possible-but-unsafe.
    fn task_status(&mut self, ctx: &mut Ctx<'_>, diag: &mut Diagnostics, sid: StepId) -> Status {
        if self.require_step(sid).is_some() {
            return Status::Invalid;
        }
        if self.steps[sid.0].ignored {
            return Status::Invalid;
        }
        if self.steps[sid.0].ignore {
            diag.solver(2, format!("consider: {}", self.steps[sid.0].desc));
            diag.solver(3, "not possible: explicitly ignored");
            self.steps[sid.0].ignored = true;
            ctx.engine.bump_generation();
            return Status::Ignored;
        }

        diag.solver(2, format!("consider: {}", self.steps[sid.0].desc));

        let taskroom = self.steps[sid.0].room;
        let mut len = 0;
        if let (Some(troom), Some(loc)) = (taskroom, ctx.location)
            && troom != loc
        {
            match self.find_path(ctx, Some(sid), loc, troom) {
                Some(l) => len = l,
                None => return Status::Invalid,
            }
        }

        let mut safemsg: Option<String> = None;
        if self.steps[sid.0].safe {
            // The user says it's safe, and they know best.
        } else if let Some(reason) = &self.steps[sid.0].unsafe_reason {
            safemsg = Some(reason.clone());
        } else {
            let gotoroom = self.steps[sid.0].goto.or(taskroom);

            if let (Some(dest), Some(loc)) = (gotoroom, ctx.location)
                && self.find_path(ctx, None, dest, loc).is_none()
            {
                safemsg = Some("no return path".to_string());
            }

            if !self.steps[sid.0].drop.is_empty() {
                let droproom = self.steps[sid.0]
                    .drop_room
                    .or(taskroom)
                    .or(ctx.location);
                if let (Some(dest), Some(drop)) = (gotoroom, droproom)
                    && self.find_path(ctx, None, dest, drop).is_none()
                {
                    safemsg = Some("no path to dropped items".to_string());
                }
            }
        }

        if diag.solver_verbose() {
            let mut line = format!("possible: {}", self.steps[sid.0].desc);
            if len > 0 {
                line.push_str(&format!(" (dist {len})"));
            }
            if let Some(msg) = &safemsg {
                line.push_str(&format!(" (unsafe: {msg})"));
            }
            diag.solver(2, line);
        }

        if safemsg.is_none() {
            Status::Safe
        } else {
            Status::Unsafe
        }
    }

    /// Walk to a step's room, dropping items that rooms or links on the
    /// way insist on, and emitting one MOVE per hop.
    fn goto_room(&mut self, ctx: &mut Ctx<'_>, diag: &mut Diagnostics, sid: StepId) {
        let Some(room) = self.steps[sid.0].room else {
            return;
        };
        if ctx.location == Some(room) {
            return;
        }
        let Some(loc) = ctx.location else {
            ctx.location = Some(room);
            return;
        };

        let path: Vec<ReachId> = match self.steps[sid.0].stored_path.take() {
            Some(path) => path,
            None => ctx
                .engine
                .route(&make_view(self, ctx.world, ctx.graph, None), loc, room)
                .unwrap_or_default(),
        };

        let mut last = loc;
        for rec in path {
            let to = ctx.graph.reach(rec).to;
            let leave = ctx.graph.reach(rec).leave.clone();
            let cmds = ctx.graph.reach(rec).cmds.clone();

            for item in leave {
                self.drop_item(ctx, diag, item, Some(last), None, true);
            }
            for item in ctx.world.room(to).leave.clone() {
                self.drop_item(ctx, diag, item, Some(last), None, true);
            }

            let mtask = self.new_step(ctx.world, StepKind::Move(to));
            self.steps[mtask.0].cmds = Some(cmds);
            if self.state.room_visited[to.0] {
                self.steps[mtask.0].score = 0;
                self.steps[mtask.0].notes.clear();
            }
            self.state.room_visited[to.0] = true;
            if ctx.world.room(to).finish {
                self.steps[mtask.0]
                    .notes
                    .push("Finishes the game".to_string());
            }
            ctx.order.push(mtask);
            diag.solver(2, format!("move to: {}", ctx.world.room(to).desc));
            last = to;
        }

        ctx.location = Some(room);
    }

    /// Leave an item behind, and schedule getting it back if still wanted.
    fn drop_item(
        &mut self,
        ctx: &mut Ctx<'_>,
        diag: &mut Diagnostics,
        item: ItemId,
        room: Option<RoomId>,
        until: Option<&[TaskId]>,
        print: bool,
    ) {
        if !self.state.taken[item.0] {
            return;
        }

        self.state.item_room[item.0] = room;
        let dstep = self.new_step(ctx.world, StepKind::Drop(item));
        self.do_step(ctx, diag, dstep, print, false);

        // The paired (optional) recovery step.
        let gstep = self.new_step(ctx.world, StepKind::Get(item));

        if let Some(until) = until {
            for &t in until {
                let tstep = self.task_step[t.0];
                if !self.steps[tstep.0].done {
                    self.order_tasks(diag, tstep, gstep);
                }
            }
        }
        for tstep in self.meta[item.0].tasks.clone() {
            if !self.steps[tstep.0].done {
                self.order_tasks(diag, gstep, tstep);
            }
        }

        if self.want_item(ctx.world, item) {
            self.add_task(gstep);
            self.steps[gstep.0].optional = true;
        }
    }

    fn take_item(&mut self, ctx: &mut Ctx<'_>, item: ItemId, taken: bool) {
        if self.state.taken[item.0] != taken {
            ctx.engine.bump_generation();
        }
        self.state.taken[item.0] = taken;
        if taken {
            self.state.ever_taken[item.0] = true;
        }
    }

    fn mark_done(&mut self, ctx: &mut Ctx<'_>, sid: StepId) {
        if !self.steps[sid.0].done {
            ctx.engine.bump_generation();
        }
        self.steps[sid.0].done = true;
        if let StepKind::User(task) = self.steps[sid.0].kind {
            self.state.task_done[task.0] = true;
        }
    }

    /// Perform a step: mutate the world state, emit it to the walkthrough,
    /// cascade into given/lost/dropped items and triggered tasks. Returns
    /// whether the game goes on.
    fn do_step(
        &mut self,
        ctx: &mut Ctx<'_>,
        diag: &mut Diagnostics,
        sid: StepId,
        print: bool,
        recurse: bool,
    ) -> bool {
        if self.steps[sid.0].done {
            return true;
        }

        let mut print = print;
        let mut scoretask = true;
        let mut filter = false;

        match self.steps[sid.0].kind {
            StepKind::Get(item) => {
                if self.state.ever_taken[item.0] {
                    scoretask = false;
                }
                self.take_item(ctx, item, true);
                if ctx.world.item(item).given {
                    print = false;
                }
                if ctx.world.item(item).finish {
                    self.steps[sid.0].notes.push("Finishes the game".to_string());
                } else if !self.meta[item.0].used {
                    self.steps[sid.0]
                        .notes
                        .push("Not used for anything yet".to_string());
                }
            }
            StepKind::Drop(item) => {
                self.take_item(ctx, item, false);
                diag.solver(3, format!("drop item: {}", ctx.world.item(item).desc));
                if ctx.world.item(item).lost {
                    print = false;
                }
            }
            StepKind::User(_) => {
                for item in self.steps[sid.0].give.clone() {
                    self.steps[sid.0]
                        .notes
                        .push(format!("Gives {}", ctx.world.item(item).desc));
                    if !self.meta[item.0].used {
                        self.steps[sid.0]
                            .notes
                            .push("Not used for anything yet".to_string());
                    }
                }
                if let Some(room) = self.steps[sid.0].goto {
                    self.steps[sid.0]
                        .notes
                        .push(format!("Moves you to {}", ctx.world.room(room).desc));
                }
                if self.steps[sid.0].finish {
                    self.steps[sid.0].notes.push("Finishes the game".to_string());
                }
                filter = true;
            }
            StepKind::Goto(_) => {
                print = false;
            }
            StepKind::Move(_) => {}
        }

        if !scoretask {
            self.steps[sid.0].score = 0;
        }

        if print || recurse {
            ctx.order.push(sid);
            diag.solver(2, format!("do task: {}", self.steps[sid.0].desc));
        }

        self.mark_done(ctx, sid);

        for item in self.steps[sid.0].give.clone() {
            if !self.state.ever_taken[item.0] {
                self.steps[sid.0].score += ctx.world.item(item).score;
            }
            diag.solver(3, format!("give item: {}", ctx.world.item(item).desc));
            self.take_item(ctx, item, true);
        }

        for item in self.steps[sid.0].lose.clone() {
            diag.solver(3, format!("lose item: {}", ctx.world.item(item).desc));
            self.take_item(ctx, item, false);
        }

        if !self.steps[sid.0].drop.is_empty() {
            let room = self.steps[sid.0].drop_room.or(ctx.location);
            let until = self.steps[sid.0].drop_until.clone();
            for item in self.steps[sid.0].drop.clone() {
                self.drop_item(ctx, diag, item, room, Some(&until), false);
            }
        }

        for task in self.steps[sid.0].do_tasks.clone() {
            let other = self.task_step[task.0];
            if self.steps[other.0].done {
                continue;
            }
            diag.solver(3, format!("also do: {}", self.steps[other.0].desc));
            // Triggered here and now: no command of its own, done wherever
            // the player happens to be.
            self.steps[other.0].cmds = Some(Vec::new());
            self.steps[other.0].room = ctx.location;
            if !self.do_step(ctx, diag, other, false, true) {
                self.steps[sid.0].finish = true;
            }
        }

        if let Some(room) = self.steps[sid.0].goto {
            diag.solver(2, format!("goto room: {}", ctx.world.room(room).desc));
            ctx.location = Some(room);
        }

        if filter {
            self.filter_tasks(ctx, diag);
        }

        if self.steps[sid.0].finish {
            return false;
        }
        if let Some(loc) = ctx.location
            && ctx.world.room(loc).finish
        {
            return false;
        }
        true
    }

    /// Mark provably redundant steps done so they stop competing: their
    /// items are already carried or their triggered tasks already done,
    /// and nothing observable is lost by skipping them.
    fn filter_tasks(&mut self, ctx: &mut Ctx<'_>, diag: &mut Diagnostics) {
        loop {
            let mut filtered = 0;

            for idx in 0..self.list.len() {
                let sid = self.list[idx];

                let decision = {
                    let step = &self.steps[sid.0];
                    let mut canfilter = false;
                    let mut filter = true;
                    let mut reason = "";

                    if step.done
                        || step.finish
                        || step.score > 0
                        || step.affects_paths
                        || step.next.is_some()
                    {
                        filter = false;
                    }

                    if filter
                        && !step.allow.is_empty()
                        && step.allow.iter().any(|a| !self.steps[a.0].done)
                    {
                        filter = false;
                    }

                    if filter && !step.get.is_empty() {
                        canfilter = true;
                        reason = "items already carried";
                        if step.get.iter().any(|i| !self.state.ever_taken[i.0]) {
                            filter = false;
                        }
                    }

                    if filter && !step.give.is_empty() {
                        canfilter = true;
                        reason = "items already carried";
                        if step.give.iter().any(|i| !self.state.ever_taken[i.0]) {
                            filter = false;
                        }
                    }

                    if filter && !step.do_tasks.is_empty() {
                        reason = "tasks already done";
                        if step
                            .do_tasks
                            .iter()
                            .all(|t| self.steps[self.task_step[t.0].0].done)
                        {
                            canfilter = true;
                        }
                    }

                    if !step.done
                        && let StepKind::Get(item) = step.kind
                    {
                        canfilter = true;
                        reason = "item already carried";
                        filter = self.state.taken[item.0];
                    }

                    (canfilter && filter).then(|| (step.desc.clone(), reason))
                };

                if let Some((desc, reason)) = decision {
                    filtered += 1;
                    self.mark_done(ctx, sid);
                    diag.solver(3, format!("redundant task: {desc} ({reason})"));
                }
            }

            if filtered == 0 {
                break;
            }
        }
    }

    /// Explain exactly why the remaining steps can't be done.
    fn warn_failure(&self, ctx: &Ctx<'_>, diag: &mut Diagnostics) {
        let mut count = 0;
        let mut groups: Vec<(&'static str, Vec<String>)> = Vec::new();

        for &sid in &self.list {
            let step = &self.steps[sid.0];
            if step.done {
                continue;
            }
            count += 1;

            let (reason, entry) = if step.ignored {
                ("ignored", step.desc.clone())
            } else if self.require_step(sid).is_some() {
                (
                    "requires previous task to be done first",
                    step.desc.clone(),
                )
            } else {
                let entry = match step.room {
                    Some(room) => format!("{} ({})", step.desc, ctx.world.room(room).desc),
                    None => step.desc.clone(),
                };
                ("no path to task room", entry)
            };

            match groups.iter_mut().find(|(r, _)| *r == reason) {
                Some((_, entries)) => entries.push(entry),
                None => groups.push((reason, vec![entry])),
            }
        }

        let location = ctx
            .location
            .map_or("nowhere", |r| ctx.world.room(r).desc.as_str());
        let mut body = format!("   final location:\n      {location}\n");
        for (reason, entries) in groups {
            body.push_str(&format!("   {reason}:\n"));
            for line in fill(&entries.join(", "), 65).lines() {
                body.push_str("      ");
                body.push_str(line);
                body.push('\n');
            }
        }

        diag.warning(format!(
            "can't solve game ({count} task{} not done)\n{body}",
            if count == 1 { "" } else { "s" }
        ));
    }
}
