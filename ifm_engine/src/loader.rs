//! Building a resolved [`World`] from a declaration.
//!
//! Declarations refer to everything by symbolic tag. The loader makes two
//! passes: first it registers every declared tag (duplicates are errors and
//! the first declaration wins), then it resolves each tag-typed attribute
//! into an arena id. An unknown tag is reported once per (kind, tag) pair
//! and the reference is dropped.
//!
//! The loader also owns the declaration-time derivations: implicit links,
//! `near`-based section membership, the start room, leave-all inversion and
//! the finish-tag variables.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::diag::{Diagnostics, WorldError};
use crate::item::Item;
use crate::link::{Join, Link};
use crate::room::Room;
use crate::task::Task;
use crate::world::{ItemId, JoinId, LinkId, RoomId, Section, SectionId, TaskId, World};
use ifm_data::WorldDef;

/// Read a declaration from a RON file.
///
/// # Errors
/// Fails on unreadable files or malformed RON.
pub fn read_decl(path: impl AsRef<Path>) -> Result<WorldDef> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("while reading declaration {}", path.display()))?;
    let decl = ron::from_str(&text)
        .with_context(|| format!("while parsing declaration {}", path.display()))?;
    Ok(decl)
}

/// Per-kind tag tables with once-only unknown-tag reporting.
struct TagTables {
    rooms: HashMap<String, usize>,
    items: HashMap<String, usize>,
    tasks: HashMap<String, usize>,
    reported: HashSet<(&'static str, String)>,
}

impl TagTables {
    fn build(decl: &WorldDef, diag: &mut Diagnostics) -> Self {
        let mut tables = Self {
            rooms: HashMap::new(),
            items: HashMap::new(),
            tasks: HashMap::new(),
            reported: HashSet::new(),
        };

        let mut links: HashMap<String, usize> = HashMap::new();
        let mut joins: HashMap<String, usize> = HashMap::new();

        for (idx, room) in decl.rooms.iter().enumerate() {
            if let Some(tag) = &room.tag {
                define("room", tag, idx, &mut tables.rooms, diag);
                // An implicit link answers to its room's tag.
                if !room.dir.is_empty() {
                    define("link", tag, idx, &mut links, diag);
                }
            }
        }
        for (idx, item) in decl.items.iter().enumerate() {
            if let Some(tag) = &item.tag {
                define("item", tag, idx, &mut tables.items, diag);
            }
        }
        for (idx, task) in decl.tasks.iter().enumerate() {
            if let Some(tag) = &task.tag {
                define("task", tag, idx, &mut tables.tasks, diag);
            }
        }
        for (idx, link) in decl.links.iter().enumerate() {
            if let Some(tag) = &link.tag {
                define("link", tag, idx, &mut links, diag);
            }
        }
        for (idx, join) in decl.joins.iter().enumerate() {
            if let Some(tag) = &join.tag {
                define("join", tag, idx, &mut joins, diag);
            }
        }

        tables
    }

    fn resolve(
        &mut self,
        kind: &'static str,
        table: fn(&Self) -> &HashMap<String, usize>,
        tag: &str,
        diag: &mut Diagnostics,
    ) -> Option<usize> {
        match table(self).get(tag) {
            Some(&idx) => Some(idx),
            None => {
                if self.reported.insert((kind, tag.to_string())) {
                    diag.error(format!("{kind} tag '{tag}' not defined"));
                }
                None
            }
        }
    }

    fn room(&mut self, tag: &str, diag: &mut Diagnostics) -> Option<RoomId> {
        self.resolve("room", |t| &t.rooms, tag, diag).map(RoomId)
    }

    fn item(&mut self, tag: &str, diag: &mut Diagnostics) -> Option<ItemId> {
        self.resolve("item", |t| &t.items, tag, diag).map(ItemId)
    }

    fn task(&mut self, tag: &str, diag: &mut Diagnostics) -> Option<TaskId> {
        self.resolve("task", |t| &t.tasks, tag, diag).map(TaskId)
    }

    fn room_opt(&mut self, tag: &Option<String>, diag: &mut Diagnostics) -> Option<RoomId> {
        tag.as_deref().and_then(|t| self.room(t, diag))
    }

    fn items(&mut self, tags: &[String], diag: &mut Diagnostics) -> Vec<ItemId> {
        tags.iter().filter_map(|t| self.item(t, diag)).collect()
    }

    fn tasks(&mut self, tags: &[String], diag: &mut Diagnostics) -> Vec<TaskId> {
        tags.iter().filter_map(|t| self.task(t, diag)).collect()
    }
}

fn define(
    kind: &'static str,
    tag: &str,
    idx: usize,
    table: &mut HashMap<String, usize>,
    diag: &mut Diagnostics,
) {
    if table.contains_key(tag) {
        diag.error(format!("{kind} tag '{tag}' already defined"));
    } else {
        table.insert(tag.to_string(), idx);
    }
}

/// Resolve a declaration into a [`World`].
///
/// Diagnostics accumulate in `diag`; the build is abandoned only when the
/// error threshold is passed.
///
/// # Errors
/// Returns [`WorldError::TooManyErrors`] past the configured threshold.
pub fn build_world(decl: &WorldDef, diag: &mut Diagnostics) -> Result<World, WorldError> {
    diag.configure(&decl.vars);
    let mut tags = TagTables::build(decl, diag);
    diag.checkpoint()?;

    let mut world = World {
        title: decl.title.clone(),
        rooms: Vec::with_capacity(decl.rooms.len()),
        items: Vec::with_capacity(decl.items.len()),
        links: Vec::new(),
        joins: Vec::new(),
        tasks: Vec::with_capacity(decl.tasks.len()),
        sections: Vec::new(),
        start: None,
        vars: decl.vars.clone(),
    };

    build_rooms(decl, &mut tags, &mut world, diag);
    build_items(decl, &mut tags, &mut world, diag);
    build_links(decl, &mut tags, &mut world, diag);
    build_joins(decl, &mut tags, &mut world, diag);
    build_tasks(decl, &mut tags, &mut world, diag);
    diag.checkpoint()?;

    invert_leave_lists(&mut world);
    apply_finish_vars(&mut world, &mut tags, diag);
    diag.checkpoint()?;

    world.start = world
        .rooms
        .iter()
        .position(|r| decl.rooms[r.id.0].start)
        .or(if world.rooms.is_empty() { None } else { Some(0) })
        .map(RoomId);

    info!(
        "world resolved: {} rooms, {} items, {} links, {} joins, {} tasks, {} sections",
        world.rooms.len(),
        world.items.len(),
        world.links.len(),
        world.joins.len(),
        world.tasks.len(),
        world.sections.len()
    );
    Ok(world)
}

/// Create rooms, assign sections from the `near` relation and synthesize
/// the implicit link each directed room declaration implies.
fn build_rooms(decl: &WorldDef, tags: &mut TagTables, world: &mut World, diag: &mut Diagnostics) {
    let mut titles = decl.section_titles.iter();

    for (idx, def) in decl.rooms.iter().enumerate() {
        let id = RoomId(idx);

        let mut near = tags.room_opt(&def.near, diag);
        // Placement is relative to an earlier room; forward references
        // would leave this room nothing to hang off yet.
        if let Some(n) = near
            && n.0 >= idx
        {
            diag.error(format!(
                "room tag '{}' not yet defined",
                def.near.as_deref().unwrap_or_default()
            ));
            near = None;
        }
        if near.is_none() && !def.dir.is_empty() {
            if idx == 0 {
                diag.warning(format!(
                    "room '{}' has directions but no room to be near",
                    def.desc
                ));
            } else {
                near = Some(RoomId(idx - 1));
            }
        }

        let section = match near.map(|n| world.rooms[n.0].section) {
            Some(sect) => sect,
            None => {
                let sect = SectionId(world.sections.len());
                world.sections.push(Section {
                    id: sect,
                    title: titles.next().cloned(),
                    rooms: Vec::new(),
                    links: Vec::new(),
                    xlen: 0,
                    ylen: 0,
                });
                sect
            }
        };
        world.sections[section.0].rooms.push(id);

        let dir = if near.is_some() { def.dir.clone() } else { Vec::new() };
        let implicit_link = near.filter(|_| !dir.is_empty()).map(|near_room| {
            let link_id = LinkId(world.links.len());
            world.links.push(Link {
                id: link_id,
                tag: def.tag.clone(),
                from: near_room,
                to: id,
                dir: dir.clone(),
                go: def.go,
                oneway: def.oneway,
                hidden: false,
                nolink: def.nolink,
                nopath: def.nopath,
                len: def.len,
                cmd_to: def.cmd_to.clone(),
                cmd_from: def.cmd_from.clone(),
                need: tags.items(&def.link_need, diag),
                before: tags.tasks(&def.link_before, diag),
                after: tags.tasks(&def.link_after, diag),
                leave: tags.items(&def.link_leave, diag),
                leave_all: def.link_leave_all,
                notes: Vec::new(),
                styles: def.styles.clone(),
                section: None,
                xs: Vec::new(),
                ys: Vec::new(),
                to_dir: None,
                from_dir: None,
            });
            link_id
        });

        world.rooms.push(Room {
            id,
            tag: def.tag.clone(),
            desc: def.desc.clone(),
            section,
            pos: None,
            near,
            dir,
            implicit_link,
            exits: def.exits.clone(),
            exit_stubs: Vec::new(),
            need: tags.items(&def.need, diag),
            before: tags.tasks(&def.before, diag),
            after: tags.tasks(&def.after, diag),
            leave: tags.items(&def.leave, diag),
            leave_all: def.leave_all,
            nodrop: def.nodrop,
            score: def.score,
            finish: def.finish,
            notes: def.notes.clone(),
            styles: def.styles.clone(),
        });
    }
}

fn build_items(decl: &WorldDef, tags: &mut TagTables, world: &mut World, diag: &mut Diagnostics) {
    for (idx, def) in decl.items.iter().enumerate() {
        let item = Item {
            id: ItemId(idx),
            tag: def.tag.clone(),
            desc: def.desc.clone(),
            start_room: tags.room_opt(&def.in_room, diag),
            score: def.score,
            finish: def.finish,
            hidden: def.hidden,
            given: def.given,
            lost: def.lost,
            ignore: def.ignore,
            keep: def.keep,
            keep_with: tags.items(&def.keep_with, diag),
            keep_until: tags.tasks(&def.keep_until, diag),
            need: tags.items(&def.need, diag),
            before: tags.tasks(&def.before, diag),
            after: tags.tasks(&def.after, diag),
            notes: def.notes.clone(),
            styles: def.styles.clone(),
        };
        world.items.push(item);
    }
}

fn build_links(decl: &WorldDef, tags: &mut TagTables, world: &mut World, diag: &mut Diagnostics) {
    for def in &decl.links {
        let (Some(from), Some(to)) = (tags.room(&def.from, diag), tags.room(&def.to, diag)) else {
            continue;
        };
        let id = LinkId(world.links.len());
        world.links.push(Link {
            id,
            tag: def.tag.clone(),
            from,
            to,
            dir: def.dir.clone(),
            go: def.go,
            oneway: def.oneway,
            hidden: def.hidden,
            nolink: def.nolink,
            nopath: def.nopath,
            len: def.len,
            cmd_to: def.cmd_to.clone(),
            cmd_from: def.cmd_from.clone(),
            need: tags.items(&def.need, diag),
            before: tags.tasks(&def.before, diag),
            after: tags.tasks(&def.after, diag),
            leave: tags.items(&def.leave, diag),
            leave_all: def.leave_all,
            notes: def.notes.clone(),
            styles: def.styles.clone(),
            section: None,
            xs: Vec::new(),
            ys: Vec::new(),
            to_dir: None,
            from_dir: None,
        });
    }
}

fn build_joins(decl: &WorldDef, tags: &mut TagTables, world: &mut World, diag: &mut Diagnostics) {
    for def in &decl.joins {
        let (Some(from), Some(to)) = (tags.room(&def.from, diag), tags.room(&def.to, diag)) else {
            continue;
        };
        let id = JoinId(world.joins.len());
        world.joins.push(Join {
            id,
            tag: def.tag.clone(),
            from,
            to,
            go: def.go,
            oneway: def.oneway,
            hidden: def.hidden,
            nopath: def.nopath,
            len: def.len,
            cmd_to: def.cmd_to.clone(),
            cmd_from: def.cmd_from.clone(),
            need: tags.items(&def.need, diag),
            before: tags.tasks(&def.before, diag),
            after: tags.tasks(&def.after, diag),
            leave: tags.items(&def.leave, diag),
            leave_all: def.leave_all,
            notes: def.notes.clone(),
            styles: def.styles.clone(),
        });
    }
}

fn build_tasks(decl: &WorldDef, tags: &mut TagTables, world: &mut World, diag: &mut Diagnostics) {
    for (idx, def) in decl.tasks.iter().enumerate() {
        let task = Task {
            id: TaskId(idx),
            tag: def.tag.clone(),
            desc: def.desc.clone(),
            room: tags.room_opt(&def.in_room, diag),
            cmds: def.cmd.clone(),
            score: def.score,
            finish: def.finish,
            safe: def.safe,
            ignore: def.ignore,
            after: tags.tasks(&def.after, diag),
            need: tags.items(&def.need, diag),
            get: tags.items(&def.get, diag),
            give: tags.items(&def.give, diag),
            lose: tags.items(&def.lose, diag),
            drop: tags.items(&def.drop, diag),
            drop_all: def.drop_all,
            drop_until: tags.tasks(&def.drop_until, diag),
            drop_room: tags.room_opt(&def.drop_room, diag),
            do_tasks: tags.tasks(&def.do_tasks, diag),
            goto: tags.room_opt(&def.goto, diag),
            follow: def.follow.as_deref().and_then(|t| tags.task(t, diag)),
            notes: def.notes.clone(),
            styles: def.styles.clone(),
        };
        world.tasks.push(task);
    }
}

/// Rewrite every leave-all list as "all items except the ones listed".
fn invert_leave_lists(world: &mut World) {
    let all: Vec<ItemId> = world.item_ids().collect();
    let invert = |listed: &[ItemId]| -> Vec<ItemId> {
        let listed: HashSet<ItemId> = listed.iter().copied().collect();
        all.iter().copied().filter(|i| !listed.contains(i)).collect()
    };

    for room in &mut world.rooms {
        if room.leave_all {
            room.leave = invert(&room.leave);
        }
    }
    for link in &mut world.links {
        if link.leave_all {
            link.leave = invert(&link.leave);
        }
    }
    for join in &mut world.joins {
        if join.leave_all {
            join.leave = invert(&join.leave);
        }
    }
}

/// Mark the rooms/items/tasks named by the finish-tag variables.
fn apply_finish_vars(world: &mut World, tags: &mut TagTables, diag: &mut Diagnostics) {
    let split = |value: &Option<String>| -> Vec<String> {
        value
            .as_deref()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    for tag in split(&world.vars.finish_room.clone()) {
        if let Some(id) = tags.room(&tag, diag) {
            diag.solver(1, format!("entering room '{}' finishes the game", world.room(id).desc));
            world.rooms[id.0].finish = true;
        }
    }
    for tag in split(&world.vars.finish_item.clone()) {
        if let Some(id) = tags.item(&tag, diag) {
            diag.solver(1, format!("obtaining item '{}' finishes the game", world.item(id).desc));
            world.items[id.0].finish = true;
        }
    }
    for tag in split(&world.vars.finish_task.clone()) {
        if let Some(id) = tags.task(&tag, diag) {
            diag.solver(1, format!("doing task '{}' finishes the game", world.task(id).desc));
            world.tasks[id.0].finish = true;
        }
    }
}
