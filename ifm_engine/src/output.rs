//! The data products renderers and the walkthrough writer consume.
//!
//! Three artifacts: laid-out map sections, packed pages (see
//! [`crate::pack`]), and the walkthrough. Everything here is plain
//! serializable data; drawing it is someone else's job.

use serde::{Deserialize, Serialize};

use crate::step::StepKind;
use crate::world::{ItemId, RoomId, World};
use ifm_data::{Direction, JoinFormat};

/// One map section, ready to draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSection {
    pub num: usize,
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub rooms: Vec<MapRoom>,
    pub links: Vec<MapLink>,
}

/// One room of a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRoom {
    pub id: RoomId,
    /// Display name: description plus join markers and tag suffix.
    pub name: String,
    pub tag: Option<String>,
    pub x: i32,
    pub y: i32,
    /// Unit offsets of exits that lead nowhere on the map.
    pub exits: Vec<(i32, i32)>,
    /// Descriptions of visible items that start here.
    pub items: Vec<String>,
    pub notes: Vec<String>,
    pub styles: Vec<String>,
}

/// One link of a section, as a polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLink {
    pub from: RoomId,
    pub to: RoomId,
    pub xs: Vec<i32>,
    pub ys: Vec<i32>,
    pub oneway: bool,
    pub go: Option<Direction>,
    pub cmds: Option<Vec<String>>,
    pub styles: Vec<String>,
}

/// One row of the item reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEntry {
    pub id: ItemId,
    pub desc: String,
    pub tag: Option<String>,
    /// Room the item starts in; `None` means carried from the outset.
    pub room: Option<RoomId>,
    pub score: u32,
    pub hidden: bool,
    pub kept: bool,
    pub finish: bool,
    pub notes: Vec<String>,
}

/// One executed step of the solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayStep {
    pub kind: StepKind,
    pub desc: String,
    pub cmds: Vec<String>,
    pub room: Option<RoomId>,
    pub score: u32,
    pub notes: Vec<String>,
}

/// The ordered solution, with its totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Walkthrough {
    pub steps: Vec<PlayStep>,
    /// Sum of the step scores.
    pub total_score: u32,
    /// Number of MOVE steps.
    pub total_travel: usize,
}

impl Walkthrough {
    /// Fill in the totals from the step list.
    pub fn tally(mut self) -> Self {
        self.total_score = self.steps.iter().map(|s| s.score).sum();
        self.total_travel = self
            .steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Move(_)))
            .count();
        self
    }
}

/// Synthesized display name per room: description, join markers in join
/// declaration order, then the tag suffix.
pub fn room_names(world: &World) -> Vec<String> {
    let mut names: Vec<String> = world.rooms.iter().map(|r| r.desc.clone()).collect();

    if world.vars.show_joins {
        let mut jnum = 0usize;
        for join in &world.joins {
            if join.hidden {
                continue;
            }
            let marker = match world.vars.join_format {
                JoinFormat::Numeric => {
                    jnum += 1;
                    format!(" ({jnum})")
                }
                JoinFormat::Alpha => {
                    let letter = (b'A' + (jnum % 26) as u8) as char;
                    jnum += 1;
                    format!(" ({letter})")
                }
            };
            names[join.from.0].push_str(&marker);
            names[join.to.0].push_str(&marker);
        }
    }

    if world.vars.show_tags {
        for room in &world.rooms {
            if let Some(tag) = &room.tag {
                names[room.id.0] = format!("{} [{tag}]", names[room.id.0]);
            }
        }
    }

    names
}

/// Build the section product from a laid-out world.
pub fn map_sections(world: &World) -> Vec<MapSection> {
    let names = room_names(world);

    world
        .sections
        .iter()
        .map(|sect| {
            let num = sect.id.0 + 1;
            let rooms = sect
                .rooms
                .iter()
                .map(|&id| {
                    let room = world.room(id);
                    let (x, y) = room.at();
                    MapRoom {
                        id,
                        name: names[id.0].clone(),
                        tag: room.tag.clone(),
                        x,
                        y,
                        exits: room.exit_stubs.clone(),
                        items: world
                            .items
                            .iter()
                            .filter(|i| i.start_room == Some(id) && !i.hidden)
                            .map(|i| i.desc.clone())
                            .collect(),
                        notes: room.notes.clone(),
                        styles: room.styles.clone(),
                    }
                })
                .collect();

            let links = sect
                .links
                .iter()
                .map(|&id| {
                    let link = world.link(id);
                    MapLink {
                        from: link.from,
                        to: link.to,
                        xs: link.xs.clone(),
                        ys: link.ys.clone(),
                        oneway: link.oneway,
                        go: link.go,
                        cmds: link.cmd_to.clone(),
                        styles: link.styles.clone(),
                    }
                })
                .collect();

            MapSection {
                num,
                title: sect
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("Map section {num}")),
                width: sect.xlen,
                height: sect.ylen,
                rooms,
                links,
            }
        })
        .collect()
}

/// Build the item reference table.
pub fn item_table(world: &World) -> Vec<ItemEntry> {
    world
        .items
        .iter()
        .map(|item| ItemEntry {
            id: item.id,
            desc: item.desc.clone(),
            tag: item.tag.clone(),
            room: item.start_room,
            score: item.score,
            hidden: item.hidden,
            kept: item.keep,
            finish: item.finish,
            notes: item.notes.clone(),
        })
        .collect()
}
