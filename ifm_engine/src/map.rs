//! The map builder: grid placement, link polylines, exit stubs and
//! section normalization.
//!
//! Rooms are placed relative to their `near` room, each section growing
//! outwards from its first declared room at (0, 0). Links are traced into
//! integer polylines by walking their declared directions; whatever delta
//! remains is closed with a straight axial or diagonal run. Finally every
//! section is shifted so its minimum coordinate is zero.

use std::collections::HashMap;

use log::info;

use crate::diag::Diagnostics;
use crate::world::{RoomId, SectionId, World};
use ifm_data::Direction;

/// Run every map-building stage in order.
pub fn build_map(world: &mut World, diag: &mut Diagnostics) {
    let mut grid = Grid::default();
    place_rooms(world, &mut grid, diag);
    declare_exits(world, &mut grid, diag);
    trace_links(world, &mut grid, diag);
    finalize_exits(world, &grid, diag);
    normalize_sections(world);
    info!("map built: {} sections", world.sections.len());
}

/// Working state shared by the build stages.
#[derive(Default)]
struct Grid {
    /// Which room sits at a (section, x, y) cell.
    occupied: HashMap<(SectionId, i32, i32), RoomId>,
    /// Exit bookkeeping per room and unit offset: -1 marks a declared
    /// stub, positive counts the links leaving that way.
    exits: HashMap<RoomId, HashMap<(i32, i32), i32>>,
}

impl Grid {
    fn put_room_at(&mut self, world: &mut World, room: RoomId, x: i32, y: i32) {
        let section = world.rooms[room.0].section;
        self.occupied.insert((section, x, y), room);
        world.rooms[room.0].pos = Some((x, y));
    }

    fn room_at(&self, section: SectionId, x: i32, y: i32) -> Option<RoomId> {
        self.occupied.get(&(section, x, y)).copied()
    }

    /// Mark an exit offset: declared stubs get -1, links bump the count.
    fn room_exit(&mut self, room: RoomId, xoff: i32, yoff: i32, declared: bool) {
        if (xoff, yoff) == (0, 0) {
            return;
        }
        let entry = self
            .exits
            .entry(room)
            .or_default()
            .entry((xoff, yoff))
            .or_insert(0);
        *entry = if declared { -1 } else { (*entry).max(0) + 1 };
    }
}

/// Place every room on its section grid.
fn place_rooms(world: &mut World, grid: &mut Grid, diag: &mut Diagnostics) {
    for sect in 0..world.sections.len() {
        let rooms = world.sections[sect].rooms.clone();

        // The section's first declared room anchors the grid.
        if let Some(&base) = rooms.first() {
            grid.put_room_at(world, base, 0, 0);
        }

        loop {
            let mut placed = 0;
            for &room in &rooms {
                if world.rooms[room.0].pos.is_some() {
                    continue;
                }
                if world.rooms[room.0].implicit_link.is_none() {
                    continue;
                }
                let Some(near) = world.rooms[room.0].near else {
                    continue;
                };
                let Some((mut x, mut y)) = world.rooms[near.0].pos else {
                    continue;
                };

                for dir in world.rooms[room.0].dir.clone() {
                    let (dx, dy) = dir.offset();
                    x += dx;
                    y += dy;
                }

                if let Some(other) = grid.room_at(SectionId(sect), x, y) {
                    diag.warning(format!(
                        "rooms '{}' and '{}' overlap",
                        world.rooms[room.0].desc, world.rooms[other.0].desc
                    ));
                }

                grid.put_room_at(world, room, x, y);
                placed += 1;
            }
            if placed == 0 {
                break;
            }
        }
    }
}

/// Register the exit stubs a room declares.
fn declare_exits(world: &World, grid: &mut Grid, diag: &mut Diagnostics) {
    for room in &world.rooms {
        for dir in &room.exits {
            let (dx, dy) = dir.offset();
            if (dx, dy) == (0, 0) {
                diag.warning(format!(
                    "room '{}' has an exit {} with no map direction",
                    room.desc, dir
                ));
                continue;
            }
            grid.room_exit(room.id, dx, dy, true);
        }
    }
}

/// Trace each link's polyline and record which exits links occupy.
fn trace_links(world: &mut World, grid: &mut Grid, diag: &mut Diagnostics) {
    for idx in 0..world.links.len() {
        if world.links[idx].nolink {
            continue;
        }

        let from = world.links[idx].from;
        let to = world.links[idx].to;
        let fname = world.rooms[from.0].desc.clone();
        let tname = world.rooms[to.0].desc.clone();
        let sect = world.rooms[from.0].section;

        if world.rooms[to.0].section != sect {
            diag.error(format!(
                "can't link '{fname}' to '{tname}' -- different map sections"
            ));
            continue;
        }
        if from == to && world.links[idx].dir.is_empty() {
            diag.error(format!(
                "can't link '{fname}' to itself without at least one direction"
            ));
            continue;
        }

        world.sections[sect.0].links.push(world.links[idx].id);
        world.links[idx].section = Some(sect);

        let (mut x, mut y) = world.rooms[from.0].at();
        let (xt, yt) = world.rooms[to.0].at();

        // Canonical circular link: keep the exit direction only; the
        // return leg is the straight-run completion below.
        if world.links[idx].oneway && (x, y) == (xt, yt) {
            world.links[idx].dir.truncate(1);
        }

        let mut xs = vec![x];
        let mut ys = vec![y];

        if world.links[idx].hidden {
            world.links[idx].xs = xs;
            world.links[idx].ys = ys;
            continue;
        }

        let dirs = world.links[idx].dir.clone();
        let ndirs = dirs.len();
        let mut count = 0usize;
        let mut xoff = 0;
        let mut yoff = 0;

        for dir in &dirs {
            let (dx, dy) = dir.offset();
            xoff = dx;
            yoff = dy;
            x += dx;
            y += dy;
            xs.push(x);
            ys.push(y);

            if count == 0 {
                grid.room_exit(from, dx, dy, false);
                world.links[idx].to_dir = Some(*dir);
            }
            count += 1;

            if (x != xt || y != yt || count < ndirs)
                && let Some(other) = grid.room_at(sect, x, y)
            {
                warn_crossed(diag, &world.rooms[other.0].desc, &fname, &tname);
            }
        }

        if (x, y) == (xt, yt) {
            grid.room_exit(to, -xoff, -yoff, false);
        } else {
            // Close the remaining delta with a straight run.
            xoff = xt - x;
            yoff = yt - y;

            if xoff != 0 && yoff != 0 && xoff.abs() != yoff.abs() {
                diag.warning(format!("link from '{fname}' to '{tname}' outside grid"));
            } else {
                xoff = xoff.signum();
                yoff = yoff.signum();

                if count == 0 {
                    grid.room_exit(from, xoff, yoff, false);
                }
                grid.room_exit(to, -xoff, -yoff, false);

                loop {
                    x += xoff;
                    y += yoff;
                    if (x, y) == (xt, yt) {
                        break;
                    }
                    xs.push(x);
                    ys.push(y);
                    if let Some(other) = grid.room_at(sect, x, y) {
                        warn_crossed(diag, &world.rooms[other.0].desc, &fname, &tname);
                    }
                }
            }

            xs.push(xt);
            ys.push(yt);
        }

        world.links[idx].from_dir = Direction::from_offset(-xoff, -yoff);
        if count == 0 {
            world.links[idx].to_dir = Direction::from_offset(xoff, yoff);
        }
        world.links[idx].xs = xs;
        world.links[idx].ys = ys;
    }
}

fn warn_crossed(diag: &mut Diagnostics, room: &str, from: &str, to: &str) {
    diag.warning(format!(
        "room '{room}' crossed by link line between '{from}' and '{to}'"
    ));
}

/// Turn leftover exit bookkeeping into stub lists and doubled-up warnings.
fn finalize_exits(world: &mut World, grid: &Grid, diag: &mut Diagnostics) {
    for room in &mut world.rooms {
        let Some(flags) = grid.exits.get(&room.id) else {
            continue;
        };
        let mut entries: Vec<_> = flags.iter().collect();
        entries.sort_by_key(|(off, _)| **off);

        for (&(dx, dy), &num) in entries {
            if num < 0 {
                room.exit_stubs.push((dx, dy));
            } else if num > 1 {
                let name = Direction::from_offset(dx, dy)
                    .map_or("unknown", Direction::long_name);
                diag.warning(format!("room '{}' has multiple {} links", room.desc, name));
            }
        }
    }
}

/// Shift each section so its minimum coordinate is zero and record its
/// extent, polyline points included.
fn normalize_sections(world: &mut World) {
    for sect in 0..world.sections.len() {
        let rooms = world.sections[sect].rooms.clone();
        let links = world.sections[sect].links.clone();

        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        let mut grow = |x: i32, y: i32| {
            bounds = Some(match bounds {
                None => (x, x, y, y),
                Some((minx, maxx, miny, maxy)) => {
                    (minx.min(x), maxx.max(x), miny.min(y), maxy.max(y))
                }
            });
        };

        for &room in &rooms {
            let (x, y) = world.rooms[room.0].at();
            grow(x, y);
        }
        for &link in &links {
            for i in 0..world.links[link.0].xs.len() {
                grow(world.links[link.0].xs[i], world.links[link.0].ys[i]);
            }
        }

        let Some((minx, maxx, miny, maxy)) = bounds else {
            continue;
        };
        world.sections[sect].xlen = maxx - minx + 1;
        world.sections[sect].ylen = maxy - miny + 1;

        for &room in &rooms {
            let (x, y) = world.rooms[room.0].at();
            world.rooms[room.0].pos = Some((x - minx, y - miny));
        }
        for &link in &links {
            for x in &mut world.links[link.0].xs {
                *x -= minx;
            }
            for y in &mut world.links[link.0].ys {
                *y -= miny;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::build_world;
    use ifm_data::{Direction, LinkDef, RoomDef, WorldDef};

    fn room(tag: &str, desc: &str) -> RoomDef {
        RoomDef {
            tag: Some(tag.into()),
            desc: desc.into(),
            ..RoomDef::default()
        }
    }

    #[test]
    fn rooms_place_along_directions() {
        let decl = WorldDef {
            rooms: vec![
                room("a", "Alpha"),
                RoomDef {
                    dir: vec![Direction::East, Direction::East],
                    ..room("b", "Beta")
                },
                RoomDef {
                    dir: vec![Direction::North],
                    near: Some("a".into()),
                    ..room("c", "Gamma")
                },
            ],
            ..WorldDef::default()
        };
        let mut diag = Diagnostics::new();
        let mut world = build_world(&decl, &mut diag).unwrap();
        build_map(&mut world, &mut diag);

        // One section, normalized so Alpha sits at the origin.
        assert_eq!(world.sections.len(), 1);
        assert_eq!(world.rooms[0].pos, Some((0, 0)));
        assert_eq!(world.rooms[1].pos, Some((2, 0)));
        assert_eq!(world.rooms[2].pos, Some((0, 1)));
        assert_eq!(world.sections[0].xlen, 3);
        assert_eq!(world.sections[0].ylen, 2);
    }

    #[test]
    fn colliding_rooms_warn_and_both_survive() {
        let decl = WorldDef {
            rooms: vec![
                room("a", "Alpha"),
                RoomDef {
                    dir: vec![Direction::East],
                    ..room("b", "Beta")
                },
                RoomDef {
                    dir: vec![Direction::East],
                    near: Some("a".into()),
                    ..room("c", "Gamma")
                },
            ],
            ..WorldDef::default()
        };
        let mut diag = Diagnostics::new();
        let mut world = build_world(&decl, &mut diag).unwrap();
        build_map(&mut world, &mut diag);

        assert!(
            diag.messages(crate::diag::Severity::Warning)
                .any(|m| m.contains("rooms 'Gamma' and 'Beta' overlap"))
        );
        // Both records keep the contested cell.
        assert_eq!(world.rooms[1].pos, world.rooms[2].pos);
    }

    #[test]
    fn straight_run_completes_underdeclared_links() {
        let decl = WorldDef {
            rooms: vec![
                room("a", "Alpha"),
                RoomDef {
                    dir: vec![Direction::East, Direction::East, Direction::East],
                    ..room("b", "Beta")
                },
            ],
            links: vec![LinkDef {
                from: "a".into(),
                to: "b".into(),
                dir: vec![Direction::North],
                ..LinkDef::default()
            }],
            ..WorldDef::default()
        };
        let mut diag = Diagnostics::new();
        let mut world = build_world(&decl, &mut diag).unwrap();
        build_map(&mut world, &mut diag);

        // Declared north step, then an off-grid delta of (3, -1): warned
        // and closed directly at the target.
        let link = &world.links[1];
        assert_eq!(link.xs, vec![0, 0, 3]);
        assert_eq!(link.ys, vec![0, 1, 0]);
        assert!(
            diag.messages(crate::diag::Severity::Warning)
                .any(|m| m.contains("outside grid"))
        );
    }

    #[test]
    fn crossing_a_room_warns() {
        let decl = WorldDef {
            rooms: vec![
                room("a", "Alpha"),
                RoomDef {
                    dir: vec![Direction::East],
                    ..room("b", "Beta")
                },
                RoomDef {
                    dir: vec![Direction::East],
                    near: Some("b".into()),
                    ..room("c", "Gamma")
                },
            ],
            links: vec![LinkDef {
                from: "a".into(),
                to: "c".into(),
                dir: vec![Direction::East, Direction::East],
                ..LinkDef::default()
            }],
            ..WorldDef::default()
        };
        let mut diag = Diagnostics::new();
        let mut world = build_world(&decl, &mut diag).unwrap();
        build_map(&mut world, &mut diag);
        assert!(
            diag.messages(crate::diag::Severity::Warning)
                .any(|m| m.contains("'Beta' crossed by link line between 'Alpha' and 'Gamma'"))
        );
    }

    #[test]
    fn circular_oneway_link_keeps_first_direction() {
        let decl = WorldDef {
            rooms: vec![room("a", "Alpha")],
            links: vec![LinkDef {
                from: "a".into(),
                to: "a".into(),
                dir: vec![Direction::North, Direction::East, Direction::South],
                oneway: true,
                ..LinkDef::default()
            }],
            ..WorldDef::default()
        };
        let mut diag = Diagnostics::new();
        let mut world = build_world(&decl, &mut diag).unwrap();
        build_map(&mut world, &mut diag);

        // Out one cell north and straight back: a two-segment loop.
        let link = &world.links[0];
        assert_eq!(link.dir, vec![Direction::North]);
        assert_eq!(link.xs, vec![0, 0, 0]);
        assert_eq!(link.ys, vec![0, 1, 0]);
    }

    #[test]
    fn cross_section_link_is_an_error() {
        let decl = WorldDef {
            rooms: vec![room("a", "Alpha"), room("b", "Beta")],
            links: vec![LinkDef {
                from: "a".into(),
                to: "b".into(),
                ..LinkDef::default()
            }],
            ..WorldDef::default()
        };
        let mut diag = Diagnostics::new();
        let mut world = build_world(&decl, &mut diag).unwrap();
        build_map(&mut world, &mut diag);
        assert!(
            diag.messages(crate::diag::Severity::Error)
                .any(|m| m.contains("different map sections"))
        );
    }
}
