use ifm_data::{Direction, ItemDef, JoinDef, LinkDef, RoomDef, TaskDef, Vars, WorldDef};
use ifm_engine as ie;
use ifm_engine::diag::Severity;
use ifm_engine::{Diagnostics, loader, map, reach};

fn room(tag: &str, desc: &str) -> RoomDef {
    RoomDef {
        tag: Some(tag.into()),
        desc: desc.into(),
        ..RoomDef::default()
    }
}

fn east_of(tag: &str, desc: &str, near: &str) -> RoomDef {
    RoomDef {
        dir: vec![Direction::East],
        near: Some(near.into()),
        ..room(tag, desc)
    }
}

#[test]
fn test_lib_version() {
    assert!(!ie::IFM_VERSION.is_empty());
}

#[test]
fn test_duplicate_tags_keep_first() {
    let decl = WorldDef {
        rooms: vec![room("a", "First"), room("a", "Second")],
        tasks: vec![TaskDef {
            desc: "look around".into(),
            in_room: Some("a".into()),
            ..TaskDef::default()
        }],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let world = loader::build_world(&decl, &mut diag).unwrap();
    assert!(
        diag.messages(Severity::Error)
            .any(|m| m == "room tag 'a' already defined")
    );
    // The first declaration wins.
    assert_eq!(world.tasks[0].room, Some(ie::world::RoomId(0)));
}

#[test]
fn test_unknown_tag_reported_once() {
    let decl = WorldDef {
        rooms: vec![room("a", "Alpha")],
        tasks: vec![
            TaskDef {
                desc: "first".into(),
                after: vec!["ghost".into()],
                ..TaskDef::default()
            },
            TaskDef {
                desc: "second".into(),
                after: vec!["ghost".into()],
                ..TaskDef::default()
            },
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let world = loader::build_world(&decl, &mut diag).unwrap();
    let complaints: Vec<_> = diag
        .messages(Severity::Error)
        .filter(|m| m.contains("task tag 'ghost' not defined"))
        .collect();
    assert_eq!(complaints.len(), 1);
    // The dangling reference is dropped, not kept as a bare string.
    assert!(world.tasks.iter().all(|t| t.after.is_empty()));
}

#[test]
fn test_near_defaults_to_previous_room() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Alpha"),
            RoomDef {
                dir: vec![Direction::North],
                ..room("b", "Beta")
            },
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let world = loader::build_world(&decl, &mut diag).unwrap();
    assert_eq!(world.rooms[1].near, Some(ie::world::RoomId(0)));
    assert_eq!(world.sections.len(), 1);
    // The implicit link was synthesized from Alpha to Beta.
    assert_eq!(world.links.len(), 1);
    assert_eq!(world.links[0].from, ie::world::RoomId(0));
    assert_eq!(world.links[0].to, ie::world::RoomId(1));
}

#[test]
fn test_sections_normalize_to_origin() {
    // Beta lies west of Alpha, so raw coordinates go negative.
    let decl = WorldDef {
        rooms: vec![
            room("a", "Alpha"),
            RoomDef {
                dir: vec![Direction::West, Direction::SouthWest],
                ..room("b", "Beta")
            },
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let mut world = loader::build_world(&decl, &mut diag).unwrap();
    map::build_map(&mut world, &mut diag);

    let sect = &world.sections[0];
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for room in &world.rooms {
        let (x, y) = room.at();
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    for link in &world.links {
        for (&x, &y) in link.xs.iter().zip(&link.ys) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    assert_eq!((min_x, min_y), (0, 0));
    assert_eq!(sect.xlen, max_x + 1);
    assert_eq!(sect.ylen, max_y + 1);
}

#[test]
fn test_link_stays_in_its_section() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Alpha"),
            east_of("b", "Beta", "a"),
            // A second, unconnected section.
            room("x", "Annex"),
        ],
        links: vec![LinkDef {
            from: "a".into(),
            to: "b".into(),
            dir: vec![Direction::SouthEast, Direction::NorthEast],
            ..LinkDef::default()
        }],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let mut world = loader::build_world(&decl, &mut diag).unwrap();
    map::build_map(&mut world, &mut diag);

    assert_eq!(world.sections.len(), 2);
    let first = &world.sections[0];
    assert!(world.sections[1].links.is_empty());
    for &lid in &first.links {
        let link = &world.link(lid);
        assert_eq!(link.section, Some(first.id));
        for (&x, &y) in link.xs.iter().zip(&link.ys) {
            assert!(x >= 0 && x < first.xlen);
            assert!(y >= 0 && y < first.ylen);
        }
    }
}

#[test]
fn test_exit_stubs_survive_unused_only() {
    let decl = WorldDef {
        rooms: vec![
            RoomDef {
                exits: vec![Direction::North, Direction::East],
                ..room("a", "Alpha")
            },
            east_of("b", "Beta", "a"),
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let mut world = loader::build_world(&decl, &mut diag).unwrap();
    map::build_map(&mut world, &mut diag);

    // The east exit was consumed by the link to Beta; north remains.
    assert_eq!(world.rooms[0].exit_stubs, vec![(0, 1)]);
}

#[test]
fn test_nopath_link_missing_from_reach_graph() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Alpha"),
            RoomDef {
                nopath: true,
                ..east_of("b", "Beta", "a")
            },
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let mut world = loader::build_world(&decl, &mut diag).unwrap();
    map::build_map(&mut world, &mut diag);
    let graph = reach::connect(&world, &mut diag);
    assert!(graph.reaches.is_empty());
    // The map still shows the link.
    assert_eq!(world.sections[0].links.len(), 1);
}

#[test]
fn test_join_connects_sections_in_reach_graph() {
    let decl = WorldDef {
        rooms: vec![room("a", "Alpha"), room("b", "Beta")],
        joins: vec![JoinDef {
            from: "a".into(),
            to: "b".into(),
            go: Some(Direction::Down),
            ..JoinDef::default()
        }],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let mut world = loader::build_world(&decl, &mut diag).unwrap();
    map::build_map(&mut world, &mut diag);
    let graph = reach::connect(&world, &mut diag);

    assert_eq!(world.sections.len(), 2);
    assert_eq!(graph.reaches.len(), 2);
    assert_eq!(graph.reaches[0].cmds, vec!["D".to_string()]);
    assert_eq!(graph.reaches[1].cmds, vec!["U".to_string()]);
}

#[test]
fn test_item_requirers_track_need_lists() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Alpha"),
            RoomDef {
                need: vec!["key".into()],
                ..east_of("b", "Vault", "a")
            },
        ],
        items: vec![ItemDef {
            tag: Some("key".into()),
            desc: "iron key".into(),
            in_room: Some("a".into()),
            ..ItemDef::default()
        }],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let mut world = loader::build_world(&decl, &mut diag).unwrap();
    map::build_map(&mut world, &mut diag);
    let graph = reach::connect(&world, &mut diag);
    let plan = ie::Plan::build(&world, &graph, &mut diag).unwrap();

    let (rooms, links) = plan.item_requirers(ie::world::ItemId(0));
    assert_eq!(rooms, &[ie::world::RoomId(1)]);
    assert!(links.is_empty());
}

#[test]
fn test_item_table_lists_declared_items() {
    let decl = WorldDef {
        rooms: vec![room("a", "Alpha")],
        items: vec![
            ItemDef {
                tag: Some("lamp".into()),
                desc: "brass lamp".into(),
                in_room: Some("a".into()),
                score: 5,
                ..ItemDef::default()
            },
            ItemDef {
                desc: "pocket fluff".into(),
                ..ItemDef::default()
            },
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let world = loader::build_world(&decl, &mut diag).unwrap();
    let table = ie::output::item_table(&world);
    assert_eq!(table.len(), 2);
    assert_eq!(table[0].desc, "brass lamp");
    assert_eq!(table[0].room, Some(ie::world::RoomId(0)));
    assert_eq!(table[0].score, 5);
    // No starting room means carried from the outset.
    assert_eq!(table[1].room, None);
}

#[test]
fn test_decl_round_trips_through_ron_file() {
    let decl = WorldDef {
        title: Some("Test of the Lamp".into()),
        rooms: vec![room("a", "Alpha"), east_of("b", "Beta", "a")],
        items: vec![ItemDef {
            tag: Some("lamp".into()),
            desc: "brass lamp".into(),
            in_room: Some("b".into()),
            ..ItemDef::default()
        }],
        vars: Vars {
            show_tags: true,
            ..Vars::default()
        },
        ..WorldDef::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.ron");
    std::fs::write(&path, ron::ser::to_string(&decl).unwrap()).unwrap();

    let loaded = ie::read_decl(&path).unwrap();
    assert_eq!(loaded.title.as_deref(), Some("Test of the Lamp"));
    assert_eq!(loaded.rooms.len(), 2);
    assert_eq!(loaded.items[0].in_room.as_deref(), Some("b"));
    assert!(loaded.vars.show_tags);
}

#[test]
fn test_walkthrough_serializes() {
    let decl = WorldDef {
        rooms: vec![room("a", "Alpha"), east_of("b", "Beta", "a")],
        tasks: vec![TaskDef {
            desc: "ring bell".into(),
            in_room: Some("b".into()),
            ..TaskDef::default()
        }],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let outputs = ie::run(&decl, 16, 12, &mut diag).unwrap();
    let json = serde_json::to_string(&outputs.walkthrough).unwrap();
    assert!(json.contains("ring bell"));
}
