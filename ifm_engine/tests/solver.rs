//! End-to-end solver scenarios.

use ifm_data::{Direction, ItemDef, RoomDef, TaskDef, Vars, WorldDef};
use ifm_engine::diag::Severity;
use ifm_engine::step::StepKind;
use ifm_engine::{Diagnostics, WorldError, run};

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

fn task(desc: &str, in_room: Option<&str>) -> TaskDef {
    TaskDef {
        tag: Some(desc.replace(' ', "-")),
        desc: desc.into(),
        in_room: in_room.map(str::to_string),
        ..TaskDef::default()
    }
}

fn solve(decl: &WorldDef) -> (ifm_engine::Walkthrough, Diagnostics) {
    let mut diag = Diagnostics::new();
    let outputs = run(decl, 16, 12, &mut diag).expect("world should solve");
    (outputs.walkthrough, diag)
}

fn descs(wt: &ifm_engine::Walkthrough) -> Vec<String> {
    wt.steps.iter().map(|s| s.desc.clone()).collect()
}

#[test]
fn linear_corridor() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            east_of("b", "Passage", "a"),
            east_of("c", "Chapel", "b"),
        ],
        tasks: vec![task("read sign", Some("c"))],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    assert_eq!(
        descs(&wt),
        vec!["Move to Passage", "Move to Chapel", "read sign"]
    );
    assert_eq!(wt.total_travel, 2);
}

#[test]
fn locked_door() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            RoomDef {
                need: vec!["key".into()],
                ..east_of("b", "Vault", "a")
            },
        ],
        items: vec![ItemDef {
            tag: Some("key".into()),
            desc: "iron key".into(),
            in_room: Some("a".into()),
            given: true,
            ..ItemDef::default()
        }],
        tasks: vec![
            TaskDef {
                give: vec!["key".into()],
                ..task("take key", Some("a"))
            },
            task("open chest", Some("b")),
        ],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    assert_eq!(order, vec!["take key", "Move to Vault", "open chest"]);

    // The key is in hand strictly before the vault is entered.
    let key_at = order.iter().position(|d| d == "take key").unwrap();
    let move_at = order.iter().position(|d| d == "Move to Vault").unwrap();
    assert!(key_at < move_at);
}

#[test]
fn drop_and_return() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            RoomDef {
                leave: vec!["anvil".into()],
                ..east_of("b", "Crawlspace", "a")
            },
        ],
        items: vec![
            ItemDef {
                tag: Some("anvil".into()),
                desc: "anvil".into(),
                keep: true,
                ..ItemDef::default()
            },
            ItemDef {
                tag: Some("rope".into()),
                desc: "rope".into(),
                keep: true,
                ..ItemDef::default()
            },
        ],
        tasks: vec![task("press button", Some("b"))],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    assert_eq!(
        order,
        vec![
            "Drop anvil",
            "Move to Crawlspace",
            "press button",
            "Move to Hall",
            "Get anvil",
        ]
    );
    assert_eq!(wt.total_travel, 2);
    // The rope never leaves the inventory.
    assert!(order.iter().all(|d| d != "Drop rope"));
}

#[test]
fn finish_item_stops_the_plan() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            east_of("b", "Passage", "a"),
            east_of("c", "Shrine", "b"),
            east_of("d", "Far Annex", "c"),
        ],
        items: vec![ItemDef {
            tag: Some("trophy".into()),
            desc: "golden trophy".into(),
            in_room: Some("c".into()),
            finish: true,
            ..ItemDef::default()
        }],
        tasks: vec![task("dance", Some("d"))],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    assert_eq!(order.last().unwrap(), "Get golden trophy");
    assert!(order.iter().all(|d| d != "dance"));
    assert!(
        wt.steps
            .last()
            .unwrap()
            .notes
            .iter()
            .any(|n| n == "Finishes the game")
    );
}

#[test]
fn unsafe_task_deferred() {
    // Closing the gate makes the chapel unreachable, so the solver must
    // read the inscription first even though the gate is closer.
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            east_of("b", "Gatehouse", "a"),
            RoomDef {
                before: vec!["close-gate".into()],
                ..east_of("c", "Chapel", "b")
            },
        ],
        tasks: vec![
            task("close gate", None),
            TaskDef {
                after: vec!["close-gate".into()],
                ..task("pull lever", Some("b"))
            },
            task("read inscription", Some("c")),
        ],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    let read = order.iter().position(|d| d == "read inscription").unwrap();
    let close = order.iter().position(|d| d == "close gate").unwrap();
    let lever = order.iter().position(|d| d == "pull lever").unwrap();
    assert!(read < close);
    assert!(close < lever);
}

#[test]
fn dependency_cycle_is_fatal() {
    let decl = WorldDef {
        rooms: vec![room("a", "Hall")],
        tasks: vec![
            TaskDef {
                after: vec!["second".into()],
                tag: Some("first".into()),
                desc: "wake the dragon".into(),
                ..TaskDef::default()
            },
            TaskDef {
                after: vec!["third".into()],
                tag: Some("second".into()),
                desc: "calm the dragon".into(),
                ..TaskDef::default()
            },
            TaskDef {
                after: vec!["first".into()],
                tag: Some("third".into()),
                desc: "saddle the dragon".into(),
                ..TaskDef::default()
            },
        ],
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let err = run(&decl, 16, 12, &mut diag).unwrap_err();
    match err {
        WorldError::CyclicTasks { count, message } => {
            assert_eq!(count, 1);
            for desc in ["wake the dragon", "calm the dragon", "saddle the dragon"] {
                assert!(message.contains(desc), "missing {desc} in: {message}");
            }
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn scores_and_travel_are_conserved() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            RoomDef {
                score: 2,
                ..east_of("b", "Treasury", "a")
            },
        ],
        tasks: vec![TaskDef {
            score: 3,
            ..task("count coins", Some("b"))
        }],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let sum: u32 = wt.steps.iter().map(|s| s.score).sum();
    assert_eq!(sum, 5);
    assert_eq!(wt.total_score, 5);
    let moves = wt
        .steps
        .iter()
        .filter(|s| matches!(s.kind, StepKind::Move(_)))
        .count();
    assert_eq!(moves, wt.total_travel);
}

#[test]
fn given_item_claims_score_once() {
    // Smashing the case yields the gem; its own GET step is filtered as
    // redundant and the score lands on the smash, exactly once.
    let decl = WorldDef {
        rooms: vec![room("a", "Hall"), east_of("b", "Gallery", "a")],
        items: vec![ItemDef {
            tag: Some("gem".into()),
            desc: "rough gem".into(),
            in_room: Some("b".into()),
            score: 5,
            given: true,
            ..ItemDef::default()
        }],
        tasks: vec![TaskDef {
            give: vec!["gem".into()],
            ..task("smash case", Some("b"))
        }],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    assert!(order.iter().all(|d| d != "Get rough gem"));
    assert_eq!(wt.total_score, 5);
    let smash = wt.steps.iter().find(|s| s.desc == "smash case").unwrap();
    assert_eq!(smash.score, 5);
    assert!(smash.notes.iter().any(|n| n == "Gives rough gem"));
}

#[test]
fn drop_until_gates_recovery() {
    let decl = WorldDef {
        rooms: vec![room("a", "Hall"), east_of("b", "Cellar", "a")],
        items: vec![ItemDef {
            tag: Some("lamp".into()),
            desc: "lamp".into(),
            ..ItemDef::default()
        }],
        tasks: vec![
            TaskDef {
                drop: vec!["lamp".into()],
                drop_until: vec!["oil-hinges".into()],
                ..task("wedge door", Some("a"))
            },
            task("oil hinges", Some("a")),
            TaskDef {
                need: vec!["lamp".into()],
                ..task("search cellar", Some("b"))
            },
        ],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    let wedge = order.iter().position(|d| d == "wedge door").unwrap();
    let oil = order.iter().position(|d| d == "oil hinges").unwrap();
    let get = order.iter().position(|d| d == "Get lamp").unwrap();
    let search = order.iter().position(|d| d == "search cellar").unwrap();
    assert!(wedge < get);
    assert!(oil < get, "recovery must wait for the gating task");
    assert!(get < search, "the lamp is back in hand before it is needed");
}

#[test]
fn unsafe_propagates_to_followed_predecessors_only() {
    // The second half of the chain closes off the shrine; starting the
    // chain therefore commits to losing it, so the whole chain waits
    // behind the safe shrine visit.
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            east_of("b", "Shrine", "a"),
            RoomDef {
                before: vec!["seal-door".into()],
                ..east_of("c", "Crypt", "b")
            },
        ],
        tasks: vec![
            task("light candle", Some("a")),
            TaskDef {
                follow: Some("light-candle".into()),
                ..task("seal door", Some("a"))
            },
            task("pray", Some("c"))
        ],
        ..WorldDef::default()
    };
    let (wt, _) = solve(&decl);
    let order = descs(&wt);
    let pray = order.iter().position(|d| d == "pray").unwrap();
    let candle = order.iter().position(|d| d == "light candle").unwrap();
    let seal = order.iter().position(|d| d == "seal door").unwrap();
    assert!(pray < candle, "chain inherits the unsafe marking");
    assert_eq!(seal, candle + 1, "follow-chain runs contiguously");
}

#[test]
fn stuck_solver_reports_reasons() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            // No link or join: the attic is unreachable.
            room("x", "Attic"),
        ],
        tasks: vec![task("dust shelves", Some("x"))],
        ..WorldDef::default()
    };
    let (wt, diag) = solve(&decl);
    assert!(wt.steps.is_empty());
    let failure = diag
        .messages(Severity::Warning)
        .find(|m| m.contains("can't solve game (1 task not done)"))
        .expect("failure report");
    assert!(failure.contains("no path to task room"));
    assert!(failure.contains("dust shelves (Attic)"));
    assert!(failure.contains("final location"));
}

#[test]
fn ignored_tasks_are_skipped_and_reported() {
    let decl = WorldDef {
        rooms: vec![room("a", "Hall")],
        tasks: vec![
            TaskDef {
                ignore: true,
                ..task("polish silver", Some("a"))
            },
            task("wave goodbye", Some("a")),
        ],
        ..WorldDef::default()
    };
    let (wt, diag) = solve(&decl);
    let order = descs(&wt);
    assert_eq!(order, vec!["wave goodbye"]);
    let failure = diag
        .messages(Severity::Warning)
        .find(|m| m.contains("can't solve game"))
        .expect("failure report");
    assert!(failure.contains("ignored"));
    assert!(failure.contains("polish silver"));
}

#[test]
fn step_limit_bails_out() {
    let decl = WorldDef {
        rooms: vec![room("a", "Hall")],
        tasks: vec![task("breathe", Some("a"))],
        vars: Vars {
            solver_step_limit: 1,
            ..Vars::default()
        },
        ..WorldDef::default()
    };
    let mut diag = Diagnostics::new();
    let err = run(&decl, 16, 12, &mut diag).unwrap_err();
    assert!(matches!(err, WorldError::StepLimit { limit: 1 }));
}

#[test]
fn resolving_twice_gives_identical_walkthroughs() {
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            RoomDef {
                need: vec!["key".into()],
                ..east_of("b", "Vault", "a")
            },
        ],
        items: vec![ItemDef {
            tag: Some("key".into()),
            desc: "iron key".into(),
            in_room: Some("a".into()),
            given: true,
            ..ItemDef::default()
        }],
        tasks: vec![
            TaskDef {
                give: vec!["key".into()],
                ..task("take key", Some("a"))
            },
            task("open chest", Some("b")),
        ],
        ..WorldDef::default()
    };
    let (first, _) = solve(&decl);
    let (second, _) = solve(&decl);
    assert_eq!(descs(&first), descs(&second));
    assert_eq!(first.total_score, second.total_score);
    assert_eq!(first.total_travel, second.total_travel);
}

#[test]
fn all_tasks_safe_overrides_deferral() {
    // Same world as unsafe_task_deferred, but the override makes the
    // solver take the nearest step regardless of safety.
    let decl = WorldDef {
        rooms: vec![
            room("a", "Hall"),
            east_of("b", "Gatehouse", "a"),
            RoomDef {
                before: vec!["close-gate".into()],
                ..east_of("c", "Chapel", "b")
            },
        ],
        tasks: vec![task("close gate", None), task("read inscription", Some("c"))],
        vars: Vars {
            all_tasks_safe: true,
            ..Vars::default()
        },
        ..WorldDef::default()
    };
    let (wt, diag) = solve(&decl);
    let order = descs(&wt);
    let close = order.iter().position(|d| d == "close gate").unwrap();
    assert_eq!(close, 0, "closer task taken immediately under override");
    // Which of course strands the inscription.
    assert!(
        diag.messages(Severity::Warning)
            .any(|m| m.contains("can't solve game"))
    );
}
