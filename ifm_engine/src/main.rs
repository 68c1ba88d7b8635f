#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! ** ifm **
//! Map, item table and walkthrough writer for world declarations.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use env_logger::Env;
use log::info;

use ifm_engine::step::StepKind;
use ifm_engine::{Diagnostics, IFM_VERSION, Severity, read_decl, run};

/// Default virtual page size, in grid cells.
const PAGE_WIDTH: i32 = 16;
const PAGE_HEIGHT: i32 = 12;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
    info!("Starting ifm (version {IFM_VERSION})");

    let path = std::env::args()
        .nth(1)
        .context("usage: ifm_engine <world.ron>")?;
    let decl = read_decl(&path)?;

    let mut diag = Diagnostics::new();
    let result = run(&decl, PAGE_WIDTH, PAGE_HEIGHT, &mut diag);

    for entry in diag.entries() {
        let label = match entry.severity {
            Severity::Debug => "debug".dimmed(),
            Severity::Warning => "warning".yellow(),
            Severity::Error => "error".red(),
            Severity::Fatal => "fatal".red().bold(),
        };
        eprintln!("{label}: {}", entry.message);
    }
    for line in diag.trace() {
        println!("{line}");
    }

    let outputs = match result {
        Ok(outputs) => outputs,
        Err(err) => bail!("{err}"),
    };

    let title = outputs
        .world
        .title
        .clone()
        .unwrap_or_else(|| "Interactive Fiction map".to_string());
    println!("{}", title.bold().underline());

    for section in &outputs.sections {
        println!("\n{} ({}x{})", section.title.bold(), section.width, section.height);
        for room in &section.rooms {
            println!("  [{},{}] {}", room.x, room.y, room.name);
            for item in &room.items {
                println!("      - {item}");
            }
        }
    }

    for page in &outputs.pages {
        let rotated = if page.rotate { ", rotated" } else { "" };
        println!(
            "\n{} {} ({}x{}{rotated}): {} section(s)",
            "Page".bold(),
            page.num,
            page.xlen,
            page.ylen,
            page.placements.len()
        );
    }

    if !outputs.items.is_empty() {
        println!("\n{}", "Items".bold());
        for item in outputs.items.iter().filter(|i| !i.hidden) {
            let place = item
                .room
                .map_or("carried", |r| outputs.world.room(r).desc.as_str());
            println!("  {} ({place})", item.desc);
        }
    }

    println!("\n{}", "Walkthrough".bold());
    for step in &outputs.walkthrough.steps {
        let line = match step.kind {
            StepKind::Move(_) => format!("go {}", step.cmds.join(". ").to_lowercase()),
            _ => step.desc.clone(),
        };
        let score = if step.score > 0 {
            format!(" [{}]", step.score)
        } else {
            String::new()
        };
        println!("  {line}{score}");
        for note in &step.notes {
            println!("      ({note})");
        }
    }
    println!(
        "\nscore: {}  travel: {}",
        outputs.walkthrough.total_score, outputs.walkthrough.total_travel
    );

    if diag.error_count() > 0 {
        bail!("{} error(s)", diag.error_count());
    }
    Ok(())
}
