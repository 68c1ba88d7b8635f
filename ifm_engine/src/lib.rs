#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! Interactive-fiction mapper core.
//!
//! Takes an already-parsed world declaration (rooms, items, links, joins,
//! tasks -- see the `ifm_data` crate) and produces three artifacts: map
//! sections laid out on an integer grid, an item reference table, and a
//! walkthrough that solves the game while honoring every declared
//! dependency. Rendering the artifacts is left to whoever consumes them.

// Core modules
pub mod diag;
pub mod item;
pub mod link;
pub mod loader;
pub mod map;
pub mod output;
pub mod pack;
pub mod path;
pub mod reach;
pub mod room;
pub mod solver;
pub mod step;
pub mod task;
pub mod world;

// Re-exports for convenience
pub use diag::{Diagnostics, Severity, WorldError};
pub use ifm_data::{Direction, Vars, WorldDef};
pub use loader::{build_world, read_decl};
pub use output::{ItemEntry, MapSection, Walkthrough};
pub use pack::Page;
pub use solver::Plan;
pub use world::World;

pub const IFM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything the core produces for one declaration.
#[derive(Debug)]
pub struct Outputs {
    pub world: World,
    pub sections: Vec<MapSection>,
    pub pages: Vec<Page>,
    pub items: Vec<ItemEntry>,
    pub walkthrough: Walkthrough,
}

/// Run the whole pipeline on a declaration: resolve tags, build the map,
/// connect the reach graph, plan, solve, and pack pages of the given grid
/// size.
///
/// # Errors
/// Fails on dependency cycles, a blown error threshold, or a runaway
/// solver; everything recoverable lands in `diag` instead.
pub fn run(
    decl: &WorldDef,
    page_width: i32,
    page_height: i32,
    diag: &mut Diagnostics,
) -> Result<Outputs, WorldError> {
    let mut world = loader::build_world(decl, diag)?;
    map::build_map(&mut world, diag);
    diag.checkpoint()?;

    let graph = reach::connect(&world, diag);
    diag.checkpoint()?;

    let plan = Plan::build(&world, &graph, diag)?;
    plan.check_cycles(diag)?;
    let walkthrough = plan.solve(&world, &graph, diag)?;

    let sections = output::map_sections(&world);
    let pages = pack::pack_pages(&world, page_width, page_height);
    let items = output::item_table(&world);

    Ok(Outputs {
        world,
        sections,
        pages,
        items,
        walkthrough,
    })
}
