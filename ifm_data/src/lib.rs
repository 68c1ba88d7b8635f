//! Shared declaration model for ifm worlds.
//!
//! A world declaration is the already-parsed description of an
//! interactive-fiction game: rooms, items, links, joins, tasks and a set of
//! variables. The structures here are plain data -- the engine crate owns
//! tag resolution, layout and solving.
//!
//! Declarations serialize with serde, so a world can travel as RON:
//!
//! ```
//! let decl: ifm_data::WorldDef = ron::from_str(
//!     r#"(rooms: [(tag: Some("start"), desc: "Lobby", start: true)])"#,
//! ).unwrap();
//! assert_eq!(decl.rooms[0].desc, "Lobby");
//! ```

pub mod defs;
pub mod direction;
pub mod vars;

pub use defs::{ItemDef, JoinDef, LinkDef, RoomDef, Tag, TaskDef, WorldDef};
pub use direction::{DIRECTIONS, Direction};
pub use vars::{JoinFormat, Vars};
