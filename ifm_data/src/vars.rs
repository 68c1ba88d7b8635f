//! Variables a declaration may set to steer the engine.

use serde::{Deserialize, Serialize};

/// Style of join markers appended to room display names.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinFormat {
    /// " (1)", " (2)", ...
    #[default]
    Numeric,
    /// " (A)", " (B)", ...
    Alpha,
}

/// Name/value variables consumed by the engine core.
///
/// Defaults match an empty declaration; a parser overrides individual
/// fields as `set` statements are seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vars {
    /// Treat every possible step as safe when choosing the next one.
    #[serde(default)]
    pub all_tasks_safe: bool,
    /// Keep carrying items that were never used for anything.
    #[serde(default)]
    pub keep_unused_items: bool,
    /// Append " [tag]" to tagged room display names.
    #[serde(default)]
    pub show_tags: bool,
    /// Append join markers to the display names of joined rooms.
    #[serde(default)]
    pub show_joins: bool,
    /// Solver trace verbosity: messages at levels below this are emitted.
    #[serde(default)]
    pub solver_messages: u32,
    /// Grid cells left between packed sections.
    #[serde(default = "default_section_spacing")]
    pub map_section_spacing: u32,
    /// Hard bail-out on solver iterations, against malformed input.
    #[serde(default = "default_step_limit")]
    pub solver_step_limit: u32,
    /// Errors tolerated before the run is abandoned.
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
    /// Comma-separated room tags whose entry finishes the game.
    #[serde(default)]
    pub finish_room: Option<String>,
    /// Comma-separated item tags whose pickup finishes the game.
    #[serde(default)]
    pub finish_item: Option<String>,
    /// Comma-separated task tags whose completion finishes the game.
    #[serde(default)]
    pub finish_task: Option<String>,
    #[serde(default)]
    pub join_format: JoinFormat,
}

fn default_section_spacing() -> u32 {
    1
}

fn default_step_limit() -> u32 {
    10_000
}

fn default_max_errors() -> u32 {
    10
}

impl Default for Vars {
    fn default() -> Self {
        Self {
            all_tasks_safe: false,
            keep_unused_items: false,
            show_tags: false,
            show_joins: false,
            solver_messages: 0,
            map_section_spacing: default_section_spacing(),
            solver_step_limit: default_step_limit(),
            max_errors: default_max_errors(),
            finish_room: None,
            finish_item: None,
            finish_task: None,
            join_format: JoinFormat::default(),
        }
    }
}
