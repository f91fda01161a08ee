//! Domain models for Mindful.
//!
//! # Core Concepts
//!
//! - [`GoalNode`] / [`GoalLink`]: the goal graph. Goals are user-named units of
//!   intent; links are directed prerequisite edges. Cycles are allowed.
//! - [`Category`]: one of five fixed display groupings with a color.
//! - [`GraphSnapshot`]: the `{ nodes, links }` shape used for storage and export.
//!
//! # Around the graph
//!
//! - [`Task`]: a to-do on the active or completed list, optionally pointing at a goal.
//! - [`JournalEntry`]: free-text journal entries grouped by type.
//! - [`AnalysisEntry`]: saved self-analysis forms.

mod goal;
mod journal;
mod task;

pub use goal::*;
pub use journal::*;
pub use task::*;
