//! Core engine: the fetch → predict → bet → render loop.

pub mod decision_loop;
pub mod history;
pub mod pacing;

pub use decision_loop::{log_cycle_report, CycleReport, DecisionLoop, LoopConfig, LoopState};
pub use history::History;
pub use pacing::Pacer;
