//! KENOBOT: prediction-driven keno betting loop.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod display;
pub mod engine;
pub mod exchange;
pub mod logging;
pub mod predictor;
pub mod strategy;
pub mod types;
