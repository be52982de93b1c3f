//! Strategy: turns a model distribution into a bet-or-skip decision.

pub mod policy;

pub use policy::{DecisionPolicy, PolicyConfig};
