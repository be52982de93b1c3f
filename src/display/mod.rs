//! Status view.
//!
//! The decision loop hands every cycle's balance, last bets and latest
//! distribution to a `Renderer`. Rendering is a pure view: it never
//! touches loop state, and I/O failures are logged and dropped.

pub mod terminal;

use rust_decimal::Decimal;
use tracing::info;

use crate::types::{BetResult, Distribution};

pub use terminal::TerminalRenderer;

/// How many settled bets the view shows.
pub const RECENT_BETS: usize = 5;

pub trait Renderer {
    /// Draw one frame. `recent` is oldest first and at most `RECENT_BETS`
    /// long. `distribution` is `None` when the cycle never reached the model.
    fn render(&mut self, balance: Decimal, recent: &[BetResult], distribution: Option<&Distribution>);
}

/// Writes frames to the log instead of the screen. Used when stdout is
/// not a terminal.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, balance: Decimal, recent: &[BetResult], distribution: Option<&Distribution>) {
        info!(
            balance = %balance,
            last_bet = recent.last().map(|b| b.to_string()),
            confidence = distribution.map(|d| d.confidence()),
            picks = ?distribution.map(|d| d.top_k(RECENT_BETS)),
            "Status"
        );
    }
}
