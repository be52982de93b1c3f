//! Fixed-layout terminal view drawn with `crossterm`.
//!
//! Layout (80 columns):
//! ```text
//! row 0   Balance: 1.00000000 BTC | Last 5 bets
//! row 1-5   [picks] → 0.00x
//! row 7   Next round prediction:
//! row 8     Numbers: [..]
//! row 9     Confidence: ..%
//! ```

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use rust_decimal::Decimal;
use std::io::{self, Stdout, Write};
use tracing::warn;

use super::{Renderer, RECENT_BETS};
use crate::types::{BetResult, Distribution};

/// One positioned line of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub row: u16,
    pub col: u16,
    pub text: String,
}

impl Line {
    fn at(row: u16, col: u16, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
        }
    }
}

/// Lay out one frame.
pub fn compose(
    currency: &str,
    balance: Decimal,
    recent: &[BetResult],
    distribution: Option<&Distribution>,
    top_k: usize,
) -> Vec<Line> {
    let mut lines = vec![Line::at(
        0,
        0,
        format!(
            "Balance: {balance:.8} {} | Last {RECENT_BETS} bets",
            currency.to_uppercase()
        ),
    )];

    let start = recent.len().saturating_sub(RECENT_BETS);
    for (row, bet) in (1u16..).zip(&recent[start..]) {
        lines.push(Line::at(row, 2, bet.to_string()));
    }

    lines.push(Line::at(7, 0, "Next round prediction:"));
    match distribution {
        Some(d) => {
            lines.push(Line::at(8, 2, format!("Numbers: {:?}", d.top_k(top_k))));
            lines.push(Line::at(
                9,
                2,
                format!("Confidence: {:.1}%", d.confidence() * 100.0),
            ));
        }
        None => lines.push(Line::at(8, 2, "Numbers: waiting for history")),
    }

    lines
}

/// Draws into the alternate screen; restores the terminal on drop.
pub struct TerminalRenderer {
    out: Stdout,
    currency: String,
    top_k: usize,
}

impl TerminalRenderer {
    pub fn new(currency: &str, top_k: usize) -> io::Result<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide)?;
        Ok(Self {
            out,
            currency: currency.to_string(),
            top_k,
        })
    }

    fn draw(&mut self, lines: &[Line]) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        for line in lines {
            queue!(self.out, MoveTo(line.col, line.row), Print(&line.text))?;
        }
        self.out.flush()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, balance: Decimal, recent: &[BetResult], distribution: Option<&Distribution>) {
        let lines = compose(&self.currency, balance, recent, distribution, self.top_k);
        if let Err(e) = self.draw(&lines) {
            warn!(error = %e, "Terminal redraw failed");
        }
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
    }
}
