//! Responsive layout for the TUI.
//!
//! Side-by-side panels on wide terminals, stacked on narrow ones; the MOTD
//! and key help are dropped when the terminal is too short.

use ratatui::layout::Constraint;

const WIDTH_SINGLE_COLUMN: u16 = 70; // Below this: stack panels vertically
const HEIGHT_MINIMAL: u16 = 18; // Below this: no MOTD, no key help
const HEIGHT_STACKED_MIN: u16 = 30; // Stacked panels need this much to fit

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub single_column: bool,
    pub show_motd: bool,
    pub show_status_bar: bool,
}

impl LayoutConfig {
    /// Vertical constraints: header, [motd], main, [status bar]
    #[must_use]
    pub fn rows(&self) -> Vec<Constraint> {
        let mut rows = vec![Constraint::Length(3)];
        if self.show_motd {
            rows.push(Constraint::Length(3));
        }
        rows.push(Constraint::Min(0));
        if self.show_status_bar {
            rows.push(Constraint::Length(3));
        }
        rows
    }
}

#[must_use]
pub fn compute_layout(width: u16, height: u16) -> LayoutConfig {
    let single_column = width < WIDTH_SINGLE_COLUMN;
    let minimal = height < HEIGHT_MINIMAL || (single_column && height < HEIGHT_STACKED_MIN);
    LayoutConfig { single_column, show_motd: !minimal, show_status_bar: !minimal }
}
