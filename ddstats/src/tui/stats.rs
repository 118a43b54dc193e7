use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{BONE, DAGGER_RED, GEM_RED, HOMING_GREEN, INFO_DIM};
use crate::display::StatsView;

/// Current run numbers
pub struct StatsPanel<'a> {
    stats: &'a StatsView,
}

impl<'a> StatsPanel<'a> {
    pub fn new(stats: &'a StatsView) -> Self {
        Self { stats }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let s = self.stats;
        let row = |name: &'static str, value: String, color| {
            Line::from(vec![
                Span::styled(format!(" {name:<16}"), Style::default().fg(INFO_DIM)),
                Span::styled(value, Style::default().fg(color)),
            ])
        };

        let mut lines = vec![
            Line::from(Span::styled(
                format!(" {}", if s.player_name.is_empty() { "---" } else { s.player_name.as_str() }),
                Style::default().fg(BONE).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            row("Time", format!("{:.4}s", s.timer), BONE),
            row("Gems", s.gems.to_string(), GEM_RED),
            row("Homing", s.homing.to_string(), HOMING_GREEN),
            row("Accuracy", format!("{:.2}% ({}/{})", s.accuracy, s.daggers_hit, s.daggers_fired), BONE),
            row("Enemies alive", s.enemies_alive.to_string(), BONE),
            row("Kills", s.kills.to_string(), BONE),
            Line::from(""),
            row("Level 2", split(s.level_2), INFO_DIM),
            row("Level 3", split(s.level_3), INFO_DIM),
            row("Level 4", split(s.level_4), INFO_DIM),
            Line::from(""),
            row("Max homing", format!("{} at {}", s.homing_max, split(s.homing_max_time)), HOMING_GREEN),
            row(
                "Max enemies",
                format!("{} at {}", s.enemies_alive_max, split(s.enemies_alive_max_time)),
                BONE,
            ),
        ];

        if let Some(death) = s.death_type {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(" {death}"),
                Style::default().fg(DAGGER_RED).add_modifier(Modifier::BOLD),
            )));
        }

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Run")
                .border_style(Style::default().fg(DAGGER_RED)),
        );
        f.render_widget(paragraph, area);
    }
}

/// Split time, or a dash if not reached
fn split(time: f32) -> String {
    if time > 0.0 {
        format!("{time:.4}s")
    } else {
        "---".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_format() {
        assert_eq!(split(0.0), "---");
        assert_eq!(split(63.5), "63.5000s");
    }
}
