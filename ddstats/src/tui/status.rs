use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::theme::{presence_color, status_color, submission_color, BONE, CAUTION_AMBER, INFO_DIM};
use crate::display::DisplayModel;
use crate::session::RecordingState;

/// Game / online / recording overview plus the last submission
pub struct StatusPanel<'a> {
    model: &'a DisplayModel,
}

impl<'a> StatusPanel<'a> {
    pub fn new(model: &'a DisplayModel) -> Self {
        Self { model }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let m = self.model;
        let label = |text: &'static str| Span::styled(text, Style::default().fg(INFO_DIM));

        let mut lines = vec![
            Line::from(Span::styled(
                format!(" {}", m.status_label()),
                Style::default().fg(status_color(m.status)).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                label(" Game      "),
                Span::styled(
                    m.pid.map_or_else(|| "---".to_string(), |p| p.to_string()),
                    Style::default().fg(BONE),
                ),
            ]),
            Line::from(vec![
                label(" Online    "),
                Span::styled(m.presence.label(), Style::default().fg(presence_color(m.presence))),
            ]),
            Line::from(vec![
                label(" Recording "),
                Span::styled(m.recording_label(), Style::default().fg(recording_color(m.recording))),
                Span::styled(
                    if m.recording == RecordingState::Recording {
                        format!(" ({}s)", m.frames_recorded)
                    } else {
                        String::new()
                    },
                    Style::default().fg(INFO_DIM),
                ),
            ]),
            Line::from(""),
            Line::from(label(" Last game")),
            Line::from(Span::styled(
                format!(" {}", m.submission.label()),
                Style::default().fg(submission_color(&m.submission)),
            )),
        ];

        if !m.submissions_allowed {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                " Submissions disabled: update ddstats",
                Style::default().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Status")
                    .border_style(Style::default().fg(status_color(m.status))),
            );
        f.render_widget(paragraph, area);
    }
}

fn recording_color(state: RecordingState) -> ratatui::style::Color {
    match state {
        RecordingState::Recording => super::theme::HOMING_GREEN,
        RecordingState::Submitted => BONE,
        RecordingState::NotRecording => INFO_DIM,
    }
}
