//! TUI color theme
//!
//! Blood-and-bone palette for the terminal interface

use ratatui::style::Color;

use crate::live::PresenceState;
use crate::session::CoarseStatus;
use crate::submit::LastSubmission;

pub const DAGGER_RED: Color = Color::Rgb(200, 20, 20);
pub const GEM_RED: Color = Color::Rgb(255, 60, 60);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const HOMING_GREEN: Color = Color::Rgb(90, 220, 90);
pub const BONE: Color = Color::Rgb(225, 215, 190);
pub const INFO_DIM: Color = Color::Rgb(130, 120, 110);

/// Color for the game status line
#[must_use]
pub fn status_color(status: CoarseStatus) -> Color {
    match status {
        CoarseStatus::NotConnected => GEM_RED,
        CoarseStatus::Connecting => CAUTION_AMBER,
        CoarseStatus::Playing => HOMING_GREEN,
        CoarseStatus::Dead => DAGGER_RED,
        CoarseStatus::OwnReplay(_) | CoarseStatus::OtherReplay => CAUTION_AMBER,
        CoarseStatus::TitleScreen | CoarseStatus::Menu | CoarseStatus::Lobby => BONE,
    }
}

#[must_use]
pub fn presence_color(presence: PresenceState) -> Color {
    match presence {
        PresenceState::LoggedIn => HOMING_GREEN,
        PresenceState::Connecting | PresenceState::Connected => CAUTION_AMBER,
        PresenceState::Disconnected => GEM_RED,
    }
}

#[must_use]
pub fn submission_color(submission: &LastSubmission) -> Color {
    match submission {
        LastSubmission::Submitted { .. } => HOMING_GREEN,
        LastSubmission::Failed(_) => GEM_RED,
        LastSubmission::Pending | LastSubmission::Skipped(_) => CAUTION_AMBER,
        LastSubmission::None => INFO_DIM,
    }
}
