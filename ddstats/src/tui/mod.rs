//! # Terminal User Interface (TUI)
//!
//! Live view of the game, the online channel and the last submission,
//! drawn with `ratatui` on its own thread at 2 Hz.
//!
//! ## Sub-Modules
//!
//! - `status` - game / online / recording panel
//! - `stats` - current run numbers
//! - `layout` - size breakpoints
//! - `theme` - color scheme
//!
//! Keys: `q`/`Esc`/`Ctrl-C` quit, `c` or left click copies the last game
//! URL, `F12` rewrites the default config.

#![allow(clippy::needless_pass_by_value)]

use anyhow::Result;
use arboard::Clipboard;
use crossbeam_channel::Sender;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info, warn};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::watch;

mod layout;
mod stats;
mod status;
mod theme;

use layout::compute_layout;
use stats::StatsPanel;
use status::StatusPanel;
use theme::{BONE, CAUTION_AMBER, DAGGER_RED, HOMING_GREEN, INFO_DIM};

use crate::display::{DisplayModel, Feeds};
use crate::domain::GameId;
use crate::submit::LastSubmission;

// =============================================================================
// STYLE CONSTANTS
// =============================================================================

const STYLE_HEADING: Style = Style::new().fg(DAGGER_RED).add_modifier(Modifier::BOLD);
const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);

const UPDATE_INTERVAL: Duration = Duration::from_millis(500);
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Requests from the UI to the runtime; fire-and-forget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    RewriteConfig,
}

/// Static header text
#[derive(Debug, Clone, Default)]
pub struct HeaderInfo {
    pub version: String,
    pub host: String,
    pub offline: bool,
    pub auto_clipboard: bool,
    pub config_warning: Option<String>,
}

struct LiveApp {
    header: HeaderInfo,
    clipboard: Option<Clipboard>,
    last_seen_game: Option<GameId>,
    notice: Option<(String, Instant)>,
    should_quit: bool,
}

impl LiveApp {
    fn new(header: HeaderInfo) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard unavailable: {e}");
                None
            }
        };
        let notice = header.config_warning.clone().map(|w| (w, Instant::now()));
        Self { header, clipboard, last_seen_game: None, notice, should_quit: false }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers, model: &DisplayModel, commands: &Sender<UiCommand>) {
        match code {
            KeyCode::Char('q' | 'Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.should_quit = true,
            KeyCode::Char('c' | 'C') => self.copy_url(&model.submission),
            KeyCode::F(12) => {
                if commands.send(UiCommand::RewriteConfig).is_ok() {
                    self.set_notice("Default config written; restart to apply");
                }
            }
            _ => {}
        }
    }

    fn copy_url(&mut self, submission: &LastSubmission) {
        let Some(url) = submission.url() else {
            self.set_notice("No game to copy yet");
            return;
        };
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(url.to_string()).map_err(|e| e.to_string()),
            None => Err("clipboard unavailable".to_string()),
        };
        match result {
            Ok(()) => {
                debug!("Copied {url}");
                self.set_notice("Copied game link to clipboard");
            }
            Err(e) => self.set_notice(&format!("Copy failed: {e}")),
        }
    }

    /// Copy each newly submitted game once, when enabled
    fn auto_copy(&mut self, submission: &LastSubmission) {
        let LastSubmission::Submitted { game_id, .. } = submission else {
            return;
        };
        if self.last_seen_game == Some(*game_id) {
            return;
        }
        self.last_seen_game = Some(*game_id);
        if self.header.auto_clipboard {
            self.copy_url(submission);
        }
    }

    fn set_notice(&mut self, text: &str) {
        self.notice = Some((text.to_string(), Instant::now()));
    }

    fn current_notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|(_, at)| at.elapsed() < NOTICE_TTL)
            .map(|(text, _)| text.as_str())
    }
}

/// Draw until the user quits or `shutdown` flips
///
/// # Errors
/// Returns an error if terminal setup or rendering fails
pub fn run_live(
    feeds: Feeds,
    header: HeaderInfo,
    commands: Sender<UiCommand>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    // -------------------------------------------------------------------------
    // Terminal Setup
    // -------------------------------------------------------------------------
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = LiveApp::new(header);
    let mut model = feeds.render();
    let mut last_update: Option<Instant> = None;

    // -------------------------------------------------------------------------
    // Main Event Loop
    // -------------------------------------------------------------------------
    loop {
        if last_update.map_or(true, |t| t.elapsed() >= UPDATE_INTERVAL) {
            model = feeds.render();
            app.auto_copy(&model.submission);
            terminal.draw(|f| draw(f, &app, &model))?;
            last_update = Some(Instant::now());
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key.code, key.modifiers, &model, &commands);
                    last_update = None;
                }
                Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                    app.copy_url(&model.submission);
                    last_update = None;
                }
                Event::Resize(..) => last_update = None,
                _ => {}
            }
        }

        if app.should_quit || *shutdown.borrow() {
            break;
        }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    info!("TUI closed");

    Ok(())
}

fn draw(f: &mut ratatui::Frame, app: &LiveApp, model: &DisplayModel) {
    let area = f.area();
    let config = compute_layout(area.width, area.height);
    let rows = Layout::default().direction(Direction::Vertical).constraints(config.rows()).split(area);
    let mut next = 0;
    let mut take = || {
        let r = rows[next];
        next += 1;
        r
    };

    // Header
    let mut spans = vec![
        Span::styled("ddstats", STYLE_HEADING),
        Span::styled(format!(" v{}", app.header.version), STYLE_DIM),
        Span::styled(" | ", STYLE_DIM),
    ];
    if app.header.offline {
        spans.push(Span::styled("[OFFLINE]", Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD)));
    } else {
        spans.push(Span::styled(app.header.host.clone(), Style::new().fg(BONE)));
    }
    if model.update_available {
        spans.push(Span::styled(" | ", STYLE_DIM));
        spans.push(Span::styled("Update available", Style::new().fg(HOMING_GREEN).add_modifier(Modifier::BOLD)));
    }
    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::new().fg(DAGGER_RED)));
    f.render_widget(header, take());

    // MOTD
    if config.show_motd {
        let motd = model.motd.as_deref().unwrap_or("");
        let paragraph = Paragraph::new(Span::styled(motd, Style::new().fg(BONE)))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Message of the day").border_style(STYLE_DIM));
        f.render_widget(paragraph, take());
    }

    // Main panels
    let main = take();
    let direction = if config.single_column { Direction::Vertical } else { Direction::Horizontal };
    let cols = Layout::default()
        .direction(direction)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(main);
    StatusPanel::new(model).render(f, cols[0]);
    StatsPanel::new(&model.stats).render(f, cols[1]);

    // Status bar keybinds
    if config.show_status_bar {
        let mut keys = vec![
            Span::styled("Q", STYLE_KEY),
            Span::styled(":Quit ", STYLE_DIM),
            Span::styled("C", STYLE_KEY),
            Span::styled(":Copy link ", STYLE_DIM),
            Span::styled("F12", STYLE_KEY),
            Span::styled(":Reset config ", STYLE_DIM),
        ];
        if let Some(notice) = app.current_notice() {
            keys.push(Span::styled(format!("| {notice}"), Style::new().fg(CAUTION_AMBER)));
        }
        let bar = Paragraph::new(Line::from(keys))
            .block(Block::default().borders(Borders::ALL).border_style(STYLE_DIM));
        f.render_widget(bar, take());
    }
}
