//! Full-screen progress monitor
//!
//! The installer runs on a scoped worker thread and reports through an
//! `mpsc` channel; the UI thread drains the channel, redraws, and polls
//! the keyboard. The monitor never feeds anything back into the pipeline.

use std::collections::VecDeque;
use std::io::stdout;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
};
use tracing::{debug, error};

use crate::error::{InstallError, Result};
use crate::install_state::InstallStage;
use crate::progress::ProgressEvent;
use crate::theme::{Colors, Styles, StepStatus};

/// Lines kept in the scroll-back
const LOG_CAPACITY: usize = 500;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything the monitor draws, rebuilt from progress events
#[derive(Debug, Clone)]
pub struct MonitorState {
    stages: Vec<(InstallStage, StepStatus)>,
    percent: u16,
    log: VecDeque<String>,
    failure: Option<String>,
    finished: bool,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            stages: InstallStage::work_stages()
                .iter()
                .map(|stage| (*stage, StepStatus::Pending))
                .collect(),
            percent: 0,
            log: VecDeque::with_capacity(LOG_CAPACITY),
            failure: None,
            finished: false,
        }
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        if let Some(percent) = event.percent() {
            self.percent = percent;
        }
        match event {
            ProgressEvent::StageStarted {
                stage,
                index,
                total,
            } => {
                self.set_status(stage, StepStatus::Active);
                self.push_log(format!("==> [{}/{}] {}", index, total, stage));
            }
            ProgressEvent::StageCompleted { stage, .. } => {
                self.set_status(stage, StepStatus::Complete);
            }
            ProgressEvent::Command(line) => self.push_log(format!("  $ {}", line)),
            ProgressEvent::Failed { stage, message } => {
                self.set_status(stage, StepStatus::Failed);
                self.push_log(format!("!! {} failed: {}", stage, message));
                self.failure = Some(message);
            }
            ProgressEvent::Finished => {
                self.finished = true;
                self.push_log("==> Installation complete".to_string());
            }
        }
    }

    pub fn percent(&self) -> u16 {
        self.percent
    }

    pub fn status_of(&self, stage: InstallStage) -> Option<StepStatus> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, status)| *status)
    }

    pub fn log(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    /// True once the pipeline has either finished or failed
    pub fn is_done(&self) -> bool {
        self.finished || self.failure.is_some()
    }

    fn set_status(&mut self, stage: InstallStage, status: StepStatus) {
        if let Some(entry) = self.stages.iter_mut().find(|(s, _)| *s == stage) {
            entry.1 = status;
        }
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }
}

// =============================================================================
// RENDERING
// =============================================================================

pub fn draw(f: &mut Frame, state: &MonitorState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Gauge
            Constraint::Min(8),    // Stages + log
            Constraint::Length(1), // Status line
        ])
        .split(f.area());

    let title = Paragraph::new("CachyOS Btrfs Installer")
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .style(Styles::title());
    f.render_widget(title, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Installation Progress"),
        )
        .gauge_style(Styles::progress())
        .percent(state.percent.min(100));
    f.render_widget(gauge, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(20)])
        .split(chunks[2]);
    render_stages(f, body[0], state);
    render_log(f, body[1], state);

    let status = match (&state.failure, state.finished) {
        (Some(_), _) => Line::from(Span::styled(
            "Installation failed. Press any key to exit.",
            Styles::error(),
        )),
        (None, true) => Line::from(Span::styled(
            "Installation complete. Press any key to continue.",
            Styles::success(),
        )),
        (None, false) => Line::from(Span::styled(
            "Installing... do not power off the machine.",
            Style::default().fg(Colors::FG_SECONDARY),
        )),
    };
    f.render_widget(Paragraph::new(status), chunks[3]);
}

fn render_stages(f: &mut Frame, area: Rect, state: &MonitorState) {
    let items: Vec<ListItem> = state
        .stages
        .iter()
        .map(|(stage, status)| {
            ListItem::new(format!("{} {}", status.marker(), stage)).style(status.style())
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Stages"));
    f.render_widget(list, area);
}

fn render_log(f: &mut Frame, area: Rect, state: &MonitorState) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .log
        .iter()
        .skip(skip)
        .map(|line| {
            let style = if line.starts_with("!!") {
                Styles::error()
            } else if line.starts_with("  $") {
                Styles::command()
            } else {
                Style::default().fg(Colors::FG_PRIMARY)
            };
            Line::from(Span::styled(line.clone(), style))
        })
        .collect();

    let output = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Output"))
        .wrap(Wrap { trim: false });
    f.render_widget(output, area);
}

// =============================================================================
// EVENT LOOP
// =============================================================================

/// Drain pending events into the state; returns true if anything changed
fn drain(rx: &Receiver<ProgressEvent>, state: &mut MonitorState) -> bool {
    let mut changed = false;
    while let Ok(event) = rx.try_recv() {
        state.apply(event);
        changed = true;
    }
    changed
}

fn key_pressed() -> Result<bool> {
    if event::poll(POLL_INTERVAL)? {
        if let Event::Key(key) = event::read()? {
            return Ok(key.kind == KeyEventKind::Press);
        }
    }
    Ok(false)
}

/// Redraw until the worker is gone, then wait for a key press
fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    rx: &Receiver<ProgressEvent>,
    worker_done: impl Fn() -> bool,
) -> Result<MonitorState> {
    let mut state = MonitorState::new();
    terminal.draw(|f| draw(f, &state))?;

    loop {
        // Checked before draining so the last events are never missed
        let finished = worker_done();
        if drain(rx, &mut state) {
            terminal.draw(|f| draw(f, &state))?;
        }
        if key_pressed()? {
            if finished {
                break;
            }
            debug!("Key press ignored while installing");
        }
    }

    Ok(state)
}

/// Run `work` on a worker thread while the monitor owns the terminal.
///
/// `work` receives the channel end it should hand to the installer as its
/// progress sink. The terminal is restored before this returns, whatever
/// the outcome.
pub fn run_monitored<T, F>(work: F) -> Result<T>
where
    F: FnOnce(&mut Sender<ProgressEvent>) -> Result<T> + Send,
    T: Send,
{
    enable_raw_mode()?;
    if let Err(e) = crossterm::execute!(stdout(), EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }

    let (mut tx, rx) = mpsc::channel();
    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(move || work(&mut tx));

        let ui = Terminal::new(CrosstermBackend::new(stdout()))
            .map_err(InstallError::from)
            .and_then(|mut terminal| event_loop(&mut terminal, &rx, || worker.is_finished()));

        let result = worker.join().unwrap_or_else(|_| {
            error!("Installer thread panicked");
            Err(InstallError::Io(std::io::Error::other(
                "installer thread panicked",
            )))
        });
        (ui, result)
    });

    // Cleanup terminal (always attempt cleanup, even if the install failed)
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), LeaveAlternateScreen);

    let (ui, result) = outcome;
    if let Err(e) = ui {
        error!("Progress monitor error: {}", e);
    }
    result
}
