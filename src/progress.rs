//! Progress notifications from the installer.
//!
//! The installer pushes plain values into a `ProgressSink`; it never reads
//! anything back. The terminal monitor receives them over an `mpsc` channel,
//! the plain CLI logs them, tests collect them in a `Vec`.

use std::sync::mpsc::Sender;

use tracing::{error, info};

use crate::install_state::InstallStage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A stage was entered; `index` is 1-based
    StageStarted {
        stage: InstallStage,
        index: usize,
        total: usize,
    },
    /// A stage finished; `completed` of `total` stages are now done
    StageCompleted {
        stage: InstallStage,
        completed: usize,
        total: usize,
    },
    /// A command is about to run
    Command(String),
    /// The stage failed and the pipeline halted
    Failed { stage: InstallStage, message: String },
    /// Every stage completed
    Finished,
}

impl ProgressEvent {
    /// Progress percentage carried by this event, if any
    pub fn percent(&self) -> Option<u16> {
        match self {
            Self::StageCompleted {
                completed, total, ..
            } if *total > 0 => Some((completed * 100 / total) as u16),
            Self::Finished => Some(100),
            _ => None,
        }
    }
}

/// Receiver of progress notifications.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

/// Reports progress through tracing.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted {
                stage,
                index,
                total,
            } => info!("[{}/{}] {}", index, total, stage),
            ProgressEvent::StageCompleted {
                completed, total, ..
            } => info!("Progress: {}%", completed * 100 / total.max(1)),
            // The executor already logs each command
            ProgressEvent::Command(_) => {}
            ProgressEvent::Failed { stage, message } => {
                error!("{} failed: {}", stage, message)
            }
            ProgressEvent::Finished => info!("Installation complete"),
        }
    }
}

impl ProgressSink for Sender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        // A closed receiver means the UI is gone; the installer carries on
        let _ = self.send(event);
    }
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}
