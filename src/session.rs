//! UI-side run state: which controls are live, the progress bar, the log
//! panel and the channel the current worker reports on.

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::WorkerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Stop requested; the worker has not reached an item boundary yet
    Stopping,
    Paused { resume_index: usize },
}

/// Which buttons are clickable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub download: bool,
    pub stop: bool,
    pub resume: bool,
}

impl RunState {
    pub fn controls(self) -> Controls {
        match self {
            RunState::Idle => Controls {
                download: true,
                stop: false,
                resume: false,
            },
            RunState::Running => Controls {
                download: false,
                stop: true,
                resume: false,
            },
            RunState::Stopping => Controls {
                download: false,
                stop: false,
                resume: false,
            },
            RunState::Paused { .. } => Controls {
                download: true,
                stop: false,
                resume: true,
            },
        }
    }
}

/// Message shown in a popup until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Info(String),
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::Warning(_) => "Error",
            Notice::Info(_) => "Done",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Warning(m) | Notice::Info(m) => m,
        }
    }
}

/// Handles a freshly started worker needs.
pub struct RunHandle {
    pub stop: CancellationToken,
    pub events: UnboundedSender<WorkerEvent>,
}

pub struct Session {
    state: RunState,
    progress: u8,
    log: Vec<String>,
    notice: Option<Notice>,
    stop: Option<CancellationToken>,
    events: Option<UnboundedReceiver<WorkerEvent>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            progress: 0,
            log: Vec::new(),
            notice: None,
            stop: None,
            events: None,
        }
    }
}

impl Session {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn controls(&self) -> Controls {
        self.state.controls()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Index a Resume click would continue from.
    pub fn resume_index(&self) -> Option<usize> {
        match self.state {
            RunState::Paused { resume_index } => Some(resume_index),
            _ => None,
        }
    }

    /// Moves to `Running` for a run starting at `start_index`.
    ///
    /// Returns `None` while a worker is still active.
    pub fn begin(&mut self, start_index: usize) -> Option<RunHandle> {
        if matches!(self.state, RunState::Running | RunState::Stopping) {
            return None;
        }
        if start_index == 0 {
            self.progress = 0;
        }
        let stop = CancellationToken::new();
        let (tx, rx) = unbounded_channel();
        self.stop = Some(stop.clone());
        self.events = Some(rx);
        self.notice = None;
        self.state = RunState::Running;
        Some(RunHandle { stop, events: tx })
    }

    /// Asks the worker to stop at the next item boundary.
    pub fn request_stop(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        if let Some(stop) = &self.stop {
            stop.cancel();
        }
        self.state = RunState::Stopping;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice::Warning(message.into()));
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Applies every event the worker has sent since the last frame.
    pub fn poll(&mut self) {
        loop {
            let Some(rx) = self.events.as_mut() else {
                return;
            };
            match rx.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    // The worker went away without a terminal event.
                    if matches!(self.state, RunState::Running | RunState::Stopping) {
                        warn!("download worker exited unexpectedly");
                        self.state = RunState::Idle;
                    }
                    self.release();
                    return;
                }
            }
        }
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(value) => self.progress = value.min(100),
            WorkerEvent::Log(line) => self.log.push(line),
            WorkerEvent::VideoDownloaded(path) => {
                debug!(path = %path.display(), "video downloaded");
            }
            WorkerEvent::Stopped { resume_index } => {
                self.state = RunState::Paused { resume_index };
                self.release();
            }
            WorkerEvent::Finished => {
                self.state = RunState::Idle;
                self.notice = Some(Notice::Info("All videos have been downloaded!".into()));
                self.release();
            }
            WorkerEvent::Failed => {
                self.state = RunState::Idle;
                self.release();
            }
        }
    }

    fn release(&mut self) {
        self.stop = None;
        self.events = None;
    }
}
