//! Boundary contracts between the session and its host.
//!
//! The session never talks to audio or rendering directly. It calls a
//! [`SoundPort`] and a [`PresentationSink`] supplied by the host:
//!
//! - Sound is best-effort. A failing `play`/`stop` is logged with
//!   `tracing::warn!` and otherwise ignored; it never reaches Domain State.
//! - Presentation is write-only. The sink is handed read-only views of the
//!   state and the console lines as they are appended.
//!
//! [`NullSound`] and [`NullPresentation`] are the headless defaults.
//! [`RecordingPresentation`] keeps counters and copies of what it was shown,
//! which is what tests and the headless driver use.

use mission_console::LogLine;
use mission_core::content::{ContentTables, OperationSpec};
use mission_core::identity::Tab;
use mission_core::state::MissionState;
use mission_core::MissionTime;

/// Sound effect names used by the session.
pub mod sounds {
    /// A transmission arrived.
    pub const INCOMING: &str = "incoming";
    /// An image arrived.
    pub const IMAGE: &str = "image";
    /// A capability unlocked.
    pub const UNLOCK: &str = "unlock";
    /// An operation was sent.
    pub const UPLINK: &str = "uplink";
    /// An operation completed.
    pub const COMPLETE: &str = "complete";
    /// An action was rejected.
    pub const ERROR: &str = "error";
    /// A puzzle was solved.
    pub const SOLVED: &str = "solved";
    /// Looping carrier hum while the link is degraded.
    pub const STATIC: &str = "static";
}

// ---------------------------------------------------------------------------
// SoundPort
// ---------------------------------------------------------------------------

/// Why a sound could not be played.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SoundError {
    /// The named sound is not loaded.
    #[error("sound '{0}' is not available")]
    Unavailable(String),
    /// The backend refused to play.
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Play or stop named sounds.
pub trait SoundPort {
    /// Start playing `name`.
    fn play(&mut self, name: &str) -> Result<(), SoundError>;
    /// Stop playing `name`.
    fn stop(&mut self, name: &str) -> Result<(), SoundError>;
}

/// Silently accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSound;

impl SoundPort for NullSound {
    fn play(&mut self, _name: &str) -> Result<(), SoundError> {
        Ok(())
    }

    fn stop(&mut self, _name: &str) -> Result<(), SoundError> {
        Ok(())
    }
}

/// Remembers what it was asked to play; optionally fails every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingSound {
    /// Names passed to `play`, in order.
    pub played: Vec<String>,
    /// Names passed to `stop`, in order.
    pub stopped: Vec<String>,
    /// When set, every call fails after being recorded.
    pub fail: bool,
}

impl SoundPort for RecordingSound {
    fn play(&mut self, name: &str) -> Result<(), SoundError> {
        self.played.push(name.to_owned());
        if self.fail {
            return Err(SoundError::Playback(format!("{name}: device unavailable")));
        }
        Ok(())
    }

    fn stop(&mut self, name: &str) -> Result<(), SoundError> {
        self.stopped.push(name.to_owned());
        if self.fail {
            return Err(SoundError::Playback(format!("{name}: device unavailable")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PresentationSink
// ---------------------------------------------------------------------------

/// Inline feedback shown inside a puzzle modal.
#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleFeedback {
    /// Message for the player.
    pub message: String,
    /// Whether validation succeeded.
    pub success: bool,
    /// Play the non-destructive shake effect.
    pub shake: bool,
}

/// Renders mission state for the player.
pub trait PresentationSink {
    /// Status strip: mission time, progress, telemetry, in-progress operation.
    fn render_status(&mut self, state: &MissionState, now: MissionTime);

    /// The active content tab and the unread indicators of all tabs.
    fn render_active_tab(&mut self, state: &MissionState, content: &ContentTables);

    /// The operations button panel.
    fn render_operations_panel(&mut self, state: &MissionState, operations: &[OperationSpec]);

    /// A new console line.
    fn append_log_line(&mut self, line: &LogLine);

    /// Transient badge on a tab that just received an unread item.
    fn notify(&mut self, _tab: Tab) {}

    /// Open the puzzle modal.
    fn show_puzzle(&mut self, _title: &str, _instructions: &str, _blocking: bool, _surface: &str) {}

    /// Redraw the puzzle surface after input.
    fn update_puzzle(&mut self, _surface: &str) {}

    /// Inline feedback after a validate click.
    fn puzzle_feedback(&mut self, _feedback: &PuzzleFeedback) {}

    /// Close the puzzle modal.
    fn hide_puzzle(&mut self) {}
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl PresentationSink for NullPresentation {
    fn render_status(&mut self, _state: &MissionState, _now: MissionTime) {}
    fn render_active_tab(&mut self, _state: &MissionState, _content: &ContentTables) {}
    fn render_operations_panel(&mut self, _state: &MissionState, _operations: &[OperationSpec]) {}
    fn append_log_line(&mut self, _line: &LogLine) {}
}

/// Counts renders and keeps what it was shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresentation {
    /// `render_status` calls.
    pub status_renders: u64,
    /// `render_active_tab` calls.
    pub tab_renders: u64,
    /// `render_operations_panel` calls.
    pub panel_renders: u64,
    /// Rendered console lines.
    pub log: Vec<String>,
    /// Tabs that received a badge.
    pub notifications: Vec<Tab>,
    /// Title of the open puzzle modal.
    pub puzzle_title: Option<String>,
    /// Latest puzzle surface.
    pub puzzle_surface: Option<String>,
    /// Feedback shown in the modal, in order.
    pub feedback: Vec<PuzzleFeedback>,
    /// Labels of the buttons enabled at the last panel render.
    pub enabled_operations: Vec<String>,
}

impl PresentationSink for RecordingPresentation {
    fn render_status(&mut self, _state: &MissionState, _now: MissionTime) {
        self.status_renders += 1;
    }

    fn render_active_tab(&mut self, _state: &MissionState, _content: &ContentTables) {
        self.tab_renders += 1;
    }

    fn render_operations_panel(&mut self, state: &MissionState, operations: &[OperationSpec]) {
        self.panel_renders += 1;
        self.enabled_operations = operations
            .iter()
            .filter(|op| {
                state.has_capability(op.id.as_str())
                    && !state.is_executed(op.id.as_str())
                    && state.operation_in_progress().is_none()
            })
            .map(|op| op.label.clone())
            .collect();
    }

    fn append_log_line(&mut self, line: &LogLine) {
        self.log.push(line.render());
    }

    fn notify(&mut self, tab: Tab) {
        self.notifications.push(tab);
    }

    fn show_puzzle(&mut self, title: &str, _instructions: &str, _blocking: bool, surface: &str) {
        self.puzzle_title = Some(title.to_owned());
        self.puzzle_surface = Some(surface.to_owned());
    }

    fn update_puzzle(&mut self, surface: &str) {
        self.puzzle_surface = Some(surface.to_owned());
    }

    fn puzzle_feedback(&mut self, feedback: &PuzzleFeedback) {
        self.feedback.push(feedback.clone());
    }

    fn hide_puzzle(&mut self) {
        self.puzzle_title = None;
        self.puzzle_surface = None;
    }
}
