//! User actions.
//!
//! Everything the player can do goes through [`MissionSession::apply`] as a
//! [`UserAction`]. Actions are serde-serializable so they can be recorded for
//! replay and scripted for the headless driver:
//!
//! ```
//! use mission_engine::actions::{ScriptedAction, UserAction};
//!
//! let script: Vec<ScriptedAction> = serde_json::from_str(r#"[
//!     { "at_ms": 6000, "action": "ping" },
//!     { "at_ms": 50000, "action": { "execute": "OP_CLEAN_LENS" } }
//! ]"#).unwrap();
//! assert_eq!(script[0].action, UserAction::Ping);
//! ```
//!
//! While an unsolved blocking puzzle is open, every action except
//! [`UserAction::Puzzle`] is rejected.

use mission_console::LineCause;
use mission_core::event::{EventPayload, LogTag, TelemetryUpdate};
use mission_core::identity::{EntryId, PuzzleId, Tab};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ports::{sounds, PresentationSink, PuzzleFeedback, SoundPort};
use crate::puzzle::{CloseReason, PuzzleInput};
use crate::session::MissionSession;
use crate::ActionRejected;

/// Signal gain applied by a sync.
pub const SYNC_SIGNAL_GAIN: f64 = 0.02;

// ---------------------------------------------------------------------------
// UserAction
// ---------------------------------------------------------------------------

/// A player command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Round-trip a ping; the pong arrives after twice the link latency.
    Ping,
    /// Report telemetry and nudge the link toward its baseline.
    Sync,
    /// Show the most recent image.
    OpenLast,
    /// Send an operation.
    Execute(String),
    /// Switch the content tab.
    SelectTab(Tab),
    /// Mark an item viewed.
    View {
        /// Tab holding the item.
        tab: Tab,
        /// Item id.
        id: String,
    },
    /// Show a hint.
    Hint(String),
    /// Interact with the open puzzle.
    Puzzle(PuzzleAction),
}

impl UserAction {
    /// Short name for console causes.
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::Ping => "ping",
            UserAction::Sync => "sync",
            UserAction::OpenLast => "open_last",
            UserAction::Execute(_) => "execute",
            UserAction::SelectTab(_) => "select_tab",
            UserAction::View { .. } => "view",
            UserAction::Hint(_) => "hint",
            UserAction::Puzzle(_) => "puzzle",
        }
    }
}

/// Interaction with the open puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleAction {
    /// Forward input to the puzzle.
    Input(PuzzleInput),
    /// Click validate.
    Validate,
    /// Try to dismiss the modal.
    Close(CloseReason),
    /// Bring back a puzzle that was opened by an operation but closed or
    /// replaced before it was solved.
    Reopen(String),
}

/// A user action at a mission time, as read from a script file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedAction {
    /// Mission time at which the action is applied.
    pub at_ms: u64,
    /// The action.
    pub action: UserAction,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

impl<S: SoundPort, P: PresentationSink> MissionSession<S, P> {
    /// Apply a user action, then refresh the presentation.
    pub fn apply(&mut self, action: &UserAction) -> Result<(), ActionRejected> {
        self.sync_now();
        debug!(action = action.name(), "user action");

        if !matches!(action, UserAction::Puzzle(_) | UserAction::Execute(_)) {
            if let Some(puzzle) = self.puzzle.current().filter(|_| self.puzzle.is_blocking()) {
                let rejection = ActionRejected::PuzzleBlocking(puzzle.clone());
                warn!(action = action.name(), %rejection, "action rejected");
                return Err(rejection);
            }
        }

        let result = match action {
            UserAction::Ping => {
                self.ping();
                Ok(())
            }
            UserAction::Sync => {
                self.sync();
                Ok(())
            }
            UserAction::OpenLast => self.open_last(),
            // Execute runs its own gate checks and logs its own rejections.
            UserAction::Execute(op) => return self.execute(op),
            UserAction::SelectTab(tab) => {
                self.state.select_tab(*tab);
                Ok(())
            }
            UserAction::View { tab, id } => {
                self.state.view(*tab, id);
                Ok(())
            }
            UserAction::Hint(key) => self.hint(key),
            UserAction::Puzzle(PuzzleAction::Input(input)) => self.puzzle_input(input),
            UserAction::Puzzle(PuzzleAction::Validate) => self.validate_puzzle().map(|_| ()),
            UserAction::Puzzle(PuzzleAction::Close(reason)) => self.close_puzzle(*reason),
            UserAction::Puzzle(PuzzleAction::Reopen(id)) => self.reopen_puzzle(id),
        };

        if let Err(rejection) = &result {
            warn!(action = action.name(), %rejection, "action rejected");
        }
        self.refresh_presentation();
        result
    }

    fn ping(&mut self) {
        let latency = self.state.telemetry().latency_ms;
        let cause = LineCause::UserAction("ping".to_owned());
        self.log(LogTag::Tx, "PING", cause);
        self.schedule_in(
            latency.saturating_mul(2),
            EventPayload::log(LogTag::Rx, format!("PONG ({} ms round trip)", latency.saturating_mul(2))),
        );
    }

    fn sync(&mut self) {
        let telemetry = self.state.telemetry();
        let baseline = self.config.initial_latency_ms;
        self.log(
            LogTag::Sys,
            format!(
                "Telemetry: signal {:.0}%, latency {} ms.",
                telemetry.signal_quality * 100.0,
                telemetry.latency_ms
            ),
            LineCause::UserAction("sync".to_owned()),
        );

        // Halve the distance to the baseline latency.
        let latency = if telemetry.latency_ms > baseline {
            telemetry.latency_ms - (telemetry.latency_ms - baseline) / 2
        } else {
            telemetry.latency_ms + (baseline - telemetry.latency_ms) / 2
        };
        self.schedule_in(
            0,
            EventPayload::UpdateTelemetry(TelemetryUpdate {
                signal_quality: Some((telemetry.signal_quality + SYNC_SIGNAL_GAIN).min(1.0)),
                latency_ms: Some(latency),
            }),
        );
    }

    fn open_last(&mut self) -> Result<(), ActionRejected> {
        let Some(image) = self.state.last_image().cloned() else {
            self.log(
                LogTag::Warn,
                "No image received yet.",
                LineCause::UserAction("open_last".to_owned()),
            );
            return Err(ActionRejected::NoImage);
        };
        self.state.select_tab(Tab::Images);
        self.state.view(Tab::Images, image.as_str());
        Ok(())
    }

    fn hint(&mut self, key: &str) -> Result<(), ActionRejected> {
        let text = match self.content.hint(key) {
            Ok(text) => text.to_owned(),
            Err(err) => {
                warn!(%err, "hint not shown");
                return Err(ActionRejected::UnknownHint(key.to_owned()));
            }
        };
        self.log(LogTag::Hint, text, LineCause::UserAction(format!("hint {key}")));
        Ok(())
    }

    fn puzzle_input(&mut self, input: &PuzzleInput) -> Result<(), ActionRejected> {
        let surface = self.puzzle.input(input)?;
        self.presentation.update_puzzle(&surface);
        Ok(())
    }

    /// Validate the open puzzle. On success the reward is applied, the modal
    /// is scheduled to close after `puzzle_close_delay_ms`, and a first-try
    /// solve earns the combo bonus. Returns whether the puzzle was solved.
    pub(crate) fn validate_puzzle(&mut self) -> Result<bool, ActionRejected> {
        let outcome = self.puzzle.validate()?;
        let cause = LineCause::Puzzle(outcome.puzzle.clone());
        let success = outcome.validation.success;

        self.presentation.puzzle_feedback(&PuzzleFeedback {
            message: outcome.validation.message.clone(),
            success,
            shake: !success,
        });
        if let Some(text) = outcome.validation.log_message {
            self.log(LogTag::Puzzle, text, cause.clone());
        }

        let Some(reward) = outcome.reward else {
            self.play(sounds::ERROR);
            return Ok(false);
        };

        info!(puzzle = %outcome.puzzle, first_try = outcome.first_try, "puzzle solved");
        self.play(sounds::SOLVED);
        self.state.mark_puzzle_solved(outcome.puzzle.clone());
        for clue in reward.clues {
            self.state.add_clue(clue);
        }
        self.add_entries(reward.journal_entries, Tab::Journal);
        self.add_entries(reward.encyclopedia_entries, Tab::Encyclopedia);

        if outcome.first_try && self.config.combo_bonus_ms > 0 {
            let applied = self.clock.apply_bonus(self.config.combo_bonus_ms);
            if applied > 0 {
                self.sync_now();
                self.log(
                    LogTag::Bonus,
                    format!("Solved on the first try: -{:.1} s mission time.", applied as f64 / 1_000.0),
                    cause,
                );
            }
        }

        let close_at = self.now.plus(self.config.puzzle_close_delay_ms);
        self.puzzle.schedule_close(close_at);
        self.recompute_progress();
        Ok(true)
    }

    fn add_entries(&mut self, entries: Vec<EntryId>, tab: Tab) {
        let mut added = false;
        for entry in entries {
            added |= match tab {
                Tab::Encyclopedia => self.state.add_encyclopedia_entry(entry),
                _ => self.state.add_journal_entry(entry),
            };
        }
        if added {
            self.notify_arrival(tab);
        }
    }

    fn reopen_puzzle(&mut self, id: &str) -> Result<(), ActionRejected> {
        if let Some(open) = self.puzzle.current().filter(|_| self.puzzle.is_blocking()) {
            return Err(ActionRejected::PuzzleBlocking(open.clone()));
        }
        if self.state.is_puzzle_solved(id) {
            return Err(ActionRejected::PuzzleAlreadySolved(PuzzleId::from(id)));
        }
        if !self.state.was_puzzle_opened(id) {
            return Err(ActionRejected::PuzzleUnavailable(id.to_owned()));
        }
        if self.puzzle.current().is_some_and(|open| open == id) {
            return Ok(());
        }
        self.open_puzzle(id);
        Ok(())
    }

    fn close_puzzle(&mut self, reason: CloseReason) -> Result<(), ActionRejected> {
        match self.puzzle.request_close(reason) {
            Ok(id) => {
                self.presentation.hide_puzzle();
                debug!(puzzle = %id, "puzzle dismissed");
                self.note_set_aside(&id);
                Ok(())
            }
            Err(rejection) => {
                self.presentation.puzzle_feedback(&PuzzleFeedback {
                    message: "Finish the procedure before closing.".to_owned(),
                    success: false,
                    shake: true,
                });
                Err(rejection)
            }
        }
    }
}
