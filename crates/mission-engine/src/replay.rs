//! Deterministic replay with action recording and checkpoint verification.
//!
//! A headless session is fully determined by its config and the user actions
//! applied between ticks. [`ActionRecorder`] captures those actions with the
//! tick count at which they were applied, plus periodic state hash
//! checkpoints, producing an [`ActionLog`]. [`replay`] rebuilds a fresh
//! session from the log's config, re-applies the actions at the same ticks
//! and compares hashes at each checkpoint.
//!
//! # Recording and replaying
//!
//! ```
//! use mission_engine::prelude::*;
//!
//! let mut driver = HeadlessDriver::recording(MissionConfig::default(), 10).unwrap();
//! driver.run_ticks(60);
//! let _ = driver.apply(UserAction::Ping);
//! driver.run_ticks(60);
//! let log = driver.finish_recording().unwrap();
//!
//! let result = replay(&log).expect("log is well-formed");
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! assert_eq!(result.ticks_replayed, 120);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actions::UserAction;
use crate::config::MissionConfig;
use crate::tick::HeadlessDriver;

// ---------------------------------------------------------------------------
// ActionLog
// ---------------------------------------------------------------------------

/// A recorded run: config, total ticks, and the ordered actions and
/// checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    /// Config the run started from.
    pub config: MissionConfig,
    /// Ticks run before recording finished.
    pub total_ticks: u64,
    /// Actions and checkpoints in the order they happened.
    pub entries: Vec<ActionEntry>,
}

/// One entry of an [`ActionLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEntry {
    /// An action applied after `tick` ticks had run.
    Action {
        /// Tick count at the time of the action.
        tick: u64,
        /// The action.
        action: UserAction,
    },
    /// State hash after tick `tick` completed.
    Checkpoint {
        /// Tick count at the time of the checkpoint.
        tick: u64,
        /// BLAKE3 hex digest of the session.
        state_hash: String,
    },
}

impl ActionEntry {
    /// Tick count the entry belongs to.
    pub fn tick(&self) -> u64 {
        match self {
            ActionEntry::Action { tick, .. } | ActionEntry::Checkpoint { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of [`replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every tick ran and every checkpoint matched.
    pub completed: bool,
    /// Ticks run during replay.
    pub ticks_replayed: u64,
    /// The first checkpoint whose hash did not match.
    pub first_divergence: Option<ReplayDivergence>,
    /// Hash of the replayed session at the end.
    pub final_hash: String,
}

/// A determinism failure found during replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    /// Tick of the failing checkpoint.
    pub tick: u64,
    /// Hash recorded in the log.
    pub expected_hash: String,
    /// Hash computed during replay.
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ActionRecorder
// ---------------------------------------------------------------------------

/// Builds an [`ActionLog`] while a session runs.
#[derive(Debug, Clone)]
pub struct ActionRecorder {
    log: ActionLog,
    checkpoint_interval: u64,
}

impl ActionRecorder {
    /// Start recording a session built from `config`. A checkpoint is taken
    /// every `checkpoint_interval` ticks; 0 disables checkpoints.
    pub fn new(config: MissionConfig, checkpoint_interval: u64) -> Self {
        Self {
            log: ActionLog {
                config,
                total_ticks: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
        }
    }

    /// Record an action applied after `tick` ticks.
    pub fn record_action(&mut self, tick: u64, action: UserAction) {
        self.log.entries.push(ActionEntry::Action { tick, action });
    }

    /// Called after tick `tick` completes. `state_hash` is only evaluated on
    /// checkpoint ticks.
    pub fn record_tick(&mut self, tick: u64, state_hash: impl FnOnce() -> String) {
        if self.checkpoint_interval > 0 && tick % self.checkpoint_interval == 0 {
            self.log.entries.push(ActionEntry::Checkpoint {
                tick,
                state_hash: state_hash(),
            });
        }
    }

    /// Finish recording after `total_ticks` ticks.
    pub fn finish(mut self, total_ticks: u64) -> ActionLog {
        self.log.total_ticks = total_ticks;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on a fresh headless session and verify every checkpoint.
///
/// Rejected actions are replayed too; a rejection is part of the recorded
/// behavior. Replay stops at the first divergence.
///
/// # Errors
///
/// Returns an error if the log is malformed (entries out of tick order,
/// entries past `total_ticks`, invalid config). All validation happens
/// before the session is built.
pub fn replay(log: &ActionLog) -> Result<ReplayResult, anyhow::Error> {
    // Validate the log before running anything.
    log.config
        .validate()
        .map_err(|e| anyhow::anyhow!("replay log has an invalid config: {e}"))?;
    let mut last_tick = 0;
    for entry in &log.entries {
        let tick = entry.tick();
        if tick < last_tick {
            anyhow::bail!("replay log entry at tick {tick} follows an entry at tick {last_tick}");
        }
        if tick > log.total_ticks {
            anyhow::bail!(
                "replay log entry at tick {tick} is past the end of the run ({} ticks)",
                log.total_ticks
            );
        }
        last_tick = tick;
    }

    let mut driver = HeadlessDriver::new(log.config.clone())
        .map_err(|e| anyhow::anyhow!("failed to build session for replay: {e}"))?;

    for entry in &log.entries {
        while driver.session().tick_count() < entry.tick() {
            driver.step();
        }
        match entry {
            ActionEntry::Action { action, .. } => {
                if let Err(rejection) = driver.apply(action.clone()) {
                    debug!(%rejection, "replayed action rejected");
                }
            }
            ActionEntry::Checkpoint { tick, state_hash } => {
                let actual_hash = driver.session().state_hash();
                if &actual_hash != state_hash {
                    warn!(tick, "replay diverged");
                    return Ok(ReplayResult {
                        completed: false,
                        ticks_replayed: driver.session().tick_count(),
                        first_divergence: Some(ReplayDivergence {
                            tick: *tick,
                            expected_hash: state_hash.clone(),
                            actual_hash: actual_hash.clone(),
                        }),
                        final_hash: actual_hash,
                    });
                }
            }
        }
    }

    while driver.session().tick_count() < log.total_ticks {
        driver.step();
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed: driver.session().tick_count(),
        first_divergence: None,
        final_hash: driver.session().state_hash(),
    })
}

#[cfg(test)]
mod tests {
    use mission_core::content::ids;
    use mission_core::identity::Tab;

    use super::*;

    fn recorded_run() -> (ActionLog, String) {
        let mut driver = HeadlessDriver::recording(MissionConfig::default(), 25).unwrap();
        driver.run_ticks(160);
        driver.apply(UserAction::OpenLast).unwrap();
        let _ = driver.apply(UserAction::Execute(ids::OP_CLEAN_LENS.to_owned()));
        driver.run_ticks(40);
        driver.apply(UserAction::Sync).unwrap();
        driver.apply(UserAction::SelectTab(Tab::Encyclopedia)).unwrap();
        driver.run_ticks(100);
        let hash = driver.session().state_hash();
        (driver.finish_recording().unwrap(), hash)
    }

    // -- 1. Recording -------------------------------------------------------

    #[test]
    fn recorder_captures_actions_and_checkpoints() {
        let (log, _) = recorded_run();
        assert_eq!(log.total_ticks, 300);
        let actions = log
            .entries
            .iter()
            .filter(|e| matches!(e, ActionEntry::Action { .. }))
            .count();
        let checkpoints = log.entries.len() - actions;
        assert_eq!(actions, 4);
        assert_eq!(checkpoints, 300 / 25);
    }

    #[test]
    fn zero_interval_records_no_checkpoints() {
        let mut recorder = ActionRecorder::new(MissionConfig::default(), 0);
        recorder.record_tick(10, || unreachable!());
        assert!(recorder.finish(10).entries.is_empty());
    }

    // -- 2. Replay ----------------------------------------------------------

    #[test]
    fn replay_reproduces_final_hash() {
        let (log, hash) = recorded_run();
        let result = replay(&log).unwrap();
        assert!(result.completed);
        assert_eq!(result.ticks_replayed, 300);
        assert_eq!(result.final_hash, hash);
    }

    #[test]
    fn replay_survives_json_round_trip() {
        let (log, hash) = recorded_run();
        let json = serde_json::to_string(&log).unwrap();
        let back: ActionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(replay(&back).unwrap().final_hash, hash);
    }

    #[test]
    fn dropped_action_is_detected_as_divergence() {
        let (mut log, _) = recorded_run();
        let sync = log
            .entries
            .iter()
            .position(|e| matches!(e, ActionEntry::Action { action: UserAction::Sync, .. }))
            .unwrap();
        log.entries.remove(sync);

        let result = replay(&log).unwrap();
        assert!(!result.completed);
        let divergence = result.first_divergence.unwrap();
        assert_eq!(divergence.tick, 225);
        assert_ne!(divergence.expected_hash, divergence.actual_hash);
    }

    // -- 3. Validation ------------------------------------------------------

    #[test]
    fn out_of_order_entries_are_rejected() {
        let mut log = ActionRecorder::new(MissionConfig::default(), 0).finish(20);
        log.entries.push(ActionEntry::Action {
            tick: 10,
            action: UserAction::Ping,
        });
        log.entries.push(ActionEntry::Action {
            tick: 5,
            action: UserAction::Ping,
        });
        assert!(replay(&log).is_err());
    }

    #[test]
    fn entries_past_the_end_are_rejected() {
        let mut log = ActionRecorder::new(MissionConfig::default(), 0).finish(20);
        log.entries.push(ActionEntry::Action {
            tick: 21,
            action: UserAction::Ping,
        });
        let err = replay(&log).unwrap_err();
        assert!(err.to_string().contains("past the end"));
    }

    #[test]
    fn empty_log_replays_trivially() {
        let log = ActionRecorder::new(MissionConfig::default(), 0).finish(0);
        let result = replay(&log).unwrap();
        assert!(result.completed);
        assert_eq!(result.ticks_replayed, 0);
    }
}
