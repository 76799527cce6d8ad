//! Puzzle sub-engine: the mini-game contract and the modal host.
//!
//! Some operations resolve by opening a puzzle instead of producing a result
//! directly. A puzzle is described by a [`PuzzleConfig`] (title, instructions,
//! reward and a constructor) and instantiated as a `Box<dyn Puzzle>` when it
//! opens. The [`PuzzleHost`] owns at most one open instance and enforces the
//! modal rules:
//!
//! - A **blocking** puzzle cannot be dismissed until it is solved, and while
//!   it is unsolved the session rejects every non-puzzle action.
//! - A successful validation keeps the modal up until the close delay has
//!   passed; a failed one leaves it open for another try.
//! - `cleanup()` runs exactly once per instance, on whichever path closes it
//!   (explicit close, timed close after success, replacement, or host drop).
//!
//! The host knows nothing about the Domain State. It reports outcomes and the
//! session applies rewards.
//!
//! # Example
//!
//! ```
//! use mission_engine::puzzle::{PuzzleCatalogue, PuzzleContext, PuzzleHost};
//! use mission_core::state::TechVars;
//! use mission_core::MissionTime;
//!
//! let catalogue = PuzzleCatalogue::standard();
//! let config = catalogue.get("spectrum_decode").unwrap();
//! let ctx = PuzzleContext { seed: 7, now: MissionTime(90_000), tech: TechVars::default() };
//!
//! let mut host = PuzzleHost::new();
//! host.open(config, &ctx);
//! assert!(host.is_open());
//! assert!(!host.is_blocking());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use mission_core::content::ids;
use mission_core::identity::{ClueId, EntryId, PuzzleId};
use mission_core::state::TechVars;
use mission_core::{MissionError, MissionTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::puzzles;
use crate::ActionRejected;

// ---------------------------------------------------------------------------
// Puzzle contract
// ---------------------------------------------------------------------------

/// Player input to an open puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleInput {
    /// Turn dial `dial` to `value` degrees.
    SetDial {
        /// Dial index.
        dial: usize,
        /// New reading in degrees.
        value: i32,
    },
    /// Toggle item `index` on or off.
    Toggle {
        /// Item index.
        index: usize,
    },
    /// Select the grid cell at `row`, `col`.
    Select {
        /// Grid row.
        row: usize,
        /// Grid column.
        col: usize,
    },
}

/// Result of a validate click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the puzzle is solved.
    pub success: bool,
    /// Feedback for the modal.
    pub message: String,
    /// Optional line for the mission console.
    pub log_message: Option<String>,
}

impl Validation {
    /// A successful validation.
    pub fn solved(message: impl Into<String>, log_message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            log_message: Some(log_message.into()),
        }
    }

    /// A failed validation with modal feedback only.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            log_message: None,
        }
    }
}

/// An open mini-game instance.
pub trait Puzzle {
    /// Whether the modal must stay up until solved.
    fn blocking(&self) -> bool;

    /// Apply player input. Returns `false` if the input does not apply to
    /// this puzzle or is out of range.
    fn handle_input(&mut self, input: &PuzzleInput) -> bool;

    /// Check the current configuration.
    fn validate(&mut self) -> Validation;

    /// Text rendering of the puzzle surface for the presentation sink.
    fn surface(&self) -> String;

    /// Release whatever the instance holds. Called exactly once.
    fn cleanup(&mut self) {}
}

/// Inputs available to a puzzle constructor.
#[derive(Debug, Clone)]
pub struct PuzzleContext {
    /// Seed for the puzzle's random layout.
    pub seed: u64,
    /// Mission time the puzzle opens.
    pub now: MissionTime,
    /// Probe readings at open time.
    pub tech: TechVars,
}

// ---------------------------------------------------------------------------
// PuzzleConfig / PuzzleReward
// ---------------------------------------------------------------------------

/// What a solved puzzle grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleReward {
    /// Clues added to the Domain State.
    pub clues: Vec<ClueId>,
    /// Journal entries added.
    pub journal_entries: Vec<EntryId>,
    /// Encyclopedia entries added.
    pub encyclopedia_entries: Vec<EntryId>,
}

/// Puzzle constructor.
pub type PuzzleInit = fn(&PuzzleContext) -> Box<dyn Puzzle>;

/// Static description of a puzzle.
#[derive(Clone)]
pub struct PuzzleConfig {
    /// Puzzle id.
    pub id: PuzzleId,
    /// Modal title.
    pub title: String,
    /// Modal instructions.
    pub instructions: String,
    /// Granted on success.
    pub reward: PuzzleReward,
    /// Builds the instance when the puzzle opens.
    pub init: PuzzleInit,
}

impl fmt::Debug for PuzzleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PuzzleConfig")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("reward", &self.reward)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PuzzleCatalogue
// ---------------------------------------------------------------------------

/// The puzzles a session can open, by id.
#[derive(Debug, Clone, Default)]
pub struct PuzzleCatalogue {
    configs: BTreeMap<PuzzleId, PuzzleConfig>,
}

impl PuzzleCatalogue {
    /// An empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// The three built-in puzzles.
    pub fn standard() -> Self {
        let mut catalogue = Self::new();
        catalogue.register(PuzzleConfig {
            id: PuzzleId::from(ids::PUZZLE_ANTENNA),
            title: "High-gain antenna alignment".to_owned(),
            instructions: "Turn azimuth, elevation and polarization until each dial sits on the carrier peak, then lock.".to_owned(),
            reward: PuzzleReward {
                clues: vec![ClueId::from(ids::ANTENNA_ALIGNED)],
                journal_entries: vec![EntryId::from("antenna-log")],
                encyclopedia_entries: Vec::new(),
            },
            init: puzzles::antenna,
        });
        catalogue.register(PuzzleConfig {
            id: PuzzleId::from(ids::PUZZLE_SPECTRUM),
            title: "Spectrum decode".to_owned(),
            instructions: "Mark the bands that carry the periodic emission, then decode.".to_owned(),
            reward: PuzzleReward {
                clues: vec![ClueId::from(ids::SPECTRUM_DECODED)],
                journal_entries: Vec::new(),
                encyclopedia_entries: vec![EntryId::from("signal_pattern")],
            },
            init: puzzles::spectrum,
        });
        catalogue.register(PuzzleConfig {
            id: PuzzleId::from(ids::PUZZLE_TRIANGULATION),
            title: "Origin triangulation".to_owned(),
            instructions: "Pick the grid cell where the three bearings cross.".to_owned(),
            reward: PuzzleReward {
                clues: vec![ClueId::from(ids::ORIGIN_IDENTIFIED)],
                journal_entries: vec![EntryId::from("mission_complete")],
                encyclopedia_entries: Vec::new(),
            },
            init: puzzles::triangulation,
        });
        catalogue
    }

    /// Add or replace a puzzle. Returns the config it replaced.
    pub fn register(&mut self, config: PuzzleConfig) -> Option<PuzzleConfig> {
        self.configs.insert(config.id.clone(), config)
    }

    /// Look up a puzzle.
    pub fn get(&self, id: &str) -> Result<&PuzzleConfig, MissionError> {
        self.configs
            .get(&PuzzleId::from(id))
            .ok_or_else(|| MissionError::UnknownContent {
                kind: "puzzle",
                id: id.to_owned(),
            })
    }

    /// Registered ids.
    pub fn ids(&self) -> impl Iterator<Item = &PuzzleId> {
        self.configs.keys()
    }
}

// ---------------------------------------------------------------------------
// PuzzleHost
// ---------------------------------------------------------------------------

/// How the player tried to dismiss the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The close button.
    Button,
    /// A click outside the modal.
    Backdrop,
    /// The escape key.
    Escape,
}

/// Outcome of [`PuzzleHost::validate`].
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// The validated puzzle.
    pub puzzle: PuzzleId,
    /// What the puzzle reported.
    pub validation: Validation,
    /// The reward, present only on success.
    pub reward: Option<PuzzleReward>,
    /// Solved without any failed validation before.
    pub first_try: bool,
}

struct ActivePuzzle {
    id: PuzzleId,
    reward: PuzzleReward,
    instance: Box<dyn Puzzle>,
    failed_attempts: u32,
    solved: bool,
    close_at: Option<MissionTime>,
}

impl Drop for ActivePuzzle {
    fn drop(&mut self) {
        debug!(puzzle = %self.id, "puzzle cleanup");
        self.instance.cleanup();
    }
}

/// Owns the open puzzle, if any.
#[derive(Default)]
pub struct PuzzleHost {
    active: Option<ActivePuzzle>,
}

impl fmt::Debug for PuzzleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PuzzleHost")
            .field("open", &self.current())
            .field("blocking", &self.is_blocking())
            .finish()
    }
}

impl PuzzleHost {
    /// A host with nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and show a puzzle. A puzzle already open is closed first and its
    /// id returned.
    pub fn open(&mut self, config: &PuzzleConfig, ctx: &PuzzleContext) -> Option<PuzzleId> {
        let replaced = self.active.take().map(|p| p.id.clone());
        let instance = (config.init)(ctx);
        debug!(puzzle = %config.id, blocking = instance.blocking(), "puzzle opened");
        self.active = Some(ActivePuzzle {
            id: config.id.clone(),
            reward: config.reward.clone(),
            instance,
            failed_attempts: 0,
            solved: false,
            close_at: None,
        });
        replaced
    }

    /// Whether a puzzle is open.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the open puzzle.
    pub fn current(&self) -> Option<&PuzzleId> {
        self.active.as_ref().map(|p| &p.id)
    }

    /// Whether an unsolved blocking puzzle is open.
    pub fn is_blocking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|p| p.instance.blocking() && !p.solved)
    }

    /// Surface of the open puzzle.
    pub fn surface(&self) -> Option<String> {
        self.active.as_ref().map(|p| p.instance.surface())
    }

    /// Failed validations of the open puzzle.
    pub fn failed_attempts(&self) -> u32 {
        self.active.as_ref().map_or(0, |p| p.failed_attempts)
    }

    /// Forward input to the open puzzle. Returns the redrawn surface.
    pub fn input(&mut self, input: &PuzzleInput) -> Result<String, ActionRejected> {
        let active = self.active.as_mut().ok_or(ActionRejected::NoPuzzleOpen)?;
        if active.solved {
            return Err(ActionRejected::PuzzleAlreadySolved(active.id.clone()));
        }
        if !active.instance.handle_input(input) {
            return Err(ActionRejected::InvalidPuzzleInput(active.id.clone()));
        }
        Ok(active.instance.surface())
    }

    /// Validate the open puzzle. On success the puzzle is marked solved and
    /// stays open until [`schedule_close`](Self::schedule_close) and
    /// [`close_due`](Self::close_due) remove it.
    pub fn validate(&mut self) -> Result<ValidationOutcome, ActionRejected> {
        let active = self.active.as_mut().ok_or(ActionRejected::NoPuzzleOpen)?;
        if active.solved {
            return Err(ActionRejected::PuzzleAlreadySolved(active.id.clone()));
        }

        let validation = active.instance.validate();
        let first_try = active.failed_attempts == 0;
        let reward = if validation.success {
            active.solved = true;
            Some(active.reward.clone())
        } else {
            active.failed_attempts += 1;
            None
        };
        debug!(
            puzzle = %active.id,
            success = validation.success,
            failed_attempts = active.failed_attempts,
            "puzzle validated"
        );

        Ok(ValidationOutcome {
            puzzle: active.id.clone(),
            validation,
            reward,
            first_try: first_try && active.solved,
        })
    }

    /// Close a solved puzzle once mission time reaches `at`.
    pub fn schedule_close(&mut self, at: MissionTime) {
        if let Some(active) = self.active.as_mut().filter(|p| p.solved) {
            active.close_at = Some(at);
        }
    }

    /// Close the puzzle if its scheduled close time has passed. Returns the
    /// id of the closed puzzle.
    pub fn close_due(&mut self, now: MissionTime) -> Option<PuzzleId> {
        let due = self
            .active
            .as_ref()
            .and_then(|p| p.close_at)
            .is_some_and(|at| at <= now);
        if !due {
            return None;
        }
        self.active.take().map(|p| p.id.clone())
    }

    /// Dismiss the modal. Refused while the puzzle is blocking and unsolved.
    pub fn request_close(&mut self, reason: CloseReason) -> Result<PuzzleId, ActionRejected> {
        let active = self.active.as_ref().ok_or(ActionRejected::NoPuzzleOpen)?;
        if active.instance.blocking() && !active.solved {
            debug!(puzzle = %active.id, ?reason, "close refused");
            return Err(ActionRejected::CloseRefused(active.id.clone()));
        }
        let id = active.id.clone();
        debug!(puzzle = %id, ?reason, "puzzle closed");
        self.active = None;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
