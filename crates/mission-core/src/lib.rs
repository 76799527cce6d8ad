//! Mission Core -- event scheduling, domain state and unlock rules for the
//! LARK-7 probe mission.
//!
//! This crate holds the parts of the mission engine that have no side
//! effects beyond the data they own:
//!
//! - [`clock`]: mission time derived from an injectable wall-clock source.
//! - [`event`]: the closed catalogue of scheduled event kinds.
//! - [`queue`]: the time-ordered event queue (stable for equal due times).
//! - [`state`]: the Domain State, with version counters for cheap change
//!   detection.
//! - [`rules`]: progress computation and single-pass unlock rules.
//! - [`content`]: the static content tables the engine consumes.
//!
//! Dispatch, operations, puzzles and the tick loop live in `mission-engine`.
//!
//! # Quick Start
//!
//! ```
//! use mission_core::prelude::*;
//!
//! let content = ContentTables::standard();
//! let mut state = MissionState::default();
//!
//! state.add_clue(ClueId::from("tx_0001_received"));
//! state.add_clue(ClueId::from("img_0001_received"));
//! recompute(&mut state, &content.clue_points, &content.rules);
//!
//! assert_eq!(state.progress(), 10);
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod content;
pub mod event;
pub mod identity;
pub mod queue;
pub mod rules;
pub mod state;

pub use clock::MissionTime;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by mission-core lookups and validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MissionError {
    /// A content id was referenced that the content tables do not define.
    #[error("unknown {kind} '{id}'")]
    UnknownContent {
        /// What kind of content was looked up (e.g. `"image"`).
        kind: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MissionError {
    pub(crate) fn unknown(kind: &'static str, id: &str) -> Self {
        MissionError::UnknownContent {
            kind,
            id: id.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::clock::{ManualTimeSource, MissionClock, MissionTime, SystemTimeSource, TimeSource};
    pub use crate::content::{
        ids, ContentTables, FollowUp, ImageSpec, OperationSpec, TextEntry, TransmissionSpec,
    };
    pub use crate::event::{EntrySection, Event, EventKind, EventPayload, LogTag, TelemetryUpdate};
    pub use crate::identity::{
        ClueId, EntryId, ImageId, OperationId, PuzzleId, RuleId, Tab, TransmissionId,
    };
    pub use crate::queue::{EventQueue, Schedule};
    pub use crate::rules::{
        apply_unlock_rules, compute_progress, recompute, RuleCondition, UnlockGrant, UnlockRule,
    };
    pub use crate::state::{MissionState, OperationStatus, Telemetry, TechVar, TechVars};
    pub use crate::MissionError;
}
