//! Mission Engine -- the owned session that drives the LARK-7 probe mission.
//!
//! [`MissionSession`](session::MissionSession) ties the pieces of
//! `mission-core` together and adds everything with side effects:
//!
//! - [`session`]: the explicit session context (clock, queue, state, console,
//!   puzzle host, sound and presentation ports).
//! - [`dispatch`]: routes each drained event to its handler.
//! - [`operations`]: the operation executor (one at a time, one-shot).
//! - [`puzzle`] and [`puzzles`]: the mini-game host and the built-in games.
//! - [`actions`]: user actions (ping, sync, execute, tabs, hints, puzzles).
//! - [`tick`]: the per-tick pipeline and the headless driver.
//! - [`snapshot`] and [`replay`]: BLAKE3 state hashes and action replay.
//! - [`ports`]: the sound and presentation contracts.
//! - [`config`]: tunables, loadable from JSON.
//!
//! # Quick Start
//!
//! ```
//! use mission_engine::prelude::*;
//!
//! let mut driver = HeadlessDriver::new(MissionConfig::default()).unwrap();
//! driver.run_until(MissionTime(16_000));
//!
//! let state = driver.session().state();
//! assert!(state.has_clue("tx_0001_received"));
//! assert!(state.has_clue("img_0001_received"));
//! assert_eq!(state.progress(), 10);
//! ```

#![deny(unsafe_code)]

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod operations;
pub mod ports;
pub mod puzzle;
pub mod puzzles;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod tick;

use mission_core::identity::{OperationId, PuzzleId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a user action or operation request was refused. A rejected action
/// leaves the Domain State untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionRejected {
    /// The operation id is not in the catalogue.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// The operation has not been unlocked yet.
    #[error("operation {0} is locked")]
    Locked(OperationId),

    /// The operation already ran. Operations are one-shot.
    #[error("operation {0} has already been executed")]
    AlreadyExecuted(OperationId),

    /// Another operation is waiting for its result.
    #[error("operation {running} is still in progress")]
    Busy {
        /// The operation currently in flight.
        running: OperationId,
    },

    /// A blocking puzzle is open; only puzzle actions are accepted.
    #[error("puzzle {0} must be completed first")]
    PuzzleBlocking(PuzzleId),

    /// A puzzle action arrived with no puzzle open.
    #[error("no puzzle is open")]
    NoPuzzleOpen,

    /// The open puzzle has already been solved and is closing.
    #[error("puzzle {0} is already solved")]
    PuzzleAlreadySolved(PuzzleId),

    /// No operation has opened this puzzle yet, so it cannot be reopened.
    #[error("puzzle '{0}' has not been opened by any operation")]
    PuzzleUnavailable(String),

    /// The puzzle did not accept the input.
    #[error("puzzle {0} does not accept that input")]
    InvalidPuzzleInput(PuzzleId),

    /// A blocking puzzle cannot be dismissed before it is solved.
    #[error("puzzle {0} cannot be closed before it is solved")]
    CloseRefused(PuzzleId),

    /// No image has been received yet.
    #[error("no image has been received")]
    NoImage,

    /// The hint key is not in the content tables.
    #[error("unknown hint '{0}'")]
    UnknownHint(String),
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::actions::{PuzzleAction, ScriptedAction, UserAction};
    pub use crate::config::{ConfigError, MissionConfig};
    pub use crate::ports::{
        NullPresentation, NullSound, PresentationSink, PuzzleFeedback, RecordingPresentation,
        RecordingSound, SoundError, SoundPort,
    };
    pub use crate::puzzle::{
        CloseReason, Puzzle, PuzzleCatalogue, PuzzleConfig, PuzzleContext, PuzzleHost,
        PuzzleInput, PuzzleReward, Validation,
    };
    pub use crate::replay::{
        replay, ActionEntry, ActionLog, ActionRecorder, ReplayDivergence, ReplayResult,
    };
    pub use crate::session::MissionSession;
    pub use crate::snapshot::MissionSnapshot;
    pub use crate::tick::{HeadlessDriver, TickReport};
    pub use crate::ActionRejected;
    pub use mission_console::{ConsoleLog, LineCause, LogLine};
    pub use mission_core::prelude::*;
}
