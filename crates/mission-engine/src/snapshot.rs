//! Session snapshots with BLAKE3 hashing.
//!
//! [`MissionSnapshot`] is a serializable picture of a session: mission time,
//! the Domain State, every pending event, how many console lines were written
//! and which puzzle is open, plus a BLAKE3 hex digest of all of that. Two
//! sessions fed the same actions at the same ticks produce the same hash.
//!
//! Snapshots are for determinism checks and run summaries. There is no
//! restore; a session is always rebuilt from its config and replayed.
//!
//! ```
//! use mission_engine::prelude::*;
//!
//! let mut a = HeadlessDriver::new(MissionConfig::default()).unwrap();
//! let mut b = HeadlessDriver::new(MissionConfig::default()).unwrap();
//! a.run_ticks(200);
//! b.run_ticks(200);
//!
//! let snapshot = a.session().capture_snapshot();
//! assert_eq!(snapshot.hash.len(), 64);
//! assert_eq!(snapshot.hash, b.session().state_hash());
//! assert!(snapshot.verify());
//! ```

use mission_core::event::Event;
use mission_core::identity::PuzzleId;
use mission_core::state::MissionState;
use mission_core::MissionTime;
use serde::{Deserialize, Serialize};

use crate::ports::{PresentationSink, SoundPort};
use crate::session::MissionSession;

// ---------------------------------------------------------------------------
// MissionSnapshot
// ---------------------------------------------------------------------------

/// A serializable snapshot of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSnapshot {
    /// Mission time of the last tick or action.
    pub mission_time: MissionTime,
    /// Ticks run.
    pub tick_count: u64,
    /// Total combo bonus applied to the clock.
    pub bonus_ms: u64,
    /// The Domain State.
    pub state: MissionState,
    /// Pending events in dispatch order.
    pub pending: Vec<Event>,
    /// Console lines written, including ones dropped at capacity.
    pub console_lines: u64,
    /// The open puzzle.
    pub open_puzzle: Option<PuzzleId>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

impl MissionSnapshot {
    /// Recompute the hash and compare it with the stored one.
    pub fn verify(&self) -> bool {
        compute_hash(&HashableState {
            mission_time: self.mission_time,
            tick_count: self.tick_count,
            bonus_ms: self.bonus_ms,
            state: &self.state,
            pending: &self.pending,
            console_lines: self.console_lines,
            open_puzzle: self.open_puzzle.as_ref(),
        }) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HashableState<'a> {
    mission_time: MissionTime,
    tick_count: u64,
    bonus_ms: u64,
    state: &'a MissionState,
    pending: &'a [Event],
    console_lines: u64,
    open_puzzle: Option<&'a PuzzleId>,
}

fn compute_hash(hashable: &HashableState<'_>) -> String {
    let json_bytes = serde_json::to_vec(hashable)
        .expect("MissionSnapshot state should always be JSON-serializable");
    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// MissionSession snapshot methods
// ---------------------------------------------------------------------------

impl<S: SoundPort, P: PresentationSink> MissionSession<S, P> {
    /// Capture a snapshot of the session.
    pub fn capture_snapshot(&self) -> MissionSnapshot {
        let pending = self.queue.pending();
        let hash = compute_hash(&self.hashable(&pending));
        MissionSnapshot {
            mission_time: self.now,
            tick_count: self.tick_count,
            bonus_ms: self.clock.total_bonus(),
            state: self.state.clone(),
            pending,
            console_lines: self.console.total_recorded(),
            open_puzzle: self.puzzle.current().cloned(),
            hash,
        }
    }

    /// BLAKE3 hex digest of the current session, as it would appear in
    /// [`capture_snapshot`](Self::capture_snapshot).
    pub fn state_hash(&self) -> String {
        let pending = self.queue.pending();
        compute_hash(&self.hashable(&pending))
    }

    fn hashable<'a>(&'a self, pending: &'a [Event]) -> HashableState<'a> {
        HashableState {
            mission_time: self.now,
            tick_count: self.tick_count,
            bonus_ms: self.clock.total_bonus(),
            state: &self.state,
            pending,
            console_lines: self.console.total_recorded(),
            open_puzzle: self.puzzle.current(),
        }
    }
}
