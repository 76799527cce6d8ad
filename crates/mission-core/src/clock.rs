//! Mission clock derived from an injectable wall-clock source.
//!
//! Mission time is the number of milliseconds elapsed since the mission
//! started. It is never stored: [`MissionClock::now`] recomputes it from the
//! [`TimeSource`] every time it is asked, so the scheduling axis is
//! independent of how often the presentation layer refreshes.
//!
//! The only way mission time moves backwards is [`MissionClock::apply_bonus`],
//! which shifts the mission start instant forward (the combo bonus).
//!
//! # Example
//!
//! ```
//! use mission_core::clock::{ManualTimeSource, MissionClock};
//! use mission_core::MissionTime;
//!
//! let source = ManualTimeSource::new();
//! let clock = MissionClock::new(Box::new(source.clone()));
//!
//! source.advance(1_500);
//! assert_eq!(clock.now(), MissionTime(1_500));
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MissionTime
// ---------------------------------------------------------------------------

/// Milliseconds elapsed since mission start. The scheduling axis for all
/// events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MissionTime(pub u64);

impl MissionTime {
    /// The mission start instant.
    pub const ZERO: MissionTime = MissionTime(0);

    /// Raw milliseconds.
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// This time plus `delay_ms`, saturating at `u64::MAX`.
    pub fn plus(self, delay_ms: u64) -> MissionTime {
        MissionTime(self.0.saturating_add(delay_ms))
    }
}

impl fmt::Display for MissionTime {
    /// Formats as `T+HH:MM:SS`, the way the mission console shows timestamps.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.0 / 1000;
        let hours = total_secs / 3600;
        let minutes = (total_secs / 60) % 60;
        let seconds = total_secs % 60;
        write!(f, "T+{hours:02}:{minutes:02}:{seconds:02}")
    }
}

// ---------------------------------------------------------------------------
// TimeSource
// ---------------------------------------------------------------------------

/// A monotonic wall-clock in milliseconds.
///
/// The mission core never touches platform timers directly; everything reads
/// time through this trait so tests and headless runs can inject a
/// [`ManualTimeSource`].
pub trait TimeSource {
    /// Monotonic milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

/// Real wall-clock source backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Create a source whose origin is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A hand-driven time source. Clones share the same underlying counter, so a
/// test can keep one handle while the clock owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<u64>>,
}

impl ManualTimeSource {
    /// Create a source reading 0 ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    /// Jump to an absolute reading. Going backwards is allowed here because
    /// tests sometimes need it; [`MissionClock`] clamps the result.
    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ---------------------------------------------------------------------------
// MissionClock
// ---------------------------------------------------------------------------

/// Derives mission time as `wall_now - mission_start`.
pub struct MissionClock {
    source: Box<dyn TimeSource>,
    /// Wall reading at mission start, shifted forward by applied bonuses.
    start_ms: u64,
    /// Sum of all combo bonuses applied so far.
    total_bonus_ms: u64,
}

impl MissionClock {
    /// Start a mission clock at the source's current reading.
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        let start_ms = source.now_ms();
        Self {
            source,
            start_ms,
            total_bonus_ms: 0,
        }
    }

    /// Current mission time. Saturates at zero if the source reads earlier
    /// than the (bonus-shifted) start.
    pub fn now(&self) -> MissionTime {
        MissionTime(self.source.now_ms().saturating_sub(self.start_ms))
    }

    /// Subtract `bonus_ms` from elapsed mission time by moving the start
    /// instant forward. The shift is capped so elapsed time never goes below
    /// zero. Returns the amount actually applied.
    pub fn apply_bonus(&mut self, bonus_ms: u64) -> u64 {
        let elapsed = self.now().0;
        let applied = bonus_ms.min(elapsed);
        self.start_ms += applied;
        self.total_bonus_ms += applied;
        applied
    }

    /// Sum of all bonuses applied to this clock.
    pub fn total_bonus(&self) -> u64 {
        self.total_bonus_ms
    }
}

impl fmt::Debug for MissionClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MissionClock")
            .field("now", &self.now())
            .field("total_bonus_ms", &self.total_bonus_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_clock() -> (ManualTimeSource, MissionClock) {
        let source = ManualTimeSource::new();
        source.set(10_000);
        let clock = MissionClock::new(Box::new(source.clone()));
        (source, clock)
    }

    #[test]
    fn clock_starts_at_zero() {
        let (_source, clock) = manual_clock();
        assert_eq!(clock.now(), MissionTime::ZERO);
    }

    #[test]
    fn clock_tracks_source() {
        let (source, clock) = manual_clock();
        source.advance(250);
        source.advance(250);
        assert_eq!(clock.now(), MissionTime(500));
    }

    #[test]
    fn clock_never_goes_negative() {
        let (source, clock) = manual_clock();
        source.set(0);
        assert_eq!(clock.now(), MissionTime::ZERO);
    }

    #[test]
    fn bonus_moves_time_backwards() {
        let (source, mut clock) = manual_clock();
        source.advance(20_000);
        let applied = clock.apply_bonus(5_000);
        assert_eq!(applied, 5_000);
        assert_eq!(clock.now(), MissionTime(15_000));
        assert_eq!(clock.total_bonus(), 5_000);
    }

    #[test]
    fn bonus_is_capped_at_elapsed() {
        let (source, mut clock) = manual_clock();
        source.advance(2_000);
        assert_eq!(clock.apply_bonus(5_000), 2_000);
        assert_eq!(clock.now(), MissionTime::ZERO);

        source.advance(100);
        assert_eq!(clock.now(), MissionTime(100));
    }

    #[test]
    fn display_formats_hms() {
        assert_eq!(MissionTime(3_723_000).to_string(), "T+01:02:03");
        assert_eq!(MissionTime(999).to_string(), "T+00:00:00");
    }

    #[test]
    fn plus_saturates() {
        assert_eq!(MissionTime(u64::MAX - 1).plus(10), MissionTime(u64::MAX));
    }
}
