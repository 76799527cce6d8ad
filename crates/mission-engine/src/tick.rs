//! The per-tick pipeline and the drivers that call it.
//!
//! Each [`MissionSession::tick`]:
//!
//! 1. Reads mission time from the clock.
//! 2. Drains every event due at or before that time, in (due time, insertion)
//!    order, and dispatches them one by one. Events scheduled by handlers
//!    wait for a later tick.
//! 3. Runs the unlock rules if an arrival marked progress dirty.
//! 4. Closes a solved puzzle whose close delay has passed.
//! 5. Refreshes the presentation (status every tick, tab and operations panel
//!    only when their version counters moved).
//!
//! [`HeadlessDriver`] owns a [`ManualTimeSource`] and advances it by
//! `tick_period_ms` before every tick, which makes a whole playthrough
//! deterministic and fast. [`MissionSession::run_realtime`] paces ticks
//! against the wall clock instead.
//!
//! # Example
//!
//! ```
//! use mission_engine::prelude::*;
//!
//! let mut driver = HeadlessDriver::new(MissionConfig::default()).unwrap();
//! driver.run_ticks(50);
//! assert_eq!(driver.session().tick_count(), 50);
//! assert_eq!(driver.session().now(), MissionTime(5_000));
//! ```

use std::time::{Duration, Instant};

use mission_core::clock::ManualTimeSource;
use mission_core::content::ContentTables;
use mission_core::{MissionError, MissionTime};
use tracing::{debug, info};

use crate::actions::{ScriptedAction, UserAction};
use crate::config::MissionConfig;
use crate::ports::{NullPresentation, NullSound, PresentationSink, SoundPort};
use crate::puzzle::PuzzleCatalogue;
use crate::replay::{ActionLog, ActionRecorder};
use crate::session::MissionSession;
use crate::ActionRejected;

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Tick number after this tick (1 for the first tick).
    pub tick: u64,
    /// Mission time the tick ran at.
    pub mission_time: MissionTime,
    /// Events dispatched.
    pub dispatched: usize,
    /// Wall-clock time spent in the tick.
    pub total_time: Duration,
}

impl<S: SoundPort, P: PresentationSink> MissionSession<S, P> {
    /// Run one tick.
    pub fn tick(&mut self) -> TickReport {
        let tick_start = Instant::now();
        self.sync_now();

        // Phase 1: drain, then dispatch.
        let due = self.queue.drain_due(self.now);
        let dispatched = due.len();
        for event in due {
            self.dispatch(event);
        }

        // Phase 2: rules.
        if self.progress_dirty {
            self.recompute_progress();
        }

        // Phase 3: timed puzzle close.
        if let Some(closed) = self.puzzle.close_due(self.now) {
            debug!(puzzle = %closed, "puzzle closed after delay");
            self.presentation.hide_puzzle();
        }

        // Phase 4: presentation.
        self.refresh_presentation();
        self.tick_count += 1;

        TickReport {
            tick: self.tick_count,
            mission_time: self.now,
            dispatched,
            total_time: tick_start.elapsed(),
        }
    }

    /// Tick against the wall clock until mission time reaches `until`,
    /// sleeping out the rest of each tick period and applying each scripted
    /// action at the first tick boundary at or after its `at_ms`. Meant for
    /// sessions built on a
    /// [`SystemTimeSource`](mission_core::clock::SystemTimeSource). Returns
    /// the rejected actions.
    pub fn run_realtime(
        &mut self,
        script: &[ScriptedAction],
        until: MissionTime,
    ) -> Vec<(ScriptedAction, ActionRejected)> {
        let period = Duration::from_millis(self.config.tick_period_ms);
        let mut script = script.to_vec();
        script.sort_by_key(|s| s.at_ms);
        let mut pending = script.into_iter().peekable();
        let mut rejected = Vec::new();

        loop {
            let now = self.now();
            while let Some(next) = pending.next_if(|s| MissionTime(s.at_ms) <= now) {
                if let Err(rejection) = self.apply(&next.action) {
                    rejected.push((next, rejection));
                }
            }
            if now >= until {
                break;
            }
            let report = self.tick();
            if let Some(rest) = period.checked_sub(report.total_time) {
                std::thread::sleep(rest);
            }
        }

        info!(
            ticks = self.tick_count,
            rejected = rejected.len(),
            "real-time run finished"
        );
        rejected
    }
}

// ---------------------------------------------------------------------------
// HeadlessDriver
// ---------------------------------------------------------------------------

/// Drives a session on a manual clock, one tick period per step.
pub struct HeadlessDriver<S: SoundPort = NullSound, P: PresentationSink = NullPresentation> {
    time: ManualTimeSource,
    session: MissionSession<S, P>,
    recorder: Option<ActionRecorder>,
}

impl HeadlessDriver {
    /// A driver over the standard mission with null ports.
    pub fn new(config: MissionConfig) -> Result<Self, MissionError> {
        Self::with_parts(
            config,
            ContentTables::standard(),
            PuzzleCatalogue::standard(),
            NullSound,
            NullPresentation,
        )
    }

    /// Like [`new`](Self::new), recording every applied action and a state
    /// hash checkpoint every `checkpoint_interval` ticks.
    pub fn recording(config: MissionConfig, checkpoint_interval: u64) -> Result<Self, MissionError> {
        let mut driver = Self::new(config.clone())?;
        driver.recorder = Some(ActionRecorder::new(config, checkpoint_interval));
        Ok(driver)
    }
}

impl<S: SoundPort, P: PresentationSink> HeadlessDriver<S, P> {
    /// A driver over explicit content, puzzles and ports.
    pub fn with_parts(
        config: MissionConfig,
        content: ContentTables,
        puzzles: PuzzleCatalogue,
        sound: S,
        presentation: P,
    ) -> Result<Self, MissionError> {
        let time = ManualTimeSource::new();
        let session = MissionSession::with_parts(
            config,
            content,
            puzzles,
            Box::new(time.clone()),
            sound,
            presentation,
        )?;
        Ok(Self {
            time,
            session,
            recorder: None,
        })
    }

    /// The driven session.
    pub fn session(&self) -> &MissionSession<S, P> {
        &self.session
    }

    /// Mutable access for hosts that bypass [`apply`](Self::apply). Actions
    /// applied this way are not recorded.
    pub fn session_mut(&mut self) -> &mut MissionSession<S, P> {
        &mut self.session
    }

    /// The manual time source behind the session clock.
    pub fn time(&self) -> &ManualTimeSource {
        &self.time
    }

    /// Advance one tick period and tick.
    pub fn step(&mut self) -> TickReport {
        self.time.advance(self.session.config().tick_period_ms);
        let report = self.session.tick();
        if let Some(recorder) = self.recorder.as_mut() {
            let session = &self.session;
            recorder.record_tick(report.tick, || session.state_hash());
        }
        report
    }

    /// Run `count` ticks. Returns the number of events dispatched.
    pub fn run_ticks(&mut self, count: u64) -> usize {
        (0..count).map(|_| self.step().dispatched).sum()
    }

    /// Tick until mission time reaches `until`.
    pub fn run_until(&mut self, until: MissionTime) -> usize {
        let mut dispatched = 0;
        while self.session.now() < until {
            dispatched += self.step().dispatched;
        }
        dispatched
    }

    /// Apply a user action between ticks.
    pub fn apply(&mut self, action: UserAction) -> Result<(), ActionRejected> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_action(self.session.tick_count(), action.clone());
        }
        self.session.apply(&action)
    }

    /// Run a script until mission time `until`. Each action is applied at
    /// the first tick boundary at or after its `at_ms`. Returns the
    /// rejected actions.
    pub fn run_script(
        &mut self,
        script: &[ScriptedAction],
        until: MissionTime,
    ) -> Vec<(ScriptedAction, ActionRejected)> {
        let mut script = script.to_vec();
        script.sort_by_key(|s| s.at_ms);
        let mut pending = script.into_iter().peekable();
        let mut rejected = Vec::new();

        loop {
            let now = self.session.now();
            while let Some(next) = pending.next_if(|s| MissionTime(s.at_ms) <= now) {
                if let Err(rejection) = self.apply(next.action.clone()) {
                    rejected.push((next, rejection));
                }
            }
            if now >= until {
                break;
            }
            self.step();
        }

        info!(
            ticks = self.session.tick_count(),
            rejected = rejected.len(),
            "script finished"
        );
        rejected
    }

    /// Stop recording and return the log, if recording.
    pub fn finish_recording(&mut self) -> Option<ActionLog> {
        let tick = self.session.tick_count();
        self.recorder.take().map(|r| r.finish(tick))
    }
}
