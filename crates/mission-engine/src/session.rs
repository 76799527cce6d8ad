//! The mission session: one explicit, owned context per playthrough.
//!
//! A [`MissionSession`] holds everything a playthrough needs: the mission
//! clock, the event queue, the Domain State, the console, the puzzle host,
//! the content and puzzle catalogues, and the sound and presentation ports.
//! There is no global state; a test can run any number of sessions side by
//! side.
//!
//! The session is single-threaded. Domain State is mutated only while a tick
//! dispatches events ([`tick`](crate::tick)) or while a user action is
//! handled ([`actions`](crate::actions)).
//!
//! # Example
//!
//! ```
//! use mission_engine::prelude::*;
//!
//! let time = ManualTimeSource::new();
//! let mut session = MissionSession::new(MissionConfig::default(), Box::new(time.clone())).unwrap();
//!
//! time.advance(5_000);
//! session.tick();
//! assert!(session.state().has_clue("tx_0001_received"));
//! ```

use std::fmt;

use mission_console::{ConsoleLog, LineCause, LogLine};
use mission_core::clock::{MissionClock, TimeSource};
use mission_core::content::ContentTables;
use mission_core::event::{EventPayload, LogTag};
use mission_core::identity::Tab;
use mission_core::queue::{EventQueue, Schedule};
use mission_core::rules::recompute;
use mission_core::state::MissionState;
use mission_core::{MissionError, MissionTime};
use tracing::{debug, warn};

use crate::config::MissionConfig;
use crate::ports::{sounds, NullPresentation, NullSound, PresentationSink, SoundPort};
use crate::puzzle::{PuzzleCatalogue, PuzzleHost};

/// One playthrough of the mission.
pub struct MissionSession<S: SoundPort = NullSound, P: PresentationSink = NullPresentation> {
    pub(crate) config: MissionConfig,
    pub(crate) content: ContentTables,
    pub(crate) puzzles: PuzzleCatalogue,
    pub(crate) clock: MissionClock,
    pub(crate) queue: EventQueue,
    pub(crate) state: MissionState,
    pub(crate) console: ConsoleLog,
    pub(crate) puzzle: PuzzleHost,
    pub(crate) sound: S,
    pub(crate) presentation: P,
    /// Mission time of the tick or action being handled.
    pub(crate) now: MissionTime,
    /// Set by arrivals; cleared by the next rule pass.
    pub(crate) progress_dirty: bool,
    pub(crate) tick_count: u64,
    pub(crate) puzzles_opened: u64,
    rendered_version: Option<u64>,
    rendered_operations_version: Option<u64>,
}

impl MissionSession {
    /// A headless session with the standard content and puzzles.
    pub fn new(config: MissionConfig, source: Box<dyn TimeSource>) -> Result<Self, MissionError> {
        Self::with_parts(
            config,
            ContentTables::standard(),
            PuzzleCatalogue::standard(),
            source,
            NullSound,
            NullPresentation,
        )
    }
}

impl<S: SoundPort, P: PresentationSink> MissionSession<S, P> {
    /// Build a session from explicit parts and run the boot sequence: seed the
    /// journal and schedule the boot script at mission time zero.
    pub fn with_parts(
        config: MissionConfig,
        content: ContentTables,
        puzzles: PuzzleCatalogue,
        source: Box<dyn TimeSource>,
        sound: S,
        presentation: P,
    ) -> Result<Self, MissionError> {
        config.validate()?;

        let mut session = Self {
            state: MissionState::new(config.initial_telemetry()),
            console: ConsoleLog::new(config.console_capacity),
            clock: MissionClock::new(source),
            queue: EventQueue::new(),
            puzzle: PuzzleHost::new(),
            now: MissionTime::ZERO,
            progress_dirty: false,
            tick_count: 0,
            puzzles_opened: 0,
            rendered_version: None,
            rendered_operations_version: None,
            config,
            content,
            puzzles,
            sound,
            presentation,
        };
        session.boot();
        Ok(session)
    }

    fn boot(&mut self) {
        for entry in self.content.journal_seed.clone() {
            self.state.add_journal_entry(entry);
        }
        for step in &self.content.boot_script {
            self.queue.schedule(
                MissionTime::ZERO,
                Schedule::At(MissionTime(step.delay_ms)),
                step.payload.clone(),
            );
        }
        debug!(scheduled = self.queue.len(), "mission booted");
        self.refresh_presentation();
    }

    // -- accessors ----------------------------------------------------------

    /// Session configuration.
    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    /// Static content.
    pub fn content(&self) -> &ContentTables {
        &self.content
    }

    /// The Domain State.
    pub fn state(&self) -> &MissionState {
        &self.state
    }

    /// The mission console.
    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    /// Pending events.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// The puzzle host.
    pub fn puzzle(&self) -> &PuzzleHost {
        &self.puzzle
    }

    /// The mission clock.
    pub fn clock(&self) -> &MissionClock {
        &self.clock
    }

    /// The sound port.
    pub fn sound(&self) -> &S {
        &self.sound
    }

    /// The presentation sink.
    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    /// Current mission time, read from the clock.
    pub fn now(&self) -> MissionTime {
        self.clock.now()
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Schedule an event from outside the session (hosts and tests).
    pub fn schedule(&mut self, when: Schedule, payload: EventPayload) -> MissionTime {
        let now = self.clock.now();
        self.queue.schedule(now, when, payload)
    }

    // -- helpers shared by dispatch, operations and actions -------------------

    /// Resynchronise `now` with the clock.
    pub(crate) fn sync_now(&mut self) {
        self.now = self.clock.now();
    }

    /// Schedule relative to the tick or action being handled.
    pub(crate) fn schedule_in(&mut self, delay_ms: u64, payload: EventPayload) -> MissionTime {
        self.queue.schedule(self.now, Schedule::In(delay_ms), payload)
    }

    /// Record a console line and hand it to the presentation sink.
    pub(crate) fn log(&mut self, tag: LogTag, text: impl Into<String>, cause: LineCause) {
        let line = self.console.record(LogLine::new(self.now, tag, text, cause));
        self.presentation.append_log_line(line);
    }

    /// Best-effort sound playback.
    pub(crate) fn play(&mut self, name: &str) {
        if let Err(err) = self.sound.play(name) {
            warn!(sound = name, %err, "sound playback failed");
        }
    }

    /// Best-effort sound stop.
    pub(crate) fn stop(&mut self, name: &str) {
        if let Err(err) = self.sound.stop(name) {
            warn!(sound = name, %err, "sound stop failed");
        }
    }

    /// Badge `tab` if it holds unread items and is not the active tab.
    pub(crate) fn notify_arrival(&mut self, tab: Tab) {
        if tab != self.state.active_tab() && self.state.has_update(tab) {
            self.presentation.notify(tab);
        }
    }

    /// Refresh progress and run one pass of the unlock rules. Each new
    /// capability gets an `UNLOCK` line and the unlock sound.
    pub(crate) fn recompute_progress(&mut self) {
        self.progress_dirty = false;
        let before = self.state.progress();
        let grants = recompute(&mut self.state, &self.content.clue_points, &self.content.rules);
        if self.state.progress() != before {
            debug!(from = before, to = self.state.progress(), "progress updated");
        }

        for grant in grants {
            let label = self
                .content
                .operation(grant.capability.as_str())
                .map(|op| op.label.clone())
                .unwrap_or_else(|_| grant.capability.to_string());
            self.log(
                LogTag::Unlock,
                format!("{} available: {label}", grant.capability),
                LineCause::Unlock(grant.rule),
            );
            self.play(sounds::UNLOCK);
        }
    }

    /// Render the status strip, then the active tab and the operations panel
    /// if their version counters moved since the last render.
    pub(crate) fn refresh_presentation(&mut self) {
        self.presentation.render_status(&self.state, self.now);

        let version = self.state.version();
        if self.rendered_version != Some(version) {
            self.presentation.render_active_tab(&self.state, &self.content);
            self.rendered_version = Some(version);
        }

        let operations_version = self.state.operations_version();
        if self.rendered_operations_version != Some(operations_version) {
            self.presentation
                .render_operations_panel(&self.state, &self.content.operations);
            self.rendered_operations_version = Some(operations_version);
        }
    }
}

impl<S: SoundPort, P: PresentationSink> fmt::Debug for MissionSession<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MissionSession")
            .field("now", &self.now)
            .field("tick_count", &self.tick_count)
            .field("pending", &self.queue.len())
            .field("progress", &self.state.progress())
            .field("puzzle", &self.puzzle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use mission_core::clock::ManualTimeSource;

    use super::*;
    use crate::ports::{RecordingPresentation, RecordingSound};

    fn recording_session() -> MissionSession<RecordingSound, RecordingPresentation> {
        MissionSession::with_parts(
            MissionConfig::default(),
            ContentTables::standard(),
            PuzzleCatalogue::standard(),
            Box::new(ManualTimeSource::new()),
            RecordingSound::default(),
            RecordingPresentation::default(),
        )
        .unwrap()
    }

    // -- 1. Boot ------------------------------------------------------------

    #[test]
    fn boot_seeds_journal_and_schedules_script() {
        let session = recording_session();
        assert_eq!(session.state().journal().len(), 1);
        assert_eq!(session.queue().len(), ContentTables::standard().boot_script.len());
        assert_eq!(session.queue().peek_due(), Some(MissionTime::ZERO));
    }

    #[test]
    fn boot_renders_everything_once() {
        let session = recording_session();
        let p = session.presentation();
        assert_eq!(p.status_renders, 1);
        assert_eq!(p.tab_renders, 1);
        assert_eq!(p.panel_renders, 1);
        assert!(p.enabled_operations.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = MissionConfig {
            tick_period_ms: 0,
            ..Default::default()
        };
        let err = MissionSession::new(config, Box::new(ManualTimeSource::new())).unwrap_err();
        assert!(matches!(err, MissionError::InvalidConfig(_)));
    }

    // -- 2. Helpers ---------------------------------------------------------

    #[test]
    fn log_reaches_console_and_sink() {
        let mut session = recording_session();
        session.log(LogTag::Sys, "hello", LineCause::System);
        assert_eq!(session.console().len(), 1);
        assert_eq!(session.presentation().log, vec!["[T+00:00:00] SYS hello".to_owned()]);
    }

    #[test]
    fn sound_failure_is_swallowed() {
        let mut session = recording_session();
        session.sound.fail = true;
        session.play(sounds::UNLOCK);
        session.stop(sounds::STATIC);
        assert_eq!(session.sound().played, vec![sounds::UNLOCK.to_owned()]);
        assert_eq!(session.sound().stopped, vec![sounds::STATIC.to_owned()]);
    }

    #[test]
    fn unchanged_state_skips_tab_and_panel_renders() {
        let mut session = recording_session();
        session.refresh_presentation();
        session.refresh_presentation();
        let p = session.presentation();
        assert_eq!(p.status_renders, 3);
        assert_eq!(p.tab_renders, 1);
        assert_eq!(p.panel_renders, 1);
    }
}
