//! Operation executor.
//!
//! Operations are commands sent to the probe. Each is one-shot and at most
//! one is in flight at a time. Sending one ([`MissionSession::execute`])
//! checks every gate before touching state, then schedules an
//! `OperationResult` event `operation_latency_ms` later. When that event is
//! dispatched the operation resolves: it becomes executed, its bespoke effect
//! runs and the unlock rules are re-evaluated.
//!
//! | Operation | Effect on resolution |
//! |-----------|----------------------|
//! | `OP_CLEAN_LENS` | clue `lens_cleaned`, lens +45, power -5, `IMG_0002_MEDQ` in 10 s |
//! | `OP_RECAL_CAMERA` | clue `camera_recalibrated`, calibration +40, signal -0.25 now and restored in 30 s, `IMG_0003_HIGHQ` in 12 s, TX #0003 in 20 s |
//! | `OP_ALIGN_ANTENNA` | antenna +10, opens the antenna puzzle |
//! | `OP_DECODE_SPECTRUM` | decoder +30, opens the spectrum puzzle |
//! | `OP_BOOST_SIGNAL` | clue `signal_boosted`, power -30, signal +0.2, latency -400 ms, `IMG_0004_STRUCT` in 10 s, TX #0004 in 25 s |
//! | `OP_TRIANGULATE` | opens the triangulation puzzle |

use mission_console::LineCause;
use mission_core::content::ids;
use mission_core::event::{EventPayload, LogTag, TelemetryUpdate};
use mission_core::identity::{ClueId, OperationId, PuzzleId};
use mission_core::state::TechVar;
use tracing::{info, warn};

use crate::ports::{sounds, PresentationSink, SoundPort};
use crate::puzzle::PuzzleContext;
use crate::session::MissionSession;
use crate::ActionRejected;

/// Signal drop while the camera recalibrates.
pub const RECAL_SIGNAL_DROP: f64 = 0.25;
/// Net signal gain once the recalibration perturbation is restored.
pub const RECAL_RESTORE_GAIN: f64 = 0.05;

impl<S: SoundPort, P: PresentationSink> MissionSession<S, P> {
    /// Send `op` to the probe.
    ///
    /// # Errors
    ///
    /// Rejected with no state change when a blocking puzzle is open, the
    /// operation is unknown, already executed, still locked, or another
    /// operation is in flight. A rejection logs a `WARN` line.
    pub fn execute(&mut self, op: &str) -> Result<(), ActionRejected> {
        self.sync_now();
        if let Err(rejection) = self.check_executable(op) {
            warn!(op, %rejection, "operation rejected");
            self.log(
                LogTag::Warn,
                rejection.to_string(),
                LineCause::UserAction(format!("execute {op}")),
            );
            self.play(sounds::ERROR);
            return Err(rejection);
        }

        let op = OperationId::from(op);
        self.state.begin_operation(op.clone());
        self.log(
            LogTag::Tx,
            format!("{op} sent. Awaiting result."),
            LineCause::Operation(op.clone()),
        );
        self.play(sounds::UPLINK);
        let due = self.schedule_in(
            self.config.operation_latency_ms,
            EventPayload::OperationResult { op: op.clone() },
        );
        info!(%op, due_at = due.0, "operation sent");
        self.refresh_presentation();
        Ok(())
    }

    fn check_executable(&self, op: &str) -> Result<(), ActionRejected> {
        if let Some(puzzle) = self.puzzle.current().filter(|_| self.puzzle.is_blocking()) {
            return Err(ActionRejected::PuzzleBlocking(puzzle.clone()));
        }
        let spec = self
            .content
            .operation(op)
            .map_err(|_| ActionRejected::UnknownOperation(op.to_owned()))?;
        if self.state.is_executed(op) {
            return Err(ActionRejected::AlreadyExecuted(spec.id.clone()));
        }
        if !self.state.has_capability(op) {
            return Err(ActionRejected::Locked(spec.id.clone()));
        }
        if let Some(running) = self.state.operation_in_progress() {
            return Err(ActionRejected::Busy {
                running: running.clone(),
            });
        }
        Ok(())
    }

    /// Complete `op`: mark it executed, apply its effect, re-run the rules.
    pub(crate) fn resolve_operation(&mut self, op: OperationId) {
        if !self.state.finish_operation(&op) {
            warn!(%op, "operation result for an already executed operation");
            return;
        }
        info!(%op, "operation resolved");
        let cause = LineCause::Operation(op.clone());
        self.log(LogTag::Rx, format!("{op} complete."), cause.clone());
        self.play(sounds::COMPLETE);

        match op.as_str() {
            ids::OP_CLEAN_LENS => {
                self.state.add_clue(ClueId::from(ids::LENS_CLEANED));
                self.state.adjust_tech(TechVar::LensClarity, 45);
                self.state.adjust_tech(TechVar::PowerReserve, -5);
                self.schedule_in(10_000, EventPayload::image(ids::IMG_0002_MEDQ));
            }
            ids::OP_RECAL_CAMERA => {
                self.state.add_clue(ClueId::from(ids::CAMERA_RECALIBRATED));
                self.state.adjust_tech(TechVar::CameraCalibration, 40);

                let pre = self.state.telemetry().signal_quality;
                self.state.set_signal_quality(pre - RECAL_SIGNAL_DROP);
                self.log(
                    LogTag::Warn,
                    "Link degraded during recalibration.",
                    cause.clone(),
                );
                self.play(sounds::STATIC);
                self.schedule_in(
                    self.config.telemetry_restore_delay_ms,
                    EventPayload::UpdateTelemetry(TelemetryUpdate {
                        signal_quality: Some((pre + RECAL_RESTORE_GAIN).min(1.0)),
                        latency_ms: None,
                    }),
                );
                self.schedule_in(12_000, EventPayload::image(ids::IMG_0003_HIGHQ));
                self.schedule_in(20_000, EventPayload::transmission(ids::TX_0003));
            }
            ids::OP_ALIGN_ANTENNA => {
                self.state.adjust_tech(TechVar::AntennaAlignment, 10);
                self.open_puzzle(ids::PUZZLE_ANTENNA);
            }
            ids::OP_DECODE_SPECTRUM => {
                self.state.adjust_tech(TechVar::DecoderConfidence, 30);
                self.open_puzzle(ids::PUZZLE_SPECTRUM);
            }
            ids::OP_BOOST_SIGNAL => {
                self.state.add_clue(ClueId::from(ids::SIGNAL_BOOSTED));
                self.state.adjust_tech(TechVar::PowerReserve, -30);
                let telemetry = self.state.telemetry();
                self.state.set_signal_quality(telemetry.signal_quality + 0.2);
                self.state.set_latency(telemetry.latency_ms.saturating_sub(400));
                self.schedule_in(10_000, EventPayload::image(ids::IMG_0004_STRUCT));
                self.schedule_in(25_000, EventPayload::transmission(ids::TX_0004));
            }
            ids::OP_TRIANGULATE => self.open_puzzle(ids::PUZZLE_TRIANGULATION),
            other => warn!(op = other, "operation has no effect"),
        }

        self.recompute_progress();
    }

    /// Open a puzzle from the catalogue and show it.
    pub(crate) fn open_puzzle(&mut self, id: &str) {
        let config = match self.puzzles.get(id) {
            Ok(config) => config.clone(),
            Err(err) => {
                warn!(%err, "puzzle not opened");
                return;
            }
        };

        let ctx = PuzzleContext {
            seed: self.config.seed.wrapping_add(self.puzzles_opened),
            now: self.now,
            tech: self.state.tech().clone(),
        };
        self.puzzles_opened += 1;
        self.state.mark_puzzle_opened(config.id.clone());

        if let Some(replaced) = self.puzzle.open(&config, &ctx) {
            info!(%replaced, "open puzzle replaced");
            self.presentation.hide_puzzle();
            self.note_set_aside(&replaced);
        }
        let blocking = self.puzzle.is_blocking();
        let surface = self.puzzle.surface().unwrap_or_default();
        self.presentation
            .show_puzzle(&config.title, &config.instructions, blocking, &surface);
        self.log(
            LogTag::Puzzle,
            format!("{} ready.", config.title),
            LineCause::Puzzle(config.id.clone()),
        );
    }

    /// Tell the player an unsolved puzzle left the screen and can be
    /// reopened.
    pub(crate) fn note_set_aside(&mut self, id: &PuzzleId) {
        if self.state.is_puzzle_solved(id.as_str()) {
            return;
        }
        let title = self
            .puzzles
            .get(id.as_str())
            .map_or_else(|_| id.to_string(), |config| config.title.clone());
        self.log(
            LogTag::Puzzle,
            format!("{title} set aside unsolved. Reopen it to finish the procedure."),
            LineCause::Puzzle(id.clone()),
        );
    }
}
