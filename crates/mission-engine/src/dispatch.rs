//! Event dispatch: one handler per [`EventPayload`] variant.
//!
//! Handlers run synchronously inside a tick. They may schedule follow-up
//! events; those land in the queue after the current drain and are handled
//! on a later tick even when already due. Unknown content ids are reported
//! with `tracing::warn!` and otherwise ignored.

use mission_console::LineCause;
use mission_core::event::{EntrySection, Event, EventKind, EventPayload, LogTag, TelemetryUpdate};
use mission_core::identity::{EntryId, ImageId, Tab, TransmissionId};
use tracing::{debug, warn};

use crate::ports::{sounds, PresentationSink, SoundPort};
use crate::session::MissionSession;

impl<S: SoundPort, P: PresentationSink> MissionSession<S, P> {
    /// Route one event to its handler.
    pub(crate) fn dispatch(&mut self, event: Event) {
        debug!(due_at = event.due_at.0, seq = event.seq, kind = ?event.kind(), "dispatch");
        let cause = LineCause::Event(event.kind());

        match event.payload {
            EventPayload::LogLine { tag, text } => self.log(tag, text, cause),
            EventPayload::IncomingTransmission { id } => self.on_transmission(&id),
            EventPayload::IncomingImage { id } => self.on_image(&id),
            EventPayload::UnlockEntry { section, id } => self.on_entry(section, id),
            EventPayload::UpdateTelemetry(update) => self.on_telemetry(update),
            EventPayload::OperationResult { op } => self.resolve_operation(op),
            EventPayload::RecomputeProgress => self.recompute_progress(),
        }
    }

    fn on_transmission(&mut self, id: &TransmissionId) {
        let spec = match self.content.transmission(id) {
            Ok(spec) => spec.clone(),
            Err(err) => {
                warn!(%err, "transmission ignored");
                return;
            }
        };

        if let Some(clue) = spec.clue {
            self.state.add_clue(clue);
        }
        if let Some(entry) = spec.journal_entry {
            self.state.add_journal_entry(entry);
            self.notify_arrival(Tab::Journal);
        }
        self.log(
            LogTag::Rx,
            format!("TX #{}: {}", spec.id, spec.subject),
            LineCause::Event(EventKind::IncomingTransmission),
        );
        self.play(sounds::INCOMING);
        for follow_up in spec.follow_ups {
            self.schedule_in(follow_up.delay_ms, follow_up.payload);
        }
        self.progress_dirty = true;
    }

    fn on_image(&mut self, id: &ImageId) {
        let spec = match self.content.image(id) {
            Ok(spec) => spec.clone(),
            Err(err) => {
                warn!(%err, "image ignored");
                return;
            }
        };

        self.state.add_image(spec.id.clone());
        self.notify_arrival(Tab::Images);
        if let Some(clue) = spec.clue {
            self.state.add_clue(clue);
        }
        self.log(
            LogTag::Rx,
            format!("{} received: {}", spec.id, spec.caption),
            LineCause::Event(EventKind::IncomingImage),
        );
        self.play(sounds::IMAGE);
        for follow_up in spec.follow_ups {
            self.schedule_in(follow_up.delay_ms, follow_up.payload);
        }
        self.progress_dirty = true;
    }

    fn on_entry(&mut self, section: EntrySection, id: EntryId) {
        let title = match self.content.entry(section, &id) {
            Ok(entry) => entry.title.clone(),
            Err(err) => {
                warn!(%err, "entry ignored");
                return;
            }
        };

        let (added, tab) = match section {
            EntrySection::Journal => (self.state.add_journal_entry(id), Tab::Journal),
            EntrySection::Encyclopedia => (self.state.add_encyclopedia_entry(id), Tab::Encyclopedia),
        };
        if added {
            self.log(
                LogTag::Sys,
                format!("{} updated: {title}", tab.name()),
                LineCause::Event(EventKind::UnlockEntry),
            );
            self.notify_arrival(tab);
        }
    }

    fn on_telemetry(&mut self, update: TelemetryUpdate) {
        let before = self.state.telemetry();
        if let Some(quality) = update.signal_quality {
            self.state.set_signal_quality(quality);
        }
        if let Some(latency) = update.latency_ms {
            self.state.set_latency(latency);
        }
        let after = self.state.telemetry();
        debug!(
            signal = after.signal_quality,
            latency_ms = after.latency_ms,
            "telemetry updated"
        );
        if after.signal_quality > before.signal_quality {
            self.stop(sounds::STATIC);
        }
    }
}
