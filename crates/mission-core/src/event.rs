//! Scheduled mission events.
//!
//! An [`Event`] is a payload due at a [`MissionTime`]. Events are created by
//! the boot script, by event handlers (follow-up chains), by the operation
//! executor and by user actions; they are removed from the queue exactly once,
//! when drained for dispatch.
//!
//! The set of kinds is closed: [`EventKind`] enumerates them, and
//! [`EventPayload`] carries the data for each kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::MissionTime;
use crate::identity::{EntryId, ImageId, OperationId, TransmissionId};

// ---------------------------------------------------------------------------
// LogTag
// ---------------------------------------------------------------------------

/// Category tag of a console log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogTag {
    /// Ground-station system message.
    Sys,
    /// Something received from the probe.
    Rx,
    /// Something sent to the probe.
    Tx,
    /// Rejected action or degraded condition.
    Warn,
    /// A capability became available.
    Unlock,
    /// Puzzle progress.
    Puzzle,
    /// Combo bonus applied.
    Bonus,
    /// Hint text requested by the player.
    Hint,
}

impl LogTag {
    /// The uppercase tag as rendered in the console.
    pub fn as_str(self) -> &'static str {
        match self {
            LogTag::Sys => "SYS",
            LogTag::Rx => "RX",
            LogTag::Tx => "TX",
            LogTag::Warn => "WARN",
            LogTag::Unlock => "UNLOCK",
            LogTag::Puzzle => "PUZZLE",
            LogTag::Bonus => "BONUS",
            LogTag::Hint => "HINT",
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntrySection
// ---------------------------------------------------------------------------

/// Which text collection an [`EventPayload::UnlockEntry`] adds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySection {
    /// The mission journal.
    Journal,
    /// The encyclopedia.
    Encyclopedia,
}

// ---------------------------------------------------------------------------
// TelemetryUpdate
// ---------------------------------------------------------------------------

/// New telemetry readings. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryUpdate {
    /// Link quality in `[0.0, 1.0]`. Clamped on application.
    pub signal_quality: Option<f64>,
    /// One-way light-time latency in milliseconds.
    pub latency_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// EventKind / EventPayload
// ---------------------------------------------------------------------------

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Append a line to the mission console.
    LogLine,
    /// A transmission from the probe arrives.
    IncomingTransmission,
    /// An image from the probe arrives.
    IncomingImage,
    /// A journal or encyclopedia entry becomes available.
    UnlockEntry,
    /// Telemetry readings change.
    UpdateTelemetry,
    /// A previously sent operation completes.
    OperationResult,
    /// Recompute progress and evaluate unlock rules.
    RecomputeProgress,
}

/// Data carried by an event. Each variant corresponds to one [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// See [`EventKind::LogLine`].
    LogLine {
        /// Console tag.
        tag: LogTag,
        /// Line text.
        text: String,
    },
    /// See [`EventKind::IncomingTransmission`].
    IncomingTransmission {
        /// Transmission sequence id.
        id: TransmissionId,
    },
    /// See [`EventKind::IncomingImage`].
    IncomingImage {
        /// Image id.
        id: ImageId,
    },
    /// See [`EventKind::UnlockEntry`].
    UnlockEntry {
        /// Target collection.
        section: EntrySection,
        /// Entry id.
        id: EntryId,
    },
    /// See [`EventKind::UpdateTelemetry`].
    UpdateTelemetry(TelemetryUpdate),
    /// See [`EventKind::OperationResult`].
    OperationResult {
        /// The operation that completes.
        op: OperationId,
    },
    /// See [`EventKind::RecomputeProgress`].
    RecomputeProgress,
}

impl EventPayload {
    /// The kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::LogLine { .. } => EventKind::LogLine,
            EventPayload::IncomingTransmission { .. } => EventKind::IncomingTransmission,
            EventPayload::IncomingImage { .. } => EventKind::IncomingImage,
            EventPayload::UnlockEntry { .. } => EventKind::UnlockEntry,
            EventPayload::UpdateTelemetry(_) => EventKind::UpdateTelemetry,
            EventPayload::OperationResult { .. } => EventKind::OperationResult,
            EventPayload::RecomputeProgress => EventKind::RecomputeProgress,
        }
    }

    /// Shorthand for a log line payload.
    pub fn log(tag: LogTag, text: impl Into<String>) -> Self {
        EventPayload::LogLine {
            tag,
            text: text.into(),
        }
    }

    /// Shorthand for a transmission arrival.
    pub fn transmission(id: &str) -> Self {
        EventPayload::IncomingTransmission {
            id: TransmissionId::from(id),
        }
    }

    /// Shorthand for an image arrival.
    pub fn image(id: &str) -> Self {
        EventPayload::IncomingImage {
            id: ImageId::from(id),
        }
    }

    /// Shorthand for an entry unlock.
    pub fn entry(section: EntrySection, id: &str) -> Self {
        EventPayload::UnlockEntry {
            section,
            id: EntryId::from(id),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A payload due at a mission time.
///
/// `seq` is the insertion sequence number assigned by the queue; it breaks
/// ties between events due at the same time (FIFO).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the event becomes due.
    pub due_at: MissionTime,
    /// Insertion order within the queue.
    pub seq: u64,
    /// What happens when it is dispatched.
    pub payload: EventPayload,
}

impl Event {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kinds_match() {
        assert_eq!(EventPayload::log(LogTag::Sys, "x").kind(), EventKind::LogLine);
        assert_eq!(
            EventPayload::transmission("0001").kind(),
            EventKind::IncomingTransmission
        );
        assert_eq!(
            EventPayload::image("IMG_0001_LOWQ").kind(),
            EventKind::IncomingImage
        );
        assert_eq!(
            EventPayload::entry(EntrySection::Encyclopedia, "regolith").kind(),
            EventKind::UnlockEntry
        );
        assert_eq!(
            EventPayload::UpdateTelemetry(TelemetryUpdate::default()).kind(),
            EventKind::UpdateTelemetry
        );
        assert_eq!(
            EventPayload::RecomputeProgress.kind(),
            EventKind::RecomputeProgress
        );
    }

    #[test]
    fn log_tag_renders_uppercase() {
        assert_eq!(LogTag::Unlock.to_string(), "UNLOCK");
        assert_eq!(serde_json::to_string(&LogTag::Rx).unwrap(), "\"RX\"");
    }
}
