//! Static mission content: the data tables the engine consumes.
//!
//! Nothing here is logic. The tables describe what each transmission and
//! image contains, which clue it yields and which follow-up events it
//! schedules, how many points each clue is worth, which rules unlock which
//! operations, and the copy for journal, encyclopedia and hint text.
//!
//! [`ContentTables::standard`] builds the LARK-7 mission. Hosts can build
//! their own tables (for tests or alternate missions) through the public
//! fields.

use std::collections::BTreeMap;

use crate::event::{EntrySection, EventPayload, LogTag};
use crate::identity::{ClueId, EntryId, ImageId, OperationId, TransmissionId};
use crate::rules::UnlockRule;
use crate::state::MissionState;
use crate::MissionError;

/// Well-known content ids.
pub mod ids {
    /// Transmission sequence ids.
    pub const TX_0001: &str = "0001";
    /// Lens contamination report.
    pub const TX_0002: &str = "0002";
    /// Spectral anomaly report.
    pub const TX_0003: &str = "0003";
    /// Signal origin report.
    pub const TX_0004: &str = "0004";

    /// First, low-quality image.
    pub const IMG_0001_LOWQ: &str = "IMG_0001_LOWQ";
    /// Image after the lens is cleaned.
    pub const IMG_0002_MEDQ: &str = "IMG_0002_MEDQ";
    /// Image after recalibration.
    pub const IMG_0003_HIGHQ: &str = "IMG_0003_HIGHQ";
    /// Image after the signal boost.
    pub const IMG_0004_STRUCT: &str = "IMG_0004_STRUCT";

    /// Clean the camera objective.
    pub const OP_CLEAN_LENS: &str = "OP_CLEAN_LENS";
    /// Recalibrate the camera sensor.
    pub const OP_RECAL_CAMERA: &str = "OP_RECAL_CAMERA";
    /// Re-point the high-gain antenna (puzzle).
    pub const OP_ALIGN_ANTENNA: &str = "OP_ALIGN_ANTENNA";
    /// Decode the spectral anomaly (puzzle).
    pub const OP_DECODE_SPECTRUM: &str = "OP_DECODE_SPECTRUM";
    /// Route reserve power to the transmitter.
    pub const OP_BOOST_SIGNAL: &str = "OP_BOOST_SIGNAL";
    /// Locate the signal origin (puzzle).
    pub const OP_TRIANGULATE: &str = "OP_TRIANGULATE";

    /// Clue ids.
    pub const TX_0001_RECEIVED: &str = "tx_0001_received";
    pub const IMG_0001_RECEIVED: &str = "img_0001_received";
    pub const TX_0002_RECEIVED: &str = "tx_0002_received";
    pub const LENS_CLEANED: &str = "lens_cleaned";
    pub const IMG_0002_RECEIVED: &str = "img_0002_received";
    pub const CAMERA_RECALIBRATED: &str = "camera_recalibrated";
    pub const IMG_0003_RECEIVED: &str = "img_0003_received";
    pub const TX_0003_RECEIVED: &str = "tx_0003_received";
    pub const ANTENNA_ALIGNED: &str = "antenna_aligned";
    pub const SPECTRUM_DECODED: &str = "spectrum_decoded";
    pub const SIGNAL_BOOSTED: &str = "signal_boosted";
    pub const IMG_0004_RECEIVED: &str = "img_0004_received";
    pub const TX_0004_RECEIVED: &str = "tx_0004_received";
    pub const ORIGIN_IDENTIFIED: &str = "origin_identified";

    /// Puzzle ids.
    pub const PUZZLE_ANTENNA: &str = "antenna_alignment";
    pub const PUZZLE_SPECTRUM: &str = "spectrum_decode";
    pub const PUZZLE_TRIANGULATION: &str = "triangulation";
}

/// Boot-script offset of the first transmission.
pub const TX_0001_OFFSET_MS: u64 = 5_000;
/// Boot-script offset of the first image.
pub const IMG_0001_OFFSET_MS: u64 = 15_000;
/// Delay between an image and the transmission it triggers.
pub const IMAGE_FOLLOW_UP_MS: u64 = 30_000;

// ---------------------------------------------------------------------------
// Table entry types
// ---------------------------------------------------------------------------

/// An event scheduled relative to the moment its parent is handled.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    /// Delay after the parent event, in milliseconds.
    pub delay_ms: u64,
    /// What to schedule.
    pub payload: EventPayload,
}

impl FollowUp {
    /// Build a follow-up.
    pub fn new(delay_ms: u64, payload: EventPayload) -> Self {
        Self { delay_ms, payload }
    }
}

/// A transmission from the probe.
#[derive(Debug, Clone)]
pub struct TransmissionSpec {
    /// Sequence id.
    pub id: TransmissionId,
    /// One-line summary for the console.
    pub subject: String,
    /// Clue granted on arrival.
    pub clue: Option<ClueId>,
    /// Journal entry added on arrival.
    pub journal_entry: Option<EntryId>,
    /// Events scheduled on arrival.
    pub follow_ups: Vec<FollowUp>,
}

/// An image from the probe.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    /// Image id.
    pub id: ImageId,
    /// Caption shown in the images tab and the console.
    pub caption: String,
    /// Clue granted on arrival.
    pub clue: Option<ClueId>,
    /// Events scheduled on arrival.
    pub follow_ups: Vec<FollowUp>,
}

/// An operation as listed in the operations panel.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    /// Operation id, also the capability id.
    pub id: OperationId,
    /// Button label.
    pub label: String,
    /// Tooltip text.
    pub description: String,
}

/// A journal or encyclopedia entry.
#[derive(Debug, Clone)]
pub struct TextEntry {
    /// Entry id.
    pub id: EntryId,
    /// Heading.
    pub title: String,
    /// Body copy.
    pub body: String,
}

// ---------------------------------------------------------------------------
// ContentTables
// ---------------------------------------------------------------------------

/// All static content of a mission.
#[derive(Debug, Clone, Default)]
pub struct ContentTables {
    /// Point value of each clue.
    pub clue_points: BTreeMap<ClueId, u32>,
    /// Unlock rules, evaluated in order.
    pub rules: Vec<UnlockRule>,
    /// Operations in panel order.
    pub operations: Vec<OperationSpec>,
    /// Transmissions by id.
    pub transmissions: BTreeMap<TransmissionId, TransmissionSpec>,
    /// Images by id.
    pub images: BTreeMap<ImageId, ImageSpec>,
    /// Journal entries by id.
    pub journal: BTreeMap<EntryId, TextEntry>,
    /// Encyclopedia entries by id.
    pub encyclopedia: BTreeMap<EntryId, TextEntry>,
    /// Hint text by key.
    pub hints: BTreeMap<String, String>,
    /// Journal entries present at mission start.
    pub journal_seed: Vec<EntryId>,
    /// Events scheduled at session start, relative to mission time zero.
    pub boot_script: Vec<FollowUp>,
}

impl ContentTables {
    /// Look up a transmission.
    pub fn transmission(&self, id: &TransmissionId) -> Result<&TransmissionSpec, MissionError> {
        self.transmissions
            .get(id)
            .ok_or_else(|| MissionError::unknown("transmission", id.as_str()))
    }

    /// Look up an image.
    pub fn image(&self, id: &ImageId) -> Result<&ImageSpec, MissionError> {
        self.images
            .get(id)
            .ok_or_else(|| MissionError::unknown("image", id.as_str()))
    }

    /// Look up an entry in either text collection.
    pub fn entry(&self, section: EntrySection, id: &EntryId) -> Result<&TextEntry, MissionError> {
        let (table, kind) = match section {
            EntrySection::Journal => (&self.journal, "journal entry"),
            EntrySection::Encyclopedia => (&self.encyclopedia, "encyclopedia entry"),
        };
        table
            .get(id)
            .ok_or_else(|| MissionError::unknown(kind, id.as_str()))
    }

    /// Look up hint text.
    pub fn hint(&self, key: &str) -> Result<&str, MissionError> {
        self.hints
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| MissionError::unknown("hint", key))
    }

    /// Look up an operation.
    pub fn operation(&self, id: &str) -> Result<&OperationSpec, MissionError> {
        self.operations
            .iter()
            .find(|op| op.id == id)
            .ok_or_else(|| MissionError::unknown("operation", id))
    }

    /// Sum of all clue values. Progress can never exceed this.
    pub fn max_points(&self) -> u32 {
        self.clue_points.values().sum()
    }

    /// The LARK-7 mission.
    pub fn standard() -> Self {
        use ids::*;

        let clue_points = [
            (TX_0001_RECEIVED, 5),
            (IMG_0001_RECEIVED, 5),
            (TX_0002_RECEIVED, 5),
            (LENS_CLEANED, 10),
            (IMG_0002_RECEIVED, 5),
            (CAMERA_RECALIBRATED, 10),
            (IMG_0003_RECEIVED, 5),
            (TX_0003_RECEIVED, 5),
            (ANTENNA_ALIGNED, 10),
            (SPECTRUM_DECODED, 10),
            (SIGNAL_BOOSTED, 8),
            (IMG_0004_RECEIVED, 5),
            (TX_0004_RECEIVED, 7),
            (ORIGIN_IDENTIFIED, 10),
        ]
        .into_iter()
        .map(|(clue, points)| (ClueId::from(clue), points))
        .collect();

        let rules = vec![
            UnlockRule::new(
                "rule_clean_lens",
                "lens contamination reported",
                |s: &MissionState| s.has_clue(TX_0002_RECEIVED),
                &[OP_CLEAN_LENS],
            ),
            UnlockRule::new(
                "rule_recal_camera",
                "clean image received",
                |s: &MissionState| s.has_clue(LENS_CLEANED) && s.has_clue(IMG_0002_RECEIVED),
                &[OP_RECAL_CAMERA],
            ),
            UnlockRule::new(
                "rule_align_antenna",
                "progress reached 40",
                |s: &MissionState| s.progress() >= 40,
                &[OP_ALIGN_ANTENNA],
            ),
            UnlockRule::new(
                "rule_decode_spectrum",
                "anomaly imaged and reported",
                |s: &MissionState| s.has_clue(IMG_0003_RECEIVED) && s.has_clue(TX_0003_RECEIVED),
                &[OP_DECODE_SPECTRUM],
            ),
            UnlockRule::new(
                "rule_boost_signal",
                "progress reached 70",
                |s: &MissionState| s.progress() >= 70,
                &[OP_BOOST_SIGNAL],
            ),
            UnlockRule::new(
                "rule_triangulate",
                "signal origin reported",
                |s: &MissionState| s.has_clue(TX_0004_RECEIVED),
                &[OP_TRIANGULATE],
            ),
        ];

        let operations = [
            (OP_CLEAN_LENS, "Clean lens", "Run the objective wiper and nitrogen purge."),
            (OP_RECAL_CAMERA, "Recalibrate camera", "Flat-field recalibration of the imaging sensor. Briefly degrades the link."),
            (OP_ALIGN_ANTENNA, "Align antenna", "Manually re-point the high-gain antenna."),
            (OP_DECODE_SPECTRUM, "Decode spectrum", "Isolate the anomalous bands in the spectrometer feed."),
            (OP_BOOST_SIGNAL, "Boost signal", "Route battery reserve to the transmitter amplifier."),
            (OP_TRIANGULATE, "Triangulate origin", "Cross the bearings from three listening passes."),
        ]
        .into_iter()
        .map(|(id, label, description)| OperationSpec {
            id: OperationId::from(id),
            label: label.to_owned(),
            description: description.to_owned(),
        })
        .collect();

        let transmissions = [
            TransmissionSpec {
                id: TransmissionId::from(TX_0001),
                subject: "LARK-7 descent complete. Surface contact confirmed, all subsystems nominal.".to_owned(),
                clue: Some(ClueId::from(TX_0001_RECEIVED)),
                journal_entry: Some(EntryId::from("tx-0001")),
                follow_ups: vec![FollowUp::new(
                    4_000,
                    EventPayload::entry(EntrySection::Encyclopedia, "cryo_plains"),
                )],
            },
            TransmissionSpec {
                id: TransmissionId::from(TX_0002),
                subject: "Imaging pipeline reports particulate on the objective. Cleaning cycle recommended.".to_owned(),
                clue: Some(ClueId::from(TX_0002_RECEIVED)),
                journal_entry: Some(EntryId::from("tx-0002")),
                follow_ups: vec![FollowUp::new(
                    3_000,
                    EventPayload::entry(EntrySection::Encyclopedia, "optics"),
                )],
            },
            TransmissionSpec {
                id: TransmissionId::from(TX_0003),
                subject: "Spectrometer flags a periodic emission in the low bands. Pattern not natural.".to_owned(),
                clue: Some(ClueId::from(TX_0003_RECEIVED)),
                journal_entry: Some(EntryId::from("tx-0003")),
                follow_ups: vec![FollowUp::new(
                    3_000,
                    EventPayload::entry(EntrySection::Encyclopedia, "spectrometer"),
                )],
            },
            TransmissionSpec {
                id: TransmissionId::from(TX_0004),
                subject: "Boosted carrier resolves a repeating beacon beneath the ice shelf. Triangulation requested.".to_owned(),
                clue: Some(ClueId::from(TX_0004_RECEIVED)),
                journal_entry: Some(EntryId::from("tx-0004")),
                follow_ups: Vec::new(),
            },
        ]
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();

        let images = [
            ImageSpec {
                id: ImageId::from(IMG_0001_LOWQ),
                caption: "First light. Heavy smearing, horizon barely visible.".to_owned(),
                clue: Some(ClueId::from(IMG_0001_RECEIVED)),
                follow_ups: vec![FollowUp::new(
                    IMAGE_FOLLOW_UP_MS,
                    EventPayload::transmission(TX_0002),
                )],
            },
            ImageSpec {
                id: ImageId::from(IMG_0002_MEDQ),
                caption: "Clean objective. Ridge line sharp, faint sensor banding.".to_owned(),
                clue: Some(ClueId::from(IMG_0002_RECEIVED)),
                follow_ups: vec![FollowUp::new(
                    2_000,
                    EventPayload::log(LogTag::Rx, "Banding consistent with sensor drift. Recalibration advised."),
                )],
            },
            ImageSpec {
                id: ImageId::from(IMG_0003_HIGHQ),
                caption: "Full resolution. Fractured ice shelf to the north, dark seam along its base.".to_owned(),
                clue: Some(ClueId::from(IMG_0003_RECEIVED)),
                follow_ups: vec![FollowUp::new(
                    5_000,
                    EventPayload::entry(EntrySection::Encyclopedia, "ice_shelf"),
                )],
            },
            ImageSpec {
                id: ImageId::from(IMG_0004_STRUCT),
                caption: "Long exposure. Regular geometry under the ice, too straight to be a fault.".to_owned(),
                clue: Some(ClueId::from(IMG_0004_RECEIVED)),
                follow_ups: Vec::new(),
            },
        ]
        .into_iter()
        .map(|i| (i.id.clone(), i))
        .collect();

        let journal = [
            ("mission_brief", "Mission brief", "LARK-7 is down on the cryo plains. Every command takes minutes to arrive and longer to answer. Patience is part of the job."),
            ("tx-0001", "TX #0001", "Descent complete. The probe is alive and talking."),
            ("tx-0002", "TX #0002", "The first image was useless. Something is on the lens."),
            ("tx-0003", "TX #0003", "A periodic emission in the low bands. Nothing natural repeats like that."),
            ("tx-0004", "TX #0004", "The boosted carrier picked out a beacon under the ice shelf."),
            ("antenna-log", "Antenna log", "High-gain antenna re-pointed by hand. The link is steadier now."),
            ("mission_complete", "Origin located", "Three bearings cross at one point beneath the shelf. Whatever is down there has been calling for a long time."),
        ]
        .into_iter()
        .map(text_entry)
        .collect();

        let encyclopedia = [
            ("lark7", "LARK-7", "Solar-electric surface probe. Fixed camera mast, spectrometer, steerable high-gain antenna."),
            ("cryo_plains", "Cryo plains", "Flat water-ice terrain with a thin regolith crust. Fine particulate lifts easily during landing."),
            ("optics", "Camera optics", "A single objective protected by a wiper and nitrogen purge line."),
            ("spectrometer", "Spectrometer", "Twelve-band receiver. Natural sources are broadband; narrow periodic peaks suggest a transmitter."),
            ("ice_shelf", "Ice shelf", "A raised shelf bounding the plains to the north, fractured along its base."),
            ("signal_pattern", "Signal pattern", "The decoded bands repeat every 4.2 seconds with no drift."),
        ]
        .into_iter()
        .map(text_entry)
        .collect();

        let hints = [
            ("general", "Operations unlock as you learn more. Watch the journal for new transmissions."),
            ("lens", "The first image came back smeared. Wait for the probe to report what it sees."),
            ("camera", "Recalibration briefly degrades the link. It recovers on its own."),
            ("antenna", "Bring each dial within a few degrees of the target bearing."),
            ("spectrum", "Only the bands that repeat belong to the signal."),
            ("triangulation", "Each miss tells you how far off you were."),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let boot_script = vec![
            FollowUp::new(0, EventPayload::log(LogTag::Sys, "Ground station online. Opening deep-space link.")),
            FollowUp::new(1_500, EventPayload::log(LogTag::Sys, "Carrier locked on LARK-7.")),
            FollowUp::new(3_000, EventPayload::entry(EntrySection::Encyclopedia, "lark7")),
            FollowUp::new(TX_0001_OFFSET_MS, EventPayload::transmission(TX_0001)),
            FollowUp::new(IMG_0001_OFFSET_MS, EventPayload::image(IMG_0001_LOWQ)),
        ];

        Self {
            clue_points,
            rules,
            operations,
            transmissions,
            images,
            journal,
            encyclopedia,
            hints,
            journal_seed: vec![EntryId::from("mission_brief")],
            boot_script,
        }
    }
}

fn text_entry((id, title, body): (&str, &str, &str)) -> (EntryId, TextEntry) {
    (
        EntryId::from(id),
        TextEntry {
            id: EntryId::from(id),
            title: title.to_owned(),
            body: body.to_owned(),
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::compute_progress;

    #[test]
    fn standard_points_total_100() {
        let content = ContentTables::standard();
        assert_eq!(content.max_points(), 100);
    }

    #[test]
    fn every_granted_capability_is_in_the_catalogue() {
        let content = ContentTables::standard();
        for rule in &content.rules {
            for cap in &rule.grants {
                assert!(content.operation(cap.as_str()).is_ok(), "{cap} not catalogued");
            }
        }
    }

    #[test]
    fn every_clue_from_arrivals_has_points() {
        let content = ContentTables::standard();
        let clues = content
            .transmissions
            .values()
            .filter_map(|t| t.clue.as_ref())
            .chain(content.images.values().filter_map(|i| i.clue.as_ref()));
        for clue in clues {
            assert!(content.clue_points.contains_key(clue), "{clue} has no points");
        }
    }

    #[test]
    fn follow_up_references_resolve() {
        let content = ContentTables::standard();
        let follow_ups = content
            .boot_script
            .iter()
            .chain(content.transmissions.values().flat_map(|t| &t.follow_ups))
            .chain(content.images.values().flat_map(|i| &i.follow_ups));

        for f in follow_ups {
            match &f.payload {
                EventPayload::IncomingTransmission { id } => {
                    assert!(content.transmission(id).is_ok());
                }
                EventPayload::IncomingImage { id } => assert!(content.image(id).is_ok()),
                EventPayload::UnlockEntry { section, id } => {
                    assert!(content.entry(*section, id).is_ok(), "{id}");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn first_two_arrivals_make_ten_percent() {
        let content = ContentTables::standard();
        let clues = [
            ClueId::from(ids::TX_0001_RECEIVED),
            ClueId::from(ids::IMG_0001_RECEIVED),
        ];
        assert_eq!(compute_progress(&clues, &content.clue_points), 10);
    }

    #[test]
    fn unknown_lookups_fail() {
        let content = ContentTables::standard();
        assert!(content.hint("nope").is_err());
        assert!(content
            .entry(EntrySection::Encyclopedia, &EntryId::from("nope"))
            .is_err());
        assert!(content.operation("OP_NOPE").is_err());
    }
}
