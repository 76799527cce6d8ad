//! Mutable mission progress: the Domain State.
//!
//! [`MissionState`] is the single snapshot of everything the mission has
//! learned and unlocked. It is owned by the session and mutated only through
//! the methods here, each of which bumps a version counter so presentation
//! adapters can detect change without diffing contents:
//!
//! - [`MissionState::version`] moves on every mutation.
//! - [`MissionState::operations_version`] moves only when something the
//!   operations panel shows changes (capabilities, executed set, the
//!   in-progress operation).
//!
//! Clues, capabilities, applied rules and executed operations are grow-only
//! sets; no method removes from them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::identity::{ClueId, EntryId, ImageId, OperationId, PuzzleId, RuleId, Tab};

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Link telemetry shown in the status strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Link quality in `[0.0, 1.0]`.
    pub signal_quality: f64,
    /// One-way latency in milliseconds.
    pub latency_ms: u64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            signal_quality: 0.62,
            latency_ms: 2_400,
        }
    }
}

// ---------------------------------------------------------------------------
// Technical variables
// ---------------------------------------------------------------------------

/// Probe subsystem readings adjusted by operations. Each is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechVar {
    /// Camera lens cleanliness.
    LensClarity,
    /// Camera sensor calibration.
    CameraCalibration,
    /// High-gain antenna pointing accuracy.
    AntennaAlignment,
    /// Battery reserve.
    PowerReserve,
    /// Confidence of the on-board spectrum decoder.
    DecoderConfidence,
}

impl TechVar {
    /// All variables, in display order.
    pub const ALL: [TechVar; 5] = [
        TechVar::LensClarity,
        TechVar::CameraCalibration,
        TechVar::AntennaAlignment,
        TechVar::PowerReserve,
        TechVar::DecoderConfidence,
    ];

    /// Reading at mission start.
    pub fn initial(self) -> u8 {
        match self {
            TechVar::LensClarity => 35,
            TechVar::CameraCalibration => 50,
            TechVar::AntennaAlignment => 40,
            TechVar::PowerReserve => 80,
            TechVar::DecoderConfidence => 20,
        }
    }
}

/// The set of technical variables, each clamped to `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechVars(BTreeMap<TechVar, u8>);

impl TechVars {
    /// Maximum value of any variable.
    pub const MAX: u8 = 100;

    /// Current reading.
    pub fn get(&self, var: TechVar) -> u8 {
        self.0.get(&var).copied().unwrap_or_else(|| var.initial())
    }

    /// Add `delta` (may be negative) and clamp to `[0, 100]`. Returns the new
    /// reading.
    fn adjust(&mut self, var: TechVar, delta: i32) -> u8 {
        let next = (i32::from(self.get(var)) + delta).clamp(0, i32::from(Self::MAX));
        // Clamped above, cannot truncate.
        let next = next as u8;
        self.0.insert(var, next);
        next
    }

    /// Iterate `(variable, reading)` in display order.
    pub fn iter(&self) -> impl Iterator<Item = (TechVar, u8)> + '_ {
        TechVar::ALL.into_iter().map(|v| (v, self.get(v)))
    }
}

impl Default for TechVars {
    fn default() -> Self {
        Self(TechVar::ALL.into_iter().map(|v| (v, v.initial())).collect())
    }
}

// ---------------------------------------------------------------------------
// OperationStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Not yet granted by any unlock rule.
    Locked,
    /// Granted and not yet sent.
    Available,
    /// Sent; waiting for the result.
    InProgress,
    /// Completed. Terminal.
    Executed,
}

// ---------------------------------------------------------------------------
// MissionState
// ---------------------------------------------------------------------------

/// The Domain State of one mission session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionState {
    clues: BTreeSet<ClueId>,
    capabilities: BTreeSet<OperationId>,
    applied_rules: BTreeSet<RuleId>,
    executed_ops: BTreeSet<OperationId>,
    operation_in_progress: Option<OperationId>,
    tech: TechVars,
    telemetry: Telemetry,
    progress: u32,
    journal: Vec<EntryId>,
    encyclopedia: Vec<EntryId>,
    images: Vec<ImageId>,
    unread: BTreeMap<Tab, BTreeSet<String>>,
    active_tab: Tab,
    last_image: Option<ImageId>,
    opened_puzzles: BTreeSet<PuzzleId>,
    solved_puzzles: BTreeSet<PuzzleId>,
    version: u64,
    operations_version: u64,
}

impl Default for MissionState {
    fn default() -> Self {
        Self::new(Telemetry::default())
    }
}

impl MissionState {
    /// Fresh state: nothing learned, nothing unlocked.
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            clues: BTreeSet::new(),
            capabilities: BTreeSet::new(),
            applied_rules: BTreeSet::new(),
            executed_ops: BTreeSet::new(),
            operation_in_progress: None,
            tech: TechVars::default(),
            telemetry: Telemetry {
                signal_quality: telemetry.signal_quality.clamp(0.0, 1.0),
                latency_ms: telemetry.latency_ms,
            },
            progress: 0,
            journal: Vec::new(),
            encyclopedia: Vec::new(),
            images: Vec::new(),
            unread: Tab::ALL.into_iter().map(|t| (t, BTreeSet::new())).collect(),
            active_tab: Tab::default(),
            last_image: None,
            opened_puzzles: BTreeSet::new(),
            solved_puzzles: BTreeSet::new(),
            version: 0,
            operations_version: 0,
        }
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn touch_operations(&mut self) {
        self.version += 1;
        self.operations_version += 1;
    }

    // -- versions -----------------------------------------------------------

    /// Incremented on every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Incremented when capabilities, executed operations or the in-progress
    /// operation change.
    pub fn operations_version(&self) -> u64 {
        self.operations_version
    }

    // -- clues --------------------------------------------------------------

    /// Add a clue. Returns `true` if it was not already known.
    pub fn add_clue(&mut self, clue: ClueId) -> bool {
        let added = self.clues.insert(clue);
        if added {
            self.touch();
        }
        added
    }

    /// Whether the clue is known.
    pub fn has_clue(&self, clue: &str) -> bool {
        self.clues.contains(clue)
    }

    /// All known clues.
    pub fn clues(&self) -> &BTreeSet<ClueId> {
        &self.clues
    }

    // -- progress -----------------------------------------------------------

    /// Last computed progress percentage.
    pub fn progress(&self) -> u32 {
        self.progress
    }

    /// Store a recomputed progress value.
    pub fn set_progress(&mut self, progress: u32) {
        if self.progress != progress {
            self.progress = progress;
            self.touch();
        }
    }

    // -- capabilities & rules -----------------------------------------------

    /// Grant a capability. Returns `true` if it was newly added.
    pub fn grant_capability(&mut self, op: OperationId) -> bool {
        let added = self.capabilities.insert(op);
        if added {
            self.touch_operations();
        }
        added
    }

    /// Whether the operation is unlocked.
    pub fn has_capability(&self, op: &str) -> bool {
        self.capabilities.contains(op)
    }

    /// All unlocked operations.
    pub fn capabilities(&self) -> &BTreeSet<OperationId> {
        &self.capabilities
    }

    /// Record that an unlock rule has fired. Returns `true` the first time.
    pub fn mark_rule_applied(&mut self, rule: RuleId) -> bool {
        let added = self.applied_rules.insert(rule);
        if added {
            self.touch();
        }
        added
    }

    /// Whether the rule has already fired.
    pub fn is_rule_applied(&self, rule: &str) -> bool {
        self.applied_rules.contains(rule)
    }

    /// Ids of rules that have fired.
    pub fn applied_rules(&self) -> &BTreeSet<RuleId> {
        &self.applied_rules
    }

    // -- operations ---------------------------------------------------------

    /// The operation currently awaiting its result.
    pub fn operation_in_progress(&self) -> Option<&OperationId> {
        self.operation_in_progress.as_ref()
    }

    /// Whether the operation has completed.
    pub fn is_executed(&self, op: &str) -> bool {
        self.executed_ops.contains(op)
    }

    /// Completed operations.
    pub fn executed_ops(&self) -> &BTreeSet<OperationId> {
        &self.executed_ops
    }

    /// Mark `op` as in progress. The caller has already checked the gating
    /// rules.
    pub fn begin_operation(&mut self, op: OperationId) {
        self.operation_in_progress = Some(op);
        self.touch_operations();
    }

    /// Clear the in-progress slot (if it holds `op`) and add `op` to the
    /// executed set. Returns `true` if `op` had not been executed before.
    pub fn finish_operation(&mut self, op: &OperationId) -> bool {
        let cleared = self.operation_in_progress.as_ref() == Some(op);
        if cleared {
            self.operation_in_progress = None;
        }
        let added = self.executed_ops.insert(op.clone());
        if cleared || added {
            self.touch_operations();
        }
        added
    }

    /// Lifecycle status of `op`.
    pub fn operation_status(&self, op: &str) -> OperationStatus {
        if self.is_executed(op) {
            OperationStatus::Executed
        } else if self.operation_in_progress.as_ref().is_some_and(|o| o == op) {
            OperationStatus::InProgress
        } else if self.has_capability(op) {
            OperationStatus::Available
        } else {
            OperationStatus::Locked
        }
    }

    // -- technical variables & telemetry ------------------------------------

    /// Probe subsystem readings.
    pub fn tech(&self) -> &TechVars {
        &self.tech
    }

    /// Adjust a technical variable, clamped to `[0, 100]`.
    pub fn adjust_tech(&mut self, var: TechVar, delta: i32) -> u8 {
        let value = self.tech.adjust(var, delta);
        self.touch();
        value
    }

    /// Current telemetry.
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    /// Set signal quality, clamped to `[0.0, 1.0]`. Non-finite input is
    /// ignored.
    pub fn set_signal_quality(&mut self, quality: f64) {
        if !quality.is_finite() {
            return;
        }
        self.telemetry.signal_quality = quality.clamp(0.0, 1.0);
        self.touch();
    }

    /// Set the link latency.
    pub fn set_latency(&mut self, latency_ms: u64) {
        self.telemetry.latency_ms = latency_ms;
        self.touch();
    }

    // -- content collections ------------------------------------------------

    /// Journal entries in arrival order.
    pub fn journal(&self) -> &[EntryId] {
        &self.journal
    }

    /// Encyclopedia entries in arrival order.
    pub fn encyclopedia(&self) -> &[EntryId] {
        &self.encyclopedia
    }

    /// Received images in arrival order.
    pub fn images(&self) -> &[ImageId] {
        &self.images
    }

    /// The most recently received image.
    pub fn last_image(&self) -> Option<&ImageId> {
        self.last_image.as_ref()
    }

    /// Add a journal entry. Returns `true` if it was new.
    pub fn add_journal_entry(&mut self, id: EntryId) -> bool {
        if self.journal.contains(&id) {
            return false;
        }
        self.mark_arrival(Tab::Journal, id.as_str());
        self.journal.push(id);
        true
    }

    /// Add an encyclopedia entry. Returns `true` if it was new.
    pub fn add_encyclopedia_entry(&mut self, id: EntryId) -> bool {
        if self.encyclopedia.contains(&id) {
            return false;
        }
        self.mark_arrival(Tab::Encyclopedia, id.as_str());
        self.encyclopedia.push(id);
        true
    }

    /// Add an image and remember it as the last one received. Returns `true`
    /// if it was new.
    pub fn add_image(&mut self, id: ImageId) -> bool {
        if self.images.contains(&id) {
            return false;
        }
        self.mark_arrival(Tab::Images, id.as_str());
        self.last_image = Some(id.clone());
        self.images.push(id);
        true
    }

    /// New items are unread unless their tab is the active one.
    fn mark_arrival(&mut self, tab: Tab, id: &str) {
        if tab != self.active_tab {
            self.unread.entry(tab).or_default().insert(id.to_owned());
        }
        self.touch();
    }

    // -- tabs & unread tracking ---------------------------------------------

    /// The tab currently shown.
    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    /// Switch tabs. Items already unread stay unread until viewed.
    pub fn select_tab(&mut self, tab: Tab) {
        if self.active_tab != tab {
            self.active_tab = tab;
            self.touch();
        }
    }

    /// Mark an item viewed (hover or click). Returns `true` if it was unread.
    pub fn view(&mut self, tab: Tab, id: &str) -> bool {
        let removed = self
            .unread
            .get_mut(&tab)
            .is_some_and(|set| set.remove(id));
        if removed {
            self.touch();
        }
        removed
    }

    /// Unread ids of a tab.
    pub fn unread(&self, tab: Tab) -> impl Iterator<Item = &str> {
        self.unread
            .get(&tab)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Whether the tab shows the "has update" indicator.
    pub fn has_update(&self, tab: Tab) -> bool {
        self.unread.get(&tab).is_some_and(|set| !set.is_empty())
    }

    // -- puzzles ------------------------------------------------------------

    /// Record that an operation has opened `puzzle`. Returns `true` the
    /// first time.
    pub fn mark_puzzle_opened(&mut self, puzzle: PuzzleId) -> bool {
        let added = self.opened_puzzles.insert(puzzle);
        if added {
            self.touch();
        }
        added
    }

    /// Whether an operation has ever opened the puzzle.
    pub fn was_puzzle_opened(&self, puzzle: &str) -> bool {
        self.opened_puzzles.contains(puzzle)
    }

    /// Puzzles that have been opened but not solved. These can be reopened.
    pub fn unsolved_puzzles(&self) -> impl Iterator<Item = &PuzzleId> {
        self.opened_puzzles.difference(&self.solved_puzzles)
    }

    /// Record a solved puzzle. Returns `true` the first time.
    pub fn mark_puzzle_solved(&mut self, puzzle: PuzzleId) -> bool {
        let added = self.solved_puzzles.insert(puzzle);
        if added {
            self.touch();
        }
        added
    }

    /// Whether the puzzle has been solved.
    pub fn is_puzzle_solved(&self, puzzle: &str) -> bool {
        self.solved_puzzles.contains(puzzle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Grow-only sets --------------------------------------------------

    #[test]
    fn clues_are_added_once() {
        let mut state = MissionState::default();
        assert!(state.add_clue(ClueId::from("tx_0001_received")));
        let v = state.version();
        assert!(!state.add_clue(ClueId::from("tx_0001_received")));
        assert_eq!(state.version(), v, "duplicate add must not bump version");
        assert!(state.has_clue("tx_0001_received"));
    }

    #[test]
    fn capability_grant_bumps_operations_version() {
        let mut state = MissionState::default();
        let before = state.operations_version();
        assert!(state.grant_capability(OperationId::from("OP_CLEAN_LENS")));
        assert_eq!(state.operations_version(), before + 1);
        assert!(!state.grant_capability(OperationId::from("OP_CLEAN_LENS")));
        assert_eq!(state.operations_version(), before + 1);
    }

    #[test]
    fn clue_changes_do_not_bump_operations_version() {
        let mut state = MissionState::default();
        let before = state.operations_version();
        state.add_clue(ClueId::from("x"));
        state.set_signal_quality(0.3);
        assert_eq!(state.operations_version(), before);
    }

    // -- 2. Operation lifecycle ---------------------------------------------

    #[test]
    fn operation_status_walks_lifecycle() {
        let mut state = MissionState::default();
        let op = OperationId::from("OP_CLEAN_LENS");
        assert_eq!(state.operation_status("OP_CLEAN_LENS"), OperationStatus::Locked);

        state.grant_capability(op.clone());
        assert_eq!(state.operation_status("OP_CLEAN_LENS"), OperationStatus::Available);

        state.begin_operation(op.clone());
        assert_eq!(state.operation_status("OP_CLEAN_LENS"), OperationStatus::InProgress);

        assert!(state.finish_operation(&op));
        assert_eq!(state.operation_status("OP_CLEAN_LENS"), OperationStatus::Executed);
        assert!(state.operation_in_progress().is_none());
    }

    // -- 3. Technical variables & telemetry ---------------------------------

    #[test]
    fn tech_vars_clamp() {
        let mut state = MissionState::default();
        assert_eq!(state.adjust_tech(TechVar::LensClarity, 500), 100);
        assert_eq!(state.adjust_tech(TechVar::LensClarity, -1_000), 0);
        assert_eq!(state.tech().get(TechVar::PowerReserve), 80);
    }

    #[test]
    fn signal_quality_clamps_and_ignores_nan() {
        let mut state = MissionState::default();
        state.set_signal_quality(1.7);
        assert_eq!(state.telemetry().signal_quality, 1.0);
        state.set_signal_quality(-0.2);
        assert_eq!(state.telemetry().signal_quality, 0.0);
        state.set_signal_quality(f64::NAN);
        assert_eq!(state.telemetry().signal_quality, 0.0);
    }

    // -- 4. Unread tracking -------------------------------------------------

    #[test]
    fn items_on_inactive_tab_are_unread() {
        let mut state = MissionState::default();
        assert_eq!(state.active_tab(), Tab::Journal);

        state.add_image(ImageId::from("IMG_0001_LOWQ"));
        assert!(state.has_update(Tab::Images));
        assert_eq!(state.unread(Tab::Images).collect::<Vec<_>>(), vec!["IMG_0001_LOWQ"]);
        assert_eq!(state.last_image().map(ImageId::as_str), Some("IMG_0001_LOWQ"));
    }

    #[test]
    fn items_on_active_tab_are_read_immediately() {
        let mut state = MissionState::default();
        state.add_journal_entry(EntryId::from("tx-0001"));
        assert!(!state.has_update(Tab::Journal));
    }

    #[test]
    fn indicator_clears_only_when_set_empties() {
        let mut state = MissionState::default();
        state.add_encyclopedia_entry(EntryId::from("regolith"));
        state.add_encyclopedia_entry(EntryId::from("high_gain_antenna"));

        assert!(state.view(Tab::Encyclopedia, "regolith"));
        assert!(state.has_update(Tab::Encyclopedia));

        assert!(!state.view(Tab::Encyclopedia, "regolith"));
        assert!(state.view(Tab::Encyclopedia, "high_gain_antenna"));
        assert!(!state.has_update(Tab::Encyclopedia));
    }

    #[test]
    fn selecting_a_tab_does_not_mark_read() {
        let mut state = MissionState::default();
        state.add_image(ImageId::from("IMG_0001_LOWQ"));
        state.select_tab(Tab::Images);
        assert!(state.has_update(Tab::Images));
    }

    #[test]
    fn duplicate_items_are_ignored() {
        let mut state = MissionState::default();
        assert!(state.add_image(ImageId::from("IMG_0001_LOWQ")));
        assert!(!state.add_image(ImageId::from("IMG_0001_LOWQ")));
        assert_eq!(state.images().len(), 1);
    }

    // -- 5. Puzzles ---------------------------------------------------------

    #[test]
    fn opened_but_unsolved_puzzles_stay_listed() {
        let mut state = MissionState::default();
        assert!(state.mark_puzzle_opened(PuzzleId::from("spectrum_decode")));
        assert!(!state.mark_puzzle_opened(PuzzleId::from("spectrum_decode")));
        state.mark_puzzle_opened(PuzzleId::from("antenna_alignment"));
        state.mark_puzzle_solved(PuzzleId::from("antenna_alignment"));

        let unsolved: Vec<&str> = state.unsolved_puzzles().map(PuzzleId::as_str).collect();
        assert_eq!(unsolved, vec!["spectrum_decode"]);
        assert!(state.was_puzzle_opened("antenna_alignment"));
        assert!(!state.was_puzzle_opened("triangulation"));
    }

    // -- 6. Serialization ---------------------------------------------------

    #[test]
    fn state_round_trips_through_json() {
        let mut state = MissionState::default();
        state.add_clue(ClueId::from("lens_cleaned"));
        state.add_image(ImageId::from("IMG_0002_MEDQ"));
        state.adjust_tech(TechVar::LensClarity, 40);

        let json = serde_json::to_string(&state).unwrap();
        let back: MissionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
