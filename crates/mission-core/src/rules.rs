//! Progress computation and declarative unlock rules.
//!
//! Progress is a pure function of the clue set: the sum of each clue's point
//! value, floored to a multiple of 5. Unlock rules are evaluated against the
//! state after progress is refreshed:
//!
//! 1. Rules run once per pass, in list order. There is no fixed-point
//!    iteration: a capability granted by an earlier rule is visible to later
//!    rules in the same pass, but an earlier rule is not re-checked.
//! 2. A rule whose id is already in the applied set is skipped.
//! 3. A rule whose condition holds is marked applied and its grants are
//!    unioned into the capability set.
//! 4. Only capabilities that were *not* already held are reported back, so
//!    the caller notifies each capability at most once even if two rules
//!    grant it.
//!
//! The applied-rule set and the capability set are kept separate for exactly
//! that reason.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::identity::{ClueId, OperationId, RuleId};
use crate::state::MissionState;

/// Progress values are floored to this step.
pub const PROGRESS_STEP: u32 = 5;

// ---------------------------------------------------------------------------
// UnlockRule
// ---------------------------------------------------------------------------

/// A rule condition. Conditions should read clues and progress only.
pub type RuleCondition = fn(&MissionState) -> bool;

/// A declarative rule granting capabilities once its condition holds.
#[derive(Clone)]
pub struct UnlockRule {
    /// Unique rule id.
    pub id: RuleId,
    /// Human-readable summary, used in debug output.
    pub description: String,
    /// Predicate over the mission state.
    pub condition: RuleCondition,
    /// Capabilities granted when the condition first holds.
    pub grants: Vec<OperationId>,
}

impl UnlockRule {
    /// Build a rule.
    pub fn new(id: &str, description: &str, condition: RuleCondition, grants: &[&str]) -> Self {
        Self {
            id: RuleId::from(id),
            description: description.to_owned(),
            condition,
            grants: grants.iter().map(|g| OperationId::from(*g)).collect(),
        }
    }
}

impl fmt::Debug for UnlockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockRule")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("grants", &self.grants)
            .finish_non_exhaustive()
    }
}

/// A capability newly granted by a rule pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockGrant {
    /// The rule that fired.
    pub rule: RuleId,
    /// The capability that became available.
    pub capability: OperationId,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Sum of the point values of `clues`, floored to a multiple of
/// [`PROGRESS_STEP`]. Clues missing from `points` are worth nothing.
pub fn compute_progress<'a>(
    clues: impl IntoIterator<Item = &'a ClueId>,
    points: &BTreeMap<ClueId, u32>,
) -> u32 {
    let total: u32 = clues
        .into_iter()
        .map(|c| points.get(c).copied().unwrap_or(0))
        .sum();
    total - total % PROGRESS_STEP
}

// ---------------------------------------------------------------------------
// Rule evaluation
// ---------------------------------------------------------------------------

/// Run one pass of `rules` over `state`. Returns the capabilities that were
/// newly added, in grant order.
pub fn apply_unlock_rules(state: &mut MissionState, rules: &[UnlockRule]) -> Vec<UnlockGrant> {
    let mut granted = Vec::new();

    for rule in rules {
        if state.is_rule_applied(rule.id.as_str()) {
            continue;
        }
        if !(rule.condition)(state) {
            continue;
        }

        state.mark_rule_applied(rule.id.clone());
        debug!(rule = %rule.id, "unlock rule applied");

        for capability in &rule.grants {
            if state.grant_capability(capability.clone()) {
                info!(rule = %rule.id, capability = %capability, "capability unlocked");
                granted.push(UnlockGrant {
                    rule: rule.id.clone(),
                    capability: capability.clone(),
                });
            }
        }
    }

    granted
}

/// Refresh `state.progress` from its clues, then run the unlock rules.
pub fn recompute(
    state: &mut MissionState,
    points: &BTreeMap<ClueId, u32>,
    rules: &[UnlockRule],
) -> Vec<UnlockGrant> {
    let progress = compute_progress(state.clues(), points);
    state.set_progress(progress);
    apply_unlock_rules(state, rules)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> BTreeMap<ClueId, u32> {
        [("a", 5), ("b", 5), ("c", 3), ("d", 4)]
            .into_iter()
            .map(|(k, v)| (ClueId::from(k), v))
            .collect()
    }

    fn has_a(state: &MissionState) -> bool {
        state.has_clue("a")
    }

    fn progress_at_least_10(state: &MissionState) -> bool {
        state.progress() >= 10
    }

    fn always(_: &MissionState) -> bool {
        true
    }

    // -- 1. Progress --------------------------------------------------------

    #[test]
    fn progress_sums_and_floors() {
        let points = points();
        let clues = [ClueId::from("a"), ClueId::from("c")];
        assert_eq!(compute_progress(&clues, &points), 5);

        let clues = [ClueId::from("a"), ClueId::from("c"), ClueId::from("d")];
        assert_eq!(compute_progress(&clues, &points), 10);
    }

    #[test]
    fn unknown_clues_are_worth_nothing() {
        let clues = [ClueId::from("zzz")];
        assert_eq!(compute_progress(&clues, &points()), 0);
    }

    #[test]
    fn progress_is_idempotent() {
        let points = points();
        let clues = [ClueId::from("a"), ClueId::from("b")];
        let first = compute_progress(&clues, &points);
        assert_eq!(compute_progress(&clues, &points), first);
    }

    // -- 2. Rule application ------------------------------------------------

    #[test]
    fn rule_grants_when_condition_holds() {
        let rules = vec![UnlockRule::new("r1", "has a", has_a, &["OP_X"])];
        let mut state = MissionState::default();

        assert!(apply_unlock_rules(&mut state, &rules).is_empty());

        state.add_clue(ClueId::from("a"));
        let granted = apply_unlock_rules(&mut state, &rules);
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].capability, "OP_X");
        assert!(state.has_capability("OP_X"));
        assert!(state.is_rule_applied("r1"));
    }

    #[test]
    fn rules_apply_once() {
        let rules = vec![UnlockRule::new("r1", "always", always, &["OP_X"])];
        let mut state = MissionState::default();

        assert_eq!(apply_unlock_rules(&mut state, &rules).len(), 1);
        let version = state.version();
        assert!(apply_unlock_rules(&mut state, &rules).is_empty());
        assert_eq!(state.version(), version);
    }

    #[test]
    fn shared_capability_is_reported_once() {
        let rules = vec![
            UnlockRule::new("r1", "always", always, &["OP_X"]),
            UnlockRule::new("r2", "always", always, &["OP_X", "OP_Y"]),
        ];
        let mut state = MissionState::default();

        let granted = apply_unlock_rules(&mut state, &rules);
        let caps: Vec<_> = granted.iter().map(|g| g.capability.as_str()).collect();
        assert_eq!(caps, vec!["OP_X", "OP_Y"]);
        assert!(state.is_rule_applied("r1"));
        assert!(state.is_rule_applied("r2"));
    }

    #[test]
    fn earlier_grants_are_visible_to_later_rules_but_not_earlier_ones() {
        fn has_op_y(state: &MissionState) -> bool {
            state.has_capability("OP_Y")
        }
        // r1 depends on r2's grant but runs first: single pass, no fixed point.
        let rules = vec![
            UnlockRule::new("r1", "needs OP_Y", has_op_y, &["OP_Z"]),
            UnlockRule::new("r2", "always", always, &["OP_Y"]),
        ];
        let mut state = MissionState::default();

        let granted = apply_unlock_rules(&mut state, &rules);
        assert_eq!(granted.len(), 1);
        assert!(!state.has_capability("OP_Z"));

        let granted = apply_unlock_rules(&mut state, &rules);
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].capability, "OP_Z");
    }

    // -- 3. Recompute -------------------------------------------------------

    #[test]
    fn recompute_refreshes_progress_before_rules() {
        let rules = vec![UnlockRule::new(
            "r1",
            "progress >= 10",
            progress_at_least_10,
            &["OP_X"],
        )];
        let mut state = MissionState::default();
        state.add_clue(ClueId::from("a"));
        state.add_clue(ClueId::from("b"));

        let granted = recompute(&mut state, &points(), &rules);
        assert_eq!(state.progress(), 10);
        assert_eq!(granted.len(), 1);
    }
}
