//! Property tests for the event queue, progress and unlock rules.
//!
//! These tests use `proptest` to generate random schedules and clue
//! sequences and verify that ordering, monotonicity and idempotence
//! invariants hold.

use mission_core::prelude::*;
use proptest::prelude::*;

fn standard_clues() -> Vec<ClueId> {
    ContentTables::standard().clue_points.keys().cloned().collect()
}

fn schedule_strategy() -> impl Strategy<Value = Vec<(u64, bool)>> {
    // (time, absolute?) pairs
    prop::collection::vec((0u64..10_000, any::<bool>()), 0..200)
}

proptest! {
    #[test]
    fn drain_is_ordered_and_bounded(
        schedules in schedule_strategy(),
        now in 0u64..5_000,
        drain_at in 0u64..20_000,
    ) {
        let mut queue = EventQueue::new();
        for (i, (t, absolute)) in schedules.iter().enumerate() {
            let when = if *absolute { Schedule::At(MissionTime(*t)) } else { Schedule::In(*t) };
            queue.schedule(MissionTime(now), when, EventPayload::log(LogTag::Sys, i.to_string()));
        }

        let due = queue.drain_due(MissionTime(drain_at));

        for pair in due.windows(2) {
            prop_assert!(pair[0].due_at <= pair[1].due_at);
            if pair[0].due_at == pair[1].due_at {
                prop_assert!(pair[0].seq < pair[1].seq, "equal due times must be FIFO");
            }
        }
        for event in &due {
            prop_assert!(event.due_at <= MissionTime(drain_at));
        }
        if let Some(next) = queue.peek_due() {
            prop_assert!(next > MissionTime(drain_at));
        }
        prop_assert_eq!(due.len() + queue.len(), schedules.len());
    }

    #[test]
    fn repeated_drains_yield_every_event_once(
        schedules in schedule_strategy(),
        steps in prop::collection::vec(1u64..2_000, 1..20),
    ) {
        let mut queue = EventQueue::new();
        for (t, _) in &schedules {
            queue.schedule(MissionTime::ZERO, Schedule::At(MissionTime(*t)), EventPayload::RecomputeProgress);
        }

        let mut now = 0u64;
        let mut seen = Vec::new();
        for step in steps {
            now += step;
            seen.extend(queue.drain_due(MissionTime(now)).into_iter().map(|e| e.seq));
        }
        seen.extend(queue.drain_due(MissionTime(u64::MAX)).into_iter().map(|e| e.seq));

        let mut sorted = seen.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), seen.len(), "no event drained twice");
        prop_assert_eq!(seen.len(), schedules.len());
    }

    #[test]
    fn progress_is_monotone_and_stepped(order in Just(standard_clues()).prop_shuffle()) {
        let content = ContentTables::standard();
        let mut state = MissionState::default();
        let mut last = 0;

        for clue in order {
            state.add_clue(clue);
            let progress = compute_progress(state.clues(), &content.clue_points);
            prop_assert!(progress >= last);
            prop_assert_eq!(progress % 5, 0);
            prop_assert!(progress <= 100);
            last = progress;
        }
        prop_assert_eq!(last, 100);
    }

    #[test]
    fn unlock_rules_are_idempotent(clue_mask in prop::collection::vec(any::<bool>(), 14)) {
        let content = ContentTables::standard();
        let mut state = MissionState::default();
        for (clue, keep) in content.clue_points.keys().zip(clue_mask) {
            if keep {
                state.add_clue(clue.clone());
            }
        }

        let first = recompute(&mut state, &content.clue_points, &content.rules);
        let capabilities = state.capabilities().clone();
        let version = state.version();

        for _ in 0..3 {
            let again = recompute(&mut state, &content.clue_points, &content.rules);
            // A later rule can only newly fire if it reads a capability; the
            // standard rules read clues and progress only.
            prop_assert!(again.is_empty());
        }
        prop_assert_eq!(state.capabilities(), &capabilities);
        prop_assert_eq!(state.version(), version);

        let mut names: Vec<_> = first.iter().map(|g| g.capability.clone()).collect();
        names.sort();
        names.dedup();
        prop_assert_eq!(names.len(), first.len(), "each capability notified once");
    }
}
