//! Time-ordered queue of pending mission events.
//!
//! The [`EventQueue`] is a min-heap keyed by `(due_at, seq)`: events come out
//! in ascending due time, and events due at the same time come out in the
//! order they were scheduled (FIFO).
//!
//! Draining is split from dispatch. [`EventQueue::drain_due`] removes every
//! event due at or before `now` and returns them as a batch; the caller then
//! dispatches the batch. Anything a handler schedules while the batch is being
//! dispatched goes back into the heap and is only seen by the *next* drain,
//! even when it is already due. That bounds the work done per tick and keeps
//! iteration safe against re-entrant scheduling.
//!
//! # Example
//!
//! ```
//! use mission_core::prelude::*;
//!
//! let mut queue = EventQueue::new();
//! queue.schedule(MissionTime(0), Schedule::In(500), EventPayload::log(LogTag::Sys, "b"));
//! queue.schedule(MissionTime(0), Schedule::At(MissionTime(100)), EventPayload::log(LogTag::Sys, "a"));
//!
//! let due = queue.drain_due(MissionTime(200));
//! assert_eq!(due.len(), 1);
//! assert_eq!(queue.len(), 1);
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::clock::MissionTime;
use crate::event::{Event, EventPayload};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// When an event should become due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// `delay` milliseconds after the `now` passed to
    /// [`EventQueue::schedule`].
    In(u64),
    /// At an absolute mission time.
    At(MissionTime),
}

impl Schedule {
    /// Resolve to an absolute mission time.
    pub fn resolve(self, now: MissionTime) -> MissionTime {
        match self {
            Schedule::In(delay) => now.plus(delay),
            Schedule::At(at) => at,
        }
    }
}

// ---------------------------------------------------------------------------
// Heap ordering
// ---------------------------------------------------------------------------

/// Orders events by `(due_at, seq)` only; payloads do not participate.
#[derive(Debug, Clone)]
struct QueuedEvent(Event);

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .due_at
            .cmp(&other.0.due_at)
            .then_with(|| self.0.seq.cmp(&other.0.seq))
    }
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// Pending events, ordered by due time then insertion order.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueuedEvent>>,
    next_seq: u64,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event. `now` is only used to resolve [`Schedule::In`].
    ///
    /// Returns the absolute due time. Scheduling is infallible; an event due
    /// in the past simply becomes due on the next drain.
    pub fn schedule(&mut self, now: MissionTime, when: Schedule, payload: EventPayload) -> MissionTime {
        let due_at = when.resolve(now);
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(due_at = due_at.0, seq, kind = ?payload.kind(), "event scheduled");
        self.heap.push(Reverse(QueuedEvent(Event {
            due_at,
            seq,
            payload,
        })));
        due_at
    }

    /// Remove and return every event with `due_at <= now`, earliest first.
    ///
    /// Returns an empty vector when nothing is due.
    pub fn drain_due(&mut self, now: MissionTime) -> Vec<Event> {
        let mut due = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.0.due_at > now {
                break;
            }
            if let Some(Reverse(QueuedEvent(event))) = self.heap.pop() {
                due.push(event);
            }
        }
        due
    }

    /// Due time of the earliest pending event.
    pub fn peek_due(&self) -> Option<MissionTime> {
        self.heap.peek().map(|Reverse(e)| e.0.due_at)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// All pending events in dispatch order. Allocates; meant for snapshots
    /// and debugging, not the tick path.
    pub fn pending(&self) -> Vec<Event> {
        let mut events: Vec<QueuedEvent> = self.heap.iter().map(|Reverse(e)| e.clone()).collect();
        events.sort();
        events.into_iter().map(|e| e.0).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogTag;

    fn line(text: &str) -> EventPayload {
        EventPayload::log(LogTag::Sys, text)
    }

    fn texts(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .map(|e| match &e.payload {
                EventPayload::LogLine { text, .. } => text.clone(),
                other => format!("{:?}", other.kind()),
            })
            .collect()
    }

    // -- 1. Empty queue -----------------------------------------------------

    #[test]
    fn drain_on_empty_queue_is_noop() {
        let mut queue = EventQueue::new();
        assert!(queue.drain_due(MissionTime(1_000_000)).is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.peek_due(), None);
    }

    // -- 2. Ordering --------------------------------------------------------

    #[test]
    fn drains_in_due_order() {
        let mut queue = EventQueue::new();
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(300)), line("c"));
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(100)), line("a"));
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(200)), line("b"));

        let due = queue.drain_due(MissionTime(1_000));
        assert_eq!(texts(&due), vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_times_are_fifo() {
        let mut queue = EventQueue::new();
        for name in ["first", "second", "third"] {
            queue.schedule(MissionTime(0), Schedule::At(MissionTime(50)), line(name));
        }
        let due = queue.drain_due(MissionTime(50));
        assert_eq!(texts(&due), vec!["first", "second", "third"]);
    }

    #[test]
    fn relative_schedule_resolves_against_now() {
        let mut queue = EventQueue::new();
        let at = queue.schedule(MissionTime(1_000), Schedule::In(250), line("x"));
        assert_eq!(at, MissionTime(1_250));
        assert_eq!(queue.peek_due(), Some(MissionTime(1_250)));
    }

    // -- 3. Partial drains --------------------------------------------------

    #[test]
    fn never_drains_future_events() {
        let mut queue = EventQueue::new();
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(100)), line("now"));
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(101)), line("later"));

        let due = queue.drain_due(MissionTime(100));
        assert_eq!(texts(&due), vec!["now"]);
        assert_eq!(queue.len(), 1);

        let due = queue.drain_due(MissionTime(101));
        assert_eq!(texts(&due), vec!["later"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn events_scheduled_after_drain_wait_for_next_drain() {
        let mut queue = EventQueue::new();
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(10)), line("parent"));

        let due = queue.drain_due(MissionTime(10));
        assert_eq!(due.len(), 1);

        // A handler for "parent" schedules a child that is already due.
        queue.schedule(MissionTime(10), Schedule::In(0), line("child"));
        assert_eq!(queue.len(), 1);

        let due = queue.drain_due(MissionTime(10));
        assert_eq!(texts(&due), vec!["child"]);
    }

    #[test]
    fn past_events_are_due_immediately() {
        let mut queue = EventQueue::new();
        queue.schedule(MissionTime(500), Schedule::At(MissionTime(10)), line("late"));
        assert_eq!(queue.drain_due(MissionTime(500)).len(), 1);
    }

    // -- 4. Pending view ----------------------------------------------------

    #[test]
    fn pending_lists_in_dispatch_order_without_removing() {
        let mut queue = EventQueue::new();
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(20)), line("b"));
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(10)), line("a"));
        queue.schedule(MissionTime(0), Schedule::At(MissionTime(20)), line("c"));

        assert_eq!(texts(&queue.pending()), vec!["a", "b", "c"]);
        assert_eq!(queue.len(), 3);
    }
}
