//! Bounded console log with causality metadata.
//!
//! The [`ConsoleLog`] records every [`LogLine`] appended during a session.
//! Each line captures:
//! - **When**: the mission time it was written.
//! - **What**: its [`LogTag`] and text.
//! - **Why**: the [`LineCause`] that produced it.
//!
//! The log keeps at most `capacity` lines; older lines are dropped from the
//! front, while [`ConsoleLog::total_recorded`] keeps counting.
//!
//! # Query API
//!
//! - **Tag**: [`ConsoleLog::lines_with_tag`]
//! - **Cause**: [`ConsoleLog::lines_by_cause`]
//! - **Time**: [`ConsoleLog::lines_since`]
//!
//! # Example
//!
//! ```
//! use mission_console::{ConsoleLog, LineCause, LogLine};
//! use mission_core::event::LogTag;
//! use mission_core::MissionTime;
//!
//! let mut log = ConsoleLog::new(100);
//! log.record(LogLine::new(MissionTime(5_000), LogTag::Rx, "TX #0001 received", LineCause::System));
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.lines_with_tag(LogTag::Rx).count(), 1);
//! assert_eq!(log.last().map(|l| l.render()), Some("[T+00:00:05] RX TX #0001 received".to_owned()));
//! ```

use std::collections::VecDeque;

use mission_core::event::{EventKind, LogTag};
use mission_core::identity::{OperationId, PuzzleId, RuleId};
use mission_core::MissionTime;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default number of lines retained.
pub const DEFAULT_CAPACITY: usize = 500;

// ---------------------------------------------------------------------------
// LineCause
// ---------------------------------------------------------------------------

/// What produced a console line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineCause {
    /// A dispatched event of this kind.
    Event(EventKind),
    /// A direct user action (e.g. `"ping"`).
    UserAction(String),
    /// An operation being sent or resolved.
    Operation(OperationId),
    /// An unlock rule firing.
    Unlock(RuleId),
    /// A puzzle validation.
    Puzzle(PuzzleId),
    /// Session bookkeeping with no more specific cause.
    System,
}

// ---------------------------------------------------------------------------
// LogLine
// ---------------------------------------------------------------------------

/// A single console line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    /// Mission time the line was written.
    pub at: MissionTime,
    /// Console tag.
    pub tag: LogTag,
    /// Line text.
    pub text: String,
    /// What produced the line.
    pub cause: LineCause,
}

impl LogLine {
    /// Build a line.
    pub fn new(at: MissionTime, tag: LogTag, text: impl Into<String>, cause: LineCause) -> Self {
        Self {
            at,
            tag,
            text: text.into(),
            cause,
        }
    }

    /// Console rendering: `[T+HH:MM:SS] TAG text`.
    pub fn render(&self) -> String {
        format!("[{}] {} {}", self.at, self.tag, self.text)
    }
}

// ---------------------------------------------------------------------------
// ConsoleLog
// ---------------------------------------------------------------------------

/// Accumulates [`LogLine`]s for a session, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLog {
    lines: VecDeque<LogLine>,
    capacity: usize,
    total_recorded: u64,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ConsoleLog {
    /// Create an empty log retaining at most `capacity` lines. A capacity of
    /// zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            total_recorded: 0,
        }
    }

    /// Append a line, dropping the oldest one if the log is full. Returns a
    /// reference to the stored line.
    pub fn record(&mut self, line: LogLine) -> &LogLine {
        trace!(at = line.at.0, tag = %line.tag, "console line");
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.total_recorded += 1;
        self.lines.push_back(line);
        &self.lines[self.lines.len() - 1]
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines ever recorded, including dropped ones.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// Maximum number of retained lines.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// The most recent line.
    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    /// Lines with the given tag.
    pub fn lines_with_tag(&self, tag: LogTag) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().filter(move |l| l.tag == tag)
    }

    /// Lines produced by the given cause.
    pub fn lines_by_cause<'a>(&'a self, cause: &'a LineCause) -> impl Iterator<Item = &'a LogLine> {
        self.lines.iter().filter(move |l| &l.cause == cause)
    }

    /// Lines written at or after `since`.
    pub fn lines_since(&self, since: MissionTime) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().filter(move |l| l.at >= since)
    }

    /// Whether any retained line contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn line(at: u64, tag: LogTag, text: &str) -> LogLine {
        LogLine::new(MissionTime(at), tag, text, LineCause::System)
    }

    // -- 1. Empty log -------------------------------------------------------

    #[test]
    fn empty_log() {
        let log = ConsoleLog::default();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(log.last().is_none());
        assert_eq!(log.lines_with_tag(LogTag::Sys).count(), 0);
        assert_eq!(log.capacity(), DEFAULT_CAPACITY);
    }

    // -- 2. Record and render -----------------------------------------------

    #[test]
    fn record_and_render() {
        let mut log = ConsoleLog::new(10);
        let stored = log.record(line(65_000, LogTag::Tx, "OP_CLEAN_LENS sent"));
        assert_eq!(stored.render(), "[T+00:01:05] TX OP_CLEAN_LENS sent");
        assert_eq!(log.total_recorded(), 1);
    }

    // -- 3. Capacity --------------------------------------------------------

    #[test]
    fn oldest_lines_are_dropped_at_capacity() {
        let mut log = ConsoleLog::new(3);
        for i in 0..5 {
            log.record(line(i, LogTag::Sys, &format!("line {i}")));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.total_recorded(), 5);
        let texts: Vec<_> = log.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn zero_capacity_keeps_one_line() {
        let mut log = ConsoleLog::new(0);
        log.record(line(0, LogTag::Sys, "a"));
        log.record(line(1, LogTag::Sys, "b"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|l| l.text.as_str()), Some("b"));
    }

    // -- 4. Queries ---------------------------------------------------------

    #[test]
    fn query_by_tag_and_time() {
        let mut log = ConsoleLog::new(10);
        log.record(line(100, LogTag::Sys, "boot"));
        log.record(line(5_000, LogTag::Rx, "tx"));
        log.record(line(15_000, LogTag::Rx, "img"));
        log.record(line(16_000, LogTag::Warn, "busy"));

        assert_eq!(log.lines_with_tag(LogTag::Rx).count(), 2);
        assert_eq!(log.lines_since(MissionTime(15_000)).count(), 2);
        assert!(log.contains_text("busy"));
        assert!(!log.contains_text("nope"));
    }

    #[test]
    fn query_by_cause() {
        let mut log = ConsoleLog::new(10);
        let op = LineCause::Operation(OperationId::from("OP_CLEAN_LENS"));
        log.record(LogLine::new(MissionTime(0), LogTag::Tx, "sent", op.clone()));
        log.record(LogLine::new(
            MissionTime(1),
            LogTag::Sys,
            "ping",
            LineCause::UserAction("ping".to_owned()),
        ));
        log.record(LogLine::new(MissionTime(2), LogTag::Rx, "done", op.clone()));

        let texts: Vec<_> = log.lines_by_cause(&op).map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["sent", "done"]);
    }

    // -- 5. Serialization ---------------------------------------------------

    #[test]
    fn log_serializes_to_json() {
        let mut log = ConsoleLog::new(4);
        log.record(line(1, LogTag::Unlock, "OP_CLEAN_LENS available"));
        let json = serde_json::to_string(&log).unwrap();
        let back: ConsoleLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.last(), log.last());
    }
}
