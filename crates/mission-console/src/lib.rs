//! Mission Console -- the user-facing log stream of a mission session.
//!
//! Every line the player sees in the ground-station console is recorded here
//! with its mission timestamp, tag, and the cause that produced it (a
//! dispatched event, a user action, an operation, an unlock rule or a
//! puzzle). The presentation layer renders lines as they are appended; tests
//! and tools query the log after the fact.
//!
//! # Modules
//!
//! - [`console`]: bounded console log with query API by tag, cause and time.

#![deny(unsafe_code)]

pub mod console;

pub use console::{ConsoleLog, LineCause, LogLine};
