//! Typed identifiers for mission content.
//!
//! Every piece of content the mission engine refers to -- clues, operations,
//! transmissions, images, journal and encyclopedia entries -- is addressed by
//! an opaque string id. Each kind gets its own newtype so a clue id can never
//! be passed where an operation id is expected.
//!
//! Tabs ([`Tab`]) name the three content panels that carry unread tracking.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Build an id from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// An irreversible fact learned during the mission (e.g. `"tx_0001_received"`).
    ClueId
);

string_id!(
    /// An operation the player can send to the probe (e.g. `"OP_CLEAN_LENS"`).
    /// Once granted, the same id is the capability that unlocks it.
    OperationId
);

string_id!(
    /// An incoming transmission, addressed by its sequence number (e.g. `"0001"`).
    TransmissionId
);

string_id!(
    /// An incoming image (e.g. `"IMG_0001_LOWQ"`).
    ImageId
);

string_id!(
    /// A journal or encyclopedia entry.
    EntryId
);

string_id!(
    /// An unlock rule.
    RuleId
);

string_id!(
    /// A puzzle mini-game.
    PuzzleId
);

// ---------------------------------------------------------------------------
// Tab
// ---------------------------------------------------------------------------

/// The content tabs of the mission panel. Each tab tracks its own unread set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    /// Mission journal: transmissions and narrative notes.
    #[default]
    Journal,
    /// Reference entries about the probe and its environment.
    Encyclopedia,
    /// Received images.
    Images,
}

impl Tab {
    /// All tabs in display order.
    pub const ALL: [Tab; 3] = [Tab::Journal, Tab::Encyclopedia, Tab::Images];

    /// Lowercase display name.
    pub fn name(self) -> &'static str {
        match self {
            Tab::Journal => "journal",
            Tab::Encyclopedia => "encyclopedia",
            Tab::Images => "images",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_with_str() {
        let op = OperationId::from("OP_CLEAN_LENS");
        assert_eq!(op, "OP_CLEAN_LENS");
        assert_eq!(op.as_str(), "OP_CLEAN_LENS");
        assert_eq!(op.to_string(), "OP_CLEAN_LENS");
    }

    #[test]
    fn id_sets_are_searchable_by_str() {
        let ops: std::collections::BTreeSet<OperationId> =
            ["OP_BOOST_SIGNAL", "OP_CLEAN_LENS"].into_iter().map(OperationId::from).collect();
        assert!(ops.contains("OP_CLEAN_LENS"));
        assert!(!ops.contains("OP_TRIANGULATE"));
        assert_eq!(ops.get("OP_BOOST_SIGNAL").map(OperationId::as_str), Some("OP_BOOST_SIGNAL"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let clue = ClueId::new("lens_cleaned");
        let json = serde_json::to_string(&clue).unwrap();
        assert_eq!(json, "\"lens_cleaned\"");
    }

    #[test]
    fn tab_serializes_snake_case() {
        let json = serde_json::to_string(&Tab::Encyclopedia).unwrap();
        assert_eq!(json, "\"encyclopedia\"");
        assert_eq!(Tab::default(), Tab::Journal);
    }
}
