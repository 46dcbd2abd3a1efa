// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identifier types shared by nodes, parents, groups, connections and hooks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an ID from its string form, `None` if malformed
            pub fn parse(candidate: &str) -> Option<Self> {
                Uuid::parse_str(candidate).ok().map(Self)
            }

            /// Check whether a string is a well-formed ID
            pub fn is_valid(candidate: &str) -> bool {
                Self::parse(candidate).is_some()
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a node
    NodeId
);
define_id!(
    /// Identifier shared by sibling nodes under the same parent
    ParentId
);
define_id!(
    /// Node "type" tag, used when persisting a graph
    GroupId
);
define_id!(
    /// Unique identifier for a connection
    ConnectionId
);
define_id!(
    /// Handle returned when registering a hook
    HookId
);
