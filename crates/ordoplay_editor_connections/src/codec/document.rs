// SPDX-License-Identifier: MIT OR Apache-2.0
//! The persisted document format.

use crate::attribute::{Attributes, Point};
use crate::id::{GroupId, NodeId, ParentId};
use serde::{Deserialize, Serialize};

/// A flattened registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Distinct node groups, in first-seen order
    pub groups: Vec<GroupId>,
    /// One record per node
    pub nodes: Vec<SerializedNode>,
    /// One record per parent bucket
    pub parents: Vec<SerializedParent>,
    /// One record per connection
    pub connections: Vec<SerializedConnection>,
}

/// A persisted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    /// Node ID
    pub id: NodeId,
    /// Parent bucket
    pub parent: ParentId,
    /// Node group
    pub group: GroupId,
    /// Root position when saved
    pub position: Point,
    /// Node attributes
    #[serde(default)]
    pub attributes: Attributes,
}

/// A persisted parent bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedParent {
    /// Parent ID
    pub id: ParentId,
    /// Child node IDs
    pub children: Vec<NodeId>,
    /// Attributes supplied by the first child that had any
    #[serde(default)]
    pub attributes: Option<Attributes>,
}

/// A persisted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedConnection {
    /// Node the connection starts at
    pub origin: NodeId,
    /// Node the connection ends at
    pub destination: NodeId,
}

impl Document {
    /// Compact JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// As a JSON value
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Strict JSON parse; any malformed record fails the whole document.
    ///
    /// Use [`deserialize`](super::deserialize) to skip bad records instead.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Save as RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Load from RON
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Record for a parent
    pub fn parent(&self, id: ParentId) -> Option<&SerializedParent> {
        self.parents.iter().find(|p| p.id == id)
    }

    /// Record for a node
    pub fn node(&self, id: NodeId) -> Option<&SerializedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
