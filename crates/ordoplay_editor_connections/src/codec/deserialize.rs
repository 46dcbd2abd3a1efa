// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document to registry.
//!
//! A JSON document that does not parse, or whose root is not an object, fails
//! the whole call. Anything below that is validated one record at a time: a
//! malformed group, node, parent or connection record is logged, counted in
//! [`Skipped`] and left out while the rest of the document is restored.

use super::document::{Document, SerializedConnection, SerializedNode, SerializedParent};
use crate::attribute::{Attributes, Point};
use crate::id::{GroupId, NodeId, ParentId};
use crate::node::{Node, NodeIds, NodeRef};
use crate::registry::Registry;
use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::ops::AddAssign;
use std::rc::Rc;
use thiserror::Error;

/// Errors that fail a whole decode
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Input is not a valid RON document
    #[error("Invalid RON: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// The root value is not an object
    #[error("Document root is not an object")]
    NotAnObject,

    /// A top-level section is present but not an array
    #[error("Section `{0}` is not an array")]
    Section(&'static str),
}

/// Records dropped while restoring, per section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skipped {
    /// Malformed group IDs
    pub groups: usize,
    /// Malformed, declined or conflicting node records
    pub nodes: usize,
    /// Malformed parent records
    pub parents: usize,
    /// Malformed connection records or ones breaking a connection rule
    pub connections: usize,
}

impl Skipped {
    /// Total records dropped
    pub fn total(&self) -> usize {
        self.groups + self.nodes + self.parents + self.connections
    }
}

impl AddAssign for Skipped {
    fn add_assign(&mut self, other: Self) {
        self.groups += other.groups;
        self.nodes += other.nodes;
        self.parents += other.parents;
        self.connections += other.connections;
    }
}

/// A rebuilt registry.
///
/// The registry only holds weak handles; `nodes` carries the strong ones
/// created by the populate hook, and the caller must keep them alive.
pub struct Restored {
    /// Rebuilt node, parent and connection maps
    pub registry: Registry,
    /// Nodes created by the populate hook, in document order
    pub nodes: Vec<Rc<dyn Node>>,
    /// Distinct groups listed by the document
    pub groups: Vec<GroupId>,
    /// Records that were left out
    pub skipped: Skipped,
}

impl fmt::Debug for Restored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restored")
            .field("registry", &self.registry)
            .field("nodes", &self.nodes.len())
            .field("groups", &self.groups)
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// Rebuild a registry from JSON text.
///
/// `populate` recreates a live node from its record and its parent's record;
/// returning `None` leaves the node out.
pub fn deserialize<F>(source: &str, populate: F) -> Result<Restored, DecodeError>
where
    F: FnMut(&SerializedNode, Option<&SerializedParent>) -> Option<Rc<dyn Node>>,
{
    let value: Value = serde_json::from_str(source)?;
    deserialize_value(&value, populate)
}

/// Rebuild a registry from RON text.
///
/// IDs are read as text and validated per record, so a malformed or missing
/// ID drops only the record holding it. Input that does not parse as RON,
/// or a record with a missing position, fails the call.
pub fn deserialize_ron<F>(source: &str, populate: F) -> Result<Restored, DecodeError>
where
    F: FnMut(&SerializedNode, Option<&SerializedParent>) -> Option<Rc<dyn Node>>,
{
    let raw: RonDocument = ron::from_str(source)?;
    let mut skipped = Skipped::default();

    let document = Document {
        groups: validated(raw.groups, "groups", &mut skipped.groups, |id| {
            GroupId::parse(&id)
        }),
        nodes: validated(raw.nodes, "nodes", &mut skipped.nodes, RonNode::validate),
        parents: validated(raw.parents, "parents", &mut skipped.parents, RonParent::validate),
        connections: validated(
            raw.connections,
            "connections",
            &mut skipped.connections,
            RonConnection::validate,
        ),
    };

    let mut restored = deserialize_document(&document, populate);
    restored.skipped += skipped;
    Ok(restored)
}

/// [`Document`] as written to RON, with IDs left as text
#[derive(Deserialize)]
struct RonDocument {
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    nodes: Vec<RonNode>,
    #[serde(default)]
    parents: Vec<RonParent>,
    #[serde(default)]
    connections: Vec<RonConnection>,
}

#[derive(Deserialize)]
struct RonNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    parent: String,
    #[serde(default)]
    group: String,
    position: Point,
    #[serde(default)]
    attributes: Attributes,
}

impl RonNode {
    fn validate(self) -> Option<SerializedNode> {
        Some(SerializedNode {
            id: NodeId::parse(&self.id)?,
            parent: ParentId::parse(&self.parent)?,
            group: GroupId::parse(&self.group)?,
            position: self.position,
            attributes: self.attributes,
        })
    }
}

#[derive(Deserialize)]
struct RonParent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    children: Vec<String>,
    #[serde(default)]
    attributes: Option<Attributes>,
}

impl RonParent {
    fn validate(self) -> Option<SerializedParent> {
        let children = self
            .children
            .iter()
            .map(|child| NodeId::parse(child))
            .collect::<Option<Vec<_>>>()?;
        Some(SerializedParent {
            id: ParentId::parse(&self.id)?,
            children,
            attributes: self.attributes,
        })
    }
}

#[derive(Deserialize)]
struct RonConnection {
    #[serde(default)]
    origin: String,
    #[serde(default)]
    destination: String,
}

impl RonConnection {
    fn validate(self) -> Option<SerializedConnection> {
        Some(SerializedConnection {
            origin: NodeId::parse(&self.origin)?,
            destination: NodeId::parse(&self.destination)?,
        })
    }
}

fn validated<R, T>(
    records: Vec<R>,
    name: &'static str,
    skipped: &mut usize,
    validate: impl Fn(R) -> Option<T>,
) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let valid = validate(record);
            if valid.is_none() {
                tracing::warn!(section = name, index, "skipping record with malformed id");
                *skipped += 1;
            }
            valid
        })
        .collect()
}

/// Rebuild a registry from an already parsed JSON value
pub fn deserialize_value<F>(value: &Value, populate: F) -> Result<Restored, DecodeError>
where
    F: FnMut(&SerializedNode, Option<&SerializedParent>) -> Option<Rc<dyn Node>>,
{
    let root = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let mut skipped = Skipped::default();

    let document = Document {
        groups: section::<GroupId>(root, "groups", &mut skipped.groups)?,
        nodes: section::<SerializedNode>(root, "nodes", &mut skipped.nodes)?,
        parents: section::<SerializedParent>(root, "parents", &mut skipped.parents)?,
        connections: section::<SerializedConnection>(
            root,
            "connections",
            &mut skipped.connections,
        )?,
    };

    let mut restored = deserialize_document(&document, populate);
    restored.skipped += skipped;
    Ok(restored)
}

fn section<T: DeserializeOwned>(
    root: &Map<String, Value>,
    name: &'static str,
    skipped: &mut usize,
) -> Result<Vec<T>, DecodeError> {
    let items = match root.get(name) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => value.as_array().ok_or(DecodeError::Section(name))?,
    };
    let records = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(section = name, index, %err, "skipping malformed record");
                *skipped += 1;
                None
            }
        })
        .collect();
    Ok(records)
}

/// Rebuild a registry from a typed document.
///
/// Nodes are inserted with the same rules as announcing them, and every
/// connection is re-added through the full connection checks.
pub fn deserialize_document<F>(document: &Document, mut populate: F) -> Restored
where
    F: FnMut(&SerializedNode, Option<&SerializedParent>) -> Option<Rc<dyn Node>>,
{
    let mut parents: IndexMap<ParentId, &SerializedParent> = IndexMap::new();
    for parent in &document.parents {
        parents.entry(parent.id).or_insert(parent);
    }

    let mut registry = Registry::new();
    let mut nodes = Vec::with_capacity(document.nodes.len());
    let mut skipped = Skipped::default();

    for record in &document.nodes {
        let Some(node) = populate(record, parents.get(&record.parent).copied()) else {
            tracing::debug!(node = %record.id, "populate hook declined node");
            skipped.nodes += 1;
            continue;
        };
        let expected = NodeIds {
            id: record.id,
            parent: record.parent,
            group: record.group,
        };
        let reported = node.ids();
        if reported != expected {
            tracing::warn!(
                node = %record.id,
                ?reported,
                "populated node reports different ids than its record"
            );
            skipped.nodes += 1;
            continue;
        }
        if let Err(err) = registry.insert(NodeRef::from_dyn(&node)) {
            tracing::warn!(%err, "skipping node record");
            skipped.nodes += 1;
            continue;
        }
        nodes.push(node);
    }

    for record in &document.connections {
        if let Err(err) = registry.add_connection(record.origin, record.destination) {
            tracing::warn!(
                origin = %record.origin,
                destination = %record.destination,
                %err,
                "skipping connection record"
            );
            skipped.connections += 1;
        }
    }

    let groups: IndexSet<GroupId> = document.groups.iter().copied().collect();
    tracing::debug!(
        nodes = registry.node_count(),
        connections = registry.connection_count(),
        skipped = skipped.total(),
        "restored registry"
    );

    Restored {
        registry,
        nodes,
        groups: groups.into_iter().collect(),
        skipped,
    }
}
