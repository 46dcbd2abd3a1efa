// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry to document.

use super::document::{Document, SerializedConnection, SerializedNode, SerializedParent};
use crate::registry::Registry;
use indexmap::IndexSet;

/// Flatten a registry into a document.
///
/// Reads node state through the weak handles; nodes the host has dropped are
/// left out, along with their connections and parent membership.
pub fn serialize(registry: &Registry) -> Document {
    let mut groups = IndexSet::new();
    let mut nodes = Vec::with_capacity(registry.node_count());

    for handle in registry.nodes() {
        let Some(node) = handle.upgrade() else {
            tracing::warn!(node = %handle.id(), "skipping dropped node");
            continue;
        };
        groups.insert(handle.group());
        nodes.push(SerializedNode {
            id: handle.id(),
            parent: handle.parent(),
            group: handle.group(),
            position: node.hooks().root_position(),
            attributes: node.attributes(),
        });
    }

    let parents = registry
        .parents()
        .filter_map(|(id, bucket)| {
            let live: Vec<_> = bucket
                .values()
                .filter_map(|h| Some((h.id(), h.upgrade()?)))
                .collect();
            if live.is_empty() {
                return None;
            }
            Some(SerializedParent {
                id: *id,
                children: live.iter().map(|(child, _)| *child).collect(),
                attributes: live.iter().find_map(|(_, node)| node.parent_attributes()),
            })
        })
        .collect();

    let connections = registry
        .connections()
        .filter(|c| {
            [c.origin, c.destination]
                .iter()
                .all(|id| registry.node(*id).is_some_and(|h| h.is_alive()))
        })
        .map(|c| SerializedConnection {
            origin: c.origin,
            destination: c.destination,
        })
        .collect();

    Document {
        groups: groups.into_iter().collect(),
        nodes,
        parents,
        connections,
    }
}
