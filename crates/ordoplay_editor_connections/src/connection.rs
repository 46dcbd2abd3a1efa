// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions and the adjacency structure that stores them.

use crate::id::{ConnectionId, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A directed connection between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Node the connection was drawn from
    pub origin: NodeId,
    /// Node the connection was drawn to
    pub destination: NodeId,
}

impl Connection {
    /// Create a new connection with a fresh ID
    pub fn new(origin: NodeId, destination: NodeId) -> Self {
        Self {
            id: ConnectionId::new(),
            origin,
            destination,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves(&self, node: NodeId) -> bool {
        self.origin == node || self.destination == node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.origin == node {
            Some(self.destination)
        } else if self.destination == node {
            Some(self.origin)
        } else {
            None
        }
    }

    /// The endpoints as an `(origin, destination)` pair
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.origin, self.destination)
    }
}

/// Connection map plus its symmetric reverse index.
///
/// `index[a][b]` and `index[b][a]` both hold the ID of the connection between
/// `a` and `b` whenever `connections` holds it. Every mutation goes through
/// this type so the two views never drift apart.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    connections: IndexMap<ConnectionId, Connection>,
    index: IndexMap<NodeId, IndexMap<NodeId, ConnectionId>>,
}

impl Adjacency {
    /// Create an empty adjacency
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a node with no connections
    pub fn track(&mut self, node: NodeId) {
        self.index.entry(node).or_default();
    }

    /// Whether a node is tracked
    pub fn is_tracked(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Stop tracking a node, removing and returning every connection touching it
    pub fn untrack(&mut self, node: NodeId) -> Vec<Connection> {
        let Some(bucket) = self.index.get(&node) else {
            return Vec::new();
        };
        let ids: Vec<ConnectionId> = bucket.values().copied().collect();
        let removed = ids.into_iter().filter_map(|id| self.unlink(id)).collect();
        self.index.shift_remove(&node);
        removed
    }

    /// Record a connection under both endpoints.
    ///
    /// Callers are expected to have checked that both endpoints are tracked
    /// and not yet connected.
    pub fn link(&mut self, origin: NodeId, destination: NodeId) -> Connection {
        let connection = Connection::new(origin, destination);
        self.index
            .entry(origin)
            .or_default()
            .insert(destination, connection.id);
        self.index
            .entry(destination)
            .or_default()
            .insert(origin, connection.id);
        self.connections.insert(connection.id, connection);
        connection
    }

    /// Remove a connection from both views
    pub fn unlink(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&id)?;
        if let Some(bucket) = self.index.get_mut(&connection.origin) {
            bucket.shift_remove(&connection.destination);
        }
        if let Some(bucket) = self.index.get_mut(&connection.destination) {
            bucket.shift_remove(&connection.origin);
        }
        Some(connection)
    }

    /// The connection between two nodes, in either direction
    pub fn between(&self, a: NodeId, b: NodeId) -> Option<ConnectionId> {
        self.index.get(&a)?.get(&b).copied()
    }

    /// Get a connection by ID
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All connections in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Nodes connected to `node`, with the connecting ID
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, ConnectionId)> + '_ {
        self.index
            .get(&node)
            .into_iter()
            .flat_map(|bucket| bucket.iter().map(|(n, c)| (*n, *c)))
    }

    /// Number of connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether there are no connections
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Verify that the index mirrors the connection map exactly
    pub fn is_consistent(&self) -> bool {
        let mirrored = self.connections.values().all(|c| {
            self.between(c.origin, c.destination) == Some(c.id)
                && self.between(c.destination, c.origin) == Some(c.id)
        });
        let entries: usize = self.index.values().map(IndexMap::len).sum();
        mirrored && entries == self.connections.len() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(n: usize) -> (Adjacency, Vec<NodeId>) {
        let mut adjacency = Adjacency::new();
        let nodes: Vec<NodeId> = (0..n).map(|_| NodeId::new()).collect();
        for node in &nodes {
            adjacency.track(*node);
        }
        (adjacency, nodes)
    }

    #[test]
    fn test_link_is_symmetric() {
        let (mut adjacency, nodes) = tracked(2);
        let connection = adjacency.link(nodes[0], nodes[1]);

        assert_eq!(adjacency.between(nodes[0], nodes[1]), Some(connection.id));
        assert_eq!(adjacency.between(nodes[1], nodes[0]), Some(connection.id));
        assert_eq!(adjacency.get(connection.id), Some(&connection));
        assert!(adjacency.is_consistent());
    }

    #[test]
    fn test_unlink_cleans_index() {
        let (mut adjacency, nodes) = tracked(2);
        let connection = adjacency.link(nodes[0], nodes[1]);

        assert_eq!(adjacency.unlink(connection.id), Some(connection));
        assert_eq!(adjacency.between(nodes[0], nodes[1]), None);
        assert_eq!(adjacency.between(nodes[1], nodes[0]), None);
        assert!(adjacency.unlink(connection.id).is_none());
        assert!(adjacency.is_tracked(nodes[0]));
        assert!(adjacency.is_consistent());
    }

    #[test]
    fn test_untrack_cascades() {
        let (mut adjacency, nodes) = tracked(3);
        let a = adjacency.link(nodes[0], nodes[1]);
        let b = adjacency.link(nodes[2], nodes[0]);
        let kept = adjacency.link(nodes[1], nodes[2]);

        let removed = adjacency.untrack(nodes[0]);
        assert_eq!(removed, vec![a, b]);
        assert!(!adjacency.is_tracked(nodes[0]));
        assert_eq!(adjacency.len(), 1);
        assert_eq!(adjacency.neighbors(nodes[1]).collect::<Vec<_>>(), [(nodes[2], kept.id)]);
        assert!(adjacency.is_consistent());
    }

    #[test]
    fn test_untrack_unknown_is_noop() {
        let (mut adjacency, _) = tracked(1);
        assert!(adjacency.untrack(NodeId::new()).is_empty());
    }

    #[test]
    fn test_other_end() {
        let (origin, destination) = (NodeId::new(), NodeId::new());
        let connection = Connection::new(origin, destination);
        assert_eq!(connection.other_end(origin), Some(destination));
        assert_eq!(connection.other_end(destination), Some(origin));
        assert_eq!(connection.other_end(NodeId::new()), None);
        assert!(connection.involves(origin));
    }
}
