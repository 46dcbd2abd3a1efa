// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node, parent and connection registry.
//!
//! The three maps are coupled: every registered node has an adjacency bucket
//! and sits in exactly one parent bucket, and every connection joins two
//! registered nodes. [`Registry`] keeps them in step; it knows nothing about
//! hooks or gestures.

use crate::connection::{Adjacency, Connection};
use crate::id::{ConnectionId, NodeId, ParentId};
use crate::node::{Node, NodeMode, NodeRef};
use indexmap::IndexMap;
use std::rc::Rc;

/// Children of one parent, keyed by node ID
pub type ParentBucket = IndexMap<NodeId, NodeRef>;

/// A node removed from the registry together with its cascaded connections
#[derive(Debug, Clone)]
pub struct RemovedNode {
    /// The removed node
    pub node: NodeRef,
    /// Connections that touched it
    pub connections: Vec<Connection>,
}

/// The registry maps
#[derive(Debug, Clone, Default)]
pub struct Registry {
    nodes: IndexMap<NodeId, NodeRef>,
    parents: IndexMap<ParentId, ParentBucket>,
    adjacency: Adjacency,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node
    pub fn insert(&mut self, node: NodeRef) -> Result<(), AnnounceError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(AnnounceError::DuplicateNode(id));
        }
        self.adjacency.track(id);
        self.parents
            .entry(node.parent())
            .or_default()
            .insert(id, node.clone());
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, id: NodeId) -> Option<RemovedNode> {
        let node = self.nodes.shift_remove(&id)?;
        if let Some(bucket) = self.parents.get_mut(&node.parent()) {
            bucket.shift_remove(&id);
            if bucket.is_empty() {
                self.parents.shift_remove(&node.parent());
            }
        }
        let connections = self.adjacency.untrack(id);
        Some(RemovedNode { node, connections })
    }

    /// Remove every node under a parent, then the parent itself
    pub fn remove_parent(&mut self, id: ParentId) -> Option<Vec<RemovedNode>> {
        let children: Vec<NodeId> = self.parents.get(&id)?.keys().copied().collect();
        let removed = children
            .into_iter()
            .filter_map(|child| self.remove_node(child))
            .collect();
        self.parents.shift_remove(&id);
        Some(removed)
    }

    /// Get a node handle by ID
    pub fn node(&self, id: NodeId) -> Option<&NodeRef> {
        self.nodes.get(&id)
    }

    /// Whether `node` is the object currently registered under its ID
    pub fn is_current(&self, node: &NodeRef) -> bool {
        self.nodes.get(&node.id()).is_some_and(|n| n.same_node(node))
    }

    /// Get the children of a parent
    pub fn parent(&self, id: ParentId) -> Option<&ParentBucket> {
        self.parents.get(&id)
    }

    /// All registered nodes, in registration order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.nodes.values()
    }

    /// All parent buckets, in creation order
    pub fn parents(&self) -> impl Iterator<Item = (&ParentId, &ParentBucket)> {
        self.parents.iter()
    }

    /// Number of registered nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check every connection rule for a prospective `origin -> destination`
    ///
    /// Rules are checked in order and the first failure is reported:
    /// self-connection, existence, distinct parents, distinct modes,
    /// existing connection, then the origin's own compatibility predicate.
    pub fn check(&self, origin: NodeId, destination: NodeId) -> Result<(), ConnectionError> {
        if origin == destination {
            return Err(ConnectionError::SelfConnection(origin));
        }

        let (origin_ref, origin_node) = self.resolve(origin)?;
        let (destination_ref, destination_node) = self.resolve(destination)?;

        if origin_ref.parent() == destination_ref.parent() {
            return Err(ConnectionError::SameParent(origin_ref.parent()));
        }

        let mode = origin_node.mode();
        if mode == destination_node.mode() {
            return Err(ConnectionError::SameMode(mode));
        }

        if let Some(existing) = self.adjacency.between(origin, destination) {
            return Err(ConnectionError::AlreadyConnected(existing));
        }

        if !origin_node.is_compatible(destination_node.as_ref()) {
            return Err(ConnectionError::Incompatible {
                origin,
                destination,
            });
        }

        Ok(())
    }

    fn resolve(&self, id: NodeId) -> Result<(&NodeRef, Rc<dyn Node>), ConnectionError> {
        let node_ref = self.nodes.get(&id).ok_or(ConnectionError::NodeNotFound(id))?;
        let node = node_ref.upgrade().ok_or(ConnectionError::NodeNotFound(id))?;
        Ok((node_ref, node))
    }

    /// Whether `origin -> destination` would be accepted
    pub fn test_compatibility(&self, origin: NodeId, destination: NodeId) -> bool {
        self.check(origin, destination).is_ok()
    }

    /// Connect two nodes if every rule passes; no side effects otherwise
    pub fn add_connection(
        &mut self,
        origin: NodeId,
        destination: NodeId,
    ) -> Result<Connection, ConnectionError> {
        self.check(origin, destination)?;
        Ok(self.adjacency.link(origin, destination))
    }

    /// Link two nodes that already passed [`Registry::check`].
    ///
    /// Only the structural duplicate rule is re-checked, so no node code runs
    /// while the caller holds the registry mutably.
    pub(crate) fn link_checked(
        &mut self,
        origin: NodeId,
        destination: NodeId,
    ) -> Result<Connection, ConnectionError> {
        if !self.nodes.contains_key(&origin) {
            return Err(ConnectionError::NodeNotFound(origin));
        }
        if !self.nodes.contains_key(&destination) {
            return Err(ConnectionError::NodeNotFound(destination));
        }
        if let Some(existing) = self.adjacency.between(origin, destination) {
            return Err(ConnectionError::AlreadyConnected(existing));
        }
        Ok(self.adjacency.link(origin, destination))
    }

    /// Remove a connection
    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        self.adjacency.unlink(id)
    }

    /// Get a connection by ID
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.adjacency.get(id)
    }

    /// The connection between two nodes, in either direction
    pub fn connection_between(&self, a: NodeId, b: NodeId) -> Option<&Connection> {
        self.adjacency
            .between(a, b)
            .and_then(|id| self.adjacency.get(id))
    }

    /// All connections, in creation order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.adjacency.iter()
    }

    /// Connections touching a node
    pub fn connections_of(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.adjacency
            .neighbors(node)
            .filter_map(|(_, id)| self.adjacency.get(id))
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.adjacency.len()
    }

    /// The adjacency structure
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }
}

/// Error when registering a node
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnounceError {
    /// Another node is already registered under this ID
    #[error("Node already registered: {0}")]
    DuplicateNode(NodeId),
}

/// Reason a connection was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Origin and destination are the same node
    #[error("Self-connection not allowed: {0}")]
    SelfConnection(NodeId),

    /// Endpoint is not registered or was dropped by its owner
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Endpoints share a parent
    #[error("Nodes share parent {0}")]
    SameParent(ParentId),

    /// Endpoints have the same mode
    #[error("Both nodes are {0:?}")]
    SameMode(NodeMode),

    /// The pair is already connected
    #[error("Nodes already connected: {0}")]
    AlreadyConnected(ConnectionId),

    /// The origin node refused the destination
    #[error("Node {origin} is not compatible with {destination}")]
    Incompatible {
        /// Origin node
        origin: NodeId,
        /// Destination node
        destination: NodeId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::GroupId;
    use crate::testing::TestNode;

    fn register(registry: &mut Registry, node: &Rc<TestNode>) {
        registry.insert(NodeRef::new(node)).unwrap();
    }

    #[test]
    fn test_insert_fills_all_maps() {
        let mut registry = Registry::new();
        let parent = ParentId::new();
        let node = TestNode::input(parent);
        register(&mut registry, &node);

        assert!(registry.node(node.id()).is_some());
        assert!(registry.parent(parent).unwrap().contains_key(&node.id()));
        assert!(registry.adjacency().is_tracked(node.id()));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = Registry::new();
        let node = TestNode::input(ParentId::new());
        register(&mut registry, &node);
        assert_eq!(
            registry.insert(NodeRef::new(&node)),
            Err(AnnounceError::DuplicateNode(node.id()))
        );
        assert_eq!(registry.node_count(), 1);
    }

    #[test]
    fn test_same_parent_never_compatible() {
        let mut registry = Registry::new();
        let parent = ParentId::new();
        for (a_mode, b_mode) in [
            (NodeMode::Input, NodeMode::Output),
            (NodeMode::Output, NodeMode::Input),
            (NodeMode::Input, NodeMode::Input),
        ] {
            let a = TestNode::new(parent, GroupId::new(), a_mode);
            let b = TestNode::new(parent, GroupId::new(), b_mode);
            register(&mut registry, &a);
            register(&mut registry, &b);
            assert!(!registry.test_compatibility(a.id(), b.id()));
            assert_eq!(
                registry.check(a.id(), b.id()),
                Err(ConnectionError::SameParent(parent))
            );
        }
    }

    #[test]
    fn test_connection_rules_in_order() {
        let mut registry = Registry::new();
        let a = TestNode::output(ParentId::new());
        let b = TestNode::input(ParentId::new());
        let same_mode = TestNode::output(ParentId::new());
        register(&mut registry, &a);
        register(&mut registry, &b);
        register(&mut registry, &same_mode);

        assert_eq!(
            registry.check(a.id(), a.id()),
            Err(ConnectionError::SelfConnection(a.id()))
        );
        let stranger = NodeId::new();
        assert_eq!(
            registry.check(a.id(), stranger),
            Err(ConnectionError::NodeNotFound(stranger))
        );
        assert_eq!(
            registry.check(a.id(), same_mode.id()),
            Err(ConnectionError::SameMode(NodeMode::Output))
        );

        a.set_compatible(false);
        assert_eq!(
            registry.check(a.id(), b.id()),
            Err(ConnectionError::Incompatible {
                origin: a.id(),
                destination: b.id()
            })
        );
        // only the origin's predicate is consulted
        assert!(registry.test_compatibility(b.id(), a.id()));
    }

    #[test]
    fn test_connect_exactly_once() {
        let mut registry = Registry::new();
        let a = TestNode::output(ParentId::new());
        let b = TestNode::input(ParentId::new());
        register(&mut registry, &a);
        register(&mut registry, &b);

        let connection = registry.add_connection(a.id(), b.id()).unwrap();
        assert_eq!(connection.endpoints(), (a.id(), b.id()));
        assert_eq!(
            registry.add_connection(a.id(), b.id()),
            Err(ConnectionError::AlreadyConnected(connection.id))
        );
        assert_eq!(
            registry.add_connection(b.id(), a.id()),
            Err(ConnectionError::AlreadyConnected(connection.id))
        );
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_dropped_node_reads_as_missing() {
        let mut registry = Registry::new();
        let a = TestNode::output(ParentId::new());
        let b = TestNode::input(ParentId::new());
        register(&mut registry, &a);
        register(&mut registry, &b);
        let b_id = b.id();
        drop(b);

        assert_eq!(
            registry.check(a.id(), b_id),
            Err(ConnectionError::NodeNotFound(b_id))
        );
    }

    #[test]
    fn test_connections_of_node() {
        let mut registry = Registry::new();
        let hub = TestNode::output(ParentId::new());
        let left = TestNode::input(ParentId::new());
        let right = TestNode::input(ParentId::new());
        for node in [&hub, &left, &right] {
            register(&mut registry, node);
        }
        let first = registry.add_connection(hub.id(), left.id()).unwrap();
        let second = registry.add_connection(hub.id(), right.id()).unwrap();

        let ids: Vec<_> = registry.connections_of(hub.id()).map(|c| c.id).collect();
        assert_eq!(ids, [first.id, second.id]);
        assert_eq!(registry.connections_of(left.id()).count(), 1);
        assert_eq!(registry.connections_of(NodeId::new()).count(), 0);
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut registry = Registry::new();
        let parent = ParentId::new();
        let a = TestNode::output(parent);
        let sibling = TestNode::output(parent);
        let b = TestNode::input(ParentId::new());
        for node in [&a, &sibling, &b] {
            register(&mut registry, node);
        }
        let connection = registry.add_connection(a.id(), b.id()).unwrap();

        let removed = registry.remove_node(a.id()).unwrap();
        assert_eq!(removed.node.id(), a.id());
        assert_eq!(removed.connections, vec![connection]);
        assert!(registry.node(a.id()).is_none());
        assert!(registry.connection(connection.id).is_none());
        assert!(!registry.parent(parent).unwrap().contains_key(&a.id()));
        assert!(registry.adjacency().is_consistent());

        assert!(registry.remove_node(a.id()).is_none());
    }

    #[test]
    fn test_last_child_prunes_parent() {
        let mut registry = Registry::new();
        let parent = ParentId::new();
        let a = TestNode::output(parent);
        register(&mut registry, &a);
        registry.remove_node(a.id());
        assert!(registry.parent(parent).is_none());
    }

    #[test]
    fn test_remove_parent() {
        let mut registry = Registry::new();
        let parent = ParentId::new();
        let a = TestNode::output(parent);
        let b = TestNode::input(parent);
        let other = TestNode::input(ParentId::new());
        for node in [&a, &b, &other] {
            register(&mut registry, node);
        }
        registry.add_connection(a.id(), other.id()).unwrap();

        let removed = registry.remove_parent(parent).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(registry.parent(parent).is_none());
        assert!(registry.node(a.id()).is_none());
        assert!(registry.node(b.id()).is_none());
        assert_eq!(registry.connection_count(), 0);

        assert!(registry.remove_parent(parent).is_none());
    }

    #[test]
    fn test_remove_connection_idempotent() {
        let mut registry = Registry::new();
        let a = TestNode::output(ParentId::new());
        let b = TestNode::input(ParentId::new());
        register(&mut registry, &a);
        register(&mut registry, &b);
        let connection = registry.add_connection(a.id(), b.id()).unwrap();

        assert!(registry.remove_connection(connection.id).is_some());
        assert!(registry.remove_connection(connection.id).is_none());
        assert!(registry.connection_between(a.id(), b.id()).is_none());
        assert!(registry.adjacency().is_consistent());
        // the pair may be connected again
        assert!(registry.add_connection(a.id(), b.id()).is_ok());
    }
}
