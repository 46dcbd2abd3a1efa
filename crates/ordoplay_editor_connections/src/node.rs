// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node collaborator contract.
//!
//! Nodes are owned by the host UI. The registry only ever holds a
//! [`NodeRef`], a weak handle that records the node's identity at
//! announce time and resolves to the live object while the host keeps it.

use crate::attribute::{Attributes, Point};
use crate::id::{GroupId, NodeId, ParentId};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Directionality of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeMode {
    /// Receives connections
    Input,
    /// Emits connections
    Output,
}

impl NodeMode {
    /// The mode a node must have to connect to this one
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Identity triple reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIds {
    /// The node's own ID
    pub id: NodeId,
    /// Bucket shared with sibling nodes
    pub parent: ParentId,
    /// Node type tag
    pub group: GroupId,
}

/// Pointer gestures a host reports for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Drag began
    DragStart,
    /// Pointer moved during a drag
    Drag,
    /// Drag finished
    DragEnd,
    /// Pointer entered the node's hit region
    PointerEnter,
    /// Pointer left the node's hit region
    PointerLeave,
    /// Single click
    Click,
    /// Double click
    DoubleClick,
}

/// Callback a host invokes when a gesture happens
pub type GestureCallback = Rc<dyn Fn()>;

/// Gesture registration and anchor query exposed by a node
pub trait NodeHooks {
    /// Register a callback for a gesture
    ///
    /// The host invokes it once per occurrence: drag start once, drag zero
    /// or more times, drag end exactly once per started gesture.
    fn subscribe(&self, gesture: Gesture, callback: GestureCallback);

    /// The node's current anchor point
    fn root_position(&self) -> Point;
}

/// A connectable endpoint supplied by the host UI
pub trait Node {
    /// The node's identity
    fn ids(&self) -> NodeIds;

    /// Input or output
    fn mode(&self) -> NodeMode;

    /// Semantic check on top of the structural connection rules
    fn is_compatible(&self, other: &dyn Node) -> bool {
        let _ = other;
        true
    }

    /// Data persisted verbatim with the node
    fn attributes(&self) -> Attributes {
        Attributes::new()
    }

    /// Data persisted with the node's parent, if this node supplies any
    fn parent_attributes(&self) -> Option<Attributes> {
        None
    }

    /// Gesture hooks
    fn hooks(&self) -> &dyn NodeHooks;
}

/// Weak handle to a host-owned node.
///
/// Identity fields are captured when the handle is created; later changes to
/// the node's own `ids()` are not tracked.
#[derive(Clone)]
pub struct NodeRef {
    id: NodeId,
    parent: ParentId,
    group: GroupId,
    node: Weak<dyn Node>,
}

impl NodeRef {
    /// Create a handle to a node without taking ownership
    pub fn new<N: Node + 'static>(node: &Rc<N>) -> Self {
        let node: Rc<dyn Node> = node.clone();
        Self::from_dyn(&node)
    }

    /// Create a handle from a type-erased node
    pub fn from_dyn(node: &Rc<dyn Node>) -> Self {
        let ids = node.ids();
        Self {
            id: ids.id,
            parent: ids.parent,
            group: ids.group,
            node: Rc::downgrade(node),
        }
    }

    /// The node's ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The parent bucket this node was filed under
    pub fn parent(&self) -> ParentId {
        self.parent
    }

    /// The node's group
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Resolve to the live node, `None` once the host dropped it
    pub fn upgrade(&self) -> Option<Rc<dyn Node>> {
        self.node.upgrade()
    }

    /// Whether the host still holds the node
    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }

    /// Whether both handles point at the same node object
    pub fn same_node(&self, other: &NodeRef) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.node, &other.node)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_node(other)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("group", &self.group)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl From<&NodeRef> for NodeId {
    fn from(node: &NodeRef) -> Self {
        node.id
    }
}

/// Ready-made [`NodeHooks`] implementation a host can embed in its nodes.
#[derive(Default)]
pub struct GestureHooks {
    callbacks: RefCell<Vec<(Gesture, GestureCallback)>>,
    position: Cell<Point>,
}

impl GestureHooks {
    /// Create hooks anchored at a position
    pub fn new(position: Point) -> Self {
        Self {
            callbacks: RefCell::new(Vec::new()),
            position: Cell::new(position),
        }
    }

    /// Move the anchor point
    pub fn set_root_position(&self, position: Point) {
        self.position.set(position);
    }

    /// Invoke every callback registered for a gesture, in registration order.
    ///
    /// Callbacks may subscribe further callbacks while running; those are
    /// picked up by the next emit.
    pub fn emit(&self, gesture: Gesture) {
        let callbacks: Vec<GestureCallback> = self
            .callbacks
            .borrow()
            .iter()
            .filter(|(g, _)| *g == gesture)
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Number of callbacks registered for a gesture
    pub fn subscriber_count(&self, gesture: Gesture) -> usize {
        self.callbacks
            .borrow()
            .iter()
            .filter(|(g, _)| *g == gesture)
            .count()
    }
}

impl NodeHooks for GestureHooks {
    fn subscribe(&self, gesture: Gesture, callback: GestureCallback) {
        self.callbacks.borrow_mut().push((gesture, callback));
    }

    fn root_position(&self) -> Point {
        self.position.get()
    }
}

impl fmt::Debug for GestureHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureHooks")
            .field("callbacks", &self.callbacks.borrow().len())
            .field("position", &self.position.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestNode;

    #[test]
    fn test_node_ref_captures_identity() {
        let node = TestNode::output(ParentId::new());
        let handle = NodeRef::new(&node);
        assert_eq!(handle.id(), node.ids().id);
        assert_eq!(handle.parent(), node.ids().parent);
        assert_eq!(handle.group(), node.ids().group);
        assert!(handle.is_alive());
    }

    #[test]
    fn test_node_ref_does_not_own() {
        let node = TestNode::input(ParentId::new());
        let handle = NodeRef::new(&node);
        drop(node);
        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn test_same_node_compares_objects() {
        let parent = ParentId::new();
        let a = TestNode::input(parent);
        let twin = TestNode::with_ids(a.ids(), NodeMode::Input);
        assert!(NodeRef::new(&a).same_node(&NodeRef::new(&a)));
        assert!(!NodeRef::new(&a).same_node(&NodeRef::new(&twin)));
    }

    #[test]
    fn test_gesture_hooks_emit_in_order() {
        let hooks = GestureHooks::new(Point::new(1.0, 2.0));
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            hooks.subscribe(Gesture::Drag, Rc::new(move || log.borrow_mut().push(tag)));
        }
        hooks.subscribe(Gesture::Click, Rc::new(|| panic!("wrong gesture")));

        hooks.emit(Gesture::Drag);
        assert_eq!(*log.borrow(), ["first", "second"]);
        assert_eq!(hooks.subscriber_count(Gesture::Drag), 2);
        assert_eq!(hooks.root_position(), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_mode_opposite() {
        assert_eq!(NodeMode::Input.opposite(), NodeMode::Output);
        assert_eq!(NodeMode::Output.opposite(), NodeMode::Input);
    }
}
