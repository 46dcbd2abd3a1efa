// SPDX-License-Identifier: MIT OR Apache-2.0
//! The connection manager.
//!
//! [`ConnectionManager`] owns the registry, the drag state and the hook
//! registry, and wires itself into every announced node's gestures.
//!
//! ## Reentrancy
//!
//! No internal borrow is held while a hook, a gesture callback or the mouse
//! accessor runs. Callbacks may therefore call back into the manager, for
//! example removing the node whose connection is being reported. Such calls
//! interleave with the operation in progress: a `ConnectionInitiated` hook
//! that removes an endpoint runs before `add_connection` returns, so the
//! returned ID may already be gone.

use crate::attribute::Point;
use crate::codec::{self, Document};
use crate::config::{DuplicatePolicy, ManagerConfig};
use crate::connection::Connection;
use crate::drag::DragState;
use crate::hook::{self, Dispatch, HookCallback, HookEvent, HookKind, HookRegistry};
use crate::id::{ConnectionId, HookId, NodeId, ParentId};
use crate::node::{Gesture, Node, NodeRef};
use crate::registry::{AnnounceError, ConnectionError, ParentBucket, Registry, RemovedNode};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Gestures the manager subscribes to on every announced node
const WIRED_GESTURES: [Gesture; 5] = [
    Gesture::DragStart,
    Gesture::Drag,
    Gesture::DragEnd,
    Gesture::PointerEnter,
    Gesture::PointerLeave,
];

struct Inner {
    config: ManagerConfig,
    registry: RefCell<Registry>,
    drag: RefCell<DragState>,
    hooks: RefCell<HookRegistry>,
}

/// Node/parent/connection registry driven by drag gestures.
///
/// Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Rc<Inner>,
}

impl ConnectionManager {
    /// Create an empty manager
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                registry: RefCell::new(Registry::new()),
                drag: RefCell::new(DragState::Idle),
                hooks: RefCell::new(HookRegistry::new()),
            }),
        }
    }

    /// Adopt an existing registry, typically one restored by [`codec::deserialize`].
    ///
    /// Every live node in it is wired to the manager's gesture handling.
    /// No `Announcement` hooks fire since none can be registered yet.
    pub fn from_registry(config: ManagerConfig, registry: Registry) -> Self {
        let manager = Self::new(config);
        let nodes: Vec<NodeRef> = registry.nodes().cloned().collect();
        *manager.inner.registry.borrow_mut() = registry;
        for handle in &nodes {
            if let Some(node) = handle.upgrade() {
                manager.wire(node.as_ref(), handle);
            }
        }
        tracing::debug!(nodes = nodes.len(), "adopted registry");
        manager
    }

    /// The configuration the manager was built with
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Current pointer position from the configured accessor
    pub fn mouse_position(&self) -> Point {
        (self.inner.config.mouse_position)()
    }


    /// Register a host-owned node and subscribe to its gestures
    pub fn announce<N: Node + 'static>(&self, node: &Rc<N>) -> Result<NodeRef, AnnounceError> {
        let node: Rc<dyn Node> = node.clone();
        self.announce_dyn(&node)
    }

    /// Register a type-erased node and subscribe to its gestures
    pub fn announce_dyn(&self, node: &Rc<dyn Node>) -> Result<NodeRef, AnnounceError> {
        let handle = NodeRef::from_dyn(node);
        let existing = self.inner.registry.borrow().node(handle.id()).cloned();

        if let Some(existing) = existing {
            match self.inner.config.settings.duplicate_policy {
                DuplicatePolicy::Reject => {
                    tracing::warn!(node = %handle.id(), "rejected duplicate announce");
                    return Err(AnnounceError::DuplicateNode(handle.id()));
                }
                DuplicatePolicy::Replace => {
                    if existing.is_alive() && existing.same_node(&handle) {
                        return Ok(existing);
                    }
                    tracing::debug!(node = %handle.id(), "replacing registered node");
                    self.remove_node(handle.id());
                }
            }
        }

        self.inner.registry.borrow_mut().insert(handle.clone())?;
        self.wire(node.as_ref(), &handle);
        tracing::debug!(node = %handle.id(), parent = %handle.parent(), "announced node");

        self.exec_hooks(&HookEvent::Announcement {
            node: handle.clone(),
        });
        Ok(handle)
    }

    fn wire(&self, node: &dyn Node, handle: &NodeRef) {
        let hooks = node.hooks();
        for gesture in WIRED_GESTURES {
            let manager = Rc::downgrade(&self.inner);
            let handle = handle.clone();
            hooks.subscribe(
                gesture,
                Rc::new(move || {
                    if let Some(inner) = manager.upgrade() {
                        ConnectionManager { inner }.on_gesture(gesture, &handle);
                    }
                }),
            );
        }
    }

    /// Get a live node by ID
    pub fn get_node(&self, id: NodeId) -> Option<Rc<dyn Node>> {
        self.node_ref(id)?.upgrade()
    }

    /// Get the registry's handle for a node
    pub fn node_ref(&self, id: NodeId) -> Option<NodeRef> {
        self.inner.registry.borrow().node(id).cloned()
    }

    /// Remove a node and every connection touching it.
    ///
    /// Accepts a [`NodeId`] or a `&NodeRef`. Returns `false` if the node was
    /// not registered.
    pub fn remove_node(&self, node: impl Into<NodeId>) -> bool {
        let id = node.into();
        let removed = self.inner.registry.borrow_mut().remove_node(id);
        match removed {
            Some(removed) => {
                tracing::debug!(
                    node = %id,
                    connections = removed.connections.len(),
                    "removed node"
                );
                self.after_removal(vec![removed]);
                true
            }
            None => false,
        }
    }

    /// Live view of a parent's children, `None` if the parent is unknown
    pub fn get_parent(&self, id: ParentId) -> Option<ParentView> {
        self.inner.registry.borrow().parent(id)?;
        Some(ParentView {
            id,
            manager: Rc::downgrade(&self.inner),
        })
    }

    /// Remove every node under a parent, then the parent.
    ///
    /// Returns `false` if the parent is unknown.
    pub fn remove_parent(&self, id: ParentId) -> bool {
        let removed = self.inner.registry.borrow_mut().remove_parent(id);
        match removed {
            Some(removed) => {
                tracing::debug!(parent = %id, nodes = removed.len(), "removed parent");
                self.after_removal(removed);
                true
            }
            None => false,
        }
    }

    fn after_removal(&self, removed: Vec<RemovedNode>) {
        {
            let mut drag = self.inner.drag.borrow_mut();
            for entry in &removed {
                *drag = std::mem::take(&mut *drag).forget(&entry.node);
            }
        }
        for entry in removed {
            for connection in entry.connections {
                self.exec_hooks(&HookEvent::ConnectionTerminated { connection });
            }
        }
    }

    /// Number of registered nodes
    pub fn node_count(&self) -> usize {
        self.inner.registry.borrow().node_count()
    }


    /// Whether `origin -> destination` would be accepted
    pub fn test_compatibility(&self, origin: NodeId, destination: NodeId) -> bool {
        self.check_connection(origin, destination).is_ok()
    }

    /// Why `origin -> destination` would be refused, if it would
    pub fn check_connection(
        &self,
        origin: NodeId,
        destination: NodeId,
    ) -> Result<(), ConnectionError> {
        self.inner.registry.borrow().check(origin, destination)
    }

    /// Connect two nodes, `None` if any connection rule fails
    pub fn add_connection(&self, origin: NodeId, destination: NodeId) -> Option<ConnectionId> {
        self.try_add_connection(origin, destination).ok()
    }

    /// Connect two nodes, reporting the rule that failed
    pub fn try_add_connection(
        &self,
        origin: NodeId,
        destination: NodeId,
    ) -> Result<ConnectionId, ConnectionError> {
        self.check_connection(origin, destination)?;
        let connection = self
            .inner
            .registry
            .borrow_mut()
            .link_checked(origin, destination)?;
        tracing::debug!(
            connection = %connection.id,
            origin = %origin,
            destination = %destination,
            "connected"
        );

        self.exec_hooks(&HookEvent::ConnectionInitiated { connection });
        Ok(connection.id)
    }

    /// Remove a connection, `false` if it does not exist
    pub fn remove_connection(&self, id: ConnectionId) -> bool {
        let removed = self.inner.registry.borrow_mut().remove_connection(id);
        match removed {
            Some(connection) => {
                tracing::debug!(connection = %id, "disconnected");
                self.exec_hooks(&HookEvent::ConnectionTerminated { connection });
                true
            }
            None => false,
        }
    }

    /// Endpoints of a connection as `(origin, destination)`
    pub fn get_connection(&self, id: ConnectionId) -> Option<(NodeId, NodeId)> {
        self.connection(id).map(|c| c.endpoints())
    }

    /// Get a connection by ID
    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.inner.registry.borrow().connection(id).copied()
    }

    /// The connection between two nodes, in either direction
    pub fn connection_between(&self, a: NodeId, b: NodeId) -> Option<Connection> {
        self.inner.registry.borrow().connection_between(a, b).copied()
    }

    /// All connections, in creation order
    pub fn connections(&self) -> Vec<Connection> {
        self.inner.registry.borrow().connections().copied().collect()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.inner.registry.borrow().connection_count()
    }


    /// Origin of the gesture in progress
    pub fn get_origin(&self) -> Option<NodeRef> {
        self.inner.drag.borrow().origin().cloned()
    }

    /// Target of the gesture in progress
    pub fn get_target(&self) -> Option<NodeRef> {
        self.inner.drag.borrow().target().cloned()
    }

    /// Snapshot of the drag state
    pub fn drag_state(&self) -> DragState {
        self.inner.drag.borrow().clone()
    }

    fn on_gesture(&self, gesture: Gesture, handle: &NodeRef) {
        if !self.inner.registry.borrow().is_current(handle) {
            tracing::trace!(
                node = %handle.id(),
                ?gesture,
                "ignoring gesture from unregistered node"
            );
            return;
        }
        match gesture {
            Gesture::DragStart => self.drag_start(handle),
            Gesture::Drag => self.drag(handle),
            Gesture::DragEnd => self.drag_end(handle),
            Gesture::PointerEnter => self.update_drag(|state| state.enter(handle)),
            Gesture::PointerLeave => self.update_drag(|state| state.leave(handle)),
            Gesture::Click | Gesture::DoubleClick => {}
        }
    }

    fn update_drag(&self, transition: impl FnOnce(DragState) -> DragState) {
        let mut drag = self.inner.drag.borrow_mut();
        *drag = transition(std::mem::take(&mut *drag));
    }

    fn root_position(&self, handle: &NodeRef) -> Point {
        match handle.upgrade() {
            Some(node) => node.hooks().root_position(),
            None => self.mouse_position(),
        }
    }

    fn drag_start(&self, origin: &NodeRef) {
        let anchor = self.root_position(origin);
        *self.inner.drag.borrow_mut() = DragState::begin(origin.clone(), anchor);
        tracing::trace!(node = %origin.id(), "drag started");

        self.exec_hooks(&HookEvent::StartConnection {
            origin: origin.clone(),
        });
    }

    fn drag(&self, node: &NodeRef) {
        let anchor = self.inner.drag.borrow().anchor();
        let anchor = anchor.unwrap_or_else(|| self.mouse_position());
        let current = self.root_position(node);
        self.exec_hooks(&HookEvent::Line { current, anchor });
    }

    fn drag_end(&self, node: &NodeRef) {
        let state = self.drag_state();
        let Some(origin) = state.origin().cloned() else {
            tracing::trace!("drag end without a gesture in progress");
            return;
        };
        if !origin.same_node(node) {
            tracing::trace!(node = %node.id(), "ignoring drag end from a non-origin node");
            return;
        }
        let target = state.target().cloned();

        self.exec_hooks(&HookEvent::EndConnection {
            origin: origin.clone(),
            target: target.clone(),
        });

        if let Some(target) = target {
            if let Err(err) = self.try_add_connection(origin.id(), target.id()) {
                tracing::debug!(%err, "gesture did not produce a connection");
            }
        }

        // a hook may already have started the next gesture
        let mut drag = self.inner.drag.borrow_mut();
        if drag.origin().is_some_and(|current| current.same_node(&origin)) {
            *drag = DragState::Idle;
        }
    }


    /// Register a hook
    pub fn add_hook<F>(&self, kind: HookKind, callback: F) -> HookId
    where
        F: Fn(&HookEvent) + 'static,
    {
        self.inner.hooks.borrow_mut().add(kind, callback)
    }

    /// Look up a hook
    pub fn get_hook(&self, kind: HookKind, id: HookId) -> Option<HookCallback> {
        self.inner.hooks.borrow().get(kind, id)
    }

    /// Unregister a hook, `false` if it was not registered
    pub fn remove_hook(&self, kind: HookKind, id: HookId) -> bool {
        self.inner.hooks.borrow_mut().remove(kind, id)
    }

    /// Deliver an event to every hook of its kind
    pub fn exec_hooks(&self, event: &HookEvent) -> Dispatch {
        let callbacks = self.inner.hooks.borrow().callbacks(event.kind());
        hook::dispatch(&callbacks, event)
    }


    /// Flatten the registry into a document
    pub fn serialize(&self) -> Document {
        codec::serialize(&self.inner.registry.borrow())
    }

    /// Read access to the registry maps
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.inner.registry.borrow())
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("drag", &self.inner.drag)
            .field("hooks", &self.inner.hooks)
            .finish()
    }
}

/// Live view of one parent's children.
///
/// Reads go through the manager, so removals made after the view was taken
/// are reflected.
#[derive(Clone)]
pub struct ParentView {
    id: ParentId,
    manager: Weak<Inner>,
}

impl ParentView {
    /// The parent's ID
    pub fn id(&self) -> ParentId {
        self.id
    }

    fn read<R>(&self, f: impl FnOnce(Option<&ParentBucket>) -> R) -> R {
        let Some(inner) = self.manager.upgrade() else {
            return f(None);
        };
        let registry = inner.registry.borrow();
        f(registry.parent(self.id))
    }

    /// Whether the parent still has children in the registry
    pub fn exists(&self) -> bool {
        self.read(|bucket| bucket.is_some())
    }

    /// Current children, in registration order
    pub fn children(&self) -> Vec<NodeRef> {
        self.read(|bucket| bucket.map(|b| b.values().cloned().collect()).unwrap_or_default())
    }

    /// IDs of the current children
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.read(|bucket| bucket.map(|b| b.keys().copied().collect()).unwrap_or_default())
    }

    /// Whether a node is currently a child
    pub fn contains(&self, node: NodeId) -> bool {
        self.read(|bucket| bucket.is_some_and(|b| b.contains_key(&node)))
    }

    /// Number of current children
    pub fn len(&self) -> usize {
        self.read(|bucket| bucket.map_or(0, |b| b.len()))
    }

    /// Whether the parent has no children left
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ParentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentView")
            .field("id", &self.id)
            .field("children", &self.child_ids())
            .finish()
    }
}
