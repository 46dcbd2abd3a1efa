// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lifecycle hooks the host can subscribe to.
//!
//! Callbacks are partitioned by [`HookKind`] and run synchronously in
//! registration order. A panicking callback is caught and logged so the
//! rest of the dispatch still runs.

use crate::attribute::Point;
use crate::connection::Connection;
use crate::id::HookId;
use crate::node::NodeRef;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Event kinds a hook can listen to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// A drag gesture started on a node
    StartConnection,
    /// A drag gesture ended
    EndConnection,
    /// Live preview line while dragging
    Line,
    /// A node was announced
    Announcement,
    /// A connection was created
    ConnectionInitiated,
    /// A connection was removed
    ConnectionTerminated,
}

impl HookKind {
    /// Every kind, in declaration order
    pub const ALL: [HookKind; 6] = [
        Self::StartConnection,
        Self::EndConnection,
        Self::Line,
        Self::Announcement,
        Self::ConnectionInitiated,
        Self::ConnectionTerminated,
    ];
}

/// Payload delivered to hooks
#[derive(Debug, Clone)]
pub enum HookEvent {
    /// A drag gesture started on `origin`
    StartConnection {
        /// Node being dragged from
        origin: NodeRef,
    },
    /// A drag gesture ended
    EndConnection {
        /// Node the gesture started on
        origin: NodeRef,
        /// Node under the pointer at release, if any
        target: Option<NodeRef>,
    },
    /// Preview line between the dragged node and the gesture anchor
    Line {
        /// Current root position of the dragged node
        current: Point,
        /// Anchor captured at drag start
        anchor: Point,
    },
    /// A node was registered
    Announcement {
        /// The registered node
        node: NodeRef,
    },
    /// A connection was created
    ConnectionInitiated {
        /// The new connection
        connection: Connection,
    },
    /// A connection was removed, directly or by cascade
    ConnectionTerminated {
        /// The removed connection
        connection: Connection,
    },
}

impl HookEvent {
    /// The kind of hooks this event is delivered to
    pub fn kind(&self) -> HookKind {
        match self {
            Self::StartConnection { .. } => HookKind::StartConnection,
            Self::EndConnection { .. } => HookKind::EndConnection,
            Self::Line { .. } => HookKind::Line,
            Self::Announcement { .. } => HookKind::Announcement,
            Self::ConnectionInitiated { .. } => HookKind::ConnectionInitiated,
            Self::ConnectionTerminated { .. } => HookKind::ConnectionTerminated,
        }
    }
}

/// A registered hook
pub type HookCallback = Rc<dyn Fn(&HookEvent)>;

/// Outcome of a dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Callbacks that returned normally
    pub delivered: usize,
    /// Callbacks that panicked
    pub failed: usize,
}

/// Hook storage keyed by event kind
#[derive(Default)]
pub struct HookRegistry {
    hooks: IndexMap<HookKind, IndexMap<HookId, HookCallback>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, returning the handle needed to remove it
    pub fn add<F>(&mut self, kind: HookKind, callback: F) -> HookId
    where
        F: Fn(&HookEvent) + 'static,
    {
        let id = HookId::new();
        self.hooks
            .entry(kind)
            .or_default()
            .insert(id, Rc::new(callback));
        id
    }

    /// Look up a callback
    pub fn get(&self, kind: HookKind, id: HookId) -> Option<HookCallback> {
        self.hooks.get(&kind)?.get(&id).cloned()
    }

    /// Unregister a callback, `false` if it was not registered
    pub fn remove(&mut self, kind: HookKind, id: HookId) -> bool {
        self.hooks
            .get_mut(&kind)
            .is_some_and(|hooks| hooks.shift_remove(&id).is_some())
    }

    /// Snapshot of the callbacks for a kind, in registration order
    pub fn callbacks(&self, kind: HookKind) -> Vec<HookCallback> {
        self.hooks
            .get(&kind)
            .map(|hooks| hooks.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of callbacks registered for a kind
    pub fn len(&self, kind: HookKind) -> usize {
        self.hooks.get(&kind).map_or(0, IndexMap::len)
    }

    /// Whether no callback of any kind is registered
    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(IndexMap::is_empty)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, hooks) in &self.hooks {
            map.entry(kind, &hooks.len());
        }
        map.finish()
    }
}

/// Run callbacks against an event, isolating panics per callback
pub fn dispatch(callbacks: &[HookCallback], event: &HookEvent) -> Dispatch {
    let mut outcome = Dispatch::default();
    for callback in callbacks {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(()) => outcome.delivered += 1,
            Err(payload) => {
                outcome.failed += 1;
                tracing::error!(
                    kind = ?event.kind(),
                    "hook panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
