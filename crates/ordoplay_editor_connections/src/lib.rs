// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection state for `OrdoPlay` Editor node graphs.
//!
//! The host UI owns the node objects; this crate tracks them and the
//! connections drawn between them:
//! - Nodes grouped into parent buckets, held by weak handles
//! - Connections validated against parent, mode and compatibility rules
//! - A drag gesture state machine fed by node pointer gestures
//! - Event hooks the UI uses to draw and react to connections
//! - Serialization to a JSON or RON document and back
//!
//! ## Architecture
//!
//! [`ConnectionManager`] is a single-threaded handle over a [`Registry`],
//! a [`DragState`] and a [`HookRegistry`]. Announcing a node subscribes
//! the manager to its [`Gesture`]s; a drag from an output onto an input
//! ends in [`ConnectionManager::add_connection`].

pub mod id;
pub mod attribute;
pub mod node;
pub mod hook;
pub mod connection;
pub mod registry;
pub mod drag;
pub mod config;
pub mod manager;
pub mod codec;

#[cfg(test)]
mod testing;

pub use id::{ConnectionId, GroupId, HookId, NodeId, ParentId};
pub use attribute::{AttributeValue, Attributes, Point, Size};
pub use node::{Gesture, GestureCallback, GestureHooks, Node, NodeHooks, NodeIds, NodeMode, NodeRef};
pub use hook::{Dispatch, HookCallback, HookEvent, HookKind, HookRegistry};
pub use connection::{Adjacency, Connection};
pub use registry::{AnnounceError, ConnectionError, ParentBucket, Registry, RemovedNode};
pub use drag::DragState;
pub use config::{DuplicatePolicy, ManagerConfig, ManagerSettings, MousePositionHook, SettingsError};
pub use manager::{ConnectionManager, ParentView};
pub use codec::{DecodeError, Document, Restored, Skipped};
