// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph persistence.
//!
//! [`serialize`] flattens a [`Registry`](crate::Registry) into a
//! [`Document`]; [`deserialize`] validates a JSON document record by record
//! and rebuilds the registry, asking the host to recreate each node.

pub mod document;
pub mod serialize;
pub mod deserialize;

pub use document::{Document, SerializedConnection, SerializedNode, SerializedParent};
pub use serialize::serialize;
pub use deserialize::{
    deserialize, deserialize_document, deserialize_ron, deserialize_value, DecodeError, Restored,
    Skipped,
};
