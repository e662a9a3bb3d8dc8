// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blueprint node graph engine.
//!
//! Graphs are made of nodes with typed pins. Flow pins carry control flow;
//! data pins carry values such as numbers, vectors and media frames.
//!
//! ## Architecture
//!
//! - [`Graph`] owns nodes and links and validates every link.
//! - [`Executor`] walks flow links from the entry node, pulling data inputs
//!   on demand through a per-run [`Context`] that memoizes values and guards
//!   against re-entrant execution.
//! - [`autolink`] wires a freshly inserted node into its surroundings.
//! - [`Blueprint`] is an editing session that reports every change to the
//!   host and follows the [`Directive`] it answers with.
//! - [`codec`] persists graphs as JSON documents.

pub mod autolink;
pub mod blueprint;
pub mod callback;
pub mod codec;
pub mod compute;
pub mod context;
pub mod document;
pub mod execution;
pub mod graph;
pub mod link;
pub mod node;
pub mod pin;
pub mod resource;
pub mod value;

#[cfg(test)]
mod test_nodes;

pub use autolink::{auto_link, AutoLinkReport};
pub use blueprint::{Blueprint, BlueprintError, Reaction};
pub use callback::{CallbackDispatcher, ChangeKind, ChangeObserver, Directive};
pub use codec::{LoadError, LoadReport, LoadWarning, FORMAT_VERSION};
pub use compute::{Compute, ComputeError, Computed};
pub use context::{Context, ExecResult, ExecutionError, NodeError, StopToken};
pub use document::{IdRemap, LoadStatus, NodeDocument};
pub use execution::{Executor, RunReport, RunStatus};
pub use graph::{Graph, GraphError, LinkError};
pub use link::{Link, LinkId};
pub use node::{Node, NodeBase, NodeId, NodeKind, NodeRegistry, NodeType, NodeTypeInfo};
pub use pin::{Pin, PinDirection, PinId, PinType};
pub use resource::{ResourceGuard, ResourceSlot};
pub use value::{Mat, MatDataType, MatDevice, PinValue, MAX_MAT_SAMPLES};
