// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-run execution state.
//!
//! A [`Context`] is created for every run. It owns the call stack used to
//! detect re-entrant execution, the cache of pin values computed during the
//! run, and the records a run reports back to the host.

use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId};
use crate::pin::{Pin, PinDirection, PinId};
use crate::value::PinValue;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of executing a node: the flow pin to follow, if any
pub type ExecResult = Result<Option<PinId>, ExecutionError>;

/// Shared flag used to ask a run to stop at the next safe point
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    /// Create a lowered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the token
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Lower the token so the next run may proceed
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether the token is raised
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Non-fatal failure reported by a node during a run
#[derive(Debug, Clone, PartialEq)]
pub struct NodeError {
    /// Failing node
    pub node: NodeId,
    /// Node display name at the time of failure
    pub node_name: String,
    /// What went wrong
    pub message: String,
}

/// State for one run over a graph
pub struct Context<'g> {
    graph: &'g Graph,
    call_stack: Vec<NodeId>,
    values: HashMap<PinId, PinValue>,
    executed: HashSet<NodeId>,
    pulled_exits: HashMap<NodeId, Option<PinId>>,
    errors: Vec<NodeError>,
    costs: IndexMap<NodeId, Duration>,
    threading: bool,
    stop: StopToken,
}

impl<'g> Context<'g> {
    /// Create a fresh context over `graph`
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            call_stack: Vec::new(),
            values: HashMap::new(),
            executed: HashSet::new(),
            pulled_exits: HashMap::new(),
            errors: Vec::new(),
            costs: IndexMap::new(),
            threading: false,
            stop: StopToken::new(),
        }
    }

    /// Mark this context as running concurrently with others over the same graph
    pub fn with_threading(mut self, threading: bool) -> Self {
        self.threading = threading;
        self
    }

    /// Share a stop token with the host
    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    /// The graph being run
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Threading hint passed to every `execute`
    pub fn threading(&self) -> bool {
        self.threading
    }

    /// Whether the host asked this run to stop
    pub fn stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Nodes currently in execution, outermost first
    pub fn call_stack(&self) -> &[NodeId] {
        &self.call_stack
    }

    /// Clear the call stack; exit nodes call this to end the run
    pub fn clear_call_stack(&mut self) {
        self.call_stack.clear();
    }

    /// Push a node onto the call stack, failing if it is already executing
    pub fn enter(&mut self, node_id: NodeId) -> Result<(), ExecutionError> {
        if self.call_stack.contains(&node_id) {
            return Err(ExecutionError::CyclicExecution {
                node: node_id,
                call_stack: self.call_stack.clone(),
            });
        }
        self.call_stack.push(node_id);
        Ok(())
    }

    /// Pop `node_id` if it is the innermost frame
    pub fn leave(&mut self, node_id: NodeId) {
        if self.call_stack.last() == Some(&node_id) {
            self.call_stack.pop();
        }
    }

    /// Record that a node finished executing in this run
    pub fn mark_executed(&mut self, node_id: NodeId) {
        self.executed.insert(node_id);
    }

    /// Whether a node has executed in this run
    pub fn has_executed(&self, node_id: NodeId) -> bool {
        self.executed.contains(&node_id)
    }

    /// Exit pin returned when `node_id` ran to satisfy a data pull in this
    /// run, or `None` if it has not been pulled
    pub fn pulled_exit(&self, node_id: NodeId) -> Option<Option<PinId>> {
        self.pulled_exits.get(&node_id).copied()
    }

    /// Store a value on a pin and mark it fresh for this run
    pub fn set_pin_value(&mut self, pin: &Pin, value: PinValue) {
        pin.set_value(value.clone());
        self.values.insert(pin.id(), value);
    }

    /// Value computed for a pin in this run, if any
    pub fn cached_value(&self, pin_id: PinId) -> Option<&PinValue> {
        self.values.get(&pin_id)
    }

    /// Whether a pin's value was computed in this run
    pub fn is_fresh(&self, pin_id: PinId) -> bool {
        self.values.contains_key(&pin_id)
    }

    /// Read a pin's value, pulling it from upstream if needed.
    ///
    /// For a linked input, the source pin's value is returned from the cache
    /// when fresh. Otherwise the node owning the source pin is executed (at
    /// most once per run) and the cache is consulted again; a source that
    /// still has no value yields its type's default. Unlinked inputs return
    /// their own stored value.
    pub fn get_pin_value(&mut self, pin: &Pin) -> Result<PinValue, ExecutionError> {
        let source_id = match pin.direction() {
            PinDirection::Input => match self.graph.link_to(pin.id()) {
                Some(link) => link.from_pin,
                None => {
                    return Ok(self
                        .values
                        .get(&pin.id())
                        .cloned()
                        .unwrap_or_else(|| pin.value()));
                }
            },
            PinDirection::Output => pin.id(),
        };

        if let Some(value) = self.values.get(&source_id) {
            return Ok(value.clone());
        }

        let graph = self.graph;
        let source = graph
            .pin(source_id)
            .ok_or(ExecutionError::PinNotFound(source_id))?;
        let owner = source.owner();

        if !self.has_executed(owner) {
            self.execute_upstream(owner)?;
            if let Some(value) = self.values.get(&source_id) {
                return Ok(value.clone());
            }
        }

        Ok(source.pin_type().default_value())
    }

    /// Execute a node to satisfy a data pull. Its exit flow pin is kept so
    /// flow reaching the node later in the run continues without recomputing.
    fn execute_upstream(&mut self, node_id: NodeId) -> Result<(), ExecutionError> {
        let graph = self.graph;
        let node: &dyn Node = graph
            .node(node_id)
            .ok_or(ExecutionError::NodeNotFound(node_id))?;

        self.enter(node_id)?;
        tracing::trace!("Pulling data from '{}'", node.name());
        let threading = self.threading;
        let result = node.execute(self, None, threading);
        self.leave(node_id);
        self.mark_executed(node_id);
        let exit = result?;
        self.pulled_exits.insert(node_id, exit);
        Ok(())
    }

    /// Record a non-fatal node failure
    pub fn report_error(&mut self, node: NodeId, message: impl Into<String>) {
        let node_name = self
            .graph
            .node(node)
            .map(|n| n.name().to_string())
            .unwrap_or_default();
        let message = message.into();
        tracing::warn!("Node '{}' failed: {}", node_name, message);
        self.errors.push(NodeError {
            node,
            node_name,
            message,
        });
    }

    /// Node failures recorded so far
    pub fn errors(&self) -> &[NodeError] {
        &self.errors
    }

    /// Record time a node spent computing
    pub fn record_cost(&mut self, node: NodeId, cost: Duration) {
        *self.costs.entry(node).or_default() += cost;
    }

    /// Per-node compute cost recorded so far
    pub fn costs(&self) -> &IndexMap<NodeId, Duration> {
        &self.costs
    }

    /// Drop run-local state so the context can start another run
    pub(crate) fn begin_run(&mut self) {
        self.values.clear();
        self.executed.clear();
        self.pulled_exits.clear();
        self.errors.clear();
        self.costs.clear();
    }

    pub(crate) fn take_errors(&mut self) -> Vec<NodeError> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn take_costs(&mut self) -> IndexMap<NodeId, Duration> {
        std::mem::take(&mut self.costs)
    }
}

/// Fatal errors that end a run
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// A node was entered while already executing
    #[error("Cyclic execution at node {node}")]
    CyclicExecution {
        /// Node entered twice
        node: NodeId,
        /// Call stack at the time
        call_stack: Vec<NodeId>,
    },

    /// The call stack was not empty when the exit node finished
    #[error("Call stack not cleared at exit: {0:?}")]
    UnterminatedCallStack(Vec<NodeId>),

    /// A run was started on a context that is still executing
    #[error("Context is already running: {0:?}")]
    ContextBusy(Vec<NodeId>),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found
    #[error("Pin not found: {0:?}")]
    PinNotFound(PinId),

    /// A node returned a pin that is not one of its output flow pins
    #[error("Node {node} returned invalid exit pin {pin:?}")]
    InvalidExitPin {
        /// Executing node
        node: NodeId,
        /// Returned pin
        pin: PinId,
    },

    /// The graph cannot run
    #[error("Graph is not runnable: {0}")]
    NotRunnable(#[from] GraphError),
}
