// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph execution.
//!
//! A run starts at the entry node and follows flow links one node at a time.
//! Every node stepped into stays on the context's call stack until the run
//! ends, so a flow path that returns to a node is reported as a cycle. Data
//! inputs are pulled on demand through [`Context::get_pin_value`]. A node that
//! already ran for a data pull is not executed again when flow reaches it in
//! the same run; flow continues from the exit pin that pull returned.

use crate::context::{Context, ExecutionError, NodeError, StopToken};
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::pin::{PinDirection, PinId};
use indexmap::IndexMap;
use std::time::{Duration, Instant};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// An exit node ran and cleared the call stack
    Completed,
    /// A node returned no exit pin, or an unlinked one
    Halted,
    /// The host asked the run to stop
    Stopped,
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the run ended
    pub status: RunStatus,
    /// Nodes stepped into through flow, in order
    pub path: Vec<NodeId>,
    /// Non-fatal node failures
    pub errors: Vec<NodeError>,
    /// Compute cost reported per node
    pub costs: IndexMap<NodeId, Duration>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether the run completed without node failures
    pub fn is_clean(&self) -> bool {
        self.status == RunStatus::Completed && self.errors.is_empty()
    }
}

/// Drives runs over a graph.
///
/// The executor is `Sync`: one thread may run while another calls
/// [`Executor::stop`].
#[derive(Debug)]
pub struct Executor<'g> {
    graph: &'g Graph,
    stop: StopToken,
}

impl<'g> Executor<'g> {
    /// Create an executor for `graph`
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            stop: StopToken::new(),
        }
    }

    /// The graph being run
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Create a context wired to this executor's stop token
    pub fn context(&self) -> Context<'g> {
        Context::new(self.graph).with_stop_token(self.stop.clone())
    }

    /// Token observed by contexts created with [`Executor::context`]
    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// Ask active runs to stop and let every node make its outputs safe
    pub fn stop(&self) {
        tracing::info!("Stopping graph '{}'", self.graph.name);
        self.stop.stop();
        for node in self.graph.nodes() {
            node.on_stop();
        }
    }

    /// Lower the stop token so new runs proceed
    pub fn clear_stop(&self) {
        self.stop.clear();
    }

    /// Run from the graph's entry node
    pub fn run(&self, ctx: &mut Context<'g>) -> Result<RunReport, ExecutionError> {
        let entry = self.graph.check_runnable()?;
        self.run_from(ctx, entry)
    }

    /// Run starting at an arbitrary node
    pub fn run_from(
        &self,
        ctx: &mut Context<'g>,
        start: NodeId,
    ) -> Result<RunReport, ExecutionError> {
        if !ctx.call_stack().is_empty() {
            return Err(ExecutionError::ContextBusy(ctx.call_stack().to_vec()));
        }
        if !self.graph.contains_node(start) {
            return Err(ExecutionError::NodeNotFound(start));
        }

        tracing::info!("Running graph '{}'", self.graph.name);
        let started = Instant::now();
        ctx.begin_run();
        for node in self.graph.nodes() {
            node.reset(ctx);
        }

        let mut path = Vec::new();
        let result = self.walk(ctx, start, &mut path);
        // The stack never outlives a run, whatever ended it
        ctx.clear_call_stack();
        let status = result?;

        let report = RunReport {
            status,
            path,
            errors: ctx.take_errors(),
            costs: ctx.take_costs(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Graph '{}' finished: {:?} after {} steps in {:?}",
            self.graph.name,
            report.status,
            report.path.len(),
            report.elapsed
        );
        Ok(report)
    }

    fn walk(
        &self,
        ctx: &mut Context<'g>,
        start: NodeId,
        path: &mut Vec<NodeId>,
    ) -> Result<RunStatus, ExecutionError> {
        let mut current = Some((start, None));

        while let Some((node_id, entry)) = current {
            if self.stop.is_stopped() || ctx.stop_requested() {
                tracing::debug!("Run stopped before node {}", node_id);
                return Ok(RunStatus::Stopped);
            }

            let node: &dyn Node = self
                .graph
                .node(node_id)
                .ok_or(ExecutionError::NodeNotFound(node_id))?;

            ctx.enter(node_id)?;
            let exit = match ctx.pulled_exit(node_id) {
                Some(exit) => {
                    tracing::debug!("'{}' already ran for data; continuing its flow", node.name());
                    if node.info().kind == NodeKind::ExitPoint {
                        ctx.clear_call_stack();
                    }
                    exit
                }
                None => {
                    tracing::debug!("Executing '{}' ({})", node.name(), node.info().name);
                    let threading = ctx.threading();
                    node.execute(ctx, entry, threading)?
                }
            };
            ctx.mark_executed(node_id);
            path.push(node_id);

            if node.info().kind == NodeKind::ExitPoint {
                if !ctx.call_stack().is_empty() {
                    return Err(ExecutionError::UnterminatedCallStack(
                        ctx.call_stack().to_vec(),
                    ));
                }
                return Ok(RunStatus::Completed);
            }

            current = match exit {
                Some(pin) => self.follow(node_id, pin)?,
                None => None,
            };
        }

        if self.stop.is_stopped() || ctx.stop_requested() {
            return Ok(RunStatus::Stopped);
        }
        Ok(RunStatus::Halted)
    }

    /// Resolve the node and entry pin reached through `node_id`'s exit pin
    fn follow(
        &self,
        node_id: NodeId,
        pin_id: PinId,
    ) -> Result<Option<(NodeId, Option<PinId>)>, ExecutionError> {
        let valid = self.graph.pin(pin_id).is_some_and(|pin| {
            pin.owner() == node_id && pin.is_flow() && pin.direction() == PinDirection::Output
        });
        if !valid {
            return Err(ExecutionError::InvalidExitPin {
                node: node_id,
                pin: pin_id,
            });
        }

        let mut links = self.graph.links_from(pin_id);
        let next = links.next().map(|link| (link.to_node, Some(link.to_pin)));
        if links.next().is_some() {
            tracing::debug!("Flow pin {:?} fans out; following its first link", pin_id);
        }
        Ok(next)
    }
}
