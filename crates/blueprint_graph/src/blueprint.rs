// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing session over a graph.
//!
//! [`Blueprint`] owns a graph, the registry its nodes come from and the
//! host's change observer. Every edit goes through it, is reported to the
//! observer, and is followed by exactly the [`Directive`] the observer
//! returned.

use crate::autolink::{auto_link, AutoLinkReport};
use crate::callback::{CallbackDispatcher, ChangeKind, ChangeObserver, Directive};
use crate::codec::{self, LoadError, LoadReport};
use crate::context::ExecutionError;
use crate::execution::{Executor, RunReport};
use crate::graph::{Graph, GraphError, LinkError};
use crate::link::LinkId;
use crate::node::{Node, NodeId, NodeRegistry};
use crate::pin::{PinDirection, PinId};
use crate::value::PinValue;
use serde_json::Value;
use std::io;
use std::path::Path;

/// What a session did in response to an edit
#[derive(Debug, Clone)]
pub enum Reaction {
    /// The observer asked for nothing
    Nothing,
    /// The changed node was auto-linked
    AutoLinked(AutoLinkReport),
    /// The graph was run again
    Ran(RunReport),
    /// The graph was run again and the run failed
    RunFailed(ExecutionError),
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    /// No registered type with this name
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// The node is not of the requested type
    #[error("Node {0} has a different type")]
    WrongNodeType(NodeId),

    /// No pin with this name on the node
    #[error("Node {node} has no {direction:?} pin named '{name}'")]
    PinNotFound {
        /// Node
        node: NodeId,
        /// Pin name
        name: String,
        /// Pin direction
        direction: PinDirection,
    },

    /// No such link
    #[error("Link not found: {0:?}")]
    LinkNotFound(LinkId),

    /// Structural graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Link refused
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Run failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Load failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Writing failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An editing session: graph, node registry and change observer
#[derive(Debug)]
pub struct Blueprint {
    graph: Graph,
    registry: NodeRegistry,
    callbacks: CallbackDispatcher,
}

impl Blueprint {
    /// Create a session with an empty graph
    pub fn new(registry: NodeRegistry) -> Self {
        Self::with_graph(Graph::default(), registry)
    }

    /// Create a session over an existing graph
    pub fn with_graph(graph: Graph, registry: NodeRegistry) -> Self {
        Self {
            graph,
            registry,
            callbacks: CallbackDispatcher::new(),
        }
    }

    /// The graph being edited
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Node types available to this session
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Install the host's change observer
    pub fn set_observer(&mut self, observer: impl ChangeObserver + 'static) {
        self.callbacks.set_observer(observer);
    }

    /// Remove the change observer
    pub fn clear_observer(&mut self) {
        self.callbacks.clear_observer();
    }

    /// Hand the graph back, ending the session
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    fn create(&mut self, type_name: &str, position: [f32; 2]) -> Result<NodeId, BlueprintError> {
        let mut node = self
            .registry
            .create_node(type_name, NodeId::new())
            .ok_or_else(|| BlueprintError::UnknownNodeType(type_name.to_string()))?;
        node.base_mut().position = position;
        Ok(self.graph.add_node(node)?)
    }

    /// Insert a node so it can be wired into its surroundings
    pub fn insert_node(
        &mut self,
        type_name: &str,
        position: [f32; 2],
    ) -> Result<(NodeId, Reaction), BlueprintError> {
        let id = self.create(type_name, position)?;
        let reaction = self.dispatch(ChangeKind::NodeInserted, id);
        Ok((id, reaction))
    }

    /// Append a node without wiring it
    pub fn append_node(
        &mut self,
        type_name: &str,
        position: [f32; 2],
    ) -> Result<(NodeId, Reaction), BlueprintError> {
        let id = self.create(type_name, position)?;
        let reaction = self.dispatch(ChangeKind::NodeAppended, id);
        Ok((id, reaction))
    }

    /// Delete a node and its links; the node is dropped before the observer
    /// is told
    pub fn delete_node(&mut self, node_id: NodeId) -> Result<Reaction, BlueprintError> {
        let node = self
            .graph
            .remove_node(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let name = node.name().to_string();
        drop(node);
        Ok(self.dispatch_named(ChangeKind::NodeDeleted, &name, node_id))
    }

    /// Link an output pin to an input pin
    pub fn link(&mut self, from: PinId, to: PinId) -> Result<(LinkId, Reaction), BlueprintError> {
        let id = self.graph.link(from, to)?;
        let node = self.graph.get_link(id).map(|l| l.to_node);
        let reaction = match node {
            Some(node) => self.dispatch(ChangeKind::Link, node),
            None => Reaction::Nothing,
        };
        Ok((id, reaction))
    }

    /// Link pins by node and pin name
    pub fn link_by_name(
        &mut self,
        from: (NodeId, &str),
        to: (NodeId, &str),
    ) -> Result<(LinkId, Reaction), BlueprintError> {
        let source = self.pin_id(from.0, from.1, PinDirection::Output)?;
        let target = self.pin_id(to.0, to.1, PinDirection::Input)?;
        self.link(source, target)
    }

    /// Remove a link
    pub fn unlink(&mut self, link_id: LinkId) -> Result<Reaction, BlueprintError> {
        let link = self
            .graph
            .unlink(link_id)
            .ok_or(BlueprintError::LinkNotFound(link_id))?;
        Ok(self.dispatch(ChangeKind::Unlink, link.to_node))
    }

    /// Set the value an unlinked input pin provides
    pub fn set_input(
        &mut self,
        node_id: NodeId,
        pin_name: &str,
        value: PinValue,
    ) -> Result<Reaction, BlueprintError> {
        let pin_id = self.pin_id(node_id, pin_name, PinDirection::Input)?;
        if let Some(pin) = self.graph.pin(pin_id) {
            pin.set_value(value);
        }
        Ok(self.dispatch(ChangeKind::ParamChanged, node_id))
    }

    /// Change a node parameter
    pub fn edit_node<T: Node>(
        &mut self,
        node_id: NodeId,
        edit: impl FnOnce(&mut T),
    ) -> Result<Reaction, BlueprintError> {
        self.edit(node_id, ChangeKind::ParamChanged, edit)
    }

    /// Change a node setting
    pub fn change_setting<T: Node>(
        &mut self,
        node_id: NodeId,
        edit: impl FnOnce(&mut T),
    ) -> Result<Reaction, BlueprintError> {
        self.edit(node_id, ChangeKind::SettingChanged, edit)
    }

    fn edit<T: Node>(
        &mut self,
        node_id: NodeId,
        kind: ChangeKind,
        edit: impl FnOnce(&mut T),
    ) -> Result<Reaction, BlueprintError> {
        if !self.graph.contains_node(node_id) {
            return Err(GraphError::NodeNotFound(node_id).into());
        }
        let node = self
            .graph
            .node_as_mut::<T>(node_id)
            .ok_or(BlueprintError::WrongNodeType(node_id))?;
        edit(node);
        Ok(self.dispatch(kind, node_id))
    }

    /// Run the graph once
    pub fn run(&self) -> Result<RunReport, ExecutionError> {
        let executor = Executor::new(&self.graph);
        let mut ctx = executor.context();
        executor.run(&mut ctx)
    }

    /// Serialize the graph
    pub fn save(&self) -> Value {
        codec::save_graph(&self.graph)
    }

    /// Write the graph to a file
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), BlueprintError> {
        codec::save_file(&self.graph, path)?;
        Ok(())
    }

    /// Replace the graph with one read from a document
    pub fn load(&mut self, doc: &Value) -> Result<LoadReport, BlueprintError> {
        let (graph, report) = codec::load_graph(doc, &self.registry)?;
        self.graph = graph;
        Ok(report)
    }

    /// Replace the graph with one read from a file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, BlueprintError> {
        let (graph, report) = codec::load_file(path, &self.registry)?;
        self.graph = graph;
        Ok(report)
    }

    /// Add a document's nodes and links to the graph
    pub fn merge(&mut self, doc: &Value) -> Result<LoadReport, BlueprintError> {
        Ok(codec::merge_graph(&mut self.graph, doc, &self.registry)?)
    }

    fn pin_id(
        &self,
        node: NodeId,
        name: &str,
        direction: PinDirection,
    ) -> Result<PinId, BlueprintError> {
        if !self.graph.contains_node(node) {
            return Err(GraphError::NodeNotFound(node).into());
        }
        self.graph
            .find_pin(node, name, direction)
            .map(|p| p.id())
            .ok_or_else(|| BlueprintError::PinNotFound {
                node,
                name: name.to_string(),
                direction,
            })
    }

    fn dispatch(&mut self, kind: ChangeKind, node_id: NodeId) -> Reaction {
        let name = self
            .graph
            .node(node_id)
            .map(|n| n.name().to_string())
            .unwrap_or_default();
        self.dispatch_named(kind, &name, node_id)
    }

    fn dispatch_named(&mut self, kind: ChangeKind, name: &str, node_id: NodeId) -> Reaction {
        match self.callbacks.notify(kind, name, node_id) {
            Directive::Nothing => Reaction::Nothing,
            Directive::AutoLink => match auto_link(&mut self.graph, node_id) {
                Ok(report) => Reaction::AutoLinked(report),
                Err(e) => {
                    tracing::debug!("Auto-link after {:?} skipped: {}", kind, e);
                    Reaction::Nothing
                }
            },
            Directive::RunAgain => match self.run() {
                Ok(report) => Reaction::Ran(report),
                Err(e) => {
                    tracing::warn!("Run after {:?} failed: {}", kind, e);
                    Reaction::RunFailed(e)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::RunStatus;
    use crate::test_nodes::{CounterNode, EndNode, PassNode, StartNode};
    use std::sync::{Arc, Mutex};

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register::<StartNode>();
        registry.register::<EndNode>();
        registry.register::<PassNode>();
        registry.register::<CounterNode>();
        registry
    }

    type Log = Arc<Mutex<Vec<(ChangeKind, String)>>>;

    /// Session whose observer records events and follows the usual host policy
    fn session() -> (Blueprint, Log) {
        let log: Log = Arc::default();
        let mut blueprint = Blueprint::new(registry());
        let seen = Arc::clone(&log);
        blueprint.set_observer(move |kind: ChangeKind, name: &str, _: NodeId| {
            seen.lock().unwrap().push((kind, name.to_string()));
            match kind {
                ChangeKind::NodeInserted => Directive::AutoLink,
                ChangeKind::ParamChanged | ChangeKind::SettingChanged => Directive::RunAgain,
                _ => Directive::Nothing,
            }
        });
        (blueprint, log)
    }

    #[test]
    fn test_insert_auto_links() {
        let (mut blueprint, log) = session();
        let (start, _) = blueprint.append_node("Test Start", [0.0, 0.0]).unwrap();
        let (end, reaction) = blueprint.insert_node("Test End", [100.0, 0.0]).unwrap();

        assert!(matches!(reaction, Reaction::AutoLinked(ref r) if r.created.len() == 1));
        assert_eq!(blueprint.graph().check_runnable(), Ok(start));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (ChangeKind::NodeAppended, "Start".to_string()),
                (ChangeKind::NodeInserted, "End".to_string()),
            ]
        );
        assert!(blueprint.graph().contains_node(end));
    }

    #[test]
    fn test_param_change_runs_again() {
        let (mut blueprint, _) = session();
        let (start, _) = blueprint.append_node("Test Start", [0.0, 0.0]).unwrap();
        let (end, _) = blueprint.append_node("Test End", [100.0, 0.0]).unwrap();
        let (counter, _) = blueprint.append_node("Test Counter", [50.0, 50.0]).unwrap();
        blueprint.link_by_name((start, "Exit"), (end, "End")).unwrap();
        blueprint.link_by_name((counter, "Out"), (end, "In")).unwrap();

        let reaction = blueprint
            .edit_node::<CounterNode>(counter, |node| node.value = 6.0)
            .unwrap();
        let Reaction::Ran(report) = reaction else {
            panic!("expected a run, got {reaction:?}");
        };
        assert_eq!(report.status, RunStatus::Completed);

        let end_node = blueprint.graph().node_as::<EndNode>(end).unwrap();
        assert_eq!(end_node.input.value(), PinValue::Float(6.0));
    }

    #[test]
    fn test_run_failure_is_a_reaction() {
        let (mut blueprint, _) = session();
        let (pass, _) = blueprint.append_node("Test Pass", [0.0, 0.0]).unwrap();
        let reaction = blueprint
            .set_input(pass, "Gain", PinValue::Float(2.0))
            .unwrap();
        assert!(matches!(
            reaction,
            Reaction::RunFailed(ExecutionError::NotRunnable(GraphError::NoEntryPoint))
        ));
    }

    #[test]
    fn test_delete_reports_name() {
        let (mut blueprint, log) = session();
        let (pass, _) = blueprint.append_node("Test Pass", [0.0, 0.0]).unwrap();
        let reaction = blueprint.delete_node(pass).unwrap();

        assert!(matches!(reaction, Reaction::Nothing));
        assert_eq!(
            log.lock().unwrap().last(),
            Some(&(ChangeKind::NodeDeleted, "Pass".to_string()))
        );
        assert!(matches!(
            blueprint.delete_node(pass),
            Err(BlueprintError::Graph(GraphError::NodeNotFound(_)))
        ));
    }

    #[test]
    fn test_edit_errors() {
        let (mut blueprint, _) = session();
        let (pass, _) = blueprint.append_node("Test Pass", [0.0, 0.0]).unwrap();

        assert!(matches!(
            blueprint.insert_node("Nope", [0.0, 0.0]),
            Err(BlueprintError::UnknownNodeType(_))
        ));
        assert!(matches!(
            blueprint.edit_node::<CounterNode>(pass, |_| {}),
            Err(BlueprintError::WrongNodeType(_))
        ));
        assert!(matches!(
            blueprint.set_input(pass, "Missing", PinValue::Empty),
            Err(BlueprintError::PinNotFound { .. })
        ));
    }

    #[test]
    fn test_unlink_and_save_load() {
        let (mut blueprint, log) = session();
        let (start, _) = blueprint.append_node("Test Start", [0.0, 0.0]).unwrap();
        let (end, _) = blueprint.append_node("Test End", [100.0, 0.0]).unwrap();
        let (link, _) = blueprint.link_by_name((start, "Exit"), (end, "End")).unwrap();

        let saved = blueprint.save();
        blueprint.unlink(link).unwrap();
        assert_eq!(blueprint.graph().link_count(), 0);
        assert_eq!(log.lock().unwrap().last().map(|e| e.0), Some(ChangeKind::Unlink));

        let report = blueprint.load(&saved).unwrap();
        assert!(report.is_clean());
        assert_eq!(blueprint.graph().link_count(), 1);
        assert!(blueprint.run().unwrap().is_clean());
    }
}
