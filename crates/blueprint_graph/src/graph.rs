// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and links.

use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId, NodeKind};
use crate::pin::{Pin, PinDirection, PinId};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// A node graph.
///
/// Owns its nodes and links. Removing a node removes every link touching it,
/// so links never dangle.
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Box<dyn Node>>,
    /// Links in insertion order
    links: IndexMap<LinkId, Link>,
    /// Owner of every pin in the graph
    pins: HashMap<PinId, NodeId>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            pins: HashMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Box<dyn Node>) -> Result<NodeId, GraphError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        for pin in node.pins() {
            self.pins.insert(pin.id(), id);
        }
        tracing::debug!("Added node '{}' ({})", node.name(), node.info().name);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node and its links, handing the node back to the caller.
    ///
    /// Dropping the returned node releases any native resources it owns.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Box<dyn Node>> {
        let node = self.nodes.shift_remove(&node_id)?;
        self.links.retain(|_, l| !l.involves_node(node_id));
        self.pins.retain(|_, owner| *owner != node_id);
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&(dyn Node + 'static)> {
        self.nodes.get(&node_id).map(|n| n.as_ref())
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut (dyn Node + 'static)> {
        match self.nodes.get_mut(&node_id) {
            Some(node) => Some(node.as_mut()),
            None => None,
        }
    }

    /// Get a node downcast to its concrete type
    pub fn node_as<T: Node>(&self, node_id: NodeId) -> Option<&T> {
        self.node(node_id)?.as_any().downcast_ref::<T>()
    }

    /// Get a mutable node downcast to its concrete type
    pub fn node_as_mut<T: Node>(&mut self, node_id: NodeId) -> Option<&mut T> {
        self.node_mut(node_id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Whether a node is in the graph
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &(dyn Node + 'static)> {
        self.nodes.values().map(|n| n.as_ref())
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a pin anywhere in the graph
    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        let owner = self.pins.get(&pin_id)?;
        self.nodes.get(owner)?.pin(pin_id)
    }

    /// Get a pin by node and name
    pub fn find_pin(&self, node_id: NodeId, name: &str, direction: PinDirection) -> Option<&Pin> {
        self.node(node_id)?.find_pin(name, direction)
    }

    /// Link an output pin to an input pin
    pub fn link(&mut self, from_pin: PinId, to_pin: PinId) -> Result<LinkId, LinkError> {
        let source = self.pin(from_pin).ok_or(LinkError::PinNotFound(from_pin))?;
        let target = self.pin(to_pin).ok_or(LinkError::PinNotFound(to_pin))?;

        if source.direction() != PinDirection::Output || target.direction() != PinDirection::Input {
            return Err(LinkError::WrongDirection);
        }

        if !source.can_link_to(target) {
            return Err(LinkError::IncompatiblePins {
                from: source.pin_type().to_string(),
                to: target.pin_type().to_string(),
            });
        }

        if source.owner() == target.owner() {
            return Err(LinkError::SelfLoop);
        }

        // Inputs accept a single link
        if self.is_linked(to_pin) {
            return Err(LinkError::PinAlreadyLinked(to_pin));
        }

        let link = Link::new(
            source.owner(),
            from_pin,
            target.owner(),
            to_pin,
            source.is_flow(),
        );
        let id = link.id;
        self.links.insert(id, link);
        Ok(id)
    }

    /// Remove a link
    pub fn unlink(&mut self, link_id: LinkId) -> Option<Link> {
        self.links.shift_remove(&link_id)
    }

    /// Remove every link touching a pin
    pub fn unlink_pin(&mut self, pin_id: PinId) -> Vec<Link> {
        let ids: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.involves_pin(pin_id))
            .map(|l| l.id)
            .collect();
        ids.into_iter().filter_map(|id| self.unlink(id)).collect()
    }

    /// Get a link by ID
    pub fn get_link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get links leaving an output pin
    pub fn links_from(&self, pin_id: PinId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.from_pin == pin_id)
    }

    /// Get the link feeding an input pin
    pub fn link_to(&self, pin_id: PinId) -> Option<&Link> {
        self.links.values().find(|l| l.to_pin == pin_id)
    }

    /// Whether any link touches a pin
    pub fn is_linked(&self, pin_id: PinId) -> bool {
        self.links.values().any(|l| l.involves_pin(pin_id))
    }

    /// Get links involving a node
    pub fn links_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_node(node_id))
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Nodes feeding `node_id` through flow links
    pub fn flow_predecessors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .values()
            .filter(move |l| l.flow && l.to_node == node_id)
            .map(|l| l.from_node)
    }

    /// Nodes fed by `node_id` through flow links
    pub fn flow_successors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .values()
            .filter(move |l| l.flow && l.from_node == node_id)
            .map(|l| l.to_node)
    }

    /// Get the entry node, if exactly one exists
    pub fn entry_node(&self) -> Result<NodeId, GraphError> {
        let mut entries = self
            .nodes
            .values()
            .filter(|n| n.info().kind == NodeKind::EntryPoint);
        let first = entries.next().ok_or(GraphError::NoEntryPoint)?;
        if entries.next().is_some() {
            return Err(GraphError::MultipleEntryPoints);
        }
        Ok(first.id())
    }

    /// Get all exit nodes
    pub fn exit_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(|n| n.info().kind == NodeKind::ExitPoint)
            .map(|n| n.id())
    }

    /// Check the graph can run; returns the entry node.
    ///
    /// Requires exactly one entry node and an exit node reachable from it
    /// through flow links.
    pub fn check_runnable(&self) -> Result<NodeId, GraphError> {
        let entry = self.entry_node()?;
        let exits: HashSet<NodeId> = self.exit_nodes().collect();

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([entry]);
        while let Some(node_id) = queue.pop_front() {
            if exits.contains(&node_id) {
                return Ok(entry);
            }
            if visited.insert(node_id) {
                queue.extend(self.flow_successors(node_id));
            }
        }
        Err(GraphError::NoReachableExit)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .finish()
    }
}

/// Error when creating a link
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    /// Pin not found
    #[error("Pin not found: {0:?}")]
    PinNotFound(PinId),

    /// Source is not an output or target is not an input
    #[error("Links run from an output pin to an input pin")]
    WrongDirection,

    /// Incompatible pin types
    #[error("Incompatible pin types: {from} -> {to}")]
    IncompatiblePins {
        /// Source type
        from: String,
        /// Target type
        to: String,
    },

    /// Input pin is already linked
    #[error("Pin already linked: {0:?}")]
    PinAlreadyLinked(PinId),

    /// Both pins belong to the same node
    #[error("Self-loop not allowed")]
    SelfLoop,
}

/// Structural graph errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A node with this ID already exists
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No entry node
    #[error("Graph has no entry point")]
    NoEntryPoint,

    /// More than one entry node
    #[error("Graph has more than one entry point")]
    MultipleEntryPoints,

    /// No exit node reachable from the entry
    #[error("No exit point is reachable from the entry point")]
    NoReachableExit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_nodes::{CounterNode, EndNode, PassNode, StartNode};
    use crate::node::NodeType;

    fn add<T: NodeType>(graph: &mut Graph) -> NodeId {
        graph.add_node(Box::new(T::create(NodeId::new()))).unwrap()
    }

    fn pin(graph: &Graph, node: NodeId, name: &str, direction: PinDirection) -> PinId {
        graph.find_pin(node, name, direction).unwrap().id()
    }

    #[test]
    fn test_link_validation() {
        let mut graph = Graph::new("test");
        let start = add::<StartNode>(&mut graph);
        let pass = add::<PassNode>(&mut graph);
        let counter = add::<CounterNode>(&mut graph);

        let start_exit = pin(&graph, start, "Exit", PinDirection::Output);
        let pass_enter = pin(&graph, pass, "Enter", PinDirection::Input);
        let pass_in = pin(&graph, pass, "In", PinDirection::Input);
        let counter_out = pin(&graph, counter, "Out", PinDirection::Output);

        // Flow never joins data
        assert!(matches!(
            graph.link(start_exit, pass_in),
            Err(LinkError::IncompatiblePins { .. })
        ));
        // Direction matters
        assert_eq!(graph.link(pass_enter, start_exit), Err(LinkError::WrongDirection));

        graph.link(start_exit, pass_enter).unwrap();
        graph.link(counter_out, pass_in).unwrap();

        // Inputs take one link
        let other = add::<CounterNode>(&mut graph);
        let other_out = pin(&graph, other, "Out", PinDirection::Output);
        assert_eq!(graph.link(other_out, pass_in), Err(LinkError::PinAlreadyLinked(pass_in)));
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = Graph::new("test");
        let pass = add::<PassNode>(&mut graph);
        let out = pin(&graph, pass, "Out", PinDirection::Output);
        let inp = pin(&graph, pass, "In", PinDirection::Input);
        assert_eq!(graph.link(out, inp), Err(LinkError::SelfLoop));
    }

    #[test]
    fn test_remove_node_drops_links() {
        let mut graph = Graph::new("test");
        let start = add::<StartNode>(&mut graph);
        let end = add::<EndNode>(&mut graph);
        let exit = pin(&graph, start, "Exit", PinDirection::Output);
        let enter = pin(&graph, end, "End", PinDirection::Input);
        graph.link(exit, enter).unwrap();

        let removed = graph.remove_node(end).unwrap();
        assert_eq!(removed.id(), end);
        assert_eq!(graph.link_count(), 0);
        assert!(graph.pin(enter).is_none());
        assert!(!graph.is_linked(exit));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = Graph::new("test");
        let id = NodeId::new();
        graph.add_node(Box::new(StartNode::create(id))).unwrap();
        assert_eq!(
            graph.add_node(Box::new(StartNode::create(id))),
            Err(GraphError::DuplicateNode(id))
        );
    }

    #[test]
    fn test_check_runnable() {
        let mut graph = Graph::new("test");
        assert_eq!(graph.check_runnable(), Err(GraphError::NoEntryPoint));

        let start = add::<StartNode>(&mut graph);
        let end = add::<EndNode>(&mut graph);
        assert_eq!(graph.check_runnable(), Err(GraphError::NoReachableExit));

        let exit = pin(&graph, start, "Exit", PinDirection::Output);
        let enter = pin(&graph, end, "End", PinDirection::Input);
        graph.link(exit, enter).unwrap();
        assert_eq!(graph.check_runnable(), Ok(start));

        add::<StartNode>(&mut graph);
        assert_eq!(graph.check_runnable(), Err(GraphError::MultipleEntryPoints));
    }

    #[test]
    fn test_downcast() {
        let mut graph = Graph::new("test");
        let counter = add::<CounterNode>(&mut graph);
        assert!(graph.node_as::<CounterNode>(counter).is_some());
        assert!(graph.node_as::<StartNode>(counter).is_none());

        graph.node_as_mut::<CounterNode>(counter).unwrap().value = 4.0;
        assert_eq!(graph.node_as::<CounterNode>(counter).unwrap().value, 4.0);
    }
}
