// SPDX-License-Identifier: MIT OR Apache-2.0
//! Automatic linking of freshly inserted nodes.
//!
//! Flow first: a node advertising both a free input and a free output flow
//! pin is spliced into the flow link nearest to it. Otherwise each advertised
//! flow pin is attached to the nearest node with a free counterpart. Data
//! pins are then matched against the node's flow neighbours, nearest first.
//! Existing links are never replaced, and finding nothing is not an error.

use crate::graph::{Graph, GraphError};
use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId};
use crate::pin::{Pin, PinDirection, PinId};
use std::collections::{HashSet, VecDeque};

/// Links changed by [`auto_link`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoLinkReport {
    /// Links created, in creation order
    pub created: Vec<LinkId>,
    /// Flow link replaced by a splice
    pub removed: Option<Link>,
}

impl AutoLinkReport {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_none()
    }
}

/// Link `node_id` into the graph around it
pub fn auto_link(graph: &mut Graph, node_id: NodeId) -> Result<AutoLinkReport, GraphError> {
    let node = graph
        .node(node_id)
        .ok_or(GraphError::NodeNotFound(node_id))?;
    let position = node.base().position;

    let free = |pin: Option<&Pin>| pin.filter(|p| !graph.is_linked(p.id())).map(Pin::id);
    let free_all = |pins: Vec<&Pin>| -> Vec<PinId> {
        pins.into_iter()
            .filter(|p| !p.is_flow() && !graph.is_linked(p.id()))
            .map(Pin::id)
            .collect()
    };
    let flow_in = free(node.auto_link_input_flow_pin());
    let flow_out = free(node.auto_link_output_flow_pin());
    let data_in = free_all(node.auto_link_input_data_pins());
    let data_out = free_all(node.auto_link_output_data_pins());

    let mut report = AutoLinkReport::default();
    link_flow(graph, node_id, position, flow_in, flow_out, &mut report);
    for pin in data_in {
        link_input_data(graph, node_id, pin, &mut report);
    }
    for pin in data_out {
        link_output_data(graph, node_id, pin, &mut report);
    }

    tracing::debug!(
        "Auto-linked node {}: {} links created, splice: {}",
        node_id,
        report.created.len(),
        report.removed.is_some()
    );
    Ok(report)
}

fn distance_sq(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn position_of(graph: &Graph, node_id: NodeId) -> [f32; 2] {
    graph
        .node(node_id)
        .map(|n| n.base().position)
        .unwrap_or_default()
}

fn link_flow(
    graph: &mut Graph,
    node_id: NodeId,
    position: [f32; 2],
    flow_in: Option<PinId>,
    flow_out: Option<PinId>,
    report: &mut AutoLinkReport,
) {
    if let (Some(input), Some(output)) = (flow_in, flow_out) {
        if let Some(link) = nearest_flow_link(graph, node_id, position) {
            splice(graph, link, input, output, report);
            return;
        }
    }

    if let Some(input) = flow_in {
        let source = nearest_free_flow_pin(graph, node_id, position, PinDirection::Output);
        if let Some(source) = source {
            try_link(graph, source, input, report);
        }
    }
    if let Some(output) = flow_out {
        let target = nearest_free_flow_pin(graph, node_id, position, PinDirection::Input);
        if let Some(target) = target {
            try_link(graph, output, target, report);
        }
    }
}

/// Flow link whose endpoint midpoint is closest; the earliest link wins ties
fn nearest_flow_link(graph: &Graph, node_id: NodeId, position: [f32; 2]) -> Option<Link> {
    let mut best: Option<(f32, &Link)> = None;
    for link in graph.links().filter(|l| l.flow && !l.involves_node(node_id)) {
        let from = position_of(graph, link.from_node);
        let to = position_of(graph, link.to_node);
        let mid = [(from[0] + to[0]) * 0.5, (from[1] + to[1]) * 0.5];
        let d = distance_sq(mid, position);
        if best.map_or(true, |(best_d, _)| d < best_d) {
            best = Some((d, link));
        }
    }
    best.map(|(_, link)| link.clone())
}

/// Preferred flow pin of the closest other node, if it is free
fn nearest_free_flow_pin(
    graph: &Graph,
    node_id: NodeId,
    position: [f32; 2],
    direction: PinDirection,
) -> Option<PinId> {
    let mut best: Option<(f32, PinId)> = None;
    for other in graph.nodes().filter(|n| n.id() != node_id) {
        let pin = match direction {
            PinDirection::Input => other.auto_link_input_flow_pin(),
            PinDirection::Output => other.auto_link_output_flow_pin(),
        };
        let Some(pin) = pin.filter(|p| !graph.is_linked(p.id())) else {
            continue;
        };
        let d = distance_sq(other.base().position, position);
        if best.map_or(true, |(best_d, _)| d < best_d) {
            best = Some((d, pin.id()));
        }
    }
    best.map(|(_, pin)| pin)
}

fn splice(
    graph: &mut Graph,
    link: Link,
    input: PinId,
    output: PinId,
    report: &mut AutoLinkReport,
) {
    graph.unlink(link.id);
    let head = graph.link(link.from_pin, input);
    let tail = graph.link(output, link.to_pin);

    match (head, tail) {
        (Ok(head), Ok(tail)) => {
            report.created.extend([head, tail]);
            report.removed = Some(link);
        }
        (head, tail) => {
            tracing::warn!("Splice into link {:?} failed, restoring it", link.id);
            for id in [head.ok(), tail.ok()].into_iter().flatten() {
                graph.unlink(id);
            }
            if let Err(e) = graph.link(link.from_pin, link.to_pin) {
                tracing::warn!("Failed to restore link {:?}: {}", link.id, e);
            }
        }
    }
}

fn try_link(graph: &mut Graph, from: PinId, to: PinId, report: &mut AutoLinkReport) -> bool {
    match graph.link(from, to) {
        Ok(id) => {
            report.created.push(id);
            true
        }
        Err(e) => {
            tracing::debug!("Auto-link candidate rejected: {}", e);
            false
        }
    }
}

/// Data pins a neighbour offers: its advertised pins, or every data pin when
/// it advertises none
fn offered_pins(node: &dyn Node, direction: PinDirection) -> Vec<&Pin> {
    let advertised = match direction {
        PinDirection::Input => node.auto_link_input_data_pins(),
        PinDirection::Output => node.auto_link_output_data_pins(),
    };
    let pins = if advertised.is_empty() {
        match direction {
            PinDirection::Input => node.input_pins(),
            PinDirection::Output => node.output_pins(),
        }
    } else {
        advertised
    };
    pins.into_iter().filter(|p| !p.is_flow()).collect()
}

/// Flow neighbours of `node_id` in breadth-first order, nearest first
fn flow_neighbours(graph: &Graph, node_id: NodeId, upstream: bool) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut visited = HashSet::from([node_id]);
    let mut queue = VecDeque::from([node_id]);

    while let Some(current) = queue.pop_front() {
        let next: Vec<NodeId> = if upstream {
            graph.flow_predecessors(current).collect()
        } else {
            graph.flow_successors(current).collect()
        };
        for neighbour in next {
            if visited.insert(neighbour) {
                order.push(neighbour);
                queue.push_back(neighbour);
            }
        }
    }
    order
}

fn link_input_data(graph: &mut Graph, node_id: NodeId, input: PinId, report: &mut AutoLinkReport) {
    let Some(target_type) = graph.pin(input).map(|p| p.pin_type().clone()) else {
        return;
    };

    let candidate = flow_neighbours(graph, node_id, true)
        .into_iter()
        .filter_map(|id| graph.node(id))
        .flat_map(|n| offered_pins(n, PinDirection::Output))
        .find(|p| !graph.is_linked(p.id()) && p.pin_type().matches(&target_type))
        .map(Pin::id);

    if let Some(source) = candidate {
        try_link(graph, source, input, report);
    }
}

fn link_output_data(graph: &mut Graph, node_id: NodeId, output: PinId, report: &mut AutoLinkReport) {
    let Some(source_type) = graph.pin(output).map(|p| p.pin_type().clone()) else {
        return;
    };

    let candidate = flow_neighbours(graph, node_id, false)
        .into_iter()
        .filter_map(|id| graph.node(id))
        .flat_map(|n| offered_pins(n, PinDirection::Input))
        .find(|p| !graph.is_linked(p.id()) && source_type.matches(p.pin_type()))
        .map(Pin::id);

    if let Some(target) = candidate {
        try_link(graph, output, target, report);
    }
}
