// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in Blueprint nodes.
//!
//! | Node | Catalog |
//! |------|---------|
//! | [`StartNode`] | `System` |
//! | [`EndNode`] | `System` |
//! | [`FloatNode`] | `Constant` |
//! | [`MatSourceNode`] | `Media#Source` |
//! | [`BranchNode`] | `Flow` |
//! | [`MoveFusionNode`] | `Fusion#Video#Move` |

pub mod blit;
pub mod branch;
pub mod constant;
pub mod fusion;
pub mod system;

pub use blit::{BlitJob, Layer, MatBlitter};
pub use branch::BranchNode;
pub use constant::{FloatNode, MatSourceNode, Pattern};
pub use fusion::{MoveFusionNode, MoveType};
pub use system::{EndNode, StartNode};

use blueprint_graph::NodeRegistry;

/// Register every built-in node type
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    registry.register::<StartNode>();
    registry.register::<EndNode>();
    registry.register::<FloatNode>();
    registry.register::<MatSourceNode>();
    registry.register::<BranchNode>();
    registry.register::<MoveFusionNode>();
}

/// Create a registry holding the built-in node types
pub fn builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_builtin_nodes(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_graph::{
        auto_link, codec, Blueprint, ChangeKind, Directive, Executor, NodeId, PinDirection,
        RunStatus,
    };

    #[test]
    fn test_builtin_catalog() {
        let registry = builtin_registry();
        assert_eq!(registry.types().count(), 6);
        assert!(registry.contains("Move Transform"));

        let system: Vec<_> = registry.types_in_catalog("System").map(|t| t.name).collect();
        assert_eq!(system, vec!["Start", "End"]);
        let fusion: Vec<_> = registry.types_in_catalog("Fusion#Video").collect();
        assert_eq!(fusion.len(), 1);
    }

    // Builds Start -> Move -> End by inserting nodes the way an editor does
    fn transition_session() -> (Blueprint, NodeId, NodeId) {
        let mut session = Blueprint::new(builtin_registry());
        session.set_observer(|kind: ChangeKind, _: &str, _: NodeId| match kind {
            ChangeKind::NodeInserted => Directive::AutoLink,
            _ => Directive::Nothing,
        });

        let (start, _) = session.insert_node("Start", [0.0, 0.0]).unwrap();
        let (end, _) = session.insert_node("End", [400.0, 0.0]).unwrap();
        let start_pin = session
            .graph()
            .find_pin(start, "Start", PinDirection::Output)
            .unwrap()
            .id();
        assert!(session.graph().is_linked(start_pin));
        let (fusion, _) = session.insert_node("Move Transform", [200.0, 0.0]).unwrap();
        (session, fusion, end)
    }

    #[test]
    fn test_inserted_fusion_is_spliced() {
        let (session, fusion, end) = transition_session();
        let graph = session.graph();

        let enter = graph.find_pin(fusion, "Enter", PinDirection::Input).unwrap();
        let exit = graph.find_pin(fusion, "Exit", PinDirection::Output).unwrap();
        assert!(graph.is_linked(enter.id()));
        assert_eq!(graph.links_from(exit.id()).next().unwrap().to_node, end);

        // Out feeds the End frame input through flow successors
        let input = graph.find_pin(end, "In", PinDirection::Input).unwrap();
        assert_eq!(graph.link_to(input.id()).unwrap().from_node, fusion);
    }

    #[test]
    fn test_sources_wire_into_fusion() {
        let (mut session, fusion, end) = transition_session();
        let (a, _) = session.append_node("Mat Source", [100.0, 100.0]).unwrap();
        let (b, _) = session.append_node("Mat Source", [100.0, 200.0]).unwrap();
        session.link_by_name((a, "Out"), (fusion, "In 1")).unwrap();
        session.link_by_name((b, "Out"), (fusion, "In 2")).unwrap();
        session
            .set_input(fusion, "Pos", blueprint_graph::PinValue::Float(0.5))
            .unwrap();

        let report = session.run().unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.errors.is_empty());
        let frame = session.graph().node_as::<EndNode>(end).unwrap().frame();
        assert_eq!((frame.width, frame.height), (64, 64));

        // Round trip through the document keeps the wiring
        let doc = session.save();
        let (graph, load) = codec::load_graph(&doc, session.registry()).unwrap();
        assert!(load.is_clean());
        assert_eq!(graph.link_count(), session.graph().link_count());
        let executor = Executor::new(&graph);
        assert!(executor.run(&mut executor.context()).unwrap().is_clean());
    }

    #[test]
    fn test_auto_link_end_after_fusion() {
        let registry = builtin_registry();
        let mut graph = blueprint_graph::Graph::new("Auto");
        let fusion = graph
            .add_node(registry.create_node("Move Transform", NodeId::new()).unwrap())
            .unwrap();
        let mut end = registry.create_node("End", NodeId::new()).unwrap();
        end.base_mut().position = [200.0, 0.0];
        let end = graph.add_node(end).unwrap();

        let report = auto_link(&mut graph, end).unwrap();
        assert_eq!(report.created.len(), 2);
        for name in ["End", "In"] {
            let pin = graph.find_pin(end, name, PinDirection::Input).unwrap();
            assert_eq!(graph.link_to(pin.id()).unwrap().from_node, fusion);
        }
    }
}
