// SPDX-License-Identifier: MIT OR Apache-2.0
//! How the runner answers change notifications.

use blueprint_graph::{ChangeKind, ChangeObserver, Directive, NodeId};

/// Wires inserted nodes and reruns the graph after parameter or setting
/// changes; everything else is ignored
#[derive(Debug, Default)]
pub struct HostPolicy;

impl HostPolicy {
    /// Create the policy
    pub fn new() -> Self {
        Self
    }

    /// Directive for a change kind
    pub fn directive(kind: ChangeKind) -> Directive {
        match kind {
            ChangeKind::NodeInserted => Directive::AutoLink,
            ChangeKind::ParamChanged | ChangeKind::SettingChanged => Directive::RunAgain,
            ChangeKind::Link
            | ChangeKind::Unlink
            | ChangeKind::NodeAppended
            | ChangeKind::NodeDeleted => Directive::Nothing,
        }
    }
}

impl ChangeObserver for HostPolicy {
    fn on_changed(&mut self, kind: ChangeKind, node_name: &str, node_id: NodeId) -> Directive {
        let directive = Self::directive(kind);
        tracing::debug!("{:?} on '{}' ({}) -> {:?}", kind, node_name, node_id, directive);
        directive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_graph::{Blueprint, PinValue, Reaction, RunStatus};
    use blueprint_nodes::builtin_registry;

    #[test]
    fn test_policy_table() {
        assert_eq!(HostPolicy::directive(ChangeKind::NodeInserted), Directive::AutoLink);
        assert_eq!(HostPolicy::directive(ChangeKind::ParamChanged), Directive::RunAgain);
        assert_eq!(HostPolicy::directive(ChangeKind::SettingChanged), Directive::RunAgain);
        for kind in [
            ChangeKind::Link,
            ChangeKind::Unlink,
            ChangeKind::NodeAppended,
            ChangeKind::NodeDeleted,
        ] {
            assert_eq!(HostPolicy::directive(kind), Directive::Nothing);
        }
    }

    #[test]
    fn test_session_follows_policy() {
        let mut session = Blueprint::new(builtin_registry());
        session.set_observer(HostPolicy::new());

        let (_, reaction) = session.insert_node("Start", [0.0, 0.0]).unwrap();
        assert!(matches!(reaction, Reaction::AutoLinked(_)));
        let (end, reaction) = session.insert_node("End", [200.0, 0.0]).unwrap();
        match reaction {
            Reaction::AutoLinked(report) => assert_eq!(report.created.len(), 1),
            other => panic!("expected auto-link, got {other:?}"),
        }

        let (fusion, reaction) = session.append_node("Move Transform", [100.0, 100.0]).unwrap();
        assert!(matches!(reaction, Reaction::Nothing));

        let reaction = session.set_input(fusion, "Pos", PinValue::Float(0.5)).unwrap();
        match reaction {
            Reaction::Ran(report) => {
                assert_eq!(report.status, RunStatus::Completed);
                assert_eq!(report.path.last(), Some(&end));
            }
            other => panic!("expected a rerun, got {other:?}"),
        }
    }
}
