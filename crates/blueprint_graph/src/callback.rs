// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications sent to the host.
//!
//! Every edit of a [`Blueprint`](crate::Blueprint) is reported to a single
//! observer, which answers with a [`Directive`] telling the session what to
//! do next.

use crate::node::NodeId;
use std::fmt;

/// Kind of edit being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A link was created
    Link,
    /// A link was removed
    Unlink,
    /// A node was inserted and may be wired into its surroundings
    NodeInserted,
    /// A node was appended without being wired
    NodeAppended,
    /// A node was deleted
    NodeDeleted,
    /// A node parameter or input value changed
    ParamChanged,
    /// A node setting changed
    SettingChanged,
}

/// What the session should do after a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Directive {
    /// Nothing
    #[default]
    Nothing,
    /// Auto-link the changed node
    AutoLink,
    /// Run the graph again
    RunAgain,
}

/// Receives change notifications
pub trait ChangeObserver: Send {
    /// Called after every edit; `node_name` and `node_id` identify the node
    /// the edit concerns
    fn on_changed(&mut self, kind: ChangeKind, node_name: &str, node_id: NodeId) -> Directive;
}

impl<F> ChangeObserver for F
where
    F: FnMut(ChangeKind, &str, NodeId) -> Directive + Send,
{
    fn on_changed(&mut self, kind: ChangeKind, node_name: &str, node_id: NodeId) -> Directive {
        self(kind, node_name, node_id)
    }
}

/// Holds the observer and forwards notifications to it
#[derive(Default)]
pub struct CallbackDispatcher {
    observer: Option<Box<dyn ChangeObserver>>,
}

impl CallbackDispatcher {
    /// Create a dispatcher with no observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the observer, replacing any previous one
    pub fn set_observer(&mut self, observer: impl ChangeObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Remove the observer
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Whether an observer is installed
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Report a change; without an observer the answer is [`Directive::Nothing`]
    pub fn notify(&mut self, kind: ChangeKind, node_name: &str, node_id: NodeId) -> Directive {
        let directive = match self.observer.as_mut() {
            Some(observer) => observer.on_changed(kind, node_name, node_id),
            None => Directive::Nothing,
        };
        tracing::trace!("{:?} on '{}' -> {:?}", kind, node_name, directive);
        directive
    }
}

impl fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("has_observer", &self.has_observer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_observer_means_nothing() {
        let mut dispatcher = CallbackDispatcher::new();
        assert_eq!(
            dispatcher.notify(ChangeKind::ParamChanged, "Pass", NodeId::new()),
            Directive::Nothing
        );
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        let mut dispatcher = CallbackDispatcher::new();
        dispatcher.set_observer(|kind: ChangeKind, _: &str, _: NodeId| match kind {
            ChangeKind::NodeInserted => Directive::AutoLink,
            ChangeKind::ParamChanged => Directive::RunAgain,
            _ => Directive::Nothing,
        });

        let id = NodeId::new();
        for kind in [ChangeKind::NodeInserted, ChangeKind::ParamChanged, ChangeKind::Link] {
            seen.push(dispatcher.notify(kind, "Node", id));
        }
        assert_eq!(
            seen,
            vec![Directive::AutoLink, Directive::RunAgain, Directive::Nothing]
        );

        dispatcher.clear_observer();
        assert!(!dispatcher.has_observer());
    }
}
