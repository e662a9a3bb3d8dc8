// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node contract, common node state and the node type registry.

use crate::codec::LoadError;
use crate::context::{Context, ExecResult};
use crate::document::{IdRemap, LoadStatus, NodeDocument};
use crate::pin::{Pin, PinDirection, PinId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a node type in traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Ordinary node
    Internal,
    /// Where a run starts; a runnable graph has exactly one
    EntryPoint,
    /// Where a run ends; clears the call stack when executed
    ExitPoint,
}

/// Static description of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTypeInfo {
    /// Unique type name, used as the factory key in documents
    pub name: &'static str,
    /// Document version written by this type
    pub version: u32,
    /// Traversal role
    pub kind: NodeKind,
    /// Catalog path, segments separated by `#` (e.g. `Fusion#Video#Move`)
    pub catalog: &'static str,
}

/// Common state every node carries
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBase {
    id: NodeId,
    /// Display name
    pub name: String,
    /// Position on the canvas
    pub position: [f32; 2],
    /// Whether the node is enabled; disabled behavior is per node type
    pub enabled: bool,
}

impl NodeBase {
    /// Create the base state for a node
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: [0.0, 0.0],
            enabled: true,
        }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Restore common fields.
    ///
    /// A document for another type, or written by a newer version of this
    /// type, is rejected. Absent fields keep their current value.
    pub fn load(
        &mut self,
        info: &NodeTypeInfo,
        doc: &NodeDocument,
        status: &mut LoadStatus,
    ) -> Result<(), LoadError> {
        if let Some(found) = doc.type_name() {
            if found != info.name {
                return Err(LoadError::TypeMismatch {
                    expected: info.name.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let mut version = info.version;
        doc.read(NodeDocument::VERSION, &mut version, self.id, status);
        if version > info.version {
            return Err(LoadError::NodeVersion {
                type_name: info.name.to_string(),
                found: version,
                supported: info.version,
            });
        }

        doc.read(NodeDocument::NAME, &mut self.name, self.id, status);
        doc.read(NodeDocument::POSITION, &mut self.position, self.id, status);
        doc.read(NodeDocument::ENABLED, &mut self.enabled, self.id, status);
        Ok(())
    }

    /// Persist common fields, translating the ID through `remap`
    pub fn save(&self, info: &NodeTypeInfo, doc: &mut NodeDocument, remap: &IdRemap) {
        doc.set(NodeDocument::TYPE, info.name);
        doc.set(NodeDocument::ID, remap.resolve(self.id).to_string());
        doc.set(NodeDocument::VERSION, info.version);
        doc.set(NodeDocument::NAME, self.name.as_str());
        doc.set(
            NodeDocument::POSITION,
            vec![f64::from(self.position[0]), f64::from(self.position[1])],
        );
        doc.set(NodeDocument::ENABLED, self.enabled);
    }
}

/// Downcasting support for node trait objects
pub trait AsAny: Any {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as `Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of computation or control in a graph.
///
/// Nodes are shared by every context running over the graph, so `execute`
/// takes `&self`. State that changes during a run lives on pins or behind
/// the node's own locks.
pub trait Node: AsAny + Send + Sync {
    /// Static type description
    fn info(&self) -> &'static NodeTypeInfo;

    /// Common state
    fn base(&self) -> &NodeBase;

    /// Mutable common state
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Node ID
    fn id(&self) -> NodeId {
        self.base().id()
    }

    /// Display name
    fn name(&self) -> &str {
        &self.base().name
    }

    /// Whether the node is enabled
    fn is_enabled(&self) -> bool {
        self.base().enabled
    }

    /// Input pins, flow and data interleaved, in declaration order
    fn input_pins(&self) -> Vec<&Pin>;

    /// Output pins in declaration order
    fn output_pins(&self) -> Vec<&Pin> {
        Vec::new()
    }

    /// All pins, inputs first
    fn pins(&self) -> Vec<&Pin> {
        let mut pins = self.input_pins();
        pins.extend(self.output_pins());
        pins
    }

    /// Find an owned pin by ID
    fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.pins().into_iter().find(|p| p.id() == pin_id)
    }

    /// Find an owned pin by name and direction
    fn find_pin(&self, name: &str, direction: PinDirection) -> Option<&Pin> {
        let pins = match direction {
            PinDirection::Input => self.input_pins(),
            PinDirection::Output => self.output_pins(),
        };
        pins.into_iter().find(|p| p.name() == name)
    }

    /// Perform this node's effect.
    ///
    /// `entry` is the input flow pin traversal arrived on, or `None` for the
    /// entry node and for data pulls. Returns the output flow pin to follow,
    /// or `None` to end the branch. Node-level failures are reported through
    /// [`Context::report_error`]; `Err` only carries fatal conditions raised
    /// by the context, such as cyclic execution.
    fn execute(&self, ctx: &mut Context<'_>, entry: Option<PinId>, threading: bool) -> ExecResult;

    /// Called on every node when a run starts
    fn reset(&self, _ctx: &mut Context<'_>) {}

    /// Called when the active run is halted externally; must not block
    fn on_stop(&self) {}

    /// Restore node configuration. Overrides restore the base first.
    fn load(&mut self, doc: &NodeDocument, status: &mut LoadStatus) -> Result<(), LoadError> {
        let info = self.info();
        self.base_mut().load(info, doc, status)
    }

    /// Persist node configuration. Overrides save the base first.
    fn save(&self, doc: &mut NodeDocument, remap: &IdRemap) {
        self.base().save(self.info(), doc, remap);
    }

    /// Input flow pin preferred by auto-linking
    fn auto_link_input_flow_pin(&self) -> Option<&Pin> {
        None
    }

    /// Output flow pin preferred by auto-linking
    fn auto_link_output_flow_pin(&self) -> Option<&Pin> {
        None
    }

    /// Input data pins offered to auto-linking, in priority order
    fn auto_link_input_data_pins(&self) -> Vec<&Pin> {
        Vec::new()
    }

    /// Output data pins offered to auto-linking, in priority order
    fn auto_link_output_data_pins(&self) -> Vec<&Pin> {
        Vec::new()
    }
}

/// A concrete node type that can be created by the registry
pub trait NodeType: Node + Sized {
    /// Static type description
    fn type_info() -> &'static NodeTypeInfo;

    /// Create a node with default configuration
    fn create(id: NodeId) -> Self;
}

/// Factory creating a node with the given ID
pub type NodeFactory = fn(NodeId) -> Box<dyn Node>;

#[derive(Debug)]
struct RegisteredType {
    info: &'static NodeTypeInfo,
    factory: NodeFactory,
}

/// Registry of available node types, keyed by type name
#[derive(Debug)]
pub struct NodeRegistry {
    types: IndexMap<&'static str, RegisteredType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register<T: NodeType>(&mut self) {
        self.register_with(T::type_info(), |id| Box::new(T::create(id)));
    }

    /// Register a type description with an explicit factory.
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_with(&mut self, info: &'static NodeTypeInfo, factory: NodeFactory) {
        if self
            .types
            .insert(info.name, RegisteredType { info, factory })
            .is_some()
        {
            tracing::debug!("Replaced node type registration: {}", info.name);
        }
    }

    /// Get a node type by name
    pub fn get(&self, name: &str) -> Option<&'static NodeTypeInfo> {
        self.types.get(name).map(|t| t.info)
    }

    /// Whether a type name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &'static NodeTypeInfo> + '_ {
        self.types.values().map(|t| t.info)
    }

    /// Get types whose catalog path starts with `prefix`
    pub fn types_in_catalog<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'static NodeTypeInfo> + 'a {
        self.types().filter(move |t| t.catalog.starts_with(prefix))
    }

    /// Create a node from a type name
    pub fn create_node(&self, name: &str, id: NodeId) -> Option<Box<dyn Node>> {
        self.types.get(name).map(|t| (t.factory)(id))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
