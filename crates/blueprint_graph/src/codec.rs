// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph persistence.
//!
//! A graph is stored as a JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "name": "Filter",
//!   "nodes": [{ "type": "Start", "id": "…", "version": 1, "name": "Start", … }],
//!   "links": [{ "from_node": "…", "from_pin": "Exit", "to_node": "…", "to_pin": "End" }]
//! }
//! ```
//!
//! Links name their pins, so pin IDs never need to be stable across saves.
//! Loading is lenient: anything that cannot be restored is dropped and
//! reported as a [`LoadWarning`].

use crate::document::{IdRemap, LoadStatus, NodeDocument};
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeRegistry};
use crate::pin::PinDirection;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

/// Current graph document version
pub const FORMAT_VERSION: u32 = 1;

/// Fatal document problems
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document root is not an object
    #[error("Graph document must be a JSON object")]
    NotAnObject,

    /// Document written by a newer format
    #[error("Graph document version {found} is newer than supported version {supported}")]
    DocumentVersion {
        /// Version in the document
        found: u64,
        /// Newest readable version
        supported: u32,
    },

    /// A node document for a different type
    #[error("Expected a '{expected}' node document, found '{found}'")]
    TypeMismatch {
        /// Type loading the document
        expected: String,
        /// Type named in the document
        found: String,
    },

    /// A node document written by a newer version of its type
    #[error("Node type '{type_name}' version {found} is newer than supported version {supported}")]
    NodeVersion {
        /// Node type
        type_name: String,
        /// Version in the document
        found: u32,
        /// Newest readable version
        supported: u32,
    },

    /// Reading the document failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Recovered problems found while loading
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadWarning {
    /// No top-level version; the current version was assumed
    #[error("Document has no version, assuming the current version")]
    MissingVersion,

    /// A top-level field has the wrong shape
    #[error("Document field '{field}' is malformed")]
    MalformedDocument {
        /// Field name
        field: String,
    },

    /// A node entry could not be read
    #[error("Node entry {index} is malformed: {reason}")]
    MalformedNode {
        /// Position in the node list
        index: usize,
        /// What was wrong
        reason: String,
    },

    /// A node entry repeats the ID of an earlier entry; it was given a fresh
    /// ID and links naming the repeated ID keep the earlier node
    #[error("Node entry {index} repeats node ID {node}")]
    DuplicateNodeId {
        /// Position in the node list
        index: usize,
        /// Repeated document ID
        node: NodeId,
    },

    /// A node entry names a type the registry does not know
    #[error("Unknown node type '{type_name}' (entry {index})")]
    UnknownNodeType {
        /// Position in the node list
        index: usize,
        /// Type name
        type_name: String,
    },

    /// A node refused its document
    #[error("Node entry {index} ('{type_name}') rejected: {reason}")]
    NodeRejected {
        /// Position in the node list
        index: usize,
        /// Type name
        type_name: String,
        /// Load error
        reason: String,
    },

    /// A node field kept its default because the stored value was unusable
    #[error("Node {node} field '{field}' is malformed: {reason}")]
    MalformedField {
        /// Node
        node: NodeId,
        /// Field name
        field: String,
        /// What was wrong
        reason: String,
    },

    /// A link entry could not be read
    #[error("Link entry {index} is malformed: {reason}")]
    MalformedLink {
        /// Position in the link list
        index: usize,
        /// What was wrong
        reason: String,
    },

    /// A link refers to a node or pin that was not loaded
    #[error("Link entry {index} refers to a missing {missing}")]
    DanglingLink {
        /// Position in the link list
        index: usize,
        /// Description of the missing endpoint
        missing: String,
    },

    /// The graph refused a link
    #[error("Link entry {index} rejected: {reason}")]
    LinkRejected {
        /// Position in the link list
        index: usize,
        /// Link error
        reason: String,
    },
}

/// Summary of a load or merge
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Recovered problems, in document order
    pub warnings: Vec<LoadWarning>,
    /// Document IDs that were replaced by fresh ones
    pub remap: IdRemap,
    /// Nodes added to the graph, in document order
    pub nodes: Vec<NodeId>,
    /// Number of links added
    pub links: usize,
}

impl LoadReport {
    /// Whether everything in the document was restored
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, warning: LoadWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Serialize a graph
pub fn save_graph(graph: &Graph) -> Value {
    save_graph_with(graph, &IdRemap::new())
}

/// Serialize a graph, writing node IDs through `remap`
pub fn save_graph_with(graph: &Graph, remap: &IdRemap) -> Value {
    let nodes: Vec<Value> = graph
        .nodes()
        .map(|node| {
            let mut doc = NodeDocument::new();
            Node::save(node, &mut doc, remap);
            doc.into_value()
        })
        .collect();

    let links: Vec<Value> = graph
        .links()
        .filter_map(|link| {
            let from = graph.pin(link.from_pin)?;
            let to = graph.pin(link.to_pin)?;
            Some(json!({
                "from_node": remap.resolve(link.from_node).to_string(),
                "from_pin": from.name(),
                "to_node": remap.resolve(link.to_node).to_string(),
                "to_pin": to.name(),
            }))
        })
        .collect();

    json!({
        "version": FORMAT_VERSION,
        "name": graph.name,
        "nodes": nodes,
        "links": links,
    })
}

/// Build a new graph from a document
pub fn load_graph(doc: &Value, registry: &NodeRegistry) -> Result<(Graph, LoadReport), LoadError> {
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Untitled");
    let mut graph = Graph::new(name);
    let report = merge_graph(&mut graph, doc, registry)?;
    Ok((graph, report))
}

/// Add a document's nodes and links to an existing graph.
///
/// Node IDs already present in `graph` are replaced by fresh IDs; the
/// replacements are returned in the report's remap and used to translate
/// link endpoints. An ID repeated within the document is reported, and only
/// its first node can be reached by links.
pub fn merge_graph(
    graph: &mut Graph,
    doc: &Value,
    registry: &NodeRegistry,
) -> Result<LoadReport, LoadError> {
    let root = doc.as_object().ok_or(LoadError::NotAnObject)?;
    let mut report = LoadReport::default();

    check_version(root, &mut report)?;

    // Document ID -> ID in the graph, for nodes loaded from this document
    let mut loaded: HashMap<NodeId, NodeId> = HashMap::new();
    for (index, entry) in list(root, "nodes", &mut report).iter().enumerate() {
        if let Some(id) = load_node(graph, registry, index, entry, &mut loaded, &mut report) {
            report.nodes.push(id);
        }
    }

    for (index, entry) in list(root, "links", &mut report).iter().enumerate() {
        load_link(graph, &loaded, index, entry, &mut report);
    }

    tracing::debug!(
        "Loaded {} nodes and {} links into '{}' with {} warnings",
        report.nodes.len(),
        report.links,
        graph.name,
        report.warnings.len()
    );
    Ok(report)
}

fn check_version(root: &Map<String, Value>, report: &mut LoadReport) -> Result<(), LoadError> {
    match root.get("version") {
        None => report.warn(LoadWarning::MissingVersion),
        Some(value) => match value.as_u64() {
            Some(found) if found > u64::from(FORMAT_VERSION) => {
                return Err(LoadError::DocumentVersion {
                    found,
                    supported: FORMAT_VERSION,
                });
            }
            Some(_) => {}
            None => report.warn(LoadWarning::MalformedDocument {
                field: "version".to_string(),
            }),
        },
    }
    Ok(())
}

fn list<'d>(root: &'d Map<String, Value>, field: &str, report: &mut LoadReport) -> &'d [Value] {
    match root.get(field) {
        None => &[],
        Some(Value::Array(items)) => items,
        Some(_) => {
            report.warn(LoadWarning::MalformedDocument {
                field: field.to_string(),
            });
            &[]
        }
    }
}

fn load_node(
    graph: &mut Graph,
    registry: &NodeRegistry,
    index: usize,
    entry: &Value,
    loaded: &mut HashMap<NodeId, NodeId>,
    report: &mut LoadReport,
) -> Option<NodeId> {
    let malformed = |reason: &str| LoadWarning::MalformedNode {
        index,
        reason: reason.to_string(),
    };

    let Some(doc) = NodeDocument::from_value(entry.clone()) else {
        report.warn(malformed("not an object"));
        return None;
    };
    let Some(type_name) = doc.type_name() else {
        report.warn(malformed("missing type"));
        return None;
    };
    let doc_id = match doc.node_id() {
        Some(Ok(id)) => id,
        Some(Err(reason)) => {
            report.warn(malformed(&reason));
            return None;
        }
        None => NodeId::new(),
    };

    let duplicate = loaded.contains_key(&doc_id);
    if duplicate {
        report.warn(LoadWarning::DuplicateNodeId {
            index,
            node: doc_id,
        });
    }
    let id = if duplicate || graph.contains_node(doc_id) {
        NodeId::new()
    } else {
        doc_id
    };

    let Some(mut node) = registry.create_node(type_name, id) else {
        report.warn(LoadWarning::UnknownNodeType {
            index,
            type_name: type_name.to_string(),
        });
        return None;
    };

    let mut status = LoadStatus::default();
    if let Err(e) = node.load(&doc, &mut status) {
        report.warn(LoadWarning::NodeRejected {
            index,
            type_name: type_name.to_string(),
            reason: e.to_string(),
        });
        return None;
    }
    for warning in status.warnings {
        report.warn(warning);
    }

    match graph.add_node(node) {
        Ok(id) => {
            if !duplicate {
                if id != doc_id {
                    report.remap.insert(doc_id, id);
                }
                loaded.insert(doc_id, id);
            }
            Some(id)
        }
        Err(e) => {
            report.warn(LoadWarning::NodeRejected {
                index,
                type_name: type_name.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

fn load_link(
    graph: &mut Graph,
    loaded: &HashMap<NodeId, NodeId>,
    index: usize,
    entry: &Value,
    report: &mut LoadReport,
) {
    let field = |key: &str| entry.get(key).and_then(Value::as_str);
    let node_field = |key: &str| {
        field(key)
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(NodeId)
    };

    let (Some(from_node), Some(from_pin), Some(to_node), Some(to_pin)) = (
        node_field("from_node"),
        field("from_pin"),
        node_field("to_node"),
        field("to_pin"),
    ) else {
        report.warn(LoadWarning::MalformedLink {
            index,
            reason: "expected from_node, from_pin, to_node and to_pin".to_string(),
        });
        return;
    };

    let dangling = |missing: String| LoadWarning::DanglingLink { index, missing };
    let Some(&from) = loaded.get(&from_node) else {
        report.warn(dangling(format!("node {from_node}")));
        return;
    };
    let Some(&to) = loaded.get(&to_node) else {
        report.warn(dangling(format!("node {to_node}")));
        return;
    };
    let Some(source) = graph.find_pin(from, from_pin, PinDirection::Output).map(|p| p.id()) else {
        report.warn(dangling(format!("output pin '{from_pin}'")));
        return;
    };
    let Some(target) = graph.find_pin(to, to_pin, PinDirection::Input).map(|p| p.id()) else {
        report.warn(dangling(format!("input pin '{to_pin}'")));
        return;
    };

    match graph.link(source, target) {
        Ok(_) => report.links += 1,
        Err(e) => report.warn(LoadWarning::LinkRejected {
            index,
            reason: e.to_string(),
        }),
    }
}

/// Write a graph to a JSON file
pub fn save_file(graph: &Graph, path: impl AsRef<Path>) -> io::Result<()> {
    let text = serde_json::to_string_pretty(&save_graph(graph)).map_err(io::Error::from)?;
    fs::write(path, text)
}

/// Read a graph from a JSON file
pub fn load_file(
    path: impl AsRef<Path>,
    registry: &NodeRegistry,
) -> Result<(Graph, LoadReport), LoadError> {
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text)?;
    load_graph(&doc, registry)
}
