// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner errors.

use blueprint_graph::{BlueprintError, ExecutionError};
use std::path::PathBuf;

/// Anything that stops the runner
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Settings file could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to write settings: {0}")]
    Serialize(#[from] ron::Error),

    /// Settings were written by a newer runner
    #[error("Settings version {found} is newer than supported version {supported}")]
    SettingsVersion {
        /// Version in the file
        found: u32,
        /// Newest version this runner reads
        supported: u32,
    },

    /// No graph file configured
    #[error("No graph path configured")]
    NoGraph,

    /// An override names a node the graph does not contain
    #[error("No node named '{0}' in {1}")]
    UnknownNode(String, PathBuf),

    /// Session operation failed
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),

    /// A run failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The preview thread panicked
    #[error("Background preview panicked")]
    PreviewPanicked,
}
