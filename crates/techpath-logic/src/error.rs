//! Error type shared by graph construction, configuration and the simulators.
//!
//! Conditions the simulators recover from locally (unparseable readiness,
//! cycles, technologies with no downstream concepts) never surface here.

use thiserror::Error;

/// Errors raised by the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Two nodes in the input share the same id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// A node was declared with an empty id.
    #[error("node declared with an empty id")]
    EmptyNodeId,

    /// A referenced node id does not exist in the graph.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// The node exists but is a reactor concept, which cannot be accelerated.
    #[error("node '{0}' is not an acceleratable technology")]
    NotAcceleratable(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SimResult<T> = Result<T, SimError>;
