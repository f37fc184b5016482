//! Error taxonomy for the generator core.
//!
//! Scan errors are local: the offending interface or parameter is skipped and
//! the run continues. Model errors mean the interface table would become
//! inconsistent, so the whole run aborts. Configuration and I/O failures are
//! reported through `anyhow` at the pipeline boundary.

use thiserror::Error;

/// Structural problem found while scanning header text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("interface `{0}` not found")]
    InterfaceNotFound(String),

    #[error("the end of interface `{0}` not found")]
    UnterminatedInterface(String),

    #[error("unrecognized function parameter line: {0}")]
    UnrecognizedParameter(String),

    #[error("parameter name is missing: {0}")]
    MissingParameterName(String),
}

/// Violation of the interface-model contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("interface `{0}` is registered twice")]
    DuplicateInterface(String),

    #[error(
        "parent `{parent}` of interface `{name}` has not been registered; \
         ancestors must be listed before their descendants"
    )]
    UnregisteredParent { name: String, parent: String },

    #[error("no call ID block is open for interface `{0}`")]
    NoCallIdBlock(String),

    #[error("call ID index {index} is out of range for interface `{interface}` ({count} methods)")]
    CallIdOutOfRange {
        interface: String,
        index: usize,
        count: usize,
    },

    #[error("call ID {0} was allocated but never labelled")]
    UnfilledCallId(usize),
}

/// Failure while turning one interface declaration into a model entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl BuildError {
    /// Model errors halt the run; scan errors only skip the interface.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::Model(_))
    }
}
