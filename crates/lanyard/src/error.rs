//! Error surface shared by registration, routing and execution

use std::sync::Arc;

/// An error produced while registering, resolving or executing an
/// interaction command
///
/// Build-time invariant violations (`ParseFailed`, `DuplicateCommand`,
/// `ComplexParameterCycle`, `NoConverter`) are returned synchronously from
/// the registration calls and never surface as a runtime result; the
/// remaining variants are runtime results reported through the executed
/// events.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No command matched the requested path or custom ID
    #[error("Unknown command")]
    UnknownCommand,
    /// A type converter rejected an option value
    #[error("Error converting option {name:?}: {reason}")]
    ConvertFailed {
        /// Name of the offending parameter
        name: String,
        /// Human-readable description of the failure
        reason: String,
    },
    /// The invocation carried too few or too many options for the command
    #[error("Bad arguments: {0}")]
    BadArgs(&'static str),
    /// The handler panicked or returned an opaque error
    #[error("Exception in handler: {0}")]
    Exception(Arc<anyhow::Error>),
    /// The handler ran to completion but reported failure
    #[error("Command was unsuccessful: {0}")]
    Unsuccessful(String),
    /// A module- or command-level precondition rejected the invocation
    #[error("Precondition not met: {0}")]
    UnmetPrecondition(String),
    /// Declared command metadata violated a build-time invariant
    #[error("Error parsing command metadata: {0}")]
    ParseFailed(String),
    /// A command path or custom-ID pattern was already registered
    #[error("Duplicate command {0:?}")]
    DuplicateCommand(String),
    /// A complex parameter recursed into a type already on the flattening
    /// stack
    #[error("Complex parameter cycle through {0}")]
    ComplexParameterCycle(&'static str),
    /// No type converter is registered for a declared parameter type
    #[error("No type converter registered for {0}")]
    NoConverter(&'static str),
    /// The invocation's cancellation signal fired mid-pipeline
    #[error("Execution was cancelled")]
    Cancelled,
}

impl Error {
    #[inline]
    pub(crate) fn convert_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConvertFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    #[inline]
    pub(crate) fn parse(reason: impl Into<String>) -> Self { Self::ParseFailed(reason.into()) }

    #[inline]
    pub(crate) fn exception(err: anyhow::Error) -> Self { Self::Exception(Arc::new(err)) }
}

/// Uniform outcome of one interaction pipeline run, published through the
/// matching executed event
pub type ExecuteResult = Result<(), Error>;
