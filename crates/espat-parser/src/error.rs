//! Error types for the AT command layer.

use std::fmt;

use thiserror::Error;

use crate::parse::Operation;

/// Errors raised while parsing or dispatching AT command lines.
///
/// None of these are fatal: every failure is recoverable at line granularity
/// and maps to a single `ERROR` status on the wire. The specific kind is
/// kept for logging and tests only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtError {
    /// The line does not start with the `AT+` marker.
    #[error("not an AT command line")]
    NotACommand,

    /// The command name is not in the registered table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The command exists but has no handler for the requested operation.
    #[error("{name} does not support the {operation:?} operation")]
    OperationNotSupported {
        /// The registered command name.
        name: String,
        /// The operation classified from the line.
        operation: Operation,
    },

    /// The argument string does not match the expected shape.
    #[error("invalid argument: {0}")]
    ArgumentError(String),

    /// An input line exceeded the configured maximum length.
    #[error("input line overflow")]
    Overflow,

    /// The command table is full.
    #[error("command table full: capacity {0}")]
    CapacityError(usize),
}

/// Result type alias for parser operations.
pub type AtResult<T> = Result<T, AtError>;

/// Failure reported by a command handler.
///
/// The dispatch engine only maps this to the protocol `ERROR` status; it
/// never inspects the kind. The wrapped error is retained so logs and tests
/// can see what actually went wrong.
pub struct CommandError(Box<dyn std::error::Error + Send + Sync>);

impl CommandError {
    /// Create a failure from a plain message.
    pub fn msg(text: impl Into<String>) -> Self {
        CommandError(text.into().into())
    }

    /// Downcast to a concrete error type, if it matches.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for CommandError {
    fn from(err: E) -> Self {
        CommandError(Box::new(err))
    }
}

/// Result type returned by command handlers.
pub type HandlerResult = Result<(), CommandError>;
