use thiserror::Error;

use crate::graph::GraphError;
use crate::program::Ref;

/// Program construction failures. These stop a run before any evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    #[error("cannot find checksum for ref {reference}")]
    MissingChecksum { reference: Ref },

    #[error("ref {reference} does not point to a chunk")]
    InvalidRef { reference: Ref },

    #[error("ref {reference} does not point to a function")]
    UnknownFunction { reference: Ref },

    #[error("ref {reference} is listed more than once as entrypoint or datapoint")]
    DuplicateCallpoint { reference: Ref },

    #[error("cannot label ref {reference}: {message}")]
    Label { reference: Ref, message: String },
}

/// Builtin lookup failures. Both variants are of the not-found class.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("cannot find functions for type '{ty}' (called '{name}')")]
    NoOperators { ty: String, name: String },

    #[error("cannot find function '{name}' for type '{ty}'")]
    NotFound { ty: String, name: String },
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LookupError::NoOperators { .. } | LookupError::NotFound { .. }
        )
    }
}

/// Errors attached to a single ref's result. They never abort a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("cannot cast value: expected {expected}, got {found}")]
    Binding { expected: String, found: String },

    #[error("failed to fetch '{field}' on '{resource}': {message}")]
    ResourceFetch {
        resource: String,
        field: String,
        message: String,
    },

    #[error("{message}")]
    Registration { message: String },

    #[error("{label}: {message}")]
    Operator { label: String, message: String },

    #[error("cannot find property '{0}'")]
    MissingProperty(String),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error("{0}")]
    Unresolved(String),
}

impl ExecError {
    pub fn binding(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ExecError::Binding {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn operator(label: impl Into<String>, message: impl Into<String>) -> Self {
        ExecError::Operator {
            label: label.into(),
            message: message.into(),
        }
    }

    pub fn registration(message: impl Into<String>) -> Self {
        ExecError::Registration {
            message: message.into(),
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    #[error("Resource graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timed out after {0:?} waiting for results")]
    Timeout(std::time::Duration),

    #[error("Result channel closed: {0}")]
    Channel(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
