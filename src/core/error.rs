use thiserror::Error;

use crate::core::unit::UnitId;

/// The error an [`Action`](crate::Action) method may fail with.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by unit and container operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Program does not exist: {0}")]
    ProgramNotFound(String),

    #[error("Program already exists: {0}")]
    DuplicateProgram(String),

    #[error("Unit '{name}' ({id}) already exists in container '{container}'")]
    DuplicateMember {
        id: UnitId,
        name: String,
        container: String,
    },

    #[error("Unit '{name}' ({id}) does not exist in container '{container}'")]
    MemberNotFound {
        id: UnitId,
        name: String,
        container: String,
    },

    #[error("Unit '{name}' ({id}) already belongs to container '{container}'")]
    MemberOfAnotherContainer {
        id: UnitId,
        name: String,
        container: String,
    },

    /// The first failing action of a run. Indices are zero-based.
    #[error(
        "Program '{program}' failed at step {step} ({step_name}), action {action} ({action_name}): {source}"
    )]
    ProgramExecution {
        program: String,
        step: usize,
        action: usize,
        step_name: String,
        action_name: String,
        #[source]
        source: ActionError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The original action failure, if this is a [`Error::ProgramExecution`].
    pub fn action_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::ProgramExecution { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
