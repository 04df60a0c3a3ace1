use thiserror::Error;

use aegis_mgmt::MgmtError;

#[derive(Error, Debug)]
pub enum PolicyError {
    /// A subject with the same identity is already declared in the set.
    #[error("subject declared more than once: {name}")]
    DuplicateSubject { name: String },

    /// The request declares nothing to assign and nothing to revoke.
    #[error("request declares no subjects to assign or revoke")]
    EmptyRequest,

    /// A subject fails its structural constraints.
    #[error("invalid subject {name}: {reason}")]
    InvalidSubject { name: String, reason: String },

    /// A declared request could not be parsed.
    #[error("unparseable request: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failure surfaced by the invocation layer.
    #[error(transparent)]
    Management(#[from] MgmtError),
}

impl PolicyError {
    /// Check if the error was raised by request validation, before any
    /// remote call was issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSubject { .. }
                | Self::EmptyRequest
                | Self::InvalidSubject { .. }
                | Self::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
