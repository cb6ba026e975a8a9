use crate::model::ProtectionId;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Rejected at the request boundary; never produced by the registry itself.
    #[error("Invalid input at {json_path}: {reason}")]
    InvalidInput { json_path: String, reason: String },

    /// A live record already holds this id (reject policy only).
    #[error("Protection already active for id {id}")]
    DuplicateId { id: ProtectionId },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RegistryError {
    pub fn invalid_input(json_path: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidInput {
            json_path: json_path.into(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(e: rusqlite::Error) -> Self {
        RegistryError::StoreUnavailable(e.to_string())
    }
}
