use super::EntityId;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Row identity missing or unparseable: '{0}'")]
    MalformedIdentity(String),

    #[error("Field '{0}' must be a non-negative number")]
    InvalidNumericInput(String),

    #[error("Update not applied: store reported zero affected rows")]
    UpdateNotApplied,

    #[error("Delete not applied: store reported zero affected rows")]
    DeleteNotApplied,

    #[error("Row {0} already has an action in flight")]
    RowBusy(EntityId),

    #[error("No row at position {0}")]
    RowNotFound(usize),

    #[error("Row at position {position} is entity {found}, expected {expected}")]
    IdentityMismatch {
        position: usize,
        expected: EntityId,
        found: EntityId,
    },

    #[error("Invalid session state: {0}")]
    SessionState(String),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ActionError>;
