use thiserror::Error;

use crate::utils::allocator::{EntityId, TriggerLease};

/// Errors surfaced by the physics core.
///
/// Simulation itself never fails; these cover misuse of handles and bad
/// persisted content.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("{0:?} has been released")]
    RevokedLease(TriggerLease),

    #[error("{0:?} has no rigid body component")]
    MissingBody(EntityId),

    #[error("unknown shape variant `{0}`")]
    UnknownShape(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
