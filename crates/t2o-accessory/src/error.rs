//! Errors surfaced to the accessory framework

use t2o_core::AccessoryKey;
use thiserror::Error;

/// Result type for accessory operations
pub type AccessoryResult<T> = Result<T, AccessoryError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessoryError {
    /// The gate is offline or its last remote call failed
    #[error("service communication failure")]
    CommunicationFailure,

    #[error("unknown accessory: {0}")]
    UnknownAccessory(AccessoryKey),
}
