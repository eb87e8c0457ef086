//! The authenticated operations the rest of the bridge depends on

use async_trait::async_trait;

use crate::{ApiResult, Gate, GateId};

/// Authenticated gate operations of the vendor portal
///
/// Implemented by the session client; gate controllers and the catalog only
/// see this trait, so tests can substitute a scripted backend.
#[async_trait]
pub trait GateApi: Send + Sync {
    /// List every gate registered to the account
    async fn list_gates(&self) -> ApiResult<Vec<Gate>>;

    /// Trigger a single open pulse on a gate
    async fn open_gate(&self, gate_id: GateId) -> ApiResult<()>;
}
