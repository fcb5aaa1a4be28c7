//! Customer collaborator boundary. Resolution, creation and merging of
//! customer records live elsewhere; the engine only needs a stable id.

use async_trait::async_trait;

use crate::engine::LedgerError;
use crate::model::CustomerId;

/// What a booking request knows about the customer. At least one of
/// email/phone identifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Resolve (or create/merge) a customer, returning a stable id, or
    /// `LedgerError::CustomerUnresolved`.
    async fn resolve(&self, details: &CustomerDetails) -> Result<CustomerId, LedgerError>;
}
