use async_trait::async_trait;

use crate::errors::BackendError;
use crate::rules::payload::{CreatedPolicy, PolicyPayload, PolicyRecord};

/// Remote store for approval policies.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    async fn create_policy(&self, payload: &PolicyPayload) -> Result<CreatedPolicy, BackendError>;

    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, BackendError>;

    async fn policy_details(&self, policy_id: &str) -> Result<PolicyRecord, BackendError>;
}
