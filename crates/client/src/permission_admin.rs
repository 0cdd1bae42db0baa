//! Admin editing of a user's permission matrix.

use serde_json::json;

use arkedia_auth::{PermissionRecord, PermissionUpdate};
use arkedia_core::UserId;

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::payload::data_array;

#[derive(Debug, Clone)]
pub struct PermissionAdmin {
    client: ApiClient,
}

impl PermissionAdmin {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, user_id: &UserId) -> Result<Vec<PermissionRecord>, ClientError> {
        let body = self
            .client
            .send(ApiRequest::get(permissions_path(user_id)))
            .await?;
        data_array(&body)
    }

    /// Save the full matrix. Rights outside `is_active && default_*` are
    /// clamped off before sending.
    pub async fn save(&self, user_id: &UserId, records: &[PermissionRecord]) -> Result<(), ClientError> {
        let permissions: Vec<PermissionUpdate> = records.iter().map(PermissionRecord::to_update).collect();
        tracing::info!(user_id = %user_id, forms = permissions.len(), "saving user permissions");

        self.client
            .send(ApiRequest::post(permissions_path(user_id)).json(&json!({ "permissions": permissions }))?)
            .await?;
        Ok(())
    }
}

fn permissions_path(user_id: &UserId) -> String {
    format!("/users/{user_id}/permissions")
}
