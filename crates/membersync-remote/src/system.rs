//! IRemoteSystem adapter over the raw HTTP client
//!
//! Maps the port's operations onto the downstream member endpoints:
//!
//! - create:  `POST   /members`
//! - update:  `PUT    /members/{id}`
//! - delete:  `DELETE /members/{id}`
//! - lookup:  `GET    /members?email=<secondary key>`
//!
//! All calls go through [`RemoteClient::request_with_retry`], so transient
//! server errors are already retried by the time a result reaches the
//! driver.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use membersync_core::domain::{RemoteError, RemoteId};
use membersync_core::ports::IRemoteSystem;

use crate::client::RemoteClient;
use crate::envelope;

/// `IRemoteSystem` implementation backed by the downstream HTTP API
pub struct HttpRemoteSystem {
    client: RemoteClient,
}

impl HttpRemoteSystem {
    /// Creates a new adapter over the given client
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl IRemoteSystem for HttpRemoteSystem {
    async fn create(&self, payload: &Value) -> Result<RemoteId, RemoteError> {
        let (_, body) = self
            .client
            .request_with_retry(Method::POST, "/members", Some(payload))
            .await?;

        let id = envelope::extract_id(&body)?;
        let remote_id = RemoteId::new(id)
            .map_err(|e| RemoteError::UnrecognizedShape(format!("Invalid entity id: {}", e)))?;

        debug!(remote_id = %remote_id, "Created remote entity");
        Ok(remote_id)
    }

    async fn update(&self, id: &RemoteId, payload: &Value) -> Result<(), RemoteError> {
        let path = format!("/members/{}", id.as_str());
        self.client
            .request_with_retry(Method::PUT, &path, Some(payload))
            .await?;

        debug!(remote_id = %id, "Updated remote entity");
        Ok(())
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        let path = format!("/members/{}", id.as_str());
        self.client
            .request_with_retry(Method::DELETE, &path, None)
            .await?;

        debug!(remote_id = %id, "Deleted remote entity");
        Ok(())
    }

    async fn find_by_secondary_key(&self, key: &str) -> Result<Option<RemoteId>, RemoteError> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("email", key)
            .finish();
        let path = format!("/members?{}", query);

        let (_, body) = self
            .client
            .request_with_retry(Method::GET, &path, None)
            .await?;

        let items = envelope::parse_list(&body)?;
        let Some(first) = items.first() else {
            debug!(key, "No remote entity matched secondary key");
            return Ok(None);
        };

        let id = envelope::extract_id(first)?;
        let remote_id = RemoteId::new(id)
            .map_err(|e| RemoteError::UnrecognizedShape(format!("Invalid entity id: {}", e)))?;

        debug!(key, remote_id = %remote_id, "Found remote entity by secondary key");
        Ok(Some(remote_id))
    }
}
