//! HTTP client for the dashboard API

use crate::config::ClientConfig;
use crate::error::{Result, SyncError};
use crate::types::*;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client for the remote resource store
///
/// Cheap to clone; clones share the connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use portal_sync::{ClientConfig, PortalClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PortalClient::new(ClientConfig {
///     base_url: "http://localhost:8000".into(),
///     ..Default::default()
/// })?;
///
/// let response = client.fetch_application().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PortalClient {
    config: Arc<ClientConfig>,
    client: Client,
}

impl PortalClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| SyncError::Config(format!("invalid API key: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        if let Some(ref token) = config.csrf_token {
            let value = header::HeaderValue::from_str(token)
                .map_err(|e| SyncError::Config(format!("invalid CSRF token: {e}")))?;
            headers.insert("X-CSRF-TOKEN", value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ==================== Applicant form ====================

    /// Fetch the signed-in user's application record
    pub async fn fetch_application(&self) -> Result<ApplicationLoadResponse> {
        let url = self.config.url(&self.config.endpoints.application_record);
        tracing::debug!(%url, "fetching application record");

        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Update the application record
    ///
    /// Sent as multipart when a CV is attached, as JSON otherwise.
    pub async fn update_application(
        &self,
        update: &ApplicationUpdate,
        cv: Option<&Attachment>,
    ) -> Result<ApplicationUpdateResponse> {
        let url = self.config.url(&self.config.endpoints.update_application);

        let request = match cv {
            Some(file) => {
                tracing::debug!(%url, file = %file.file_name, bytes = file.size(), "updating application with CV");
                let mut form = Form::new();
                for (name, value) in update.fields() {
                    form = form.text(name, value.to_string());
                }
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime_type)?;
                self.client.post(&url).multipart(form.part("cvFile", part))
            }
            None => {
                tracing::debug!(%url, "updating application");
                self.client
                    .post(&url)
                    .header(header::CONTENT_TYPE, "application/json")
                    .json(update)
            }
        };

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Remove the stored CV
    pub async fn remove_cv(&self) -> Result<StatusResponse> {
        let url = self.config.url(&self.config.endpoints.remove_cv);
        tracing::debug!(%url, "removing CV");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ==================== Sponsor portal ====================

    /// Load the resource details of one sponsor and detail type
    pub async fn load_resources(&self, request: &LoadResourcesRequest) -> Result<LoadResourcesResponse> {
        let url = self.config.url(&self.config.endpoints.load_resources);
        tracing::debug!(%url, sponsor = %request.sponsor_slug, detail_type = %request.detail_type, "loading resources");
        self.post_json(&url, request).await
    }

    /// Create or update a resource detail
    pub async fn save_resource(&self, request: &SaveResourceRequest) -> Result<SaveResourceResponse> {
        let url = self.config.url(&self.config.endpoints.save_resource);
        tracing::debug!(%url, sponsor = %request.sponsor_slug, detail_id = request.detail_id, "saving resource");
        self.post_json(&url, request).await
    }

    /// Delete a stored asset
    pub async fn remove_asset(&self, request: &RemoveAssetRequest) -> Result<StatusResponse> {
        let url = self.config.url(&self.config.endpoints.remove_asset);
        tracing::debug!(%url, asset = %request.asset_url, "removing asset");
        self.post_json(&url, request).await
    }

    // ==================== Helper Methods ====================

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "request failed");
            return Err(SyncError::protocol(Some(status.as_u16()), body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "malformed response body");
            SyncError::protocol(Some(status.as_u16()), format!("malformed body: {e}"))
        })
    }
}
