use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::PortalConfig;
use shared_models::error::PortalError;

/// Shared JSON-over-HTTP wrapper for the portal backend.
///
/// Every client crate goes through this: it owns the base URL, attaches the
/// bearer token, and maps failure statuses onto the portal error taxonomy.
pub struct PortalApiClient {
    client: Client,
    base_url: String,
}

impl PortalApiClient {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.portal_api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| PortalError::Auth("Invalid bearer token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<reqwest::Response, PortalError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let headers = self.headers(auth_token)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| PortalError::Sync(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    PortalError::Auth(error_text)
                }
                StatusCode::NOT_FOUND => PortalError::NotFound(error_text),
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    PortalError::Validation(error_text)
                }
                _ => PortalError::Backend(format!("API error ({}): {}", status, error_text)),
            });
        }

        Ok(response)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, PortalError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(method, path, auth_token, body).await?;
        let data = response
            .json::<T>()
            .await
            .map_err(|e| PortalError::Backend(format!("Malformed response body: {}", e)))?;
        Ok(data)
    }

    /// Fire a request where the caller only cares about success; the
    /// response body, if any, is discarded.
    pub async fn request_unit(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), PortalError> {
        self.execute(method, path, auth_token, body).await?;
        Ok(())
    }
}
