//! Shared REST plumbing for the kubelet and API server clients

use crate::{ClientError, Result};
use kstats_core::{AuthType, EndpointConfig};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Certificate, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP client bound to one base endpoint
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    client: Client,
}

impl RestClient {
    /// Build a client from endpoint settings.
    ///
    /// In service account mode the bearer token and CA bundle are read once,
    /// here, so a missing mount fails at startup rather than on every cycle.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .danger_accept_invalid_certs(config.insecure_skip_verify);

        if config.auth_type == AuthType::ServiceAccount {
            let token = std::fs::read_to_string(&config.token_path).map_err(|e| {
                ClientError::Configuration(format!(
                    "Failed to read service account token {}: {}",
                    config.token_path.display(),
                    e
                ))
            })?;

            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| ClientError::Configuration(format!("Invalid bearer token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);

            if let Some(ref ca_file) = config.ca_file {
                if !config.insecure_skip_verify {
                    let pem = std::fs::read(ca_file).map_err(|e| {
                        ClientError::Configuration(format!("Failed to read CA file {}: {}", ca_file.display(), e))
                    })?;
                    let cert = Certificate::from_pem(&pem)
                        .map_err(|e| ClientError::Configuration(format!("Invalid CA certificate: {}", e)))?;
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        let client = builder
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Connection(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url));
        }
        if !status.is_success() {
            return Err(ClientError::InvalidResponse(format!("{} returned {}", url, status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to decode response from {}: {}", url, e)))
    }
}
