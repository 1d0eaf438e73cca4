//! # kstats-kubelet
//!
//! HTTP clients for the endpoints a kstats collection cycle reads from.
//!
//! This crate provides:
//! - [`KubeletClient`]: the node-local kubelet stats summary and pods endpoints
//! - [`ApiServerClient`]: persistent volume claim and volume lookups
//! - Service account authentication (bearer token and cluster CA bundle)
//!
//! ## Example
//!
//! ```rust,no_run
//! use kstats_core::{AuthType, EndpointConfig, StatsProvider};
//! use kstats_kubelet::KubeletClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EndpointConfig::new("http://127.0.0.1:10255").with_auth_type(AuthType::None);
//!     let client = KubeletClient::new(&config)?;
//!
//!     let snapshot = client.stats_summary().await?;
//!     println!("node {} runs {} pods", snapshot.node.node_name, snapshot.pods.len());
//!
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod apiserver;
pub mod kubelet;
pub mod rest;

pub use apiserver::ApiServerClient;
pub use kubelet::KubeletClient;
pub use rest::RestClient;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the kubelet or API server
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ClientError> for kstats_core::Error {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(what) => kstats_core::Error::resolution(format!("{} not found", what)),
            ClientError::Configuration(msg) => kstats_core::Error::config(msg),
            ClientError::Connection(msg) | ClientError::InvalidResponse(msg) => {
                kstats_core::Error::transport(msg)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;

    /// Serve a router on an ephemeral local port and return its base URL
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
