//! HTTP transport used by registry clients

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use url::Url;

use crate::datasource::error::TransportError;
use crate::datasource::types::{RawResponse, ResponseBody};

/// Issues a single GET and hands back whatever the server answered.
///
/// Implementations must not interpret the status code; any HTTP answer is a
/// `RawResponse`. Only failures to complete the exchange are errors.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a pooled reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests fail after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("devbox-releases/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let context = || format!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::new(context(), e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(context(), e))?;

        debug!("GET {} -> {} ({} bytes)", url, status, bytes.len());

        Ok(RawResponse::new(status, ResponseBody::from_bytes(bytes.to_vec())))
    }
}
