//! Devbox package search API implementation

use tracing::debug;
use url::Url;

use crate::config::{ConfigError, RegistryConfig};
use crate::datasource::error::{LookupError, TransportError};
use crate::datasource::normalize::normalize;
use crate::datasource::registry::Registry;
use crate::datasource::transport::{HttpTransport, ReqwestTransport};
use crate::datasource::types::{LookupRequest, RawResponse, ReleaseResult};

pub const DATASOURCE_ID: &str = "devbox";

/// Registry implementation for the Devbox package search API
pub struct DevboxRegistry<T = ReqwestTransport> {
    transport: T,
    endpoint: Url,
}

impl DevboxRegistry<ReqwestTransport> {
    /// Creates a DevboxRegistry talking HTTP to the configured registry
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Self::with_transport(transport, &config.registry_url)
    }
}

impl<T: HttpTransport> DevboxRegistry<T> {
    /// Creates a DevboxRegistry on top of an arbitrary transport.
    /// `base_url` should end in `/`; `RegistryConfig` guarantees that.
    pub fn with_transport(transport: T, base_url: &Url) -> Result<Self, ConfigError> {
        let endpoint = base_url
            .join("pkg")
            .map_err(|source| ConfigError::InvalidRegistryUrl {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            transport,
            endpoint,
        })
    }

    /// URL of the package document for `package_name`
    pub fn package_url(&self, package_name: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("name", package_name);
        url
    }

    /// Issues the lookup request and returns the unclassified answer
    pub async fn fetch(&self, package_name: &str) -> Result<RawResponse, TransportError> {
        let url = self.package_url(package_name);
        debug!("Fetching devbox releases for {} from {}", package_name, url);
        self.transport.get(&url).await
    }
}

#[async_trait::async_trait]
impl<T: HttpTransport> Registry for DevboxRegistry<T> {
    fn datasource_id(&self) -> &'static str {
        DATASOURCE_ID
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, LookupError> {
        let response = self.fetch(request.package_name()).await?;
        let result = normalize(response)?;

        match &result {
            Some(r) => debug!(
                "Found {} releases for {}",
                r.releases().len(),
                request.package_name()
            ),
            None => debug!("No releases for {}", request.package_name()),
        }

        Ok(result)
    }
}
