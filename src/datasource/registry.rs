//! Registry trait for fetching package releases from various sources

use crate::datasource::error::LookupError;
use crate::datasource::types::{LookupRequest, ReleaseResult};

/// Trait for fetching releases from a package registry
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Identifier of the datasource this implementation handles (e.g., "devbox")
    fn datasource_id(&self) -> &'static str;

    /// Fetches all releases for a package from the registry
    ///
    /// # Arguments
    /// * `request` - The package to look up
    ///
    /// # Returns
    /// * `Ok(Some(ReleaseResult))` - Releases in registry order, never empty
    /// * `Ok(None)` - The registry has no release data for this package
    /// * `Err(LookupError)` - The registry or the network failed
    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, LookupError>;
}
