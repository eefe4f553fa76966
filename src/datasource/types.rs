//! Common types for release lookups

use reqwest::StatusCode;
use serde::Serialize;

use crate::datasource::error::LookupError;

/// A single package lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    package_name: String,
}

impl LookupRequest {
    /// Creates a lookup for `package_name`, which must not be blank
    pub fn new(package_name: impl Into<String>) -> Result<Self, LookupError> {
        let package_name = package_name.into();
        if package_name.trim().is_empty() {
            return Err(LookupError::InvalidRequest(
                "package name must not be empty".to_string(),
            ));
        }
        Ok(Self { package_name })
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }
}

/// Body of an HTTP response as delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Nothing (or only whitespace) arrived
    Empty,
    /// Syntactically valid JSON
    Json(serde_json::Value),
    /// Bytes that are not JSON
    Raw(Vec<u8>),
}

impl ResponseBody {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(&bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Raw(bytes),
        }
    }
}

/// Status and body of one registry request, before any classification
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn json(status: StatusCode, value: serde_json::Value) -> Self {
        Self::new(status, ResponseBody::Json(value))
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, ResponseBody::Empty)
    }
}

/// One published version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub version: String,
    /// Publish time, RFC 3339 in UTC with millisecond precision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_timestamp: Option<String>,
}

impl Release {
    pub fn new(version: impl Into<String>, release_timestamp: Option<String>) -> Self {
        Self {
            version: version.into(),
            release_timestamp,
        }
    }
}

/// Normalized release data for a package.
///
/// Never empty: [`ReleaseResult::from_releases`] is the only constructor and
/// yields `None` when there is nothing to report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    releases: Vec<Release>,
}

impl ReleaseResult {
    pub fn from_releases(homepage: Option<String>, releases: Vec<Release>) -> Option<Self> {
        if releases.is_empty() {
            return None;
        }
        Some(Self { homepage, releases })
    }

    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    /// Releases in the order the registry listed them
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn into_releases(self) -> Vec<Release> {
        self.releases
    }
}
