//! Classification and normalization of raw registry responses
//!
//! | status            | outcome                          |
//! |-------------------|----------------------------------|
//! | 404               | `Ok(None)`                       |
//! | 2xx               | parsed body, `Ok(None)` if empty |
//! | 5xx               | `ServiceUnavailable`             |
//! | anything else     | `UnexpectedResponse`             |
//!
//! Release timestamps are accepted as RFC 3339, `%Y-%m-%dT%H:%M:%S`,
//! `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d`; the zone-less forms are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::datasource::error::RegistryError;
use crate::datasource::types::{RawResponse, Release, ReleaseResult, ResponseBody};

/// Package document returned by the registry.
///
/// Both the generic and the Devbox field names may appear in one document;
/// `homepage` wins over `homepage_url`, and `versions` over `releases` unless
/// it yields no entries.
#[derive(Debug, Deserialize)]
struct PackageResponse {
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    homepage_url: Option<String>,
    #[serde(default)]
    versions: Option<Value>,
    #[serde(default)]
    releases: Option<Value>,
}

/// The registry lists versions either keyed by identifier or as an array of
/// records. Anything else fails deserialization.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VersionCollection {
    Keyed(IndexMap<String, Option<VersionMetadata>>),
    Listed(Vec<ListedVersion>),
}

#[derive(Debug, Deserialize)]
struct VersionMetadata {
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    last_updated: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ListedVersion {
    version: String,
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    last_updated: Option<Value>,
}

fn publish_time(time: Option<Value>, last_updated: Option<Value>) -> Option<Value> {
    time.or(last_updated)
}

impl VersionCollection {
    fn into_entries(self) -> Vec<(String, Option<Value>)> {
        match self {
            VersionCollection::Keyed(map) => map
                .into_iter()
                .map(|(v, meta)| {
                    let time = meta.and_then(|m| publish_time(m.time, m.last_updated));
                    (v, time)
                })
                .collect(),
            VersionCollection::Listed(list) => list
                .into_iter()
                .map(|entry| (entry.version, publish_time(entry.time, entry.last_updated)))
                .collect(),
        }
    }
}

/// Turns a raw registry answer into release data.
///
/// `Ok(None)` means the registry has nothing for this package; it is never
/// used for failures.
pub fn normalize(response: RawResponse) -> Result<Option<ReleaseResult>, RegistryError> {
    let RawResponse { status, body } = response;

    match status {
        StatusCode::NOT_FOUND => {
            debug!("Registry returned 404, package not found");
            Ok(None)
        }
        s if s.is_success() => parse_body(s, body),
        s if s.is_server_error() => {
            warn!("Registry returned server error {}", s);
            Err(RegistryError::ServiceUnavailable { status: s })
        }
        s => {
            warn!("Registry returned unexpected status {}", s);
            Err(RegistryError::UnexpectedResponse {
                status: s,
                reason: "unexpected status".to_string(),
            })
        }
    }
}

fn parse_body(
    status: StatusCode,
    body: ResponseBody,
) -> Result<Option<ReleaseResult>, RegistryError> {
    let value = match body {
        ResponseBody::Empty | ResponseBody::Json(Value::Null) => {
            debug!("Registry returned an empty body");
            return Ok(None);
        }
        ResponseBody::Json(value) => value,
        ResponseBody::Raw(_) => {
            warn!("Registry returned a body that is not JSON");
            return Err(RegistryError::UnexpectedResponse {
                status,
                reason: "response body is not valid JSON".to_string(),
            });
        }
    };

    let package: PackageResponse =
        serde_json::from_value(value).map_err(|e| unexpected(status, "package", e))?;

    let mut entries = parse_versions(status, "versions", package.versions)?;
    if entries.is_empty() {
        entries = parse_versions(status, "releases", package.releases)?;
    }

    let releases: Vec<Release> = entries
        .into_iter()
        .filter(|(version, _)| !version.is_empty())
        .map(|(version, time)| {
            let release_timestamp = time.as_ref().and_then(normalize_timestamp);
            Release::new(version, release_timestamp)
        })
        .collect();

    if releases.is_empty() {
        debug!("Registry response has no versions");
    }

    let homepage = package.homepage.or(package.homepage_url);
    Ok(ReleaseResult::from_releases(homepage, releases))
}

/// Entries of one version field; a missing or `null` field has none.
fn parse_versions(
    status: StatusCode,
    field: &str,
    value: Option<Value>,
) -> Result<Vec<(String, Option<Value>)>, RegistryError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let collection: VersionCollection =
        serde_json::from_value(value).map_err(|e| unexpected(status, field, e))?;
    Ok(collection.into_entries())
}

fn unexpected(status: StatusCode, field: &str, err: serde_json::Error) -> RegistryError {
    warn!("Failed to parse registry response ({}): {}", field, err);
    RegistryError::UnexpectedResponse {
        status,
        reason: format!("{}: {}", field, err),
    }
}

/// Re-renders a timestamp as UTC RFC 3339 with millisecond precision.
/// Non-strings and unparseable strings yield `None`.
fn normalize_timestamp(value: &Value) -> Option<String> {
    let raw = value.as_str()?;
    match parse_timestamp(raw) {
        Some(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => {
            debug!("Ignoring unparseable release timestamp {:?}", raw);
            None
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn ok(value: serde_json::Value) -> RawResponse {
        RawResponse::json(StatusCode::OK, value)
    }

    fn versions(result: &ReleaseResult) -> Vec<&str> {
        result.releases().iter().map(|r| r.version.as_str()).collect()
    }

    #[test]
    fn normalize_returns_none_for_404() {
        let response = RawResponse::json(StatusCode::NOT_FOUND, json!({"error": "not found"}));
        assert_eq!(normalize(response).unwrap(), None);
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!(null))]
    #[case(json!({"versions": []}))]
    #[case(json!({"versions": {}}))]
    #[case(json!({"versions": null}))]
    #[case(json!({"homepage": "https://nodejs.org"}))]
    #[case(json!({"homepage": "https://nodejs.org", "versions": [{"version": ""}]}))]
    fn normalize_returns_none_for_ok_without_releases(#[case] body: serde_json::Value) {
        assert_eq!(normalize(ok(body)).unwrap(), None);
    }

    #[test]
    fn normalize_returns_none_for_ok_with_empty_body() {
        assert_eq!(normalize(RawResponse::empty(StatusCode::OK)).unwrap(), None);
    }

    #[rstest]
    #[case(500)]
    #[case(502)]
    #[case(503)]
    #[case(599)]
    fn normalize_fails_with_service_unavailable_for_5xx(#[case] code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        let result = normalize(RawResponse::empty(status));

        assert!(matches!(
            result,
            Err(RegistryError::ServiceUnavailable { status: s }) if s == status
        ));
    }

    #[rstest]
    #[case(400)]
    #[case(401)]
    #[case(403)]
    #[case(429)]
    #[case(304)]
    fn normalize_fails_with_unexpected_response_for_other_statuses(#[case] code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        let result = normalize(RawResponse::json(status, json!({"versions": {"1.0.0": {}}})));

        assert!(matches!(
            result,
            Err(RegistryError::UnexpectedResponse { status: s, .. }) if s == status
        ));
    }

    #[test]
    fn normalize_fails_for_ok_with_non_json_body() {
        let response = RawResponse::new(
            StatusCode::OK,
            ResponseBody::Raw(b"<html>maintenance</html>".to_vec()),
        );

        assert!(matches!(
            normalize(response),
            Err(RegistryError::UnexpectedResponse { .. })
        ));
    }

    #[rstest]
    #[case(json!({"versions": "20.10.0"}))]
    #[case(json!({"versions": 3}))]
    #[case(json!({"versions": [{"time": "2024-01-14T03:55:27.000Z"}]}))]
    #[case(json!({"homepage": 42, "versions": {"1.0.0": {}}}))]
    fn normalize_rejects_unknown_shapes(#[case] body: serde_json::Value) {
        assert!(matches!(
            normalize(ok(body)),
            Err(RegistryError::UnexpectedResponse { status: StatusCode::OK, .. })
        ));
    }

    #[test]
    fn normalize_preserves_keyed_order() {
        let body = json!({
            "homepage": "https://www.python.org",
            "versions": {
                "3.12.1": {"time": "2023-12-08T00:00:00.000Z"},
                "3.9.18": {"time": "2023-08-24T00:00:00.000Z"},
                "3.11.7": {"time": "2023-12-04T00:00:00.000Z"}
            }
        });

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(versions(&result), vec!["3.12.1", "3.9.18", "3.11.7"]);
        assert_eq!(result.homepage(), Some("https://www.python.org"));
    }

    #[test]
    fn normalize_reads_listed_versions_with_devbox_field_names() {
        let body = json!({
            "name": "go",
            "homepage_url": "https://go.dev/",
            "releases": [
                {"version": "1.21.5", "last_updated": "2023-12-10T05:40:11Z", "platforms": []},
                {"version": "1.21.4", "last_updated": "2023-11-20T11:02:00Z"}
            ]
        });

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(result.homepage(), Some("https://go.dev/"));
        assert_eq!(
            result.releases(),
            &[
                Release::new("1.21.5", Some("2023-12-10T05:40:11.000Z".to_string())),
                Release::new("1.21.4", Some("2023-11-20T11:02:00.000Z".to_string())),
            ]
        );
    }

    #[test]
    fn normalize_converts_offset_timestamps_to_utc() {
        let body = json!({"versions": {"1.0.0": {"time": "2024-01-14T05:55:27.5+02:00"}}});

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(
            result.releases()[0].release_timestamp.as_deref(),
            Some("2024-01-14T03:55:27.500Z")
        );
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"time": "yesterday"}))]
    #[case(json!({"time": 1705204527000_i64}))]
    #[case(json!({"time": null}))]
    fn normalize_leaves_timestamp_absent_when_missing_or_unparseable(
        #[case] metadata: serde_json::Value,
    ) {
        let body = json!({"versions": {"1.0.0": metadata}});

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(result.releases(), &[Release::new("1.0.0", None)]);
    }

    #[test]
    fn normalize_drops_entries_with_empty_version() {
        let body = json!({
            "versions": [
                {"version": "2.0.0"},
                {"version": ""},
                {"version": "1.0.0"}
            ]
        });

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(versions(&result), vec!["2.0.0", "1.0.0"]);
    }

    #[test]
    fn normalize_returns_every_timestamped_entry_in_order() {
        let entries: Vec<(String, String)> = (0..7)
            .map(|i| {
                (
                    format!("1.{i}.0"),
                    format!("2023-0{}-01T12:00:00.000Z", i + 1),
                )
            })
            .collect();
        let mut map = serde_json::Map::new();
        for (version, time) in &entries {
            map.insert(version.clone(), json!({"time": time}));
        }
        let body = json!({"homepage": "https://example.org", "versions": map});

        let result = normalize(ok(body)).unwrap().unwrap();

        let expected: Vec<Release> = entries
            .into_iter()
            .map(|(version, time)| Release::new(version, Some(time)))
            .collect();
        assert_eq!(result.releases(), expected.as_slice());
        assert_eq!(result.homepage(), Some("https://example.org"));
    }

    #[rstest]
    #[case(json!({
        "homepage": "https://nodejs.org",
        "homepage_url": "https://nodejs.org/en",
        "versions": {"20.10.0": {}}
    }), Some("https://nodejs.org"))]
    #[case(json!({
        "homepage_url": "https://nodejs.org/en",
        "versions": {"20.10.0": {}}
    }), Some("https://nodejs.org/en"))]
    #[case(json!({"versions": {"20.10.0": {}}}), None)]
    fn normalize_prefers_homepage_over_homepage_url(
        #[case] body: Value,
        #[case] expected: Option<&str>,
    ) {
        let result = normalize(ok(body)).unwrap().unwrap();
        assert_eq!(result.homepage(), expected);
    }

    #[rstest]
    #[case(json!({
        "versions": {"20.10.0": {}},
        "releases": [{"version": "18.19.0"}]
    }), vec!["20.10.0"])]
    #[case(json!({
        "versions": [],
        "releases": [{"version": "18.19.0"}]
    }), vec!["18.19.0"])]
    #[case(json!({
        "versions": null,
        "releases": [{"version": "18.19.0"}, {"version": "18.18.2"}]
    }), vec!["18.19.0", "18.18.2"])]
    fn normalize_reads_releases_when_versions_has_no_entries(
        #[case] body: Value,
        #[case] expected: Vec<&str>,
    ) {
        let result = normalize(ok(body)).unwrap().unwrap();
        assert_eq!(versions(&result), expected);
    }

    #[test]
    fn normalize_prefers_time_over_last_updated() {
        let body = json!({
            "versions": [
                {
                    "version": "1.0.0",
                    "time": "2024-01-14T03:55:27.000Z",
                    "last_updated": "2024-02-01T00:00:00.000Z"
                },
                {"version": "0.9.0", "time": null, "last_updated": "2023-12-01T00:00:00Z"}
            ]
        });

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(
            result.releases(),
            &[
                Release::new("1.0.0", Some("2024-01-14T03:55:27.000Z".to_string())),
                Release::new("0.9.0", Some("2023-12-01T00:00:00.000Z".to_string())),
            ]
        );
    }

    #[test]
    fn normalize_accepts_null_version_metadata() {
        let body = json!({"versions": {"1.0.0": null, "2.0.0": {}}});

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(
            result.releases(),
            &[Release::new("1.0.0", None), Release::new("2.0.0", None)]
        );
    }

    #[rstest]
    #[case("2024-01-14", "2024-01-14T00:00:00.000Z")]
    #[case("2024-01-14 03:55:27", "2024-01-14T03:55:27.000Z")]
    #[case("2024-01-14T03:55:27", "2024-01-14T03:55:27.000Z")]
    #[case("2024-01-14T03:55:27.25", "2024-01-14T03:55:27.250Z")]
    fn normalize_reads_zoneless_timestamps_as_utc(#[case] time: &str, #[case] expected: &str) {
        let body = json!({"versions": {"1.0.0": {"time": time}}});

        let result = normalize(ok(body)).unwrap().unwrap();

        assert_eq!(
            result.releases()[0].release_timestamp.as_deref(),
            Some(expected)
        );
    }

    #[rstest]
    #[case(json!({"versions": "20.10.0"}), "versions: ")]
    #[case(json!({"releases": {"1.0.0": 3}}), "releases: ")]
    #[case(json!({"homepage": 42}), "package: ")]
    fn normalize_names_the_field_that_failed_to_parse(
        #[case] body: Value,
        #[case] prefix: &str,
    ) {
        let Err(RegistryError::UnexpectedResponse { reason, .. }) = normalize(ok(body)) else {
            panic!("expected an unexpected-response error");
        };
        assert!(reason.starts_with(prefix), "reason was {reason:?}");
    }
}
