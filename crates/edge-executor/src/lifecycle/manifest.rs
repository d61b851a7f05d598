//! Precache manifests.

use std::fmt;

use async_trait::async_trait;
use edge_core::{Failure, Response};
use http::header;
use serde::Deserialize;
use tracing::debug;

/// Turns a fetched manifest into the paths to precache.
#[async_trait]
pub trait ManifestExtractor: Send + Sync {
    async fn extract(&self, response: Response) -> Result<Vec<String>, Failure>;
}

impl fmt::Debug for dyn ManifestExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ManifestExtractor")
    }
}

/// Reads a JSON array of paths, or of objects with a `path` field.
///
/// A response that is not `application/json` yields no paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifest;

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    Path(String),
    Route { path: String },
}

#[async_trait]
impl ManifestExtractor for JsonManifest {
    async fn extract(&self, response: Response) -> Result<Vec<String>, Failure> {
        let is_json = response
            .header(header::CONTENT_TYPE.as_str())
            .and_then(|value| value.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"));
        if !is_json {
            debug!("manifest is not JSON, nothing to precache");
            return Ok(Vec::new());
        }

        let body = response.bytes().await?;
        let entries: Vec<ManifestEntry> = serde_json::from_slice(&body)
            .map_err(|err| Failure::rejected(format!("invalid precache manifest: {err}")))?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                ManifestEntry::Path(path) | ManifestEntry::Route { path } => path,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{HeaderValue, StatusCode};

    fn manifest(content_type: &'static str, body: &'static str) -> Response {
        Response::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
            .with_body(body)
    }

    #[tokio::test]
    async fn test_paths_and_objects() {
        let response = manifest(
            "application/json; charset=utf-8",
            r#"["/a", {"path": "/b"}]"#,
        );
        let paths = JsonManifest.extract(response).await.unwrap();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_other_content_type_is_empty() {
        let response = manifest("text/plain", r#"["/a"]"#);
        assert!(JsonManifest.extract(response).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let response = manifest("application/json", "{");
        let err = JsonManifest.extract(response).await.unwrap_err();
        assert!(matches!(err, Failure::Rejected(_)));
    }
}
