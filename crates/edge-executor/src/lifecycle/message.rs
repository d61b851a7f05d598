//! Out-of-band messages dispatched to handlers by type.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use edge_cache::CacheStore;
use edge_core::{Failure, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::compile::CompiledConfig;

/// Message type handled by [`CacheOverride`].
pub const CACHE_OVERRIDE: &str = "cache";

/// A message addressed to a handler by its `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Message {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Handles messages of one type.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), Failure>;
}

impl fmt::Debug for dyn MessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageHandler")
    }
}

/// Stores a caller-supplied response for a URL in the partition of the
/// route matching it.
///
/// Payload: `request` is a URL, absolute or relative to the scope;
/// `response` is either body text or `{ status, headers, body }`.
pub struct CacheOverride {
    config: Arc<CompiledConfig>,
    store: Arc<CacheStore>,
    scope: Url,
}

#[derive(Deserialize)]
struct OverridePayload {
    request: String,
    response: OverrideResponse,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OverrideResponse {
    Text(String),
    Full {
        #[serde(default = "default_status")]
        status: u16,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: String,
    },
}

fn default_status() -> u16 {
    200
}

impl CacheOverride {
    pub fn new(config: Arc<CompiledConfig>, store: Arc<CacheStore>, scope: Url) -> Self {
        Self {
            config,
            store,
            scope,
        }
    }

    /// Store `response` for `request` in the matching route's partition.
    pub async fn put(&self, request: &Request, response: Response) -> Result<(), Failure> {
        let route = self.config.route_for(request);
        let response = response.buffered().await?.with_date();
        self.store
            .put(route.cache_key().as_str(), request.url().as_str(), &response)
            .await?;
        debug!(partition = %route.cache_key(), url = %request.url(), "cache override stored");
        Ok(())
    }

    fn parse(&self, message: &Message) -> Result<(Request, Response), Failure> {
        let payload: OverridePayload = serde_json::from_value(Value::Object(message.payload.clone()))
            .map_err(|err| Failure::rejected(format!("invalid cache message: {err}")))?;

        let url = self
            .scope
            .join(&payload.request)
            .map_err(|err| Failure::rejected(format!("invalid url {}: {err}", payload.request)))?;
        let request = Request::new(http::Method::GET, url);

        let response = match payload.response {
            OverrideResponse::Text(body) => Response::new(StatusCode::OK).with_body(body),
            OverrideResponse::Full {
                status,
                headers,
                body,
            } => {
                let status = StatusCode::from_u16(status)
                    .map_err(|_| Failure::rejected(format!("invalid status {status}")))?;
                Response::new(status)
                    .with_headers(header_map(&headers)?)
                    .with_body(body)
            }
        };
        Ok((request, response))
    }
}

#[async_trait]
impl MessageHandler for CacheOverride {
    async fn handle(&self, message: &Message) -> Result<(), Failure> {
        let (request, response) = self.parse(message)?;
        self.put(&request, response).await
    }
}

/// Build a header map from name/value pairs.
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, Failure> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Failure::rejected(format!("invalid header name {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Failure::rejected(format!("invalid header value for {name}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::{Config, Route};
    use edge_core::Method;

    fn handler() -> (CacheOverride, Arc<CacheStore>) {
        let config = compile(
            Config::new()
                .with_methods([Method::GET])
                .with_route(Route::pattern("/articles/").with_cache_name("articles")),
        )
        .unwrap();
        let store = Arc::new(CacheStore::in_memory());
        let scope = Url::parse("https://example.com/").unwrap();
        (
            CacheOverride::new(Arc::new(config), Arc::clone(&store), scope),
            store,
        )
    }

    #[test]
    fn test_message_shape() {
        let message: Message =
            serde_json::from_str(r#"{"type":"cache","request":"/a","response":"hi"}"#).unwrap();
        assert_eq!(message.kind, "cache");
        assert_eq!(message.payload["request"], "/a");
    }

    #[tokio::test]
    async fn test_text_override_goes_to_matching_partition() {
        let (handler, store) = handler();
        let message = Message::new(CACHE_OVERRIDE)
            .with_field("request", "/articles/1")
            .with_field("response", "cached text");

        handler.handle(&message).await.unwrap();

        let cached = store
            .lookup("sw-articles", "https://example.com/articles/1")
            .await
            .unwrap()
            .unwrap();
        assert!(cached.header("date").is_some());
        assert_eq!(cached.text().await.unwrap(), "cached text");
    }

    #[tokio::test]
    async fn test_full_override() {
        let (handler, store) = handler();
        let message = Message::new(CACHE_OVERRIDE)
            .with_field("request", "https://example.com/other")
            .with_field(
                "response",
                serde_json::json!({
                    "status": 201,
                    "headers": {"content-type": "application/json"},
                    "body": "{}"
                }),
            );

        handler.handle(&message).await.unwrap();

        let cached = store
            .lookup("sw-default", "https://example.com/other")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.status(), StatusCode::CREATED);
        assert_eq!(cached.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let (handler, _) = handler();
        let err = handler
            .handle(&Message::new(CACHE_OVERRIDE).with_field("request", "/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, Failure::Rejected(_)));
    }
}
