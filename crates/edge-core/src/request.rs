//! Immutable request value.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// An intercepted request.
///
/// Requests are values: every `with_*` method consumes the request and
/// returns the edited copy, so a stage never observes an in-place edit made
/// by another stage.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Parse an absolute URL into a GET request.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The URL with any `#fragment` removed.
    pub fn url_without_fragment(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    /// Copy with a different URL; method, headers and body are kept.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// Copy with a different method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Copy with a header set (replacing existing values).
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Copy with a body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}
