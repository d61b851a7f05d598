//! Response value.

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

use crate::body::Body;
use crate::date;
use crate::error::Failure;

/// A response produced by the network, the cache, or a strategy.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// Create a response with an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Assemble a response from parts.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// `true` when the status is in 200..=299.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Response body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Split into parts.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header, replacing existing values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Remove a header.
    pub fn without_header(mut self, name: &HeaderName) -> Self {
        self.headers.remove(name);
        self
    }

    /// Stamp a `Date` header with the current time unless one is present.
    pub fn with_date(mut self) -> Self {
        if !self.headers.contains_key(header::DATE) {
            if let Ok(value) = HeaderValue::from_str(&date::now_http_date()) {
                self.headers.insert(header::DATE, value);
            }
        }
        self
    }

    /// Clone a response with a buffered body. Streamed responses return `None`.
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
        })
    }

    /// Buffer a streamed body so the response can be cloned.
    pub async fn buffered(self) -> Result<Self, Failure> {
        if !self.body.is_stream() {
            return Ok(self);
        }
        let bytes = self.body.collect().await?;
        Ok(Self {
            status: self.status,
            headers: self.headers,
            body: Body::Full(bytes),
        })
    }

    /// Consume the response and read its body.
    pub async fn bytes(self) -> Result<Bytes, Failure> {
        self.body.collect().await
    }

    /// Consume the response and read its body as UTF-8 text (lossy).
    pub async fn text(self) -> Result<String, Failure> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_range() {
        assert!(Response::new(StatusCode::OK).is_ok());
        assert!(Response::new(StatusCode::NO_CONTENT).is_ok());
        assert!(!Response::new(StatusCode::NOT_MODIFIED).is_ok());
        assert!(!Response::new(StatusCode::NOT_FOUND).is_ok());
    }

    #[test]
    fn test_with_date_keeps_existing() {
        let response = Response::new(StatusCode::OK)
            .with_header(header::DATE, HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"))
            .with_date();
        assert_eq!(response.header("date"), Some("Sun, 06 Nov 1994 08:49:37 GMT"));

        let stamped = Response::new(StatusCode::OK).with_date();
        assert!(stamped.header("date").is_some());
    }

    #[tokio::test]
    async fn test_buffered_allows_clone() {
        let stream = futures::stream::iter(vec![Ok(Bytes::from("x"))]);
        let response = Response::new(StatusCode::OK).with_body(Body::from_stream(stream));
        assert!(response.try_clone().is_none());

        let response = response.buffered().await.unwrap();
        let copy = response.try_clone().unwrap();
        assert_eq!(copy.text().await.unwrap(), "x");
    }
}
