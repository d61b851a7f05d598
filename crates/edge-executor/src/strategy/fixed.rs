//! Strategies answering without network or cache.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use edge_core::{Failure, HeaderMap, Outcome, Request, Response, StatusCode};

use super::Strategy;
use crate::compile::RouteConfig;
use crate::context::ExecutionContext;

/// Answer with `408 Request Timeout`, touching neither network nor cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignore;

#[async_trait]
impl Strategy for Ignore {
    fn name(&self) -> &str {
        "ignore"
    }

    async fn handle(
        &self,
        _request: &Request,
        _ctx: &ExecutionContext,
        _route: &Arc<RouteConfig>,
    ) -> Outcome {
        Ok(ignore())
    }
}

pub(crate) fn ignore() -> Response {
    Response::new(StatusCode::REQUEST_TIMEOUT).with_date()
}

/// Always answer with a fresh copy of the same response, or the same failure.
#[derive(Debug, Clone)]
pub struct Static {
    value: Result<(StatusCode, HeaderMap, Bytes), Failure>,
}

impl Static {
    /// A fixed response.
    pub fn response(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            value: Ok((status, headers, body.into())),
        }
    }

    /// A fixed `200 OK` with a body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::response(StatusCode::OK, HeaderMap::new(), body)
    }

    /// A fixed failure.
    pub fn failure(failure: Failure) -> Self {
        Self {
            value: Err(failure),
        }
    }
}

#[async_trait]
impl Strategy for Static {
    fn name(&self) -> &str {
        "static"
    }

    async fn handle(
        &self,
        _request: &Request,
        _ctx: &ExecutionContext,
        _route: &Arc<RouteConfig>,
    ) -> Outcome {
        match &self.value {
            Ok((status, headers, body)) => Ok(Response::new(*status)
                .with_headers(headers.clone())
                .with_body(body.clone())
                .with_date()),
            Err(failure) => Err(failure.clone()),
        }
    }
}
