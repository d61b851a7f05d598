//! Shared fixtures for the executor integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use edge_cache::CacheStore;
use edge_core::{
    Failure, HeaderMap, HeaderName, HeaderValue, Outcome, Request, Response, StatusCode,
};
use edge_data::Network;
use edge_executor::{
    AfterHook, AfterNetworkHook, BeforeHook, BeforeNetworkHook, Directive, ExecutionContext,
    Middleware, RouteConfig,
};

pub const ORIGIN: &str = "https://example.com";
pub const PAST: &str = "Thu, 01 Jan 1970 00:00:00 GMT";
pub const FUTURE: &str = "Fri, 01 Jan 2100 00:00:00 GMT";

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

pub fn get(path: &str) -> Request {
    Request::get(&url(path)).unwrap()
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    delay: Option<Duration>,
}

/// Scripted network: answers known URLs, rejects the rest, counts calls.
#[derive(Default)]
pub struct MockNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `path` with a status, headers and body.
    pub fn respond(&self, path: &str, status: u16, headers: &[(&str, &str)], body: &str) {
        self.respond_after(path, status, headers, body, None);
    }

    /// Like [`respond`](Self::respond), answering only after `delay`.
    pub fn respond_after(
        &self,
        path: &str,
        status: u16,
        headers: &[(&str, &str)],
        body: &str,
        delay: Option<Duration>,
    ) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let reply = Reply {
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body: Bytes::from(body.to_string()),
            delay,
        };
        self.replies.lock().unwrap().insert(url(path), reply);
    }

    /// Forget the scripted answer for `path`; fetching it fails afterwards.
    pub fn go_offline(&self, path: &str) {
        self.replies.lock().unwrap().remove(&url(path));
    }

    pub fn calls(&self, path: &str) -> usize {
        let target = url(path);
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, Failure> {
        let url = request.url().to_string();
        self.calls.lock().unwrap().push(url.clone());
        let reply = self.replies.lock().unwrap().get(&url).cloned();
        let Some(reply) = reply else {
            return Err(Failure::network(url, "offline"));
        };
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Response::new(reply.status)
            .with_headers(reply.headers)
            .with_body(reply.body))
    }
}

pub fn context(network: &Arc<MockNetwork>) -> (ExecutionContext, Arc<CacheStore>) {
    let store = Arc::new(CacheStore::in_memory());
    let network: Arc<dyn Network> = network.clone();
    (ExecutionContext::new(Arc::clone(&store), network), store)
}

/// Seed the store with a response carrying an `Expires` header.
pub async fn seed(store: &CacheStore, key: &str, path: &str, body: &str, expires: &str) {
    let response = Response::new(StatusCode::OK)
        .with_header(http::header::EXPIRES, HeaderValue::from_str(expires).unwrap())
        .with_body(body.to_string());
    store.put(key, &url(path), &response).await.unwrap();
}

pub type Log = Arc<Mutex<Vec<String>>>;

/// Middleware recording every stage it runs as `name:stage`.
pub struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    pub fn middleware(name: &'static str, log: &Log) -> Middleware {
        let recorder = Arc::new(Recorder {
            name,
            log: Arc::clone(log),
        });
        Middleware::all_stages(name, recorder)
    }

    fn record(&self, stage: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, stage));
    }
}

#[async_trait]
impl BeforeHook for Recorder {
    async fn before(&self, request: Request, _: &ExecutionContext, _: &RouteConfig) -> Directive {
        self.record("before");
        request.into()
    }
}

#[async_trait]
impl BeforeNetworkHook for Recorder {
    async fn before_network(
        &self,
        request: Request,
        _: &ExecutionContext,
        _: &RouteConfig,
    ) -> Request {
        self.record("before_network");
        request
    }
}

#[async_trait]
impl AfterNetworkHook for Recorder {
    async fn after_network(
        &self,
        _: &Request,
        outcome: Outcome,
        _: &ExecutionContext,
        _: &RouteConfig,
    ) -> Outcome {
        self.record("after_network");
        outcome
    }
}

#[async_trait]
impl AfterHook for Recorder {
    async fn after(
        &self,
        _: &Request,
        outcome: Outcome,
        _: &ExecutionContext,
        _: &RouteConfig,
    ) -> Outcome {
        self.record("after");
        outcome
    }
}
