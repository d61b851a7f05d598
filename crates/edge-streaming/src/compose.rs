//! Ordered composition of sub-response bodies.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use edge_core::{Body, BodyStream, Failure, HeaderMap, Outcome};
use futures::channel::oneshot;
use futures::stream::{self, StreamExt};
use http::header;
use tracing::debug;

/// A composed response: headers, streamed body and a completion signal.
#[derive(Debug)]
pub struct Composition {
    /// Headers of the first part that resolved to a response, without
    /// `Content-Length`.
    pub headers: HeaderMap,
    /// Concatenated part bodies, in list order.
    pub body: Body,
    /// Resolves once the body has been read to the end or dropped.
    pub completion: Completion,
}

/// Resolves when a composed body is fully consumed or abandoned.
#[derive(Debug)]
pub struct Completion(oneshot::Receiver<()>);

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx).map(|_| ())
    }
}

enum Part<F> {
    Resolved(Outcome),
    Pending(F),
}

impl<F: Future<Output = Outcome>> Part<F> {
    async fn resolve(self) -> Outcome {
        match self {
            Self::Resolved(outcome) => outcome,
            Self::Pending(fut) => fut.await,
        }
    }
}

/// Compose part outcomes into a single streamed body.
///
/// Parts are consumed strictly in list order, whatever order they complete
/// in; callers that want parts to make progress concurrently should start
/// them before calling (e.g. spawn them and pass the join futures). A part
/// that failed contributes a stream error at its position.
///
/// Parts are awaited in order until one resolves to a response, whose
/// headers become the composed headers.
pub async fn compose<F>(parts: Vec<F>) -> Composition
where
    F: Future<Output = Outcome> + Send + 'static,
{
    let total = parts.len();
    let mut pending = parts.into_iter();
    let mut resolved = Vec::new();
    let mut headers = HeaderMap::new();

    for fut in pending.by_ref() {
        let outcome = fut.await;
        let found = match &outcome {
            Ok(response) => {
                headers = response.headers().clone();
                true
            }
            Err(_) => false,
        };
        resolved.push(Part::Resolved(outcome));
        if found {
            break;
        }
    }
    headers.remove(header::CONTENT_LENGTH);
    debug!(parts = total, resolved_for_headers = resolved.len(), "composing body");

    let parts = resolved
        .into_iter()
        .chain(pending.map(Part::Pending))
        .collect::<Vec<_>>();

    let (done_tx, done_rx) = oneshot::channel();
    let chunks = stream::iter(parts)
        .then(|part| part.resolve())
        .map(part_chunks)
        .flatten();
    let finish = stream::once(async move {
        let _ = done_tx.send(());
    })
    .filter_map(|()| async { None::<Result<Bytes, Failure>> });

    Composition {
        headers,
        body: Body::from_stream(chunks.chain(finish)),
        completion: Completion(done_rx),
    }
}

fn part_chunks(outcome: Outcome) -> BodyStream {
    match outcome {
        Ok(response) => {
            let (_, _, body) = response.into_parts();
            match body {
                Body::Full(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
                Body::Stream(inner) => inner,
            }
        }
        Err(failure) => Box::pin(stream::once(async move { Err(failure) })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{HeaderValue, Response, StatusCode};
    use futures::future::BoxFuture;
    use futures::FutureExt;

    fn text(body: &'static str) -> Response {
        Response::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html"))
            .with_header(header::CONTENT_LENGTH, HeaderValue::from_static("1"))
            .with_body(body)
    }

    fn channel_part() -> (
        oneshot::Sender<Outcome>,
        impl Future<Output = Outcome> + Send + 'static,
    ) {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let part = rx.map(|r| r.unwrap_or_else(|_| Err(Failure::Stream("dropped".into()))));
        (tx, part)
    }

    #[tokio::test]
    async fn test_list_order_not_completion_order() {
        let (a_tx, a) = channel_part();
        let (b_tx, b) = channel_part();
        let (c_tx, c) = channel_part();

        tokio::spawn(async move {
            c_tx.send(Ok(text("c"))).unwrap();
            tokio::task::yield_now().await;
            b_tx.send(Ok(text("b"))).unwrap();
            tokio::task::yield_now().await;
            a_tx.send(Ok(text("a"))).unwrap();
        });

        let composition = compose(vec![a, b, c]).await;
        assert_eq!(composition.body.collect().await.unwrap(), Bytes::from("abc"));
    }

    #[tokio::test]
    async fn test_headers_from_first_response() {
        let parts: Vec<BoxFuture<'static, Outcome>> = vec![
            async { Err(Failure::network("https://x/a", "offline")) }.boxed(),
            async { Ok(text("b")) }.boxed(),
        ];
        let composition = compose(parts).await;

        assert_eq!(
            composition.headers.get(header::CONTENT_TYPE).unwrap(),
            "text/html"
        );
        assert!(composition.headers.get(header::CONTENT_LENGTH).is_none());
        assert!(composition.body.collect().await.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_completion_after_consumption() {
        let parts: Vec<BoxFuture<'static, Outcome>> =
            vec![async { Ok(text("a")) }.boxed(), async { Ok(text("b")) }.boxed()];
        let Composition {
            body, completion, ..
        } = compose(parts).await;

        let mut completion = completion;
        assert!((&mut completion).now_or_never().is_none());
        assert_eq!(body.collect().await.unwrap(), Bytes::from("ab"));
        completion.await;
    }

    #[tokio::test]
    async fn test_completion_when_body_dropped() {
        let parts: Vec<BoxFuture<'static, Outcome>> = vec![async { Ok(text("a")) }.boxed()];
        let composition = compose(parts).await;
        drop(composition.body);
        composition.completion.await;
    }

    #[tokio::test]
    async fn test_nested_streams_are_forwarded() {
        let inner = stream::iter(vec![Ok(Bytes::from("1")), Ok(Bytes::from("2"))]);
        let nested = Response::new(StatusCode::OK).with_body(Body::from_stream(inner));
        let parts: Vec<BoxFuture<'static, Outcome>> = vec![
            async { Ok(text("<")) }.boxed(),
            async move { Ok(nested) }.boxed(),
            async { Ok(text(">")) }.boxed(),
        ];

        let composition = compose(parts).await;
        assert_eq!(composition.body.collect().await.unwrap(), Bytes::from("<12>"));
    }
}
