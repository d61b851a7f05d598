//! Spans for dispatches.

use edge_core::{Request, RequestId};
use tracing::{debug_span, info_span, Span};

/// Span wrapping one top-level dispatch.
pub fn request_span(request_id: &RequestId, request: &Request) -> Span {
    info_span!(
        "dispatch",
        request_id = %request_id,
        method = %request.method(),
        url = %request.url(),
    )
}

/// Span wrapping a nested dispatch (e.g. a partition sub-request).
///
/// Entered inside the parent's span, so the request id is inherited.
pub fn inline_span(request: &Request) -> Span {
    debug_span!(
        "dispatch_inline",
        method = %request.method(),
        url = %request.url(),
    )
}
