//! Trace context propagation interceptor.
//!
//! [`TraceInterceptor`] is the privileged head of every chain: it wraps the
//! rest of the chain in a `tracing` span and stamps B3 propagation headers on
//! the outgoing request, so instrumentation observes everything the other
//! interceptors do. The chain itself guarantees it runs first; nothing here
//! depends on position.

use rand::random;
use tracing::{Instrument, Level, debug, span, warn};

use crate::interceptor::{InterceptFuture, Interceptor, Next};
use crate::Request;

/// Header carrying the 128-bit trace id, hex encoded.
pub const TRACE_ID_HEADER: &str = "x-b3-traceid";

/// Header carrying the 64-bit span id, hex encoded.
pub const SPAN_ID_HEADER: &str = "x-b3-spanid";

/// Header marking the request as sampled.
pub const SAMPLED_HEADER: &str = "x-b3-sampled";

/// Interceptor that opens a span per request and injects B3 trace headers.
///
/// An incoming `x-b3-traceid` on the request is kept, so callers already part
/// of a trace stay in it; the span id is always freshly generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceInterceptor;

impl TraceInterceptor {
    /// Create a new trace interceptor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for TraceInterceptor {
    fn name(&self) -> &str {
        "trace"
    }

    fn intercept(&self, mut request: Request, next: Next) -> InterceptFuture<'_> {
        let trace_id = request
            .header(TRACE_ID_HEADER)
            .map_or_else(|| format!("{:032x}", random::<u128>()), ToOwned::to_owned);
        let span_id = format!("{:016x}", random::<u64>());

        let headers = request.headers_mut();
        headers.insert(TRACE_ID_HEADER.to_owned(), trace_id.clone());
        headers.insert(SPAN_ID_HEADER.to_owned(), span_id.clone());
        headers.insert(SAMPLED_HEADER.to_owned(), "1".to_owned());

        let method = request.method().clone();
        let url = request.url().to_string();
        let span = span!(
            Level::INFO,
            "http_request",
            %method,
            %url,
            trace_id = %trace_id,
            span_id = %span_id,
        );

        Box::pin(
            async move {
                let result = next.run(request).await;

                match &result {
                    Ok(response) => {
                        debug!(status = response.status(), "request traced");
                    }
                    Err(err) => {
                        warn!(error = %err, "traced request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
