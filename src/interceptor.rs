//! Interceptor model: the trait, instance identity, and chain traversal.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Boxed future returned by interceptors and the transport.
pub type InterceptFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// Terminal step of a chain: whatever actually sends the request.
pub(crate) type Transport = Arc<dyn Fn(Request) -> InterceptFuture<'static> + Send + Sync>;

/// A unit of request/response processing composed into an ordered chain.
///
/// An interceptor sees the outgoing request before the transport does. It may
/// rewrite the request, short-circuit with its own [`Response`], or delegate
/// to the remainder of the chain with [`Next::run`]. Interceptors must not
/// assume anything about their position in the chain: the chain is free to
/// reorder around them to keep its own guarantees.
///
/// # Example
///
/// ```
/// use wiretap::{InterceptFuture, Interceptor, Next, Request};
///
/// struct UserAgent;
///
/// impl Interceptor for UserAgent {
///     fn name(&self) -> &str {
///         "user-agent"
///     }
///
///     fn intercept(&self, mut request: Request, next: Next) -> InterceptFuture<'_> {
///         request
///             .headers_mut()
///             .insert("User-Agent".to_owned(), "wiretap".to_owned());
///         next.run(request)
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    /// Short name used in logs and debug output.
    fn name(&self) -> &str;

    /// Process the request, optionally delegating to the rest of the chain.
    fn intercept(&self, request: Request, next: Next) -> InterceptFuture<'_>;
}

/// Identity of one interceptor instance within a chain.
///
/// Identity is the `Arc` allocation address: two ids compare equal only when
/// they refer to the same instance. Value equality of the underlying
/// interceptors plays no role, so two separately-registered interceptors of
/// the same type are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

impl InterceptorId {
    /// Identity of the given instance.
    #[must_use]
    pub fn of(interceptor: &Arc<dyn Interceptor>) -> Self {
        Self(Arc::as_ptr(interceptor).cast::<()>() as usize)
    }
}

/// The not-yet-run tail of a chain, ending at the transport.
///
/// Passed by value to [`Interceptor::intercept`]; calling [`Next::run`]
/// consumes it, so an interceptor delegates at most once.
pub struct Next {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    index: usize,
    transport: Transport,
}

impl Next {
    pub(crate) fn new(interceptors: Arc<[Arc<dyn Interceptor>]>, transport: Transport) -> Self {
        Self {
            interceptors,
            index: 0,
            transport,
        }
    }

    /// Number of interceptors still ahead of the transport.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.interceptors.len().saturating_sub(self.index)
    }

    /// Run the remainder of the chain on `request`.
    pub fn run(mut self, request: Request) -> InterceptFuture<'static> {
        match self.interceptors.get(self.index).cloned() {
            Some(interceptor) => {
                self.index += 1;
                Box::pin(async move { interceptor.intercept(request, self).await })
            }
            None => (self.transport)(request),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}
