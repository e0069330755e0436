//! Convenient re-exports for common usage.

pub use crate::{
    Chain, ClientCustomizer, HyperClient, HyperClientBuilder, InterceptFuture, Interceptor,
    InterceptorId, Method, Next, Request, Response, Result, TraceInterceptor,
};
