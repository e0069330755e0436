//! Instrumented HTTP client with an ordered, trace-first interceptor chain.
//!
//! Every [`HyperClient`] carries a [`Chain`] of [`Interceptor`]s that see
//! requests before the transport does. The chain always starts with a
//! [`TraceInterceptor`]; interceptors added when the client is built and
//! customizers that edit the chain afterwards may register anywhere they
//! like — including index 0 — and the chain still keeps the trace
//! interceptor executing first, so instrumentation wraps everything else.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wiretap::{Chain, HyperClient, InterceptFuture, Interceptor, Method, Next, Request};
//!
//! struct ApiKey(&'static str);
//!
//! impl Interceptor for ApiKey {
//!     fn name(&self) -> &str {
//!         "api-key"
//!     }
//!
//!     fn intercept(&self, mut request: Request, next: Next) -> InterceptFuture<'_> {
//!         request
//!             .headers_mut()
//!             .insert("x-api-key".to_owned(), self.0.to_owned());
//!         next.run(request)
//!     }
//! }
//!
//! # async fn run() -> wiretap::Result<()> {
//! let client = HyperClient::builder()
//!     .interceptor(ApiKey("secret"))
//!     .customizer(|chain: &mut Chain| {
//!         // Inserting at 0 still lands behind the trace interceptor.
//!         chain.insert(0, Arc::new(ApiKey("audit")));
//!     })
//!     .build();
//!
//! assert_eq!(client.interceptor_names(), ["trace", "api-key", "api-key"]);
//!
//! let url = "https://api.example.com/users".parse().expect("url");
//! let response = client.execute(Request::builder(Method::GET, url).build()).await?;
//! # Ok(())
//! # }
//! ```

mod chain;
mod client;
mod config;
mod error;
mod interceptor;
pub mod prelude;
mod request;
mod response;
mod trace;

pub use chain::Chain;
pub use client::{ClientCustomizer, HyperClient, HyperClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
pub use interceptor::{InterceptFuture, Interceptor, InterceptorId, Next};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use trace::{SAMPLED_HEADER, SPAN_ID_HEADER, TRACE_ID_HEADER, TraceInterceptor};

// Re-export http method and url types used in request building
pub use http::Method;
pub use url::Url;
