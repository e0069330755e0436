//! HTTP client implementation using hyper-util.
//!
//! [`HyperClient`] owns one interceptor [`Chain`] and a pooled hyper
//! transport. Requests flow through the chain in order; the chain keeps the
//! trace interceptor in front no matter how it was edited. Two registration
//! sites feed the chain without coordinating with each other:
//!
//! - construction-time: [`HyperClientBuilder::interceptor`] appends in call
//!   order while the client is built;
//! - post-construction: [`ClientCustomizer`]s registered on the builder run
//!   once per built client against the live chain, and
//!   [`HyperClient::customize`] does the same for an already-built client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

use crate::{
    Error, Request, Response, Result,
    chain::Chain,
    config::{ClientConfig, ClientConfigBuilder},
    interceptor::{Interceptor, InterceptorId, Next, Transport},
    trace::TraceInterceptor,
};

// ============================================================================
// Connector
// ============================================================================

/// HTTPS-or-HTTP connector with rustls and the Mozilla root certificates.
fn https_connector() -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build()
}

// ============================================================================
// Raw Client (internal, terminal step of every chain)
// ============================================================================

/// Raw HTTP client using hyper-util (internal implementation).
#[derive(Clone)]
struct RawHyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl RawHyperClient {
    fn new(config: ClientConfig) -> Self {
        let connector = https_connector();

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner, config }
    }

    /// Build a hyper request from a wiretap request.
    fn build_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder().method(method).uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = tokio::time::timeout(self.config.timeout, self.inner.request(hyper_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::new(status, response_headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

// ============================================================================
// Customizers (post-construction registration site)
// ============================================================================

/// A post-construction registration site.
///
/// Customizers registered via [`HyperClientBuilder::customizer`] are invoked
/// exactly once per built client, strictly after construction-time
/// interceptors are in place, with mutable access to the live chain. A
/// customizer may insert at any index, including 0; the chain still keeps
/// the trace interceptor in front afterwards.
///
/// Closures of type `Fn(&mut Chain)` implement this trait.
pub trait ClientCustomizer: Send + Sync {
    /// Edit the chain of a freshly built client.
    fn customize(&self, chain: &mut Chain);
}

impl<F> ClientCustomizer for F
where
    F: Fn(&mut Chain) + Send + Sync,
{
    fn customize(&self, chain: &mut Chain) {
        self(chain);
    }
}

// ============================================================================
// Public Client
// ============================================================================

/// HTTP client with connection pooling, TLS, and an interceptor chain.
///
/// Every client starts its chain with a trace interceptor and keeps it in
/// front of whatever the registration sites add.
///
/// # Example
///
/// ```ignore
/// use wiretap::HyperClient;
/// use std::time::Duration;
///
/// let client = HyperClient::builder()
///     .timeout(Duration::from_secs(10))
///     .interceptor(MyAuthInterceptor::new())
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperClient {
    chain: Arc<Mutex<Chain>>,
    transport: RawHyperClient,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .field("interceptors", &self.interceptor_names())
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration and only the trace
    /// interceptor in its chain.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a request through the interceptor chain.
    ///
    /// The chain order is snapshotted up front, so edits made while the
    /// request is in flight affect later requests only.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let interceptors = self.lock_chain().snapshot();

        let raw = self.transport.clone();
        let transport: Transport = Arc::new(move |request| {
            let raw = raw.clone();
            Box::pin(async move { raw.execute(request).await })
        });

        Next::new(interceptors, transport).run(request).await
    }

    /// Apply a post-construction edit to the live chain.
    ///
    /// The hook gets mutable access and may insert at any index, including
    /// 0. Each chain mutator re-asserts the trace-first invariant, so the
    /// chain is consistent again by the time this returns.
    pub fn customize<F>(&self, hook: F)
    where
        F: FnOnce(&mut Chain),
    {
        let mut chain = self.lock_chain();
        hook(&mut chain);
    }

    /// Current chain order as interceptor identities (verification query,
    /// no side effects).
    #[must_use]
    pub fn effective_order(&self) -> Vec<InterceptorId> {
        self.lock_chain().effective_order()
    }

    /// Current chain order as interceptor names.
    #[must_use]
    pub fn interceptor_names(&self) -> Vec<String> {
        self.lock_chain()
            .names()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect()
    }

    fn lock_chain(&self) -> std::sync::MutexGuard<'_, Chain> {
        self.chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder (construction-time registration site)
// ============================================================================

/// Builder for [`HyperClient`].
///
/// Interceptors added here are appended to the chain in call order, after
/// the trace interceptor. Customizers run once per built client after that,
/// against the live chain.
///
/// # Example
///
/// ```ignore
/// let client = HyperClient::builder()
///     .interceptor(AuthInterceptor::new(token))
///     .customizer(|chain: &mut Chain| chain.insert(0, Arc::new(Audit)))
///     .build();
/// // Chain order: [trace, Audit, AuthInterceptor]
/// ```
#[derive(Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
    trace: Option<Arc<dyn Interceptor>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    customizers: Vec<Arc<dyn ClientCustomizer>>,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("interceptors_count", &self.interceptors.len())
            .field("customizers_count", &self.customizers.len())
            .finish()
    }
}

impl HyperClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Replace the default [`TraceInterceptor`] instance.
    ///
    /// Whatever instance the chain is built with becomes the protected
    /// identity the chain keeps in front.
    #[must_use]
    pub fn trace_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.trace = Some(interceptor);
        self
    }

    /// Append an interceptor (construction-time registration).
    ///
    /// Interceptors are appended in call order, behind the trace interceptor.
    #[must_use]
    pub fn interceptor<I>(self, interceptor: I) -> Self
    where
        I: Interceptor,
    {
        self.interceptors_from([Arc::new(interceptor) as Arc<dyn Interceptor>])
    }

    /// Append already-shared interceptors in the order given.
    ///
    /// An empty sequence is a no-op.
    #[must_use]
    pub fn interceptors_from(
        mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>,
    ) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    /// Register a post-construction customizer.
    ///
    /// Runs once per built client, after construction-time interceptors.
    #[must_use]
    pub fn customizer<C>(mut self, customizer: C) -> Self
    where
        C: ClientCustomizer + 'static,
    {
        self.customizers.push(Arc::new(customizer));
        self
    }

    /// Register a customizer shared with other builders.
    ///
    /// Useful when one customizer instance is applied to several clients;
    /// each built client still gets exactly one invocation.
    #[must_use]
    pub fn shared_customizer(mut self, customizer: Arc<dyn ClientCustomizer>) -> Self {
        self.customizers.push(customizer);
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client and assemble its chain.
    ///
    /// Assembly order: trace interceptor, then construction-time
    /// interceptors in call order, then each customizer once. After the last
    /// customizer returns, the trace interceptor is at index 0.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config.build();

        let trace = self
            .trace
            .unwrap_or_else(|| Arc::new(TraceInterceptor::new()));
        let mut chain = Chain::new(trace);

        for interceptor in self.interceptors {
            chain.push(interceptor);
        }

        for customizer in &self.customizers {
            customizer.customize(&mut chain);
        }

        HyperClient {
            chain: Arc::new(Mutex::new(chain)),
            transport: RawHyperClient::new(config.clone()),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_default() {
        let client = HyperClient::new();
        assert_eq!(client.config().timeout, Duration::from_secs(30));
        assert_eq!(client.interceptor_names(), vec!["trace"]);
    }

    #[test]
    fn client_builder_config() {
        let client = HyperClient::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .build();

        assert_eq!(client.config().timeout, Duration::from_secs(60));
        assert_eq!(client.config().pool_idle_per_host, 16);
    }

    #[test]
    fn client_is_clone() {
        let client = HyperClient::new();
        let _cloned = client.clone();
    }

    #[test]
    fn client_is_debug() {
        let client = HyperClient::new();
        let debug = format!("{client:?}");
        assert!(debug.contains("HyperClient"));
        assert!(debug.contains("trace"));
    }

    #[test]
    fn builder_is_debug() {
        let builder = HyperClient::builder();
        let debug = format!("{builder:?}");
        assert!(debug.contains("HyperClientBuilder"));
    }
}
