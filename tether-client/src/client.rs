//! Client façade.

use crate::dispatch::dispatch_request;
use crate::instance::create_instance;
use crate::interceptor::Interceptors;
use crate::request::{DownloadCall, SocketCall, UploadCall};
use crate::{RequestConfig, Response, Result, TetherError};
use futures::FutureExt;
use futures::future::{select_all, try_join_all};
use http::Method;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

/// Request client holding instance defaults and interceptor chains.
///
/// Cloning is cheap; clones share defaults and interceptors.
#[derive(Clone)]
pub struct Tether {
    inner: Arc<Inner>,
}

struct Inner {
    defaults: RequestConfig,
    interceptors: Interceptors,
}

impl Tether {
    /// Create a client whose defaults are the library defaults with `config`
    /// layered on top.
    pub fn new(config: RequestConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                defaults: RequestConfig::library_defaults().merge(&config),
                interceptors: Interceptors::default(),
            }),
        }
    }

    /// Instance defaults.
    pub fn defaults(&self) -> &RequestConfig {
        &self.inner.defaults
    }

    /// Request and response interceptor chains.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Tether) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Send a request. A string is shorthand for `{ url }`.
    pub async fn request(&self, config: impl Into<RequestConfig>) -> Result<Response> {
        let mut config = self.inner.defaults.merge(&config.into());
        config.method = Some(config.http_method().to_string());

        let interceptors = &self.inner.interceptors;
        let config = interceptors.request.run(config).await?;

        let result = AssertUnwindSafe(dispatch_request(config))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(TetherError::Panicked(panic_message(panic))));

        interceptors.response.run(result).await
    }

    /// Send a request to `url` with extra options.
    pub async fn request_with(
        &self,
        url: impl Into<String>,
        mut config: RequestConfig,
    ) -> Result<Response> {
        config.url = Some(url.into());
        self.request(config).await
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        let base = RequestConfig {
            url: Some(url),
            method: Some(method.to_string()),
            data,
            ..RequestConfig::default()
        };
        let config = match config {
            Some(config) => base.merge(&config),
            None => base,
        };
        self.request(config).await
    }

    pub async fn get(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::GET, url.into(), data, config).await
    }

    pub async fn delete(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::DELETE, url.into(), data, config).await
    }

    pub async fn head(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::HEAD, url.into(), data, config).await
    }

    pub async fn options(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::OPTIONS, url.into(), data, config).await
    }

    pub async fn post(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::POST, url.into(), data, config).await
    }

    pub async fn put(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::PUT, url.into(), data, config).await
    }

    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.send(Method::PATCH, url.into(), data, config).await
    }

    /// Upload a file as multipart form data.
    ///
    /// Takes a config or `(url, file_path, name[, config])`.
    pub async fn upload_file(&self, call: impl Into<UploadCall>) -> Result<Response> {
        let config = call.into().into_config()?;
        self.request(config).await
    }

    /// Download a file. Takes a config, a URL, or `(url, file_path[, config])`.
    pub async fn download_file(&self, call: impl Into<DownloadCall>) -> Result<Response> {
        self.request(call.into().into_config()).await
    }

    /// Open a socket. Takes a config, a URL, `(url, protocols)` or `(url, config)`.
    ///
    /// Resolves once the host accepts the connection; frames flow through
    /// the socket task hooks.
    pub async fn connect_socket(&self, call: impl Into<SocketCall>) -> Result<Response> {
        self.request(call.into().into_config()).await
    }

    /// Derive an independent client from this one's defaults.
    ///
    /// The child never joins the shared instance, whatever `overrides` say.
    pub fn create(&self, mut overrides: RequestConfig) -> Tether {
        overrides.use_singleton = Some(false);
        create_instance(self.inner.defaults.merge(&overrides))
    }

    /// Await every request, failing on the first error.
    pub async fn all<I, F, T>(requests: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T>>,
    {
        try_join_all(requests).await
    }

    /// Settle with whichever request settles first.
    pub async fn race<I, F, T>(requests: I) -> Result<T>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T>>,
    {
        let pending: Vec<_> = requests.into_iter().map(Box::pin).collect();
        if pending.is_empty() {
            return Err(TetherError::config("race needs at least one request"));
        }
        let (first, index, rest) = select_all(pending).await;
        debug!(index, dropped = rest.len(), "Race settled");
        first
    }
}

impl Default for Tether {
    fn default() -> Self {
        Self::new(RequestConfig::default())
    }
}

impl std::fmt::Debug for Tether {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tether")
            .field("defaults", &self.inner.defaults)
            .field("interceptors", &self.inner.interceptors)
            .finish()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
