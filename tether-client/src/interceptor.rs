//! Request and response interceptors.

use crate::{RequestConfig, Response, Result, TetherError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

/// Runs on the merged configuration before dispatch.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Inspect or rewrite the configuration.
    async fn fulfilled(&self, config: RequestConfig) -> Result<RequestConfig> {
        Ok(config)
    }

    /// Called with the error when this interceptor's own `fulfilled` fails.
    /// The returned error rejects the call.
    async fn rejected(&self, error: TetherError) -> TetherError {
        error
    }
}

/// Runs on the settled dispatch result.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Inspect or rewrite a successful response.
    async fn fulfilled(&self, response: Response) -> Result<Response> {
        Ok(response)
    }

    /// Handle an error from dispatch or an earlier interceptor. Returning
    /// `Ok` recovers the call.
    async fn rejected(&self, error: TetherError) -> Result<Response> {
        Err(error)
    }
}

/// Request interceptor built from a closure.
pub struct RequestInterceptorFn<F> {
    f: F,
}

impl<F, Fut> RequestInterceptorFn<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestConfig>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> RequestInterceptor for RequestInterceptorFn<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestConfig>> + Send,
{
    async fn fulfilled(&self, config: RequestConfig) -> Result<RequestConfig> {
        (self.f)(config).await
    }
}

/// Response interceptor built from a closure.
pub struct ResponseInterceptorFn<F> {
    f: F,
}

impl<F, Fut> ResponseInterceptorFn<F>
where
    F: Fn(Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ResponseInterceptor for ResponseInterceptorFn<F>
where
    F: Fn(Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn fulfilled(&self, response: Response) -> Result<Response> {
        (self.f)(response).await
    }
}

/// Ordered interceptor registrations.
///
/// Ids are slot indices. Ejecting leaves a hole, so ids never shift and are
/// never reused.
pub struct InterceptorManager<I: ?Sized> {
    handlers: RwLock<Vec<Option<Arc<I>>>>,
}

impl<I: ?Sized> InterceptorManager<I> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an interceptor and return its id.
    pub fn add(&self, interceptor: Arc<I>) -> usize {
        let mut handlers = self.handlers.write();
        handlers.push(Some(interceptor));
        handlers.len() - 1
    }

    /// Remove the interceptor registered under `id`.
    pub fn eject(&self, id: usize) {
        if let Some(slot) = self.handlers.write().get_mut(id) {
            *slot = None;
        }
    }

    /// Visit live interceptors in registration order.
    pub fn for_each(&self, mut visit: impl FnMut(&Arc<I>)) {
        for handler in self.handlers.read().iter().flatten() {
            visit(handler);
        }
    }

    /// Live interceptors in registration order.
    pub fn snapshot(&self) -> Vec<Arc<I>> {
        self.handlers.read().iter().flatten().cloned().collect()
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.handlers.read().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eject everything. Existing ids stay retired.
    pub fn clear(&self) {
        for slot in self.handlers.write().iter_mut() {
            *slot = None;
        }
    }
}

impl<I: ?Sized> Default for InterceptorManager<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized> std::fmt::Debug for InterceptorManager<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("InterceptorManager")
            .field("registered", &handlers.len())
            .field("live", &handlers.iter().flatten().count())
            .finish()
    }
}

impl InterceptorManager<dyn RequestInterceptor> {
    /// Register a closure as a request interceptor.
    pub fn add_fn<F, Fut>(&self, f: F) -> usize
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestConfig>> + Send + 'static,
    {
        self.add(Arc::new(RequestInterceptorFn::new(f)))
    }

    /// Run the chain, last registered first.
    pub async fn run(&self, mut config: RequestConfig) -> Result<RequestConfig> {
        for interceptor in self.snapshot().iter().rev() {
            config = match interceptor.fulfilled(config).await {
                Ok(config) => config,
                Err(error) => {
                    tracing::debug!(error = %error, "Request interceptor failed");
                    return Err(interceptor.rejected(error).await);
                }
            };
        }
        Ok(config)
    }
}

impl InterceptorManager<dyn ResponseInterceptor> {
    /// Register a closure as a response interceptor.
    pub fn add_fn<F, Fut>(&self, f: F) -> usize
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.add(Arc::new(ResponseInterceptorFn::new(f)))
    }

    /// Thread a dispatch result through the chain in registration order.
    pub async fn run(&self, mut result: Result<Response>) -> Result<Response> {
        for interceptor in self.snapshot() {
            result = match result {
                Ok(response) => interceptor.fulfilled(response).await,
                Err(error) => interceptor.rejected(error).await,
            };
        }
        result
    }
}

/// The two interceptor chains of a client.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<dyn RequestInterceptor>,
    pub response: InterceptorManager<dyn ResponseInterceptor>,
}
