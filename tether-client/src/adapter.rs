//! Transport adapters.
//!
//! An adapter turns a fully merged [`RequestConfig`] into a host call and a
//! future of its [`Response`]. Four built-ins wrap the four host primitives;
//! [`get_default_adapter`] picks one per request.

use crate::auth::{AUTHORIZATION, authorization};
use crate::config::insert_header;
use crate::host::{
    DownloadOptions, HeaderMap, HostCallbacks, HostError, HostResponse, Platform, RequestOptions,
    SocketOptions, UploadOptions,
};
use crate::task::{self, Echo};
use crate::{RequestConfig, Response, Result, TetherError};
use futures::future::BoxFuture;
use http::Method;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Future returned by an adapter.
pub type AdapterFuture = BoxFuture<'static, Result<Response>>;

type AdapterFn = Arc<dyn Fn(RequestConfig) -> AdapterFuture + Send + Sync>;

pub const REQUEST_ADAPTER: &str = "request";
pub const UPLOAD_ADAPTER: &str = "uploadFile";
pub const DOWNLOAD_ADAPTER: &str = "downloadFile";
pub const SOCKET_ADAPTER: &str = "connectSocket";

/// Multipart content type forced on uploads.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Which host primitive serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Plain,
    Upload,
    Download,
    Socket,
}

impl RequestKind {
    /// Infer the transport from which optional fields are present.
    ///
    /// | fields                       | kind     |
    /// |------------------------------|----------|
    /// | `name` and `file_path`       | Upload   |
    /// | `file_path` without `name`   | Download |
    /// | `protocols`                  | Socket   |
    /// | otherwise                    | Plain    |
    ///
    /// Only presence matters; an empty `file_path` still selects Download.
    pub fn classify(config: &RequestConfig) -> Self {
        match (&config.name, &config.file_path, &config.protocols) {
            (Some(_), Some(_), _) => RequestKind::Upload,
            (None, Some(_), _) => RequestKind::Download,
            (_, _, Some(_)) => RequestKind::Socket,
            _ => RequestKind::Plain,
        }
    }

    /// Name the matching built-in adapter reports.
    pub fn adapter_name(&self) -> &'static str {
        match self {
            RequestKind::Plain => REQUEST_ADAPTER,
            RequestKind::Upload => UPLOAD_ADAPTER,
            RequestKind::Download => DOWNLOAD_ADAPTER,
            RequestKind::Socket => SOCKET_ADAPTER,
        }
    }
}

/// A named request handler.
#[derive(Clone)]
pub struct Adapter {
    name: Cow<'static, str>,
    handler: AdapterFn,
}

impl Adapter {
    /// Wrap a custom handler.
    pub fn new<F, Fut>(name: impl Into<Cow<'static, str>>, handler: F) -> Self
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |config| Box::pin(handler(config))),
        }
    }

    /// The built-in adapter for `kind`.
    pub fn for_kind(kind: RequestKind) -> Self {
        let handler: AdapterFn = match kind {
            RequestKind::Plain => Arc::new(request_adapter),
            RequestKind::Upload => Arc::new(upload_adapter),
            RequestKind::Download => Arc::new(download_adapter),
            RequestKind::Socket => Arc::new(socket_adapter),
        };
        Self {
            name: Cow::Borrowed(kind.adapter_name()),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the adapter.
    pub fn call(&self, config: RequestConfig) -> AdapterFuture {
        (self.handler)(config)
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter").field("name", &self.name).finish()
    }
}

/// Choose the built-in adapter for `config`, honouring an explicit `kind`.
pub fn get_default_adapter(config: &RequestConfig) -> Adapter {
    Adapter::for_kind(config.kind.unwrap_or_else(|| RequestKind::classify(config)))
}

// ============================================================================
// Shared steps
// ============================================================================

/// Full URL and outgoing headers, credentials included.
fn preprocess(config: &RequestConfig) -> (String, HeaderMap) {
    let url = config.full_url();
    let mut header = config.header.resolve(&config.http_method());
    if let Some(value) = authorization(config.auth.as_ref(), config.token.as_deref()) {
        insert_header(&mut header, AUTHORIZATION, &value);
    }
    (url, header)
}

fn require_platform(config: &RequestConfig, adapter: &str) -> Result<Arc<dyn Platform>> {
    config
        .platform
        .clone()
        .ok_or_else(|| TetherError::config(format!("{} adapter needs a host platform", adapter)))
}

/// Host callbacks paired with a future that settles when one of them fires.
fn settlement(
    adapter: &'static str,
) -> (
    HostCallbacks<HostResponse>,
    impl Future<Output = Result<HostResponse>> + Send + 'static,
) {
    let (tx, rx) = oneshot::channel::<std::result::Result<HostResponse, HostError>>();
    let success_tx = Arc::new(Mutex::new(Some(tx)));
    let fail_tx = success_tx.clone();

    let callbacks = HostCallbacks::new(
        move |response| {
            if let Some(tx) = success_tx.lock().take() {
                let _ = tx.send(Ok(response));
            }
        },
        move |error| {
            if let Some(tx) = fail_tx.lock().take() {
                let _ = tx.send(Err(error));
            }
        },
        move || tracing::trace!(adapter, "Host task complete"),
    );

    let settled = async move {
        match rx.await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err(TetherError::Transport(error)),
            Err(_) => Err(TetherError::Abandoned {
                adapter: adapter.to_string(),
            }),
        }
    };

    (callbacks, settled)
}

// ============================================================================
// Built-in adapters
// ============================================================================

fn request_adapter(config: RequestConfig) -> AdapterFuture {
    Box::pin(async move {
        let platform = require_platform(&config, REQUEST_ADAPTER)?;
        let (url, header) = preprocess(&config);
        let options = RequestOptions {
            url,
            method: config.http_method(),
            data: config.data.clone().unwrap_or(Value::Object(Map::new())),
            header,
            timeout: config.timeout,
            data_type: config.data_type.clone(),
            response_type: config.response_type.clone(),
            with_credentials: config.with_credentials,
        };

        let (callbacks, settled) = settlement(REQUEST_ADAPTER);
        let task = platform.request(options, callbacks);
        let retained = config
            .task
            .as_ref()
            .map(|spec| task::bind_request(spec, &task, Echo::from_config(&config, REQUEST_ADAPTER)));

        let settled = settled.await;
        if let Some(retained) = &retained {
            retained.release();
        }
        let host = settled?;
        Ok(Response::from_host(host, config))
    })
}

fn non_empty<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn upload_adapter(config: RequestConfig) -> AdapterFuture {
    Box::pin(async move {
        let (Some(name), Some(file_path)) = (non_empty(&config.name), non_empty(&config.file_path))
        else {
            return Err(TetherError::config(
                "uploadFile requires a non-empty `name` and `file_path`",
            ));
        };
        let platform = require_platform(&config, UPLOAD_ADAPTER)?;
        let (url, mut header) = preprocess(&config);
        insert_header(&mut header, "Content-Type", MULTIPART_CONTENT_TYPE);

        let options = UploadOptions {
            url,
            file_path: file_path.to_string(),
            name: name.to_string(),
            header,
            form_data: config.data.clone().unwrap_or(Value::Object(Map::new())),
            timeout: config.timeout,
        };

        let (callbacks, settled) = settlement(UPLOAD_ADAPTER);
        let task = platform.upload_file(options, callbacks);
        let retained = config
            .task
            .as_ref()
            .map(|spec| task::bind_transfer(spec, &task, Echo::from_config(&config, UPLOAD_ADAPTER), true));

        let settled = settled.await;
        if let Some(retained) = &retained {
            retained.release();
        }
        let host = settled?;
        let mut config = config;
        config.method = Some(Method::POST.to_string());
        Ok(Response::from_host(host, config))
    })
}

fn download_adapter(config: RequestConfig) -> AdapterFuture {
    Box::pin(async move {
        let platform = require_platform(&config, DOWNLOAD_ADAPTER)?;
        let (url, header) = preprocess(&config);
        let options = DownloadOptions {
            url,
            header,
            timeout: config.timeout,
            file_path: config.file_path.clone().unwrap_or_default(),
        };

        let (callbacks, settled) = settlement(DOWNLOAD_ADAPTER);
        let task = platform.download_file(options, callbacks);
        let retained = config
            .task
            .as_ref()
            .map(|spec| task::bind_transfer(spec, &task, Echo::from_config(&config, DOWNLOAD_ADAPTER), false));

        let settled = settled.await;
        if let Some(retained) = &retained {
            retained.release();
        }
        let host = settled?;
        let mut config = config;
        config.method = Some(Method::GET.to_string());
        Ok(Response::from_host(host, config))
    })
}

fn socket_adapter(config: RequestConfig) -> AdapterFuture {
    Box::pin(async move {
        let platform = require_platform(&config, SOCKET_ADAPTER)?;
        let (url, header) = preprocess(&config);
        let options = SocketOptions {
            url,
            header,
            method: config.http_method(),
            protocols: config.protocols.clone().unwrap_or_default(),
            tcp_no_delay: config.tcp_no_delay,
            per_message_deflate: config.per_message_deflate.unwrap_or(false),
            timeout: config.timeout,
        };

        let (callbacks, settled) = settlement(SOCKET_ADAPTER);
        let task = platform.connect_socket(options, callbacks);
        let retained = config
            .task
            .as_ref()
            .map(|spec| task::bind_socket(spec, &task, Echo::from_config(&config, SOCKET_ADAPTER)));

        // An open socket stays retained until its close event.
        let settled = settled.await;
        if let (Err(_), Some(retained)) = (&settled, &retained) {
            retained.release();
        }
        let host = settled?;
        Ok(Response::from_host(host, config))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BasicAuth;

    fn config() -> RequestConfig {
        RequestConfig::default()
    }

    #[test]
    fn test_classify_upload() {
        let c = RequestConfig::builder().name("n").file_path("f").build();
        assert_eq!(RequestKind::classify(&c), RequestKind::Upload);
    }

    #[test]
    fn test_classify_download_with_empty_path() {
        let c = RequestConfig::builder().file_path("").build();
        assert_eq!(RequestKind::classify(&c), RequestKind::Download);
    }

    #[test]
    fn test_classify_socket_and_plain() {
        let c = RequestConfig {
            protocols: Some(vec![]),
            ..config()
        };
        assert_eq!(RequestKind::classify(&c), RequestKind::Socket);
        assert_eq!(RequestKind::classify(&config()), RequestKind::Plain);
    }

    #[test]
    fn test_classify_precedence() {
        let c = RequestConfig::builder()
            .name("n")
            .file_path("f")
            .protocols(["p"])
            .build();
        assert_eq!(RequestKind::classify(&c), RequestKind::Upload);

        let c = RequestConfig::builder().file_path("f").protocols(["p"]).build();
        assert_eq!(RequestKind::classify(&c), RequestKind::Download);

        let c = RequestConfig::builder().name("n").build();
        assert_eq!(RequestKind::classify(&c), RequestKind::Plain);
    }

    #[test]
    fn test_explicit_kind_wins() {
        let c = RequestConfig::builder()
            .file_path("f")
            .kind(RequestKind::Plain)
            .build();
        assert_eq!(get_default_adapter(&c).name(), REQUEST_ADAPTER);
        assert_eq!(
            get_default_adapter(&RequestConfig::builder().protocols(["x"]).build()).name(),
            SOCKET_ADAPTER
        );
    }

    #[test]
    fn test_preprocess_adds_authorization() {
        let c = RequestConfig {
            base_url: Some("https://a.com".into()),
            url: Some("/x".into()),
            auth: Some(BasicAuth::new("u", "p")),
            token: Some("t".into()),
            ..config()
        };
        let (url, header) = preprocess(&c);
        assert_eq!(url, "https://a.com/x");
        assert_eq!(header.get(AUTHORIZATION).map(String::as_str), Some("Bearer t"));
    }

    #[test]
    fn test_preprocess_without_credentials() {
        let (_, header) = preprocess(&config());
        assert!(!header.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_upload_requires_name_and_path() {
        let c = RequestConfig::builder().name("").file_path("f").build();
        let err = Adapter::for_kind(RequestKind::Upload).call(c).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_missing_platform_is_config_error() {
        let err = Adapter::for_kind(RequestKind::Plain)
            .call(config())
            .await
            .unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_settlement_resolves_and_rejects() {
        let (callbacks, settled) = settlement(REQUEST_ADAPTER);
        callbacks.succeed(HostResponse::new(200, "ok"));
        assert_eq!(settled.await.unwrap().status_code, Some(200));

        let (callbacks, settled) = settlement(REQUEST_ADAPTER);
        callbacks.reject(HostError::new("request:fail"));
        assert!(settled.await.unwrap_err().is_transport());

        let (callbacks, settled) = settlement(SOCKET_ADAPTER);
        drop(callbacks);
        assert!(matches!(
            settled.await.unwrap_err(),
            TetherError::Abandoned { .. }
        ));
    }

    #[tokio::test]
    async fn test_custom_adapter() {
        let adapter = Adapter::new("echo", |config: RequestConfig| async move {
            Ok(Response::from_host(HostResponse::new(200, "echo"), config))
        });
        assert_eq!(adapter.name(), "echo");
        let resp = adapter.call(config()).await.unwrap();
        assert_eq!(resp.text(), Some("echo"));
    }
}
