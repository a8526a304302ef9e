//! # Tether Client
//!
//! Interceptor-driven request dispatch over host networking primitives.
//!
//! Tether owns no transport. An embedding host implements [`Platform`] over
//! its plain request, multipart upload, file download and socket
//! primitives; Tether layers configuration, interceptors, URL and
//! credential handling, JSON coercion, task hooks, diagnostics and
//! request logs on top.
//!
//! ## Features
//!
//! - **Layered configuration**: library defaults, instance defaults and
//!   per-call options merged field by field
//! - **Interceptors**: request chain (last registered first) and response
//!   chain (registration order), with ejection by id
//! - **Adapter selection**: the transport is inferred from `name`,
//!   `file_path` and `protocols`, or pinned with `kind` or a custom adapter
//! - **Task hooks**: progress, header, chunk and socket events bridged onto
//!   user hooks, with `abort`/`send`/`close` access to the host task
//! - **Diagnostics**: response summaries printed and request logs persisted
//!   to host storage outside release builds
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether_client::{RequestConfig, Tether};
//! use std::sync::Arc;
//!
//! # async fn run(platform: Arc<dyn tether_client::Platform>) -> tether_client::Result<()> {
//! let client = Tether::new(
//!     RequestConfig::builder()
//!         .base_url("https://api.example.com")
//!         .platform(platform)
//!         .build(),
//! );
//!
//! let users = client.get("/users", None, None).await?;
//! println!("{:?}", users.data);
//!
//! client.interceptors().request.add_fn(|mut config| async move {
//!     config.token = Some("secret".into());
//!     Ok(config)
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Uploads, downloads and sockets
//!
//! ```rust,ignore
//! use tether_client::{SocketTaskSpec, RequestConfig};
//!
//! # async fn run(client: tether_client::Tether) -> tether_client::Result<()> {
//! client.upload_file(("/avatar", "/tmp/me.png", "file")).await?;
//! let saved = client.download_file(("/report.pdf", "/docs/report.pdf")).await?;
//!
//! let hooks = SocketTaskSpec::new()
//!     .on_message(|message, _task| println!("{:?}", message.as_text()));
//! client
//!     .connect_socket(("wss://chat.example.com", RequestConfig::builder().task(hooks).build()))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod auth;
mod client;
pub mod config;
mod dispatch;
mod error;
pub mod host;
pub mod instance;
pub mod interceptor;
pub mod logger;
pub mod path;
pub mod printer;
mod request;
mod response;
pub mod task;
pub mod utils;

pub use adapter::{Adapter, RequestKind, get_default_adapter};
pub use auth::BasicAuth;
pub use client::Tether;
pub use config::{HeaderConfig, RequestConfig, RequestConfigBuilder};
pub use dispatch::dispatch_request;
pub use error::{Result, TetherError};
pub use host::{
    HeaderMap, HostCallbacks, HostError, HostResponse, KeyValueStorage, Platform,
    ReleaseChannel, RequestTask, SocketTask, StorageError, TransferTask,
};
pub use instance::{SingletonRegistry, create_instance, shared_instance};
pub use interceptor::{
    InterceptorManager, Interceptors, RequestInterceptor, RequestInterceptorFn,
    ResponseInterceptor, ResponseInterceptorFn,
};
pub use logger::{LogEntry, LogManager};
pub use printer::{ConsolePrinter, PrintManager, ResponseSummary};
pub use request::{DownloadCall, SocketCall, UploadCall};
pub use response::Response;
pub use task::{RequestTaskSpec, SocketTaskSpec, TaskSpec, TransferTaskSpec};

/// Re-exported so callers can name methods without depending on `http`.
pub use http::Method;
