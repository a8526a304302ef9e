//! Host platform primitives.
//!
//! Tether performs no I/O of its own. An embedding host implements
//! [`Platform`] over its four asynchronous networking primitives and,
//! optionally, a synchronous key-value store. Every primitive takes an
//! options struct plus [`HostCallbacks`] and immediately returns a task
//! handle; settlement happens later through the callbacks.

use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Header mapping as exchanged with the host.
pub type HeaderMap = BTreeMap<String, String>;

/// Handler registered on a host task through one of its `on_*` methods.
pub type HostHandler<E> = Box<dyn Fn(E) + Send + Sync>;

// ============================================================================
// Errors
// ============================================================================

/// Failure payload delivered through a primitive's `fail` callback.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{err_msg}")]
pub struct HostError {
    /// Host-provided message, e.g. `request:fail timeout`.
    pub err_msg: String,
    /// Host-specific numeric code, when the host supplies one.
    pub err_code: Option<i32>,
}

impl HostError {
    /// Create a host error with just a message.
    pub fn new(err_msg: impl Into<String>) -> Self {
        Self {
            err_msg: err_msg.into(),
            err_code: None,
        }
    }

    /// Attach a numeric code.
    pub fn with_code(mut self, code: i32) -> Self {
        self.err_code = Some(code);
        self
    }
}

/// Failure raised by the host key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

// ============================================================================
// Environment
// ============================================================================

/// Release channel reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    /// Local development build.
    Develop,
    /// Pre-release / trial build.
    Trial,
    /// Production build.
    #[default]
    Release,
}

impl ReleaseChannel {
    /// Whether local printing and logging default to enabled on this channel.
    pub fn diagnostics_enabled(&self) -> bool {
        !matches!(self, ReleaseChannel::Release)
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Success, failure and completion callbacks handed to a primitive.
///
/// A host must call exactly one of `success`/`fail`, then `complete`.
/// [`HostCallbacks::succeed`] and [`HostCallbacks::reject`] do both.
pub struct HostCallbacks<T> {
    /// Called with the primitive's result on success.
    pub success: Box<dyn FnOnce(T) + Send>,
    /// Called with the failure payload.
    pub fail: Box<dyn FnOnce(HostError) + Send>,
    /// Called after either of the above.
    pub complete: Box<dyn FnOnce() + Send>,
}

impl<T> HostCallbacks<T> {
    /// Build a callback set.
    pub fn new(
        success: impl FnOnce(T) + Send + 'static,
        fail: impl FnOnce(HostError) + Send + 'static,
        complete: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            success: Box::new(success),
            fail: Box::new(fail),
            complete: Box::new(complete),
        }
    }

    /// Fire `success` then `complete`.
    pub fn succeed(self, value: T) {
        (self.success)(value);
        (self.complete)();
    }

    /// Fire `fail` then `complete`.
    pub fn reject(self, error: HostError) {
        (self.fail)(error);
        (self.complete)();
    }
}

impl<T> std::fmt::Debug for HostCallbacks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCallbacks").finish_non_exhaustive()
    }
}

/// Result delivered by every primitive's `success` callback.
///
/// Fields a primitive does not produce stay at their defaults: a socket
/// connection carries no status code, only a download fills the file paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostResponse {
    /// HTTP status code, absent for socket connections.
    pub status_code: Option<u16>,
    /// Response body. Text bodies arrive as `Value::String`.
    pub data: Value,
    /// Response headers.
    pub header: HeaderMap,
    /// `Set-Cookie` values.
    pub cookies: Vec<String>,
    /// Temporary path of a downloaded file.
    pub temp_file_path: Option<String>,
    /// Final path of a downloaded file when the caller chose one.
    pub file_path: Option<String>,
    /// Host status message, e.g. `request:ok`.
    pub err_msg: String,
}

impl HostResponse {
    /// A response with a status and body.
    pub fn new(status_code: u16, data: impl Into<Value>) -> Self {
        Self {
            status_code: Some(status_code),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(name.into(), value.into());
        self
    }

    /// Set the host status message.
    pub fn with_err_msg(mut self, msg: impl Into<String>) -> Self {
        self.err_msg = msg.into();
        self
    }

    /// Set the temporary download path.
    pub fn with_temp_file_path(mut self, path: impl Into<String>) -> Self {
        self.temp_file_path = Some(path.into());
        self
    }
}

// ============================================================================
// Primitive options
// ============================================================================

/// Options for the plain request primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub url: String,
    pub method: Method,
    pub data: Value,
    pub header: HeaderMap,
    pub timeout: Option<Duration>,
    pub data_type: Option<String>,
    pub response_type: Option<String>,
    pub with_credentials: Option<bool>,
}

/// Options for the multipart upload primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub url: String,
    pub file_path: String,
    /// Form field name the file is sent under.
    pub name: String,
    pub header: HeaderMap,
    /// Additional form fields.
    pub form_data: Value,
    pub timeout: Option<Duration>,
}

/// Options for the file download primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub url: String,
    pub header: HeaderMap,
    pub timeout: Option<Duration>,
    /// Destination path; empty lets the host pick a temporary file.
    pub file_path: String,
}

/// Options for the socket primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketOptions {
    pub url: String,
    pub header: HeaderMap,
    pub method: Method,
    pub protocols: Vec<String>,
    pub tcp_no_delay: Option<bool>,
    pub per_message_deflate: bool,
    pub timeout: Option<Duration>,
}

// ============================================================================
// Task events
// ============================================================================

/// Upload or download progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Percentage, 0-100.
    pub progress: u8,
    /// Bytes sent (upload) or written (download) so far.
    pub total_bytes: u64,
    /// Bytes expected in total.
    pub total_bytes_expected: u64,
}

/// Response headers arrived ahead of the body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeadersReceived {
    pub header: HeaderMap,
}

/// A chunk of a streamed response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReceived {
    pub data: Bytes,
}

/// Socket connection opened.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocketOpen {
    pub header: HeaderMap,
}

/// A socket frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    Text(String),
    Binary(Bytes),
}

impl SocketMessage {
    /// Text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SocketMessage::Text(text) => Some(text),
            SocketMessage::Binary(_) => None,
        }
    }
}

/// Socket-level error reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocketError {
    pub err_msg: String,
}

/// Socket closed, by either side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocketClose {
    pub code: u16,
    pub reason: String,
}

/// Arguments to [`SocketTask::close`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseOptions {
    pub code: Option<u16>,
    pub reason: Option<String>,
}

// ============================================================================
// Task handles
// ============================================================================

/// Handle returned by the plain request primitive.
pub trait RequestTask: Send + Sync {
    /// Abort the in-flight request.
    fn abort(&self);
    fn on_headers_received(&self, handler: HostHandler<HeadersReceived>);
    fn off_headers_received(&self);
    fn on_chunk_received(&self, handler: HostHandler<ChunkReceived>);
    fn off_chunk_received(&self);
}

/// Handle returned by the upload and download primitives.
pub trait TransferTask: Send + Sync {
    /// Abort the transfer.
    fn abort(&self);
    fn on_progress_update(&self, handler: HostHandler<ProgressUpdate>);
    fn off_progress_update(&self);
    fn on_headers_received(&self, handler: HostHandler<HeadersReceived>);
    fn off_headers_received(&self);
}

/// Handle returned by the socket primitive.
///
/// Registered handlers keep the returned handle alive until the host fires
/// `on_close`, so the host only needs to keep its own connection state.
pub trait SocketTask: Send + Sync {
    /// Send a frame over the open connection.
    fn send(&self, message: SocketMessage) -> Result<(), HostError>;
    /// Close the connection.
    fn close(&self, options: CloseOptions);
    fn on_open(&self, handler: HostHandler<SocketOpen>);
    fn on_message(&self, handler: HostHandler<SocketMessage>);
    fn on_error(&self, handler: HostHandler<SocketError>);
    fn on_close(&self, handler: HostHandler<SocketClose>);
}

// ============================================================================
// Platform
// ============================================================================

/// Synchronous key-value store offered by the host.
pub trait KeyValueStorage: Send + Sync {
    fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError>;
    fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError>;
}

/// The embedding host.
pub trait Platform: Send + Sync {
    /// Plain HTTP request.
    fn request(
        &self,
        options: RequestOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn RequestTask>;

    /// Multipart file upload.
    fn upload_file(
        &self,
        options: UploadOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn TransferTask>;

    /// File download.
    fn download_file(
        &self,
        options: DownloadOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn TransferTask>;

    /// Persistent socket connection. `success` fires once the connection
    /// request is accepted, not per message. Handlers registered on the task
    /// stay live after that, until `on_close` fires.
    fn connect_socket(
        &self,
        options: SocketOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn SocketTask>;

    /// Current release channel.
    fn release_channel(&self) -> ReleaseChannel {
        ReleaseChannel::Release
    }

    /// Key-value store used for request logs, if the host has one.
    fn storage(&self) -> Option<Arc<dyn KeyValueStorage>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_diagnostics_follow_release_channel() {
        assert!(ReleaseChannel::Develop.diagnostics_enabled());
        assert!(ReleaseChannel::Trial.diagnostics_enabled());
        assert!(!ReleaseChannel::Release.diagnostics_enabled());
    }

    #[test]
    fn test_callbacks_fire_complete_after_settlement() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (events.clone(), events.clone(), events.clone());
        let callbacks = HostCallbacks::new(
            move |resp: HostResponse| a.lock().push(format!("ok {:?}", resp.status_code)),
            move |err| b.lock().push(format!("fail {}", err)),
            move || c.lock().push("complete".to_string()),
        );

        callbacks.succeed(HostResponse::new(204, Value::Null));
        assert_eq!(*events.lock(), vec!["ok Some(204)", "complete"]);
    }

    #[test]
    fn test_host_error_display() {
        let err = HostError::new("request:fail timeout").with_code(5);
        assert_eq!(err.to_string(), "request:fail timeout");
        assert_eq!(err.err_code, Some(5));
    }
}
