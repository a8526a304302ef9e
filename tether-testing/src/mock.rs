// Mock host task handles

use parking_lot::Mutex;
use std::sync::Arc;
use tether_client::host::{
    ChunkReceived, CloseOptions, HeadersReceived, HostError, HostHandler, ProgressUpdate,
    RequestTask, SocketClose, SocketError, SocketMessage, SocketOpen, SocketTask, TransferTask,
};

type Slot<E> = Mutex<Option<Arc<dyn Fn(E) + Send + Sync>>>;

fn store<E: 'static>(slot: &Slot<E>, handler: HostHandler<E>) {
    *slot.lock() = Some(Arc::from(handler));
}

/// Call the registered handler without holding the slot lock, so handlers
/// may re-register.
fn fire<E>(slot: &Slot<E>, event: E) -> bool {
    let handler = slot.lock().clone();
    match handler {
        Some(handler) => {
            handler(event);
            true
        }
        None => false,
    }
}

/// Record of control calls made on a mock task.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    fn snapshot(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn contains(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }
}

/// Mock plain-request task
#[derive(Default)]
pub struct MockRequestTask {
    log: CallLog,
    headers: Slot<HeadersReceived>,
    chunk: Slot<ChunkReceived>,
}

impl MockRequestTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Control and registration calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.log.snapshot()
    }

    pub fn was_aborted(&self) -> bool {
        self.log.contains("abort")
    }

    /// Deliver a headers event. Returns whether a handler was registered.
    pub fn emit_headers(&self, event: HeadersReceived) -> bool {
        fire(&self.headers, event)
    }

    /// Deliver a body chunk. Returns whether a handler was registered.
    pub fn emit_chunk(&self, event: ChunkReceived) -> bool {
        fire(&self.chunk, event)
    }
}

impl RequestTask for MockRequestTask {
    fn abort(&self) {
        self.log.record("abort");
    }

    fn on_headers_received(&self, handler: HostHandler<HeadersReceived>) {
        self.log.record("on_headers_received");
        store(&self.headers, handler);
    }

    fn off_headers_received(&self) {
        self.log.record("off_headers_received");
        *self.headers.lock() = None;
    }

    fn on_chunk_received(&self, handler: HostHandler<ChunkReceived>) {
        self.log.record("on_chunk_received");
        store(&self.chunk, handler);
    }

    fn off_chunk_received(&self) {
        self.log.record("off_chunk_received");
        *self.chunk.lock() = None;
    }
}

/// Mock upload or download task
#[derive(Default)]
pub struct MockTransferTask {
    log: CallLog,
    progress: Slot<ProgressUpdate>,
    headers: Slot<HeadersReceived>,
}

impl MockTransferTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.snapshot()
    }

    pub fn was_aborted(&self) -> bool {
        self.log.contains("abort")
    }

    pub fn emit_progress(&self, event: ProgressUpdate) -> bool {
        fire(&self.progress, event)
    }

    pub fn emit_headers(&self, event: HeadersReceived) -> bool {
        fire(&self.headers, event)
    }
}

impl TransferTask for MockTransferTask {
    fn abort(&self) {
        self.log.record("abort");
    }

    fn on_progress_update(&self, handler: HostHandler<ProgressUpdate>) {
        self.log.record("on_progress_update");
        store(&self.progress, handler);
    }

    fn off_progress_update(&self) {
        self.log.record("off_progress_update");
        *self.progress.lock() = None;
    }

    fn on_headers_received(&self, handler: HostHandler<HeadersReceived>) {
        self.log.record("on_headers_received");
        store(&self.headers, handler);
    }

    fn off_headers_received(&self) {
        self.log.record("off_headers_received");
        *self.headers.lock() = None;
    }
}

/// Mock socket task
///
/// Frames passed to `send` are kept; sending after `close` fails the way a
/// host would.
#[derive(Default)]
pub struct MockSocketTask {
    log: CallLog,
    sent: Mutex<Vec<SocketMessage>>,
    closed: Mutex<Option<CloseOptions>>,
    open: Slot<SocketOpen>,
    message: Slot<SocketMessage>,
    error: Slot<SocketError>,
    close: Slot<SocketClose>,
}

impl MockSocketTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.snapshot()
    }

    /// Frames sent by the client.
    pub fn sent(&self) -> Vec<SocketMessage> {
        self.sent.lock().clone()
    }

    /// Options the socket was closed with, if closed.
    pub fn closed_with(&self) -> Option<CloseOptions> {
        self.closed.lock().clone()
    }

    pub fn emit_open(&self, event: SocketOpen) -> bool {
        fire(&self.open, event)
    }

    pub fn emit_message(&self, event: SocketMessage) -> bool {
        fire(&self.message, event)
    }

    pub fn emit_error(&self, event: SocketError) -> bool {
        fire(&self.error, event)
    }

    pub fn emit_close(&self, event: SocketClose) -> bool {
        fire(&self.close, event)
    }
}

impl SocketTask for MockSocketTask {
    fn send(&self, message: SocketMessage) -> Result<(), HostError> {
        self.log.record("send");
        if self.closed.lock().is_some() {
            return Err(HostError::new("sendSocketMessage:fail socket is closed"));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    fn close(&self, options: CloseOptions) {
        self.log.record("close");
        *self.closed.lock() = Some(options);
    }

    fn on_open(&self, handler: HostHandler<SocketOpen>) {
        self.log.record("on_open");
        store(&self.open, handler);
    }

    fn on_message(&self, handler: HostHandler<SocketMessage>) {
        self.log.record("on_message");
        store(&self.message, handler);
    }

    fn on_error(&self, handler: HostHandler<SocketError>) {
        self.log.record("on_error");
        store(&self.error, handler);
    }

    fn on_close(&self, handler: HostHandler<SocketClose>) {
        self.log.record("on_close");
        store(&self.close, handler);
    }
}
