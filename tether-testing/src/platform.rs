// Scripted host platform

use crate::mock::{MockRequestTask, MockSocketTask, MockTransferTask};
use crate::storage::MemoryStorage;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tether_client::host::{
    ChunkReceived, DownloadOptions, HeadersReceived, HostCallbacks, HostError, HostResponse,
    KeyValueStorage, Platform, ProgressUpdate, ReleaseChannel, RequestOptions, RequestTask,
    SocketClose, SocketError, SocketMessage, SocketOpen, SocketOptions, SocketTask, TransferTask,
    UploadOptions,
};

/// Host primitive a script applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Request,
    Upload,
    Download,
    Socket,
}

/// How a scripted call settles.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed(HostResponse),
    Fail(HostError),
    /// Drop the callbacks without calling either.
    Abandon,
    /// Never settle; the callbacks are kept alive by the platform.
    Hang,
    /// Panic inside the primitive call.
    Panic(String),
}

/// Event delivered to the task before settlement.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Headers(HeadersReceived),
    Chunk(ChunkReceived),
    Progress(ProgressUpdate),
    Open(SocketOpen),
    Message(SocketMessage),
    Error(SocketError),
    Close(SocketClose),
}

impl TaskEvent {
    /// A headers event with one header.
    pub fn header(name: &str, value: &str) -> Self {
        let mut event = HeadersReceived::default();
        event.header.insert(name.to_string(), value.to_string());
        Self::Headers(event)
    }

    pub fn chunk(data: impl Into<Bytes>) -> Self {
        Self::Chunk(ChunkReceived { data: data.into() })
    }

    /// Progress at `progress` percent of `total` bytes.
    pub fn progress(progress: u8, total: u64) -> Self {
        Self::Progress(ProgressUpdate {
            progress,
            total_bytes: u64::try_from(u128::from(total) * u128::from(progress) / 100)
                .unwrap_or(u64::MAX),
            total_bytes_expected: total,
        })
    }

    pub fn text(message: &str) -> Self {
        Self::Message(SocketMessage::Text(message.to_string()))
    }
}

/// One scripted call.
#[derive(Debug, Clone)]
pub struct Script {
    pub events: Vec<TaskEvent>,
    pub outcome: Outcome,
}

impl Script {
    pub fn succeed(response: HostResponse) -> Self {
        Self {
            events: Vec::new(),
            outcome: Outcome::Succeed(response),
        }
    }

    /// Succeed with `status` and `data`.
    pub fn respond(status: u16, data: impl Into<Value>) -> Self {
        Self::succeed(HostResponse::new(status, data))
    }

    pub fn fail(err_msg: &str) -> Self {
        Self {
            events: Vec::new(),
            outcome: Outcome::Fail(HostError::new(err_msg)),
        }
    }

    pub fn outcome(outcome: Outcome) -> Self {
        Self {
            events: Vec::new(),
            outcome,
        }
    }

    /// Deliver `event` before settling.
    pub fn with_event(mut self, event: TaskEvent) -> Self {
        self.events.push(event);
        self
    }
}

fn default_script(primitive: Primitive) -> Script {
    match primitive {
        Primitive::Request => Script::succeed(
            HostResponse::new(200, Value::Null).with_err_msg("request:ok"),
        ),
        Primitive::Upload => Script::succeed(
            HostResponse::new(200, Value::String(String::new())).with_err_msg("uploadFile:ok"),
        ),
        Primitive::Download => Script::succeed(
            HostResponse::new(200, Value::Null)
                .with_temp_file_path("/tmp/download")
                .with_err_msg("downloadFile:ok"),
        ),
        Primitive::Socket => Script::succeed(HostResponse {
            err_msg: "connectSocket:ok".to_string(),
            ..HostResponse::default()
        }),
    }
}

/// Options a primitive was called with.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Request(RequestOptions),
    Upload(UploadOptions),
    Download(DownloadOptions),
    Socket(SocketOptions),
}

impl RecordedCall {
    pub fn primitive(&self) -> Primitive {
        match self {
            RecordedCall::Request(_) => Primitive::Request,
            RecordedCall::Upload(_) => Primitive::Upload,
            RecordedCall::Download(_) => Primitive::Download,
            RecordedCall::Socket(_) => Primitive::Socket,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            RecordedCall::Request(o) => &o.url,
            RecordedCall::Upload(o) => &o.url,
            RecordedCall::Download(o) => &o.url,
            RecordedCall::Socket(o) => &o.url,
        }
    }
}

/// Handle to whichever mock task a call produced.
#[derive(Clone)]
enum AnyTask {
    Request(Arc<MockRequestTask>),
    Transfer(Arc<MockTransferTask>),
    Socket(Arc<MockSocketTask>),
}

impl AnyTask {
    fn deliver(&self, event: TaskEvent) {
        let delivered = match (self, event) {
            (AnyTask::Request(t), TaskEvent::Headers(e)) => t.emit_headers(e),
            (AnyTask::Request(t), TaskEvent::Chunk(e)) => t.emit_chunk(e),
            (AnyTask::Transfer(t), TaskEvent::Headers(e)) => t.emit_headers(e),
            (AnyTask::Transfer(t), TaskEvent::Progress(e)) => t.emit_progress(e),
            (AnyTask::Socket(t), TaskEvent::Open(e)) => t.emit_open(e),
            (AnyTask::Socket(t), TaskEvent::Message(e)) => t.emit_message(e),
            (AnyTask::Socket(t), TaskEvent::Error(e)) => t.emit_error(e),
            (AnyTask::Socket(t), TaskEvent::Close(e)) => t.emit_close(e),
            (_, event) => {
                tracing::warn!(?event, "Scripted event does not apply to this task");
                false
            }
        };
        if !delivered {
            tracing::trace!("Scripted event had no registered handler");
        }
    }
}

/// In-process [`Platform`] driven by scripts.
///
/// Each primitive call pops the next script for its primitive (or uses a
/// 200 default), records its options, and returns a mock task. Events and
/// settlement run on a spawned tokio task. On a current-thread runtime (the
/// `#[tokio::test]` default) that task only starts once the caller awaits,
/// so hooks bound right after the primitive returns see every event.
pub struct MockPlatform {
    scripts: Mutex<HashMap<Primitive, VecDeque<Script>>>,
    calls: Mutex<Vec<RecordedCall>>,
    request_tasks: Mutex<Vec<Arc<MockRequestTask>>>,
    transfer_tasks: Mutex<Vec<Arc<MockTransferTask>>>,
    socket_tasks: Mutex<Vec<Arc<MockSocketTask>>>,
    hung: Mutex<Vec<HostCallbacks<HostResponse>>>,
    channel: ReleaseChannel,
    storage: Option<Arc<MemoryStorage>>,
}

impl MockPlatform {
    /// A release-channel platform without storage.
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            request_tasks: Mutex::new(Vec::new()),
            transfer_tasks: Mutex::new(Vec::new()),
            socket_tasks: Mutex::new(Vec::new()),
            hung: Mutex::new(Vec::new()),
            channel: ReleaseChannel::Release,
            storage: None,
        }
    }

    pub fn with_release_channel(mut self, channel: ReleaseChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_storage(mut self, storage: Arc<MemoryStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Queue a script for the next call to `primitive`.
    pub fn script(&self, primitive: Primitive, script: Script) -> &Self {
        self.scripts
            .lock()
            .entry(primitive)
            .or_default()
            .push_back(script);
        self
    }

    /// Every primitive call so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The most recent call.
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }

    pub fn request_tasks(&self) -> Vec<Arc<MockRequestTask>> {
        self.request_tasks.lock().clone()
    }

    pub fn transfer_tasks(&self) -> Vec<Arc<MockTransferTask>> {
        self.transfer_tasks.lock().clone()
    }

    pub fn socket_tasks(&self) -> Vec<Arc<MockSocketTask>> {
        self.socket_tasks.lock().clone()
    }

    fn next_script(&self, primitive: Primitive) -> Script {
        self.scripts
            .lock()
            .get_mut(&primitive)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| default_script(primitive))
    }

    fn run(&self, primitive: Primitive, task: AnyTask, callbacks: HostCallbacks<HostResponse>) {
        let Script { events, outcome } = self.next_script(primitive);
        match &outcome {
            Outcome::Panic(message) => panic!("{}", message),
            Outcome::Hang => {
                self.hung.lock().push(callbacks);
                return;
            }
            _ => {}
        }

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            for event in events {
                task.deliver(event);
            }
            match outcome {
                Outcome::Succeed(response) => callbacks.succeed(response),
                Outcome::Fail(error) => callbacks.reject(error),
                _ => drop(callbacks),
            }
        });
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    fn request(
        &self,
        options: RequestOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn RequestTask> {
        self.calls.lock().push(RecordedCall::Request(options));
        let task = Arc::new(MockRequestTask::new());
        self.request_tasks.lock().push(task.clone());
        self.run(Primitive::Request, AnyTask::Request(task.clone()), callbacks);
        task
    }

    fn upload_file(
        &self,
        options: UploadOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn TransferTask> {
        self.calls.lock().push(RecordedCall::Upload(options));
        let task = Arc::new(MockTransferTask::new());
        self.transfer_tasks.lock().push(task.clone());
        self.run(Primitive::Upload, AnyTask::Transfer(task.clone()), callbacks);
        task
    }

    fn download_file(
        &self,
        options: DownloadOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn TransferTask> {
        self.calls.lock().push(RecordedCall::Download(options));
        let task = Arc::new(MockTransferTask::new());
        self.transfer_tasks.lock().push(task.clone());
        self.run(Primitive::Download, AnyTask::Transfer(task.clone()), callbacks);
        task
    }

    fn connect_socket(
        &self,
        options: SocketOptions,
        callbacks: HostCallbacks<HostResponse>,
    ) -> Arc<dyn SocketTask> {
        self.calls.lock().push(RecordedCall::Socket(options));
        let task = Arc::new(MockSocketTask::new());
        self.socket_tasks.lock().push(task.clone());
        self.run(Primitive::Socket, AnyTask::Socket(task.clone()), callbacks);
        task
    }

    fn release_channel(&self) -> ReleaseChannel {
        self.channel
    }

    fn storage(&self) -> Option<Arc<dyn KeyValueStorage>> {
        self.storage
            .clone()
            .map(|storage| storage as Arc<dyn KeyValueStorage>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn callbacks() -> (HostCallbacks<HostResponse>, oneshot::Receiver<Result<HostResponse, HostError>>) {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let fail_tx = tx.clone();
        let callbacks = HostCallbacks::new(
            move |resp| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(Ok(resp));
                }
            },
            move |err| {
                if let Some(tx) = fail_tx.lock().take() {
                    let _ = tx.send(Err(err));
                }
            },
            || {},
        );
        (callbacks, rx)
    }

    fn options(url: &str) -> RequestOptions {
        RequestOptions {
            url: url.to_string(),
            method: tether_client::Method::GET,
            data: Value::Null,
            header: Default::default(),
            timeout: None,
            data_type: None,
            response_type: None,
            with_credentials: None,
        }
    }

    #[test]
    fn test_progress_event_bytes() {
        let TaskEvent::Progress(update) = TaskEvent::progress(25, 400) else {
            panic!("expected a progress event");
        };
        assert_eq!(update.total_bytes, 100);

        let TaskEvent::Progress(update) = TaskEvent::progress(100, u64::MAX) else {
            panic!("expected a progress event");
        };
        assert_eq!(update.total_bytes, u64::MAX);
        assert_eq!(update.total_bytes_expected, u64::MAX);
    }

    #[tokio::test]
    async fn test_default_script_succeeds() {
        let platform = MockPlatform::new();
        let (cb, rx) = callbacks();
        platform.request(options("/a"), cb);

        let resp = rx.await.unwrap().unwrap();
        assert_eq!(resp.status_code, Some(200));
        assert_eq!(platform.last_call().unwrap().url(), "/a");
    }

    #[tokio::test]
    async fn test_scripts_are_consumed_in_order() {
        let platform = MockPlatform::new();
        platform
            .script(Primitive::Request, Script::fail("request:fail"))
            .script(Primitive::Request, Script::respond(201, "second"));

        let (cb, rx) = callbacks();
        platform.request(options("/1"), cb);
        assert!(rx.await.unwrap().is_err());

        let (cb, rx) = callbacks();
        platform.request(options("/2"), cb);
        assert_eq!(rx.await.unwrap().unwrap().status_code, Some(201));
        assert_eq!(platform.call_count(), 2);
    }

    #[tokio::test]
    async fn test_abandon_drops_callbacks() {
        let platform = MockPlatform::new();
        platform.script(Primitive::Socket, Script::outcome(Outcome::Abandon));
        let (cb, rx) = callbacks();
        platform.connect_socket(
            SocketOptions {
                url: "wss://s".into(),
                header: Default::default(),
                method: tether_client::Method::GET,
                protocols: vec![],
                tcp_no_delay: None,
                per_message_deflate: false,
                timeout: None,
            },
            cb,
        );
        assert!(rx.await.is_err());
    }
}
