//! Task hooks.
//!
//! Each transport kind has its own hook set. Event hooks are registered on
//! the host task and receive the event payload plus the task handle; control
//! hooks (`abort`, `send`, `close`) run once, immediately after the host
//! returns the task, so callers can keep the handle for later use.

use crate::host::{
    ChunkReceived, HeadersReceived, HostHandler, ProgressUpdate, RequestTask, SocketClose,
    SocketError, SocketMessage, SocketOpen, SocketTask, TransferTask,
};
use crate::printer::{PrintManager, resolve_printer};
use crate::RequestConfig;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;

/// Hook receiving a host event and the task it came from.
pub type EventHook<E, T> = Arc<dyn Fn(E, &Arc<T>) + Send + Sync>;

/// Hook receiving the task handle once, at dispatch.
pub type ControlHook<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

macro_rules! hook_setters {
    ($(#[$doc:meta])* event $field:ident : $event:ty => $task:ty) => {
        $(#[$doc])*
        pub fn $field<F>(mut self, hook: F) -> Self
        where
            F: Fn($event, &Arc<$task>) + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(hook));
            self
        }
    };
    ($(#[$doc:meta])* control $field:ident => $task:ty) => {
        $(#[$doc])*
        pub fn $field<F>(mut self, hook: F) -> Self
        where
            F: Fn(&Arc<$task>) + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(hook));
            self
        }
    };
}

/// Hooks for a plain request.
#[derive(Clone, Default)]
pub struct RequestTaskSpec {
    pub on_headers_received: Option<EventHook<HeadersReceived, dyn RequestTask>>,
    pub on_chunk_received: Option<EventHook<ChunkReceived, dyn RequestTask>>,
    pub abort: Option<ControlHook<dyn RequestTask>>,
}

impl RequestTaskSpec {
    pub fn new() -> Self {
        Self::default()
    }

    hook_setters!(event on_headers_received: HeadersReceived => dyn RequestTask);
    hook_setters!(event on_chunk_received: ChunkReceived => dyn RequestTask);
    hook_setters!(
        /// Receives the task so the caller can abort it later.
        control abort => dyn RequestTask
    );

    fn hooks(&self) -> Vec<&'static str> {
        let mut hooks = Vec::new();
        if self.on_headers_received.is_some() {
            hooks.push("onHeadersReceived");
        }
        if self.on_chunk_received.is_some() {
            hooks.push("onChunkReceived");
        }
        if self.abort.is_some() {
            hooks.push("abort");
        }
        hooks
    }
}

/// Hooks for an upload or download.
#[derive(Clone, Default)]
pub struct TransferTaskSpec {
    pub on_progress_update: Option<EventHook<ProgressUpdate, dyn TransferTask>>,
    pub on_headers_received: Option<EventHook<HeadersReceived, dyn TransferTask>>,
    pub abort: Option<ControlHook<dyn TransferTask>>,
}

impl TransferTaskSpec {
    pub fn new() -> Self {
        Self::default()
    }

    hook_setters!(event on_progress_update: ProgressUpdate => dyn TransferTask);
    hook_setters!(event on_headers_received: HeadersReceived => dyn TransferTask);
    hook_setters!(
        /// Receives the task so the caller can abort it later.
        control abort => dyn TransferTask
    );

    fn hooks(&self) -> Vec<&'static str> {
        let mut hooks = Vec::new();
        if self.on_progress_update.is_some() {
            hooks.push("onProgressUpdate");
        }
        if self.on_headers_received.is_some() {
            hooks.push("onHeadersReceived");
        }
        if self.abort.is_some() {
            hooks.push("abort");
        }
        hooks
    }
}

/// Hooks for a socket connection.
#[derive(Clone, Default)]
pub struct SocketTaskSpec {
    pub on_open: Option<EventHook<SocketOpen, dyn SocketTask>>,
    pub on_message: Option<EventHook<SocketMessage, dyn SocketTask>>,
    pub on_error: Option<EventHook<SocketError, dyn SocketTask>>,
    pub on_close: Option<EventHook<SocketClose, dyn SocketTask>>,
    pub send: Option<ControlHook<dyn SocketTask>>,
    pub close: Option<ControlHook<dyn SocketTask>>,
}

impl SocketTaskSpec {
    pub fn new() -> Self {
        Self::default()
    }

    hook_setters!(event on_open: SocketOpen => dyn SocketTask);
    hook_setters!(event on_message: SocketMessage => dyn SocketTask);
    hook_setters!(event on_error: SocketError => dyn SocketTask);
    hook_setters!(event on_close: SocketClose => dyn SocketTask);
    hook_setters!(
        /// Receives the task so the caller can send frames on it.
        control send => dyn SocketTask
    );
    hook_setters!(
        /// Receives the task so the caller can close it later.
        control close => dyn SocketTask
    );

    fn hooks(&self) -> Vec<&'static str> {
        [
            ("onOpen", self.on_open.is_some()),
            ("onMessage", self.on_message.is_some()),
            ("onError", self.on_error.is_some()),
            ("onClose", self.on_close.is_some()),
            ("send", self.send.is_some()),
            ("close", self.close.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Task hooks, tagged with the transport they apply to.
#[derive(Clone)]
pub enum TaskSpec {
    Request(RequestTaskSpec),
    Upload(TransferTaskSpec),
    Download(TransferTaskSpec),
    Socket(SocketTaskSpec),
}

impl TaskSpec {
    pub fn upload(spec: TransferTaskSpec) -> Self {
        Self::Upload(spec)
    }

    pub fn download(spec: TransferTaskSpec) -> Self {
        Self::Download(spec)
    }

    fn label(&self) -> &'static str {
        match self {
            TaskSpec::Request(_) => "request",
            TaskSpec::Upload(_) => "upload",
            TaskSpec::Download(_) => "download",
            TaskSpec::Socket(_) => "socket",
        }
    }
}

impl From<RequestTaskSpec> for TaskSpec {
    fn from(spec: RequestTaskSpec) -> Self {
        Self::Request(spec)
    }
}

impl From<SocketTaskSpec> for TaskSpec {
    fn from(spec: SocketTaskSpec) -> Self {
        Self::Socket(spec)
    }
}

impl Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks = match self {
            TaskSpec::Request(spec) => spec.hooks(),
            TaskSpec::Upload(spec) | TaskSpec::Download(spec) => spec.hooks(),
            TaskSpec::Socket(spec) => spec.hooks(),
        };
        f.debug_struct("TaskSpec")
            .field("kind", &self.label())
            .field("hooks", &hooks)
            .finish()
    }
}

// ============================================================================
// Binding
// ============================================================================

/// Printer echo for bridged events.
#[derive(Clone)]
pub(crate) struct Echo {
    printer: Arc<dyn PrintManager>,
    adapter: String,
}

impl Echo {
    pub(crate) fn from_config(config: &RequestConfig, adapter: &str) -> Option<Self> {
        resolve_printer(config).map(|printer| Self {
            printer,
            adapter: adapter.to_string(),
        })
    }
}

/// Task handle shared by the hooks bridged onto it.
///
/// Bridged hooks keep the task alive until [`Retained::release`] runs, so a
/// host that only keeps its own inner state still reaches the hooks. Request
/// and transfer tasks are released once they settle; a socket is released
/// when it closes or fails to connect.
pub(crate) struct Retained<T: ?Sized> {
    slot: Arc<Mutex<Option<Arc<T>>>>,
}

impl<T: ?Sized> Clone for Retained<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: ?Sized> Retained<T> {
    fn new(task: &Arc<T>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(task.clone()))),
        }
    }

    fn empty() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().clone()
    }

    /// Drop the hooks' hold on the task.
    pub(crate) fn release(&self) {
        self.slot.lock().take();
    }
}

fn bridge<E, T>(
    hook: &EventHook<E, T>,
    retained: &Retained<T>,
    echo: &Option<Echo>,
    event: &'static str,
) -> HostHandler<E>
where
    E: Debug + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    let hook = hook.clone();
    let retained = retained.clone();
    let echo = echo.clone();
    Box::new(move |payload: E| {
        let Some(task) = retained.get() else {
            tracing::trace!(event, "Task released before event delivery");
            return;
        };
        let detail = echo.as_ref().map(|_| format!("{:?}", payload));
        hook(payload, &task);
        if let (Some(echo), Some(detail)) = (&echo, detail) {
            echo.printer.print_task_event(&echo.adapter, event, &detail);
        }
    })
}

fn mismatch(spec: &TaskSpec, expected: &'static str) {
    tracing::warn!(
        task = spec.label(),
        adapter = expected,
        "Task hooks do not match the selected adapter; ignoring them"
    );
}

pub(crate) fn bind_request(
    spec: &TaskSpec,
    task: &Arc<dyn RequestTask>,
    echo: Option<Echo>,
) -> Retained<dyn RequestTask> {
    let TaskSpec::Request(spec) = spec else {
        mismatch(spec, "request");
        return Retained::empty();
    };
    let retained = Retained::new(task);
    if let Some(hook) = &spec.on_headers_received {
        task.on_headers_received(bridge(hook, &retained, &echo, "onHeadersReceived"));
    }
    if let Some(hook) = &spec.on_chunk_received {
        task.on_chunk_received(bridge(hook, &retained, &echo, "onChunkReceived"));
    }
    if let Some(abort) = &spec.abort {
        abort(task);
    }
    retained
}

pub(crate) fn bind_transfer(
    spec: &TaskSpec,
    task: &Arc<dyn TransferTask>,
    echo: Option<Echo>,
    upload: bool,
) -> Retained<dyn TransferTask> {
    let spec = match (spec, upload) {
        (TaskSpec::Upload(spec), true) | (TaskSpec::Download(spec), false) => spec,
        (other, upload) => {
            mismatch(other, if upload { "upload" } else { "download" });
            return Retained::empty();
        }
    };
    let retained = Retained::new(task);
    if let Some(hook) = &spec.on_progress_update {
        task.on_progress_update(bridge(hook, &retained, &echo, "onProgressUpdate"));
    }
    if let Some(hook) = &spec.on_headers_received {
        task.on_headers_received(bridge(hook, &retained, &echo, "onHeadersReceived"));
    }
    if let Some(abort) = &spec.abort {
        abort(task);
    }
    retained
}

/// Bind socket hooks. A close handler is always registered so the task is
/// released when the connection closes, after the user's `on_close` hook.
pub(crate) fn bind_socket(
    spec: &TaskSpec,
    task: &Arc<dyn SocketTask>,
    echo: Option<Echo>,
) -> Retained<dyn SocketTask> {
    let TaskSpec::Socket(spec) = spec else {
        mismatch(spec, "socket");
        return Retained::empty();
    };
    let retained = Retained::new(task);
    if let Some(hook) = &spec.on_open {
        task.on_open(bridge(hook, &retained, &echo, "onOpen"));
    }
    if let Some(hook) = &spec.on_message {
        task.on_message(bridge(hook, &retained, &echo, "onMessage"));
    }
    if let Some(hook) = &spec.on_error {
        task.on_error(bridge(hook, &retained, &echo, "onError"));
    }

    let on_close = spec
        .on_close
        .as_ref()
        .map(|hook| bridge(hook, &retained, &echo, "onClose"));
    let releaser = retained.clone();
    task.on_close(Box::new(move |event: SocketClose| {
        if let Some(on_close) = &on_close {
            on_close(event);
        }
        releaser.release();
    }));

    if let Some(send) = &spec.send {
        send(task);
    }
    if let Some(close) = &spec.close {
        close(task);
    }
    retained
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullRequestTask;

    impl RequestTask for NullRequestTask {
        fn abort(&self) {}
        fn on_headers_received(&self, _handler: HostHandler<HeadersReceived>) {}
        fn off_headers_received(&self) {}
        fn on_chunk_received(&self, _handler: HostHandler<ChunkReceived>) {}
        fn off_chunk_received(&self) {}
    }

    #[test]
    fn test_bridge_keeps_task_until_released() {
        let task: Arc<dyn RequestTask> = Arc::new(NullRequestTask);
        let weak = Arc::downgrade(&task);
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let hook: EventHook<HeadersReceived, dyn RequestTask> =
            Arc::new(move |_: HeadersReceived, _: &Arc<dyn RequestTask>| *counter.lock() += 1);

        let retained = Retained::new(&task);
        let handler = bridge(&hook, &retained, &None, "onHeadersReceived");
        drop(task);

        handler(HeadersReceived::default());
        assert_eq!(*seen.lock(), 1);
        assert!(weak.upgrade().is_some());

        retained.release();
        handler(HeadersReceived::default());
        assert_eq!(*seen.lock(), 1);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_mismatched_spec_retains_nothing() {
        let task: Arc<dyn RequestTask> = Arc::new(NullRequestTask);
        let spec = TaskSpec::Socket(SocketTaskSpec::new());
        let retained = bind_request(&spec, &task, None);
        assert!(retained.get().is_none());
    }
}
