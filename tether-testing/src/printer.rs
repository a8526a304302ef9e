// Recording print manager

use parking_lot::Mutex;
use tether_client::printer::{PrintManager, ResponseSummary};

/// A task event echo as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedEvent {
    pub adapter: String,
    pub event: String,
    pub detail: String,
}

/// [`PrintManager`] that keeps everything it is asked to print.
#[derive(Default)]
pub struct MockPrinter {
    responses: Mutex<Vec<ResponseSummary>>,
    events: Mutex<Vec<PrintedEvent>>,
}

impl MockPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responses(&self) -> Vec<ResponseSummary> {
        self.responses.lock().clone()
    }

    pub fn events(&self) -> Vec<PrintedEvent> {
        self.events.lock().clone()
    }

    /// Names of echoed events, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.event.clone()).collect()
    }
}

impl PrintManager for MockPrinter {
    fn print_response(&self, summary: &ResponseSummary) {
        self.responses.lock().push(summary.clone());
    }

    fn print_task_event(&self, adapter: &str, event: &str, detail: &str) {
        self.events.lock().push(PrintedEvent {
            adapter: adapter.to_string(),
            event: event.to_string(),
            detail: detail.to_string(),
        });
    }
}
