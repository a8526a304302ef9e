//! Testing utilities for Tether clients.
//!
//! ## Features
//!
//! - **MockPlatform** - Scripted host primitives with recorded calls
//! - **Mock tasks** - Request, transfer and socket tasks that record control
//!   calls and fire registered handlers
//! - **MemoryStorage** - In-memory key-value store with switchable failure
//! - **MockPrinter** - Print manager that keeps what it prints
//! - **Assertions** - Response and error assertions
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tether_testing::*;
//!
//! # tokio_test::block_on(async {
//! let platform = Arc::new(MockPlatform::new());
//! platform.script(Primitive::Request, Script::respond(200, r#"{"id":1}"#));
//!
//! let client = client_for(platform.clone());
//! let response = client.get("/users/1", None, None).await.unwrap();
//!
//! assert_status(&response, 200);
//! assert_json(&response, &serde_json::json!({"id": 1}));
//! assert_eq!(platform.last_call().unwrap().url(), "https://mock.host/users/1");
//! # });
//! ```
//!
//! ## Scripting task events
//!
//! ```
//! use std::sync::Arc;
//! use tether_testing::*;
//! use tether_client::{RequestConfig, TaskSpec, TransferTaskSpec};
//!
//! # tokio_test::block_on(async {
//! let platform = Arc::new(MockPlatform::new());
//! platform.script(
//!     Primitive::Download,
//!     Script::respond(200, serde_json::Value::Null).with_event(TaskEvent::progress(50, 1024)),
//! );
//!
//! let hooks = TransferTaskSpec::new().on_progress_update(|update, _task| {
//!     assert_eq!(update.progress, 50);
//! });
//! let client = client_for(platform);
//! client
//!     .download_file(("/file.bin", "/tmp/file.bin", RequestConfig::builder().task(TaskSpec::download(hooks)).build()))
//!     .await
//!     .unwrap();
//! # });
//! ```

mod assertions;
mod mock;
mod platform;
mod printer;
mod storage;

pub use assertions::{
    assert_header, assert_json, assert_status, assert_success, assert_transport_error,
};
pub use mock::{MockRequestTask, MockSocketTask, MockTransferTask};
pub use platform::{MockPlatform, Outcome, Primitive, RecordedCall, Script, TaskEvent};
pub use printer::{MockPrinter, PrintedEvent};
pub use storage::MemoryStorage;

use std::sync::Arc;
use tether_client::{RequestConfig, Tether};

/// Base URL of clients built by [`client_for`].
pub const MOCK_BASE_URL: &str = "https://mock.host";

/// A client wired to `platform` under [`MOCK_BASE_URL`], with printing and
/// logging off.
pub fn client_for(platform: Arc<MockPlatform>) -> Tether {
    Tether::new(
        RequestConfig::builder()
            .base_url(MOCK_BASE_URL)
            .platform(platform)
            .open_local_printer(false)
            .open_local_logger(false)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_for_uses_platform() {
        let platform = Arc::new(MockPlatform::new());
        let client = client_for(platform.clone());
        let response = client.request("/ping").await.unwrap();

        assert_success(&response);
        assert_eq!(platform.call_count(), 1);
        assert_eq!(platform.request_tasks().len(), 1);
    }
}
