//! Local diagnostic printing.

use crate::host::HeaderMap;
use crate::{RequestConfig, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tether_log::Level;

/// Console target for response summaries.
pub const RESPONSE_TARGET: &str = "tether::response";

/// Console target for task event echoes.
pub const TASK_TARGET: &str = "tether::task";

/// Receives diagnostic output when local printing is enabled.
pub trait PrintManager: Send + Sync {
    /// A request finished successfully.
    fn print_response(&self, summary: &ResponseSummary);

    /// A bridged task event fired.
    fn print_task_event(&self, adapter: &str, event: &str, detail: &str);
}

/// What the dispatcher prints for each successful request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    pub adapter: String,
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub request_header: HeaderMap,
    pub request_data: Value,
    pub response_header: HeaderMap,
    pub response_data: Value,
    pub elapsed_ms: u64,
}

impl ResponseSummary {
    pub fn new(config: &RequestConfig, response: &Response, elapsed: Duration) -> Self {
        Self {
            adapter: config.adapter_name.clone().unwrap_or_default(),
            method: response.config.http_method().to_string(),
            url: config.full_url(),
            status_code: response.status_code,
            request_header: config.header.values.clone(),
            request_data: config.data.clone().unwrap_or(Value::Null),
            response_header: response.header.clone(),
            response_data: response.data.clone(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Prints through the `tether-log` console.
#[derive(Debug, Clone, Copy)]
pub struct ConsolePrinter {
    level: Level,
}

impl ConsolePrinter {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for ConsolePrinter {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

fn to_json(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

impl PrintManager for ConsolePrinter {
    fn print_response(&self, summary: &ResponseSummary) {
        let status = summary
            .status_code
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        tether_log::emit(
            self.level,
            RESPONSE_TARGET,
            &format!("{} {} {}", summary.method, summary.url, status),
            &[
                ("adapter", summary.adapter.clone()),
                ("elapsed", format!("{}ms", summary.elapsed_ms)),
                ("request header", to_json(&summary.request_header)),
                ("request data", to_json(&summary.request_data)),
                ("response header", to_json(&summary.response_header)),
                ("response data", to_json(&summary.response_data)),
            ],
        );
    }

    fn print_task_event(&self, adapter: &str, event: &str, detail: &str) {
        tether_log::emit(
            self.level,
            TASK_TARGET,
            &format!("{} {}", adapter, event),
            &[("detail", detail.to_string())],
        );
    }
}

/// The printer to use for `config`, if printing is enabled.
pub fn resolve_printer(config: &RequestConfig) -> Option<Arc<dyn PrintManager>> {
    if !config.printer_enabled() {
        return None;
    }
    Some(
        config
            .print_manager
            .clone()
            .unwrap_or_else(|| Arc::new(ConsolePrinter::default())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostResponse;
    use serde_json::json;

    #[test]
    fn test_summary_reflects_config_and_response() {
        let mut config = RequestConfig::builder()
            .base_url("https://a.com")
            .url("/x")
            .method("post")
            .data(json!({"k": 1}))
            .header("X-Trace", "1")
            .build();
        config.adapter_name = Some("request".to_string());
        let response = Response::from_host(
            HostResponse::new(201, json!({"ok": true})).with_header("Server", "h"),
            config.clone(),
        );

        let summary = ResponseSummary::new(&config, &response, Duration::from_millis(12));

        assert_eq!(summary.method, "POST");
        assert_eq!(summary.url, "https://a.com/x");
        assert_eq!(summary.status_code, Some(201));
        assert_eq!(summary.request_header.get("X-Trace").map(String::as_str), Some("1"));
        assert_eq!(summary.response_data, json!({"ok": true}));
        assert_eq!(summary.elapsed_ms, 12);
    }

    #[test]
    fn test_printer_disabled_without_flag_or_platform() {
        let config = RequestConfig::default();
        assert!(resolve_printer(&config).is_none());

        let config = RequestConfig::builder().open_local_printer(true).build();
        assert!(resolve_printer(&config).is_some());
    }
}
