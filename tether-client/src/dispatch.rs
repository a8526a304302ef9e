//! Request dispatch.
//!
//! Runs between the request and response interceptor chains: finalises the
//! headers, selects and invokes an adapter, then post-processes a
//! successful response (JSON coercion, printing, persisted logs).

use crate::adapter::get_default_adapter;
use crate::config::HeaderConfig;
use crate::logger::{LogEntry, LogManager};
use crate::printer::{ResponseSummary, resolve_printer};
use crate::{RequestConfig, Response, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Dispatch a fully merged configuration.
pub async fn dispatch_request(mut config: RequestConfig) -> Result<Response> {
    if config.data.is_none() {
        config.data = Some(Value::Object(Map::new()));
    }

    let method = config.http_method();
    config.header = HeaderConfig {
        values: config.header.resolve(&method),
        ..HeaderConfig::default()
    };

    let adapter = match &config.adapter {
        Some(select) => select(&config),
        None => get_default_adapter(&config),
    };
    config.adapter_name = Some(adapter.name().to_string());

    tracing::debug!(
        adapter = %adapter.name(),
        method = %method,
        url = %config.full_url(),
        "Dispatching request"
    );

    let started = Instant::now();
    let mut response = adapter.call(config.clone()).await?;
    let elapsed = started.elapsed();

    coerce_json(&config, &mut response)?;

    if let Some(printer) = resolve_printer(&config) {
        printer.print_response(&ResponseSummary::new(&config, &response, elapsed));
    }

    if config.logger_enabled() {
        persist_log(&config, &response);
    }

    Ok(response)
}

/// Parse a string body as JSON when the status passes validation.
fn coerce_json(config: &RequestConfig, response: &mut Response) -> Result<()> {
    let Some(status) = response.status_code else {
        return Ok(());
    };
    if !config.is_valid_status(status) || !config.forced_json_parsing.unwrap_or(true) {
        return Ok(());
    }
    if config
        .data_type
        .as_deref()
        .is_some_and(|t| !t.eq_ignore_ascii_case("json"))
    {
        return Ok(());
    }
    let Value::String(body) = &response.data else {
        return Ok(());
    };
    if body.trim().is_empty() {
        return Ok(());
    }

    response.data = serde_json::from_str(body)?;
    Ok(())
}

fn persist_log(config: &RequestConfig, response: &Response) {
    let manager = match (&config.log_manager, &config.platform) {
        (Some(manager), _) => manager.clone(),
        (None, Some(platform)) => match platform.storage() {
            Some(storage) => Arc::new(LogManager::new(storage)),
            None => return,
        },
        (None, None) => return,
    };

    let entry = LogEntry {
        adapter: config.adapter_name.clone().unwrap_or_default(),
        status_code: response.status_code,
        method: response.config.http_method().to_string(),
        url: config.full_url(),
    };
    if let Err(e) = manager.record(&entry) {
        tracing::debug!(error = %e, "Failed to persist request log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Adapter;
    use crate::host::HostResponse;
    use serde_json::json;

    fn echo_adapter(
        status: u16,
        body: Value,
    ) -> impl Fn(&RequestConfig) -> Adapter + Send + Sync + 'static {
        move |_: &RequestConfig| {
            let body = body.clone();
            Adapter::new("stub", move |config: RequestConfig| {
                let body = body.clone();
                async move { Ok(Response::from_host(HostResponse::new(status, body), config)) }
            })
        }
    }

    fn with_adapter(status: u16, body: Value) -> RequestConfig {
        RequestConfig::builder()
            .adapter(echo_adapter(status, body))
            .build()
    }

    #[tokio::test]
    async fn test_string_body_is_parsed() {
        let resp = dispatch_request(with_adapter(200, json!(r#"{"a":1}"#)))
            .await
            .unwrap();
        assert_eq!(resp.data, json!({"a": 1}));
        assert_eq!(resp.adapter_name(), Some("stub"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_data_parse_error() {
        let err = dispatch_request(with_adapter(200, json!("{oops")))
            .await
            .unwrap_err();
        assert!(err.is_data_parse());
    }

    #[tokio::test]
    async fn test_failed_status_is_not_parsed() {
        let resp = dispatch_request(with_adapter(500, json!("{oops")))
            .await
            .unwrap();
        assert_eq!(resp.data, json!("{oops"));
    }

    #[tokio::test]
    async fn test_forcing_disabled_or_non_json_type() {
        let mut config = with_adapter(200, json!(r#"{"a":1}"#));
        config.forced_json_parsing = Some(false);
        let resp = dispatch_request(config).await.unwrap();
        assert_eq!(resp.text(), Some(r#"{"a":1}"#));

        let mut config = with_adapter(200, json!("<p>"));
        config.data_type = Some("text".into());
        assert_eq!(dispatch_request(config).await.unwrap().text(), Some("<p>"));
    }

    #[tokio::test]
    async fn test_headers_flattened_and_data_defaulted() {
        let mut config = RequestConfig::library_defaults().merge(&with_adapter(200, json!({})));
        config.method = Some("post".into());
        config.header.set("X-Id", "1");

        let resp = dispatch_request(config).await.unwrap();
        let sent = &resp.config;
        assert!(sent.header.common.is_empty());
        assert!(sent.header.methods.is_empty());
        assert_eq!(sent.header.get("content-type"), Some("application/json;charset=UTF-8"));
        assert_eq!(sent.header.get("x-id"), Some("1"));
        assert_eq!(sent.data, Some(json!({})));
    }
}
