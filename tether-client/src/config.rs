//! Request configuration.
//!
//! A [`RequestConfig`] is layered three times per call: library defaults,
//! instance defaults, per-call options. [`RequestConfig::merge`] defines how
//! each field combines; it never modifies either side.

use crate::adapter::{Adapter, RequestKind};
use crate::auth::BasicAuth;
use crate::host::{HeaderMap, Platform};
use crate::logger::LogManager;
use crate::path::{build_full_path, build_path_param};
use crate::printer::PrintManager;
use crate::task::TaskSpec;
use crate::utils::deep_merge;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a status code counts as success.
pub type StatusValidator = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Custom adapter selection.
pub type AdapterSelector = Arc<dyn Fn(&RequestConfig) -> Adapter + Send + Sync>;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Methods the client passes through; anything else becomes `GET`.
pub const KNOWN_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "TRACE", "CONNECT",
];

/// Statuses in `200..300` pass.
pub fn default_validate_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Uppercase `raw` and map it onto a known method, falling back to `GET`.
pub fn normalize_method(raw: Option<&str>) -> Method {
    let upper = raw.map(|m| m.trim().to_ascii_uppercase()).unwrap_or_default();
    if KNOWN_METHODS.contains(&upper.as_str()) {
        Method::from_bytes(upper.as_bytes()).unwrap_or(Method::GET)
    } else {
        Method::GET
    }
}

// ============================================================================
// Headers
// ============================================================================

/// Layered request headers.
///
/// Resolution order at dispatch is `common` < per-method < explicit values.
/// Names compare case-insensitively; the last writer keeps its casing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderConfig {
    /// Sent with every method.
    pub common: HeaderMap,
    /// Sent only with the keyed method.
    pub methods: HashMap<Method, HeaderMap>,
    /// Explicit headers for this request.
    pub values: HeaderMap,
}

pub(crate) fn insert_header(map: &mut HeaderMap, name: &str, value: &str) {
    map.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    map.insert(name.to_string(), value.to_string());
}

fn overlay(target: &mut HeaderMap, source: &HeaderMap) {
    for (name, value) in source {
        insert_header(target, name, value);
    }
}

impl HeaderConfig {
    /// Set an explicit header.
    pub fn set(&mut self, name: &str, value: &str) {
        insert_header(&mut self.values, name, value);
    }

    /// Set a header for every method.
    pub fn set_common(&mut self, name: &str, value: &str) {
        insert_header(&mut self.common, name, value);
    }

    /// Set a header for one method.
    pub fn set_for(&mut self, method: Method, name: &str, value: &str) {
        insert_header(self.methods.entry(method).or_default(), name, value);
    }

    /// Look up an explicit header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Key-wise overlay of `over` onto `self` in every layer.
    pub fn merge(&self, over: &HeaderConfig) -> HeaderConfig {
        let mut merged = self.clone();
        overlay(&mut merged.common, &over.common);
        for (method, headers) in &over.methods {
            overlay(merged.methods.entry(method.clone()).or_default(), headers);
        }
        overlay(&mut merged.values, &over.values);
        merged
    }

    /// Flatten the layers for `method`.
    pub fn resolve(&self, method: &Method) -> HeaderMap {
        let mut resolved = self.common.clone();
        if let Some(per_method) = self.methods.get(method) {
            overlay(&mut resolved, per_method);
        }
        overlay(&mut resolved, &self.values);
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.methods.values().all(|m| m.is_empty()) && self.values.is_empty()
    }
}

// ============================================================================
// RequestConfig
// ============================================================================

/// Options for one request, or a defaults layer.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: Option<String>,
    pub base_url: Option<String>,
    /// Query mapping, or a literal path segment.
    pub params: Option<Value>,
    /// Request body; form fields for uploads.
    pub data: Option<Value>,
    pub header: HeaderConfig,
    pub method: Option<String>,
    pub timeout: Option<Duration>,
    pub auth: Option<BasicAuth>,
    /// Bearer token; wins over `auth`.
    pub token: Option<String>,
    pub task: Option<TaskSpec>,
    /// Upload form field name.
    pub name: Option<String>,
    /// Upload source or download destination.
    pub file_path: Option<String>,
    pub protocols: Option<Vec<String>>,
    pub tcp_no_delay: Option<bool>,
    pub per_message_deflate: Option<bool>,
    pub data_type: Option<String>,
    pub response_type: Option<String>,
    pub with_credentials: Option<bool>,
    pub validate_status: Option<StatusValidator>,
    pub forced_json_parsing: Option<bool>,
    pub open_local_printer: Option<bool>,
    pub print_manager: Option<Arc<dyn PrintManager>>,
    pub open_local_logger: Option<bool>,
    pub log_manager: Option<Arc<LogManager>>,
    pub use_singleton: Option<bool>,
    pub adapter: Option<AdapterSelector>,
    /// Explicit transport; inferred from `name`/`file_path`/`protocols` when unset.
    pub kind: Option<RequestKind>,
    /// Stamped by the dispatcher once an adapter is chosen.
    pub adapter_name: Option<String>,
    pub platform: Option<Arc<dyn Platform>>,
}

fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.clone().or_else(|| base.clone())
}

fn merge_value(base: Option<&Value>, over: Option<&Value>) -> Option<Value> {
    match (base, over) {
        (Some(base @ Value::Object(_)), Some(over @ Value::Object(_))) => {
            Some(deep_merge(&[base, over]))
        }
        (_, Some(over)) => Some(over.clone()),
        (base, None) => base.cloned(),
    }
}

impl RequestConfig {
    /// Create a new configuration builder.
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::default()
    }

    /// The bottom configuration layer.
    pub fn library_defaults() -> Self {
        let mut header = HeaderConfig::default();
        header.set_common("Accept", "application/json, text/plain, */*");
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            header.set_for(method, "Content-Type", "application/json;charset=UTF-8");
        }

        Self {
            method: Some("GET".to_string()),
            timeout: Some(DEFAULT_TIMEOUT),
            header,
            validate_status: Some(Arc::new(default_validate_status)),
            forced_json_parsing: Some(true),
            use_singleton: Some(false),
            ..Self::default()
        }
    }

    /// Layer `over` on top of `self`, producing a new configuration.
    ///
    /// Scalars from `over` win when set. `data` and `params` deep-merge when
    /// both sides are mappings. Headers overlay per layer. Task specs,
    /// validators, managers, adapters and the platform are replaced whole.
    pub fn merge(&self, over: &RequestConfig) -> RequestConfig {
        RequestConfig {
            url: pick(&self.url, &over.url),
            base_url: pick(&self.base_url, &over.base_url),
            params: merge_value(self.params.as_ref(), over.params.as_ref()),
            data: merge_value(self.data.as_ref(), over.data.as_ref()),
            header: self.header.merge(&over.header),
            method: pick(&self.method, &over.method),
            timeout: pick(&self.timeout, &over.timeout),
            auth: pick(&self.auth, &over.auth),
            token: pick(&self.token, &over.token),
            task: pick(&self.task, &over.task),
            name: pick(&self.name, &over.name),
            file_path: pick(&self.file_path, &over.file_path),
            protocols: pick(&self.protocols, &over.protocols),
            tcp_no_delay: pick(&self.tcp_no_delay, &over.tcp_no_delay),
            per_message_deflate: pick(&self.per_message_deflate, &over.per_message_deflate),
            data_type: pick(&self.data_type, &over.data_type),
            response_type: pick(&self.response_type, &over.response_type),
            with_credentials: pick(&self.with_credentials, &over.with_credentials),
            validate_status: pick(&self.validate_status, &over.validate_status),
            forced_json_parsing: pick(&self.forced_json_parsing, &over.forced_json_parsing),
            open_local_printer: pick(&self.open_local_printer, &over.open_local_printer),
            print_manager: pick(&self.print_manager, &over.print_manager),
            open_local_logger: pick(&self.open_local_logger, &over.open_local_logger),
            log_manager: pick(&self.log_manager, &over.log_manager),
            use_singleton: pick(&self.use_singleton, &over.use_singleton),
            adapter: pick(&self.adapter, &over.adapter),
            kind: pick(&self.kind, &over.kind),
            adapter_name: pick(&self.adapter_name, &over.adapter_name),
            platform: pick(&self.platform, &over.platform),
        }
    }

    /// Normalized method.
    pub fn http_method(&self) -> Method {
        normalize_method(self.method.as_deref())
    }

    /// `base_url` + `url` + `params`, as sent to the host.
    pub fn full_url(&self) -> String {
        let full = build_full_path(
            self.base_url.as_deref().unwrap_or_default(),
            self.url.as_deref().unwrap_or_default(),
        );
        match &self.params {
            Some(params) => build_path_param(&full, params),
            None => full,
        }
    }

    /// Run the status validator, defaulting to `200..300`.
    pub fn is_valid_status(&self, status: u16) -> bool {
        match &self.validate_status {
            Some(validate) => validate(status),
            None => default_validate_status(status),
        }
    }

    fn diagnostics_default(&self) -> bool {
        self.platform
            .as_ref()
            .map(|p| p.release_channel().diagnostics_enabled())
            .unwrap_or(false)
    }

    /// Whether responses and task events are printed.
    pub fn printer_enabled(&self) -> bool {
        self.open_local_printer
            .unwrap_or_else(|| self.diagnostics_default())
    }

    /// Whether request logs are persisted.
    pub fn logger_enabled(&self) -> bool {
        self.open_local_logger
            .unwrap_or_else(|| self.diagnostics_default())
    }
}

impl From<&str> for RequestConfig {
    fn from(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }
}

impl From<String> for RequestConfig {
    fn from(url: String) -> Self {
        Self {
            url: Some(url),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn set<T>(value: &Option<T>) -> Option<&'static str> {
            value.as_ref().map(|_| "<set>")
        }

        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("header", &self.header)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth.as_ref().map(|a| &a.username))
            .field("token", &set(&self.token))
            .field("task", &self.task)
            .field("name", &self.name)
            .field("file_path", &self.file_path)
            .field("protocols", &self.protocols)
            .field("validate_status", &set(&self.validate_status))
            .field("forced_json_parsing", &self.forced_json_parsing)
            .field("open_local_printer", &self.open_local_printer)
            .field("open_local_logger", &self.open_local_logger)
            .field("use_singleton", &self.use_singleton)
            .field("adapter", &set(&self.adapter))
            .field("kind", &self.kind)
            .field("adapter_name", &self.adapter_name)
            .field("platform", &set(&self.platform))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`RequestConfig`].
#[derive(Debug, Default)]
pub struct RequestConfigBuilder {
    config: RequestConfig,
}

impl RequestConfigBuilder {
    /// Set the request URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Set the base URL relative URLs resolve against.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set query params or a path segment.
    pub fn params(mut self, params: impl Into<Value>) -> Self {
        self.config.params = Some(params.into());
        self
    }

    /// Set the request body.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.config.data = Some(data.into());
        self
    }

    /// Set an explicit header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.config.header.set(name, value);
        self
    }

    /// Set a header for every method.
    pub fn common_header(mut self, name: &str, value: &str) -> Self {
        self.config.header.set_common(name, value);
        self
    }

    /// Set a header for one method.
    pub fn method_header(mut self, method: Method, name: &str, value: &str) -> Self {
        self.config.header.set_for(method, name, value);
        self
    }

    /// Set the method. Unknown methods are sent as `GET`.
    pub fn method(mut self, method: impl AsRef<str>) -> Self {
        self.config.method = Some(method.as_ref().to_string());
        self
    }

    /// Set the timeout passed to the host.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set basic credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.auth = Some(BasicAuth::new(username, password));
        self
    }

    /// Set a bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Attach task hooks.
    pub fn task(mut self, task: impl Into<TaskSpec>) -> Self {
        self.config.task = Some(task.into());
        self
    }

    /// Set the upload form field name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Set the upload source or download destination.
    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.config.file_path = Some(path.into());
        self
    }

    /// Set socket sub-protocols.
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.protocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    pub fn tcp_no_delay(mut self, enable: bool) -> Self {
        self.config.tcp_no_delay = Some(enable);
        self
    }

    pub fn per_message_deflate(mut self, enable: bool) -> Self {
        self.config.per_message_deflate = Some(enable);
        self
    }

    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.config.data_type = Some(data_type.into());
        self
    }

    pub fn response_type(mut self, response_type: impl Into<String>) -> Self {
        self.config.response_type = Some(response_type.into());
        self
    }

    pub fn with_credentials(mut self, enable: bool) -> Self {
        self.config.with_credentials = Some(enable);
        self
    }

    /// Set the status predicate.
    pub fn validate_status<F>(mut self, validate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.config.validate_status = Some(Arc::new(validate));
        self
    }

    /// Enable or disable parsing of string bodies as JSON.
    pub fn forced_json_parsing(mut self, enable: bool) -> Self {
        self.config.forced_json_parsing = Some(enable);
        self
    }

    /// Enable or disable printing of responses and task events.
    pub fn open_local_printer(mut self, enable: bool) -> Self {
        self.config.open_local_printer = Some(enable);
        self
    }

    /// Replace the printer.
    pub fn print_manager(mut self, printer: Arc<dyn PrintManager>) -> Self {
        self.config.print_manager = Some(printer);
        self
    }

    /// Enable or disable persisted request logs.
    pub fn open_local_logger(mut self, enable: bool) -> Self {
        self.config.open_local_logger = Some(enable);
        self
    }

    /// Replace the log manager.
    pub fn log_manager(mut self, manager: Arc<LogManager>) -> Self {
        self.config.log_manager = Some(manager);
        self
    }

    /// Request the process-wide shared instance.
    pub fn use_singleton(mut self, enable: bool) -> Self {
        self.config.use_singleton = Some(enable);
        self
    }

    /// Override adapter selection.
    pub fn adapter<F>(mut self, select: F) -> Self
    where
        F: Fn(&RequestConfig) -> Adapter + Send + Sync + 'static,
    {
        self.config.adapter = Some(Arc::new(select));
        self
    }

    /// Pin the transport instead of inferring it.
    pub fn kind(mut self, kind: RequestKind) -> Self {
        self.config.kind = Some(kind);
        self
    }

    /// Set the host platform.
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.config.platform = Some(platform);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RequestConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_prefers_over_and_keeps_inputs() {
        let base = RequestConfig::builder()
            .base_url("https://a.com")
            .timeout(Duration::from_secs(5))
            .data(json!({"a": 1, "nested": {"x": 1}}))
            .build();
        let over = RequestConfig::builder()
            .timeout(Duration::from_secs(9))
            .data(json!({"nested": {"y": 2}}))
            .build();

        let merged = base.merge(&over);

        assert_eq!(merged.base_url.as_deref(), Some("https://a.com"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(9)));
        assert_eq!(merged.data, Some(json!({"a": 1, "nested": {"x": 1, "y": 2}})));
        assert_eq!(base.data, Some(json!({"a": 1, "nested": {"x": 1}})));
        assert_eq!(over.data, Some(json!({"nested": {"y": 2}})));
    }

    #[test]
    fn test_merge_replaces_non_object_data() {
        let base = RequestConfig::builder().data(json!({"a": 1})).build();
        let over = RequestConfig::builder().data(json!("raw body")).build();
        assert_eq!(base.merge(&over).data, Some(json!("raw body")));
    }

    #[test]
    fn test_merge_replaces_protocols_and_validator() {
        let base = RequestConfig::builder()
            .protocols(["a", "b"])
            .validate_status(|s| s == 200)
            .build();
        let over = RequestConfig::builder()
            .protocols(["c"])
            .validate_status(|s| s == 404)
            .build();

        let merged = base.merge(&over);
        assert_eq!(merged.protocols, Some(vec!["c".to_string()]));
        assert!(merged.is_valid_status(404));
        assert!(!merged.is_valid_status(200));
    }

    #[test]
    fn test_header_precedence() {
        let mut header = HeaderConfig::default();
        header.set_common("X-Layer", "common");
        header.set_common("Accept", "*/*");
        header.set_for(Method::POST, "x-layer", "post");
        header.set("X-LAYER", "explicit");

        let resolved = header.resolve(&Method::POST);
        assert_eq!(resolved.get("X-LAYER").map(String::as_str), Some("explicit"));
        assert_eq!(resolved.len(), 2);

        let mut no_explicit = header.clone();
        no_explicit.values.clear();
        let resolved = no_explicit.resolve(&Method::POST);
        assert_eq!(resolved.get("x-layer").map(String::as_str), Some("post"));

        let resolved = no_explicit.resolve(&Method::GET);
        assert_eq!(resolved.get("X-Layer").map(String::as_str), Some("common"));
    }

    #[test]
    fn test_header_merge_is_per_layer() {
        let mut base = HeaderConfig::default();
        base.set_common("A", "1");
        base.set_for(Method::PUT, "B", "1");
        let mut over = HeaderConfig::default();
        over.set_for(Method::PUT, "C", "2");
        over.set("D", "3");

        let merged = base.merge(&over);
        assert_eq!(merged.common.len(), 1);
        assert_eq!(merged.methods[&Method::PUT].len(), 2);
        assert_eq!(merged.get("d"), Some("3"));
        assert!(base.values.is_empty());
    }

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method(Some("post")), Method::POST);
        assert_eq!(normalize_method(Some(" Patch ")), Method::PATCH);
        assert_eq!(normalize_method(Some("FETCH")), Method::GET);
        assert_eq!(normalize_method(None), Method::GET);
    }

    #[test]
    fn test_library_defaults() {
        let defaults = RequestConfig::library_defaults();
        assert_eq!(defaults.http_method(), Method::GET);
        assert_eq!(defaults.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(defaults.forced_json_parsing, Some(true));
        assert!(defaults.is_valid_status(204));
        assert!(!defaults.is_valid_status(304));
        assert!(
            defaults
                .header
                .resolve(&Method::POST)
                .contains_key("Content-Type")
        );
        assert!(!defaults.printer_enabled());
    }

    #[test]
    fn test_full_url() {
        let config = RequestConfig::builder()
            .base_url("https://api.example.com/")
            .url("/users")
            .params(json!({"page": 2}))
            .build();
        assert_eq!(config.full_url(), "https://api.example.com/users?page=2");
    }

    #[test]
    fn test_from_str() {
        let config = RequestConfig::from("/ping");
        assert_eq!(config.url.as_deref(), Some("/ping"));
        assert!(config.method.is_none());
    }
}
