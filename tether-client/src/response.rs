//! Uniform response shape for every adapter.

use crate::host::{HeaderMap, HostResponse};
use crate::{RequestConfig, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A settled request.
///
/// The same shape is produced by all four adapters. A socket connection has
/// no status code; only downloads fill the file paths.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: Option<u16>,
    /// Body; strings are parsed as JSON by the dispatcher when forced parsing is on.
    pub data: Value,
    pub header: HeaderMap,
    pub cookies: Vec<String>,
    pub temp_file_path: Option<String>,
    pub file_path: Option<String>,
    pub err_msg: String,
    /// The configuration the request was dispatched with.
    pub config: RequestConfig,
}

impl Response {
    /// Wrap a host result.
    pub fn from_host(host: HostResponse, config: RequestConfig) -> Self {
        Self {
            status_code: host.status_code,
            data: host.data,
            header: host.header,
            cookies: host.cookies,
            temp_file_path: host.temp_file_path,
            file_path: host.file_path,
            err_msg: host.err_msg,
            config,
        }
    }

    /// Status code, if the transport has one.
    pub fn status(&self) -> Option<u16> {
        self.status_code
    }

    /// Check if the status is 2xx.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(200..=299))
    }

    /// Get a header, matching the name case-insensitively.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.header
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get the content type if available.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, when it is a string.
    pub fn text(&self) -> Option<&str> {
        self.data.as_str()
    }

    /// Deserialize the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.data)?)
    }

    /// Consume the response and deserialize the body.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.data)?)
    }

    /// Name of the adapter that produced this response.
    pub fn adapter_name(&self) -> Option<&str> {
        self.config.adapter_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
    }

    fn response(status: Option<u16>, data: Value) -> Response {
        let mut host = HostResponse::new(0, data).with_header("Content-Type", "application/json");
        host.status_code = status;
        Response::from_host(host, RequestConfig::default())
    }

    #[test]
    fn test_status_helpers() {
        assert!(response(Some(204), Value::Null).is_success());
        assert!(!response(Some(404), Value::Null).is_success());
        assert!(!response(None, Value::Null).is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = response(Some(200), Value::Null);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn test_json_body() {
        let resp = response(Some(200), json!({"id": 7}));
        assert_eq!(resp.json::<User>().unwrap(), User { id: 7 });
        assert!(resp.json::<Vec<u32>>().is_err());
        assert_eq!(resp.into_json::<User>().unwrap(), User { id: 7 });
    }

    #[test]
    fn test_text_body() {
        assert_eq!(response(Some(200), json!("plain")).text(), Some("plain"));
        assert_eq!(response(Some(200), json!(1)).text(), None);
    }
}
