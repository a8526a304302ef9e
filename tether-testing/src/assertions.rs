// Test assertions for responses and errors

use tether_client::{Response, TetherError};

/// Assert that a response has a specific status code
pub fn assert_status(response: &Response, expected: u16) {
    let actual = response.status_code;
    assert_eq!(
        actual,
        Some(expected),
        "Expected status {}, got {:?}",
        expected,
        actual
    );
}

/// Assert that a response is successful (2xx status)
pub fn assert_success(response: &Response) {
    assert!(
        response.is_success(),
        "Expected successful status (2xx), got {:?}",
        response.status_code
    );
}

/// Assert that a response body deserializes to the expected value
pub fn assert_json<T>(response: &Response, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = match response.json() {
        Ok(actual) => actual,
        Err(e) => panic!("Failed to deserialize response body {}: {}", response.data, e),
    };
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header
pub fn assert_header(response: &Response, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a call failed in the host with a message containing `expected`
pub fn assert_transport_error(error: &TetherError, expected: &str) {
    match error.host_error() {
        Some(host) => assert!(
            host.err_msg.contains(expected),
            "Expected host error containing '{}', got '{}'",
            expected,
            host.err_msg
        ),
        None => panic!("Expected transport error, got {:?}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_client::{HostError, HostResponse, RequestConfig};

    fn create_test_response(status: u16, data: serde_json::Value) -> Response {
        Response::from_host(
            HostResponse::new(status, data).with_header("Content-Type", "application/json"),
            RequestConfig::default(),
        )
    }

    #[test]
    fn test_assert_status() {
        let response = create_test_response(201, json!(null));
        assert_status(&response, 201);
        assert_success(&response);
    }

    #[test]
    #[should_panic(expected = "Expected status 200")]
    fn test_assert_status_mismatch() {
        assert_status(&create_test_response(404, json!(null)), 200);
    }

    #[test]
    fn test_assert_json_and_header() {
        let response = create_test_response(200, json!({"ok": true}));
        assert_json(&response, &json!({"ok": true}));
        assert_header(&response, "content-type", "application/json");
    }

    #[test]
    fn test_assert_transport_error() {
        let err = TetherError::from(HostError::new("request:fail timeout"));
        assert_transport_error(&err, "timeout");
    }
}
