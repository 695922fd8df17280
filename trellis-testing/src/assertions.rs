// Test assertions for HTTP responses

use crate::TestResponse;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(
        actual,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        actual,
        response.text()
    );
}

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .json()
        .expect("Failed to deserialize response body");
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
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

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.text();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that a response redirects to `location`
pub fn assert_redirect(response: &TestResponse, location: &str) {
    assert!(
        response.is_redirect(),
        "Expected a redirect to '{}', got status {}",
        location,
        response.status()
    );
    assert_header(response, "Location", location);
}

/// Assert that a response is a client error (4xx status)
pub fn assert_client_error(response: &TestResponse) {
    let status = response.status();
    assert!(
        (400..500).contains(&status),
        "Expected client error status (4xx), got {}",
        status
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::HttpResponse;

    #[test]
    fn test_passing_assertions() {
        let response = TestResponse::new(
            HttpResponse::new(302)
                .with_header("Location", "/login")
                .with_text("Redirecting"),
        );
        assert_status(&response, 302);
        assert_redirect(&response, "/login");
        assert_body_contains(&response, "Redirect");
    }

    #[test]
    #[should_panic(expected = "Expected status 200")]
    fn test_status_mismatch_panics() {
        assert_status(&TestResponse::new(HttpResponse::not_found()), 200);
    }

    #[test]
    fn test_json_assertion() {
        let response = TestResponse::new(
            HttpResponse::ok()
                .with_json(&serde_json::json!({"ok": true}))
                .unwrap(),
        );
        assert_json(&response, &serde_json::json!({"ok": true}));
    }
}
