//! Fuzz target for the request facade.
//!
//! Accept negotiation, method override and URI normalization run on every
//! request with client-controlled input.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use trellis_core::http::sanitize_uri;
use trellis_core::{Accept, HttpRequest, MediaType, MethodOverride};

#[derive(Debug, Arbitrary)]
struct FuzzRequest {
    method: String,
    path: String,
    accept: Option<String>,
    override_header: Option<String>,
    body: Vec<u8>,
}

fuzz_target!(|data: FuzzRequest| {
    if data.path.len() > 10000 || data.body.len() > 64 * 1024 {
        return;
    }

    let mut request = HttpRequest::new(data.method, data.path).with_body(data.body);
    if let Some(accept) = &data.accept {
        request = request.with_header("Accept", accept.as_str());
        let parsed = Accept::parse(accept);
        let quality = parsed.quality_for(&MediaType::json());
        assert!((0.0..=1.0).contains(&quality));
    }
    if let Some(value) = data.override_header {
        request = request.with_header("X-HTTP-Method-Override", value);
    }

    let uri = request.uri();
    assert!(uri.starts_with('/'));
    assert!(!uri.contains("//"));

    let _ = request.method_with(&MethodOverride::default());
    let _ = request.is_json_request();
    let _ = request.form();
    let _ = sanitize_uri(&uri);
});
