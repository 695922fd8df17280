//! Fuzz target for route matching.
//!
//! Arbitrary patterns must either load or fail with an error, and resolving
//! arbitrary paths must never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use trellis_core::{MatchPolicy, Method, Output, Route, RoutePattern, RouteTable, Router, handler};

#[derive(Debug, Arbitrary)]
struct FuzzRouting {
    routes: Vec<FuzzRoute>,
    match_paths: Vec<(FuzzMethod, String)>,
    first_structural: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzRoute {
    method: FuzzMethod,
    pattern: String,
}

#[derive(Debug, Arbitrary, Clone)]
enum FuzzMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

impl FuzzMethod {
    fn to_method(&self) -> Method {
        match self {
            FuzzMethod::Get => Method::GET,
            FuzzMethod::Head => Method::HEAD,
            FuzzMethod::Post => Method::POST,
            FuzzMethod::Put => Method::PUT,
            FuzzMethod::Delete => Method::DELETE,
            FuzzMethod::Patch => Method::PATCH,
        }
    }
}

fuzz_target!(|data: FuzzRouting| {
    let noop = handler(|_, _| Ok(Output::Empty));
    let mut table = RouteTable::new();

    for route in data.routes.iter().take(100) {
        if route.pattern.len() > 1000 {
            continue;
        }

        if let Ok(pattern) = RoutePattern::parse(&route.pattern) {
            let params: Vec<(String, String)> = pattern
                .param_names()
                .map(|name| (name.to_string(), "x".to_string()))
                .collect();
            let borrowed: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            if let Some(built) = pattern.build(&borrowed) {
                let _ = pattern.matches(&built);
            }
        }

        // Invalid patterns must be rejected, not panic.
        if let Ok(route) = Route::new(route.method.to_method(), &route.pattern, noop.clone()) {
            table.add(route);
        }
    }

    let policy = if data.first_structural {
        MatchPolicy::FirstStructural
    } else {
        MatchPolicy::ScanAll
    };
    let router = Router::new(table).with_policy(policy);

    for (method, path) in &data.match_paths {
        if path.len() > 10000 {
            continue;
        }
        let _ = router.resolve(path, &method.to_method());
        let _ = router.allowed_methods(path);
    }
});
