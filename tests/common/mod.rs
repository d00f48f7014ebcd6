//! Shared helpers for integration tests: a wiremock stand-in for the
//! format/benchmark service and profiles pointing at it.

#![allow(dead_code)]

use benchpad::config::ServiceProfile;
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const UNFORMATTED: &str = "package main\nfunc  main(){}";
pub const FORMATTED: &str = "package main\n\nfunc main() {}\n";

/// Profile whose server is the mock service
pub fn profile_for(server: &MockServer) -> ServiceProfile {
    ServiceProfile::default()
        .with_server(&server.uri())
        .expect("mock server URI should be a valid server")
}

/// Answer `POST <endpoint>` with a JSON body
pub async fn respond_json(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer `POST <endpoint>` with a JSON body after `delay`
pub async fn respond_json_after(server: &MockServer, endpoint: &str, body: Value, delay: Duration) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}
