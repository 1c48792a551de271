//! Common test utilities and helpers
//!
//! Shared infrastructure for driving the composed router without a
//! listening socket.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use trellis_server::App;
use trellis_server::bootstrap::{ServerOpts, build_app};

/// Builds an application from an in-memory workspace tree, with the
/// process environment masked out.
pub async fn build_test_app(workspace: Value) -> (App, Router) {
	build_app(ServerOpts {
		workspace_config: Some(workspace),
		env_vars: Some(Vec::new()),
		..ServerOpts::default()
	})
	.await
	.unwrap()
}

pub struct TestResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub text: String,
}

impl TestResponse {
	pub fn json(&self) -> Value {
		serde_json::from_str(&self.text).unwrap()
	}

	/// All `Set-Cookie` values of the response.
	pub fn set_cookies(&self) -> Vec<String> {
		self.headers
			.get_all(header::SET_COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.map(str::to_string)
			.collect()
	}

	/// The value of a cookie set by the response, if any.
	pub fn cookie_value(&self, name: &str) -> Option<String> {
		let prefix = format!("{}=", name);
		self.set_cookies()
			.iter()
			.find(|cookie| cookie.starts_with(&prefix))
			.and_then(|cookie| cookie.split(';').next().map(str::to_string))
			.map(|pair| pair[prefix.len()..].to_string())
	}
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
	let response = router.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let headers = response.headers().clone();
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	let text = String::from_utf8(bytes.to_vec()).unwrap();
	TestResponse { status, headers, text }
}

pub async fn get(router: &Router, path: &str, headers: &[(&str, &str)]) -> TestResponse {
	let mut builder = Request::builder().method("GET").uri(path);
	for (name, value) in headers {
		builder = builder.header(*name, *value);
	}
	send(router, builder.body(Body::empty()).unwrap()).await
}

pub async fn post(router: &Router, path: &str, headers: &[(&str, &str)]) -> TestResponse {
	let mut builder = Request::builder().method("POST").uri(path);
	for (name, value) in headers {
		builder = builder.header(*name, *value);
	}
	send(router, builder.body(Body::empty()).unwrap()).await
}

pub async fn post_form(router: &Router, path: &str, fields: &[(&str, &str)]) -> TestResponse {
	let body = serde_urlencoded::to_string(fields).unwrap();
	let request = Request::builder()
		.method("POST")
		.uri(path)
		.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
		.body(Body::from(body))
		.unwrap();
	send(router, request).await
}

/// `Authorization: Basic` header value for the given credentials.
pub fn basic_auth(username: &str, password: &str) -> String {
	let encoded =
		base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
	format!("Basic {}", encoded)
}

// vim: ts=4
