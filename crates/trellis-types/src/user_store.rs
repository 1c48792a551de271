//! The pluggable user-store trait and its capability traits.
//!
//! A store maps an incoming request to a [`User`]. Stores are tried in
//! configuration order by the security manager; the first non-empty
//! result wins. Optional capabilities (key-based lookup, store-driven
//! logout) are separate traits surfaced through explicit accessors
//! instead of runtime reflection.

use async_trait::async_trait;
use axum::http::request::Parts;
use serde_json::Value;
use std::fmt::Debug;

use crate::error::TrResult;
use crate::user::{LogoutPayload, User};

/// A pluggable identity-resolution unit.
///
/// `load_from_request` returning `Ok(None)` is a miss (the chain moves
/// on); returning `Err` is a store malfunction, which the chain logs and
/// also treats as a miss. A store must never panic on untrusted input.
#[async_trait]
pub trait UserStore: Debug + Send + Sync {
	/// Stable store identifier, listed by `GET /api/security/stores`.
	fn id(&self) -> &'static str;

	/// Hint for the client which login form to render.
	fn ui_hint(&self) -> &'static str {
		"DefaultLoginForm"
	}

	/// Client-visible store configuration.
	fn configuration(&self) -> Value {
		Value::Object(serde_json::Map::new())
	}

	/// Attempts to resolve the request to a user.
	async fn load_from_request(&self, parts: &Parts) -> TrResult<Option<User>>;

	/// Key-based lookup capability, if this store supports it.
	fn as_key_resolvable(&self) -> Option<&dyn KeyResolvable> {
		None
	}

	/// Store-driven logout capability, if this store supports it.
	fn as_logout_capable(&self) -> Option<&dyn LogoutCapable> {
		None
	}
}

/// Resolves an API key of the form `username:secret` to a user.
///
/// Also backs explicit login with username/password credentials.
#[async_trait]
pub trait KeyResolvable: Send + Sync {
	async fn load_from_key(&self, key: &str) -> TrResult<Option<User>>;
}

/// Contributes cookie-clear instructions and an optional redirect URL
/// when the user it resolved logs out.
pub trait LogoutCapable: Send + Sync {
	fn logout(&self, user: &User) -> LogoutPayload;
}

// vim: ts=4
