//! Error type shared across the Trellis workspace.
//!
//! Startup errors (`Discovery`, `Registration`) are fatal and abort the
//! process; request-time errors map onto HTTP status codes via
//! `IntoResponse`. Authentication failures never surface as 500s.

use axum::{Json, http::StatusCode, http::header, response::IntoResponse};
use serde_json::json;

pub type TrResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// The plugin enumeration mechanism itself is broken. Fatal at startup.
	Discovery(String),
	/// A plugin's registration callback failed. Fatal at startup; no
	/// partially built registry is ever exposed.
	Registration { plugin: Box<str>, source: Box<Error> },
	/// No authenticated user. Rendered as 401 with a challenge header.
	Unauthorized,
	PermissionDenied,
	NotFound,
	ValidationError(String),
	Internal(String),

	// externals
	Io(std::io::Error),
	Json(serde_json::Error),
	Jwt(jsonwebtoken::errors::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Json(err)
	}
}

impl From<jsonwebtoken::errors::Error> for Error {
	fn from(err: jsonwebtoken::errors::Error) -> Self {
		Self::Jwt(err)
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::Discovery(msg) => write!(f, "plugin discovery failed: {}", msg),
			Error::Registration { plugin, source } => {
				write!(f, "plugin '{}' failed to register: {}", plugin, source)
			}
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::NotFound => write!(f, "not found"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
			Error::Json(err) => write!(f, "json error: {}", err),
			Error::Jwt(err) => write!(f, "jwt error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		match self {
			Error::Unauthorized => (
				StatusCode::UNAUTHORIZED,
				[(header::WWW_AUTHENTICATE, "Bearer")],
				Json(json!({ "detail": "Not authenticated" })),
			)
				.into_response(),
			Error::PermissionDenied => (
				StatusCode::FORBIDDEN,
				Json(json!({ "detail": "Permission denied" })),
			)
				.into_response(),
			Error::NotFound => {
				(StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found" }))).into_response()
			}
			Error::ValidationError(msg) => {
				(StatusCode::BAD_REQUEST, Json(json!({ "detail": msg }))).into_response()
			}
			err => (
				StatusCode::INTERNAL_SERVER_ERROR,
				Json(json!({ "detail": err.to_string() })),
			)
				.into_response(),
		}
	}
}

// vim: ts=4
