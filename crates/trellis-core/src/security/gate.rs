//! The per-request authentication guard.
//!
//! Requests to exempt paths skip authentication entirely (no store is
//! consulted). Everything else is resolved through the security manager;
//! an unresolved request is rejected with a 401 challenge. The sliding
//! token refresh happens on the response path, so the served request
//! still sees the original token's claims while the returned cookie
//! carries the refreshed token.

use axum::{
	body::Body,
	extract::State,
	http::{Request, header, header::HeaderValue, response::Response},
	middleware::Next,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::prelude::*;
use crate::security::extract::CurrentUser;
use crate::security::manager::SecurityManager;
use crate::settings::{SameSite, Settings};

/// Paths that never require authentication, regardless of plugins.
pub const BUILTIN_PATHS_WITHOUT_AUTHENTICATION: &[&str] = &[
	"/api/health",
	"/health",
	"/api/login",
	"/api/logout",
	"/api/metrics",
	"/api/security/stores",
	"/api/clientConfig",
	"/api/sentry",
	"/api/buildInfo.json",
];

/// Session-cookie attributes, rendered into `Set-Cookie` values.
#[derive(Clone, Debug)]
pub struct SessionCookie {
	pub name: String,
	pub path: String,
	pub secure: bool,
	pub samesite: Option<SameSite>,
}

impl SessionCookie {
	pub fn from_settings(settings: &Settings) -> SessionCookie {
		SessionCookie {
			name: settings.jwt_access_cookie_name.clone(),
			path: settings.jwt_access_cookie_path.clone(),
			secure: settings.jwt_cookie_secure,
			samesite: settings.jwt_cookie_samesite,
		}
	}

	fn attributes(&self) -> String {
		let mut attributes = format!("Path={}; HttpOnly", self.path);
		if let Some(samesite) = self.samesite {
			attributes.push_str("; SameSite=");
			attributes.push_str(samesite.as_str());
		}
		if self.secure {
			attributes.push_str("; Secure");
		}
		attributes
	}

	/// `Set-Cookie` value carrying the session token.
	pub fn set(&self, token: &str) -> String {
		format!("{}={}; {}", self.name, token, self.attributes())
	}

	/// `Set-Cookie` value clearing the session cookie.
	pub fn clear(&self) -> String {
		format!("{}=; Max-Age=0; {}", self.name, self.attributes())
	}

	/// `Set-Cookie` value clearing an arbitrary store cookie.
	pub fn clear_named(name: &str) -> String {
		format!("{}=; Max-Age=0; Path=/", name)
	}
}

pub struct AuthGate {
	security: Arc<SecurityManager>,
	exempt: HashSet<String>,
	cookie: SessionCookie,
}

impl AuthGate {
	/// Builds the gate from the built-in exemption set unioned with the
	/// paths contributed by every active plugin.
	pub fn new(
		security: Arc<SecurityManager>,
		plugin_paths: impl IntoIterator<Item = String>,
		cookie: SessionCookie,
	) -> AuthGate {
		let mut exempt: HashSet<String> = BUILTIN_PATHS_WITHOUT_AUTHENTICATION
			.iter()
			.map(|path| (*path).to_string())
			.collect();
		exempt.extend(plugin_paths);

		AuthGate { security, exempt, cookie }
	}

	pub fn is_exempt(&self, path: &str) -> bool {
		self.exempt.contains(path)
	}

	pub fn security(&self) -> &Arc<SecurityManager> {
		&self.security
	}

	pub fn cookie(&self) -> &SessionCookie {
		&self.cookie
	}
}

/// The gate middleware. Install once per application, with the gate as
/// the middleware state.
pub async fn protect(
	State(gate): State<Arc<AuthGate>>,
	req: Request<Body>,
	next: Next,
) -> TrResult<Response<Body>> {
	if gate.is_exempt(req.uri().path()) {
		return Ok(next.run(req).await);
	}

	let (mut parts, body) = req.into_parts();
	let Some(resolution) = gate.security.load_from_request(&parts).await else {
		return Err(Error::Unauthorized);
	};

	// Decide the refresh before serving so the handler still sees the
	// original claims.
	let refreshed = resolution
		.claims
		.as_ref()
		.and_then(|claims| gate.security.refreshed_token(claims));

	let resolution = Arc::new(resolution);
	parts.extensions.insert(CurrentUser(resolution.clone()));
	let req = Request::from_parts(parts, body);

	let mut response = next.run(req).await;

	if let Some((token, _claims)) = refreshed {
		debug!("Refreshing session token for {}", resolution.user.id);
		if let Ok(value) = HeaderValue::from_str(&gate.cookie.set(&token)) {
			response.headers_mut().append(header::SET_COOKIE, value);
		}
	}

	Ok(response)
}


// vim: ts=4
