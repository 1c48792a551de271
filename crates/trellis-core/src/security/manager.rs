//! The security manager.
//!
//! Owns the ordered user-store chain and the session-token machinery.
//! A request is resolved through deterministic credential sources: the
//! `apiKey` header, HTTP Basic credentials, the session token from the
//! permitted locations, and finally the store chain. The first source
//! that yields a user wins.

use axum::http::header;
use axum::http::request::Parts;
use base64::Engine;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

use trellis_types::user_store::UserStore;

use crate::prelude::*;
use crate::security::jwt::{SessionClaims, SessionTokens};
use crate::settings::{Settings, TokenLocation};

/// Contributes extra claims to every issued session token.
pub type ClaimsLoader = Arc<dyn Fn(&User) -> Map<String, Value> + Send + Sync>;

/// Observer invoked once per request when a user is resolved.
pub type UserLoadedHook = Arc<dyn Fn(&User) + Send + Sync>;

/// The outcome of resolving one request: the user, the store that
/// produced it (absent for token-based sessions), and the session-token
/// claims (absent for store-based resolutions).
#[derive(Clone)]
pub struct Resolution {
	pub user: User,
	pub store: Option<Arc<dyn UserStore>>,
	pub claims: Option<SessionClaims>,
}

/// Successful explicit login: the user with its freshly minted token.
pub struct LoginOutcome {
	pub user: User,
	pub token: String,
	pub claims: SessionClaims,
	pub store: Arc<dyn UserStore>,
}

struct TokenLocations {
	locations: Vec<TokenLocation>,
	header_name: String,
	header_type: String,
	cookie_name: String,
}

pub struct SecurityManager {
	tokens: SessionTokens,
	token_locations: TokenLocations,
	/// Swapped wholesale so concurrent readers observe either the old or
	/// the new list, never a partially updated one.
	stores: RwLock<Vec<Arc<dyn UserStore>>>,
	claims_loaders: RwLock<Vec<ClaimsLoader>>,
	user_loaded_hooks: RwLock<Vec<UserLoadedHook>>,
}

impl SecurityManager {
	pub fn new(settings: &Settings, stores: Vec<Arc<dyn UserStore>>) -> TrResult<SecurityManager> {
		Ok(SecurityManager {
			tokens: SessionTokens::from_settings(settings)?,
			token_locations: TokenLocations {
				locations: settings.jwt_token_location.clone(),
				header_name: settings.jwt_header_name.clone(),
				header_type: settings.jwt_header_type.clone(),
				cookie_name: settings.jwt_access_cookie_name.clone(),
			},
			stores: RwLock::new(stores),
			claims_loaders: RwLock::new(Vec::new()),
			user_loaded_hooks: RwLock::new(Vec::new()),
		})
	}

	/// Snapshot of the active store chain.
	pub fn stores(&self) -> Vec<Arc<dyn UserStore>> {
		self.stores.read().clone()
	}

	/// Replaces the store chain atomically. Intended for startup and
	/// test composition, not steady-state traffic.
	pub fn set_stores(&self, stores: Vec<Arc<dyn UserStore>>) {
		*self.stores.write() = stores;
	}

	/// Registers a claims loader, invoked in registration order on every
	/// token issue.
	pub fn register_claims_loader(&self, loader: ClaimsLoader) {
		self.claims_loaders.write().push(loader);
	}

	/// Registers an observer invoked once per request with the resolved
	/// user, in registration order.
	pub fn register_on_user_loaded(&self, hook: UserLoadedHook) {
		self.user_loaded_hooks.write().push(hook);
	}

	/// Resolves a `username:secret` key against the stores supporting
	/// key-based lookup. First match wins; a store error is logged and
	/// the chain continues.
	pub async fn resolve_from_key(&self, key: &str) -> Option<(User, Arc<dyn UserStore>)> {
		for store in self.stores() {
			let Some(resolver) = store.as_key_resolvable() else {
				continue;
			};
			match resolver.load_from_key(key).await {
				Ok(Some(user)) => return Some((user, store.clone())),
				Ok(None) => {}
				Err(err) => warn!("Store {} failed during key resolution: {}", store.id(), err),
			}
		}
		None
	}

	async fn resolve_stores(&self, parts: &Parts) -> Option<(User, Arc<dyn UserStore>)> {
		for store in self.stores() {
			match store.load_from_request(parts).await {
				Ok(Some(user)) => return Some((user, store.clone())),
				Ok(None) => {}
				// A single misbehaving store must never take down
				// request processing.
				Err(err) => warn!("Store {} failed during resolution: {}", store.id(), err),
			}
		}
		None
	}

	fn basic_credentials(parts: &Parts) -> Option<String> {
		let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
		let encoded = value.strip_prefix("Basic ")?;
		let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim()).ok()?;
		String::from_utf8(bytes).ok()
	}

	fn token_from_request(&self, parts: &Parts) -> Option<String> {
		for location in &self.token_locations.locations {
			match location {
				TokenLocation::Headers => {
					let Some(value) = parts
						.headers
						.get(self.token_locations.header_name.as_str())
						.and_then(|h| h.to_str().ok())
					else {
						continue;
					};
					let prefix = format!("{} ", self.token_locations.header_type);
					if let Some(token) = value.strip_prefix(&prefix) {
						return Some(token.trim().to_string());
					}
				}
				TokenLocation::Cookies => {
					if let Some(token) =
						cookie_value(parts, &self.token_locations.cookie_name)
					{
						return Some(token);
					}
				}
			}
		}
		None
	}

	fn user_from_claims(claims: &SessionClaims, raw_token: &str) -> User {
		let mut user = User::new(claims.sub.clone()).with_roles(claims.roles.clone());
		user.access_token = Some(raw_token.to_string());
		user
	}

	async fn resolve(&self, parts: &Parts) -> Option<Resolution> {
		// 1. API key of the form `username:secret`
		if let Some(key) = parts.headers.get("apiKey").and_then(|h| h.to_str().ok()) {
			if let Some((user, store)) = self.resolve_from_key(key).await {
				return Some(Resolution { user, store: Some(store), claims: None });
			}
		}

		// 2. HTTP Basic credentials
		if let Some(credentials) = Self::basic_credentials(parts) {
			if let Some((user, store)) = self.resolve_from_key(&credentials).await {
				return Some(Resolution { user, store: Some(store), claims: None });
			}
		}

		// 3. Session token from the permitted locations. A rejected
		// token is no user, not an error; the chain continues below.
		if let Some(raw) = self.token_from_request(parts) {
			match self.tokens.decode(&raw) {
				Ok(claims) => {
					let user = Self::user_from_claims(&claims, &raw);
					return Some(Resolution { user, store: None, claims: Some(claims) });
				}
				Err(err) => debug!("Rejected session token: {}", err),
			}
		}

		// 4. The pluggable store chain
		let (user, store) = self.resolve_stores(parts).await?;
		Some(Resolution { user, store: Some(store), claims: None })
	}

	/// Resolves the request to a user, firing the on-user-loaded hooks
	/// exactly once on success.
	pub async fn load_from_request(&self, parts: &Parts) -> Option<Resolution> {
		let resolution = self.resolve(parts).await?;
		let hooks = self.user_loaded_hooks.read().clone();
		for hook in hooks {
			hook(&resolution.user);
		}
		Some(resolution)
	}

	/// Issues a session token for the user, merging the output of every
	/// registered claims loader in registration order.
	pub fn issue_token(&self, user: &User) -> TrResult<(String, SessionClaims)> {
		let loaders = self.claims_loaders.read().clone();
		let mut extra = Map::new();
		for loader in loaders {
			extra.extend(loader(user));
		}
		self.tokens.issue(user, extra)
	}

	/// Explicit login with username/password against the key-resolvable
	/// stores. Failures are indistinguishable from unknown users.
	pub async fn login(&self, username: &str, password: &str) -> Option<LoginOutcome> {
		let (mut user, store) =
			self.resolve_from_key(&format!("{}:{}", username, password)).await?;
		match self.issue_token(&user) {
			Ok((token, claims)) => {
				user.access_token = Some(token.clone());
				Some(LoginOutcome { user, token, claims, store })
			}
			Err(err) => {
				error!("Failed to issue session token: {}", err);
				None
			}
		}
	}

	/// Re-mints the token when its remaining validity has dropped below
	/// the refresh threshold. Returns `None` when no refresh is due, so
	/// untouched tokens stay byte-identical.
	pub fn refreshed_token(&self, claims: &SessionClaims) -> Option<(String, SessionClaims)> {
		if !self.tokens.needs_refresh(claims) {
			return None;
		}
		let user = User::new(claims.sub.clone()).with_roles(claims.roles.clone());
		match self.issue_token(&user) {
			Ok(pair) => Some(pair),
			Err(err) => {
				error!("Failed to refresh session token: {}", err);
				None
			}
		}
	}

	/// Store-driven logout: delegates to the store that produced the
	/// user, when it supports logout.
	pub fn logout(&self, resolution: &Resolution) -> LogoutPayload {
		resolution
			.store
			.as_ref()
			.and_then(|store| store.as_logout_capable())
			.map(|capable| capable.logout(&resolution.user))
			.unwrap_or_default()
	}
}

/// Extracts a cookie value from the request's `Cookie` headers.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
	for header_value in parts.headers.get_all(header::COOKIE) {
		let Ok(cookies) = header_value.to_str() else {
			continue;
		};
		for pair in cookies.split(';') {
			if let Some((key, value)) = pair.trim().split_once('=') {
				if key == name {
					return Some(value.to_string());
				}
			}
		}
	}
	None
}


// vim: ts=4
