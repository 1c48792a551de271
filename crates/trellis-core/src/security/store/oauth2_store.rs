//! OAuth2/JWT header store.
//!
//! The trust boundary is the upstream proxy: tokens are decoded without
//! signature verification. Multiple named header variants are tried in
//! declared order; a variant whose token lacks all candidate id fields
//! falls through to the next. The alternate trust-headers mode reads
//! plain email/groups headers instead of decoding a token.

use async_trait::async_trait;
use axum::http::request::Parts;
use serde_json::{Map, Value};
use std::sync::Arc;

use trellis_types::user::{ClearCookie, LogoutPayload};
use trellis_types::user_store::{LogoutCapable, UserStore};

use crate::prelude::*;
use crate::security::jwt::decode_unverified;
use crate::settings::{OAuth2HeaderSettings, OAuth2StoreSettings, Settings};

#[derive(Debug)]
pub struct OAuth2SecurityStore {
	cfg: OAuth2StoreSettings,
}

impl OAuth2SecurityStore {
	pub fn new(cfg: OAuth2StoreSettings) -> OAuth2SecurityStore {
		OAuth2SecurityStore { cfg }
	}

	pub fn create(settings: &Settings) -> Option<Arc<dyn UserStore>> {
		let cfg = &settings.trellis_core.security.store.oauth2_security_store;
		if cfg.enable {
			info!("Adding OAuth2SecurityStore");
			Some(Arc::new(OAuth2SecurityStore::new(cfg.clone())))
		} else {
			None
		}
	}

	fn user_from_variant(
		&self,
		variant: &OAuth2HeaderSettings,
		claims: &Map<String, Value>,
		token: &str,
	) -> Option<User> {
		let id = variant
			.email_fields
			.iter()
			.find_map(|field| claims.get(field).and_then(Value::as_str))?;

		// The first candidate roles field whose value is a list of
		// strings wins; scalar values are skipped.
		let roles = variant
			.roles_fields
			.iter()
			.find_map(|field| claims.get(field).and_then(Value::as_array))
			.map(|values| values.iter().filter_map(Value::as_str).map(str::to_string).collect())
			.unwrap_or_default();

		let mut properties = Map::new();
		for field in &variant.properties_fields {
			if let Some(value) = claims.get(field) {
				properties.insert(field.clone(), value.clone());
			}
		}

		let mut user = User::new(id).with_roles(roles);
		user.properties = properties;
		user.oauth2_access_token = Some(token.to_string());
		Some(user)
	}

	fn load_from_trusted_headers(&self, parts: &Parts) -> Option<User> {
		let email = parts
			.headers
			.get(self.cfg.email_header_name.as_str())
			.and_then(|h| h.to_str().ok())?;
		let roles = parts
			.headers
			.get(self.cfg.groups_header_name.as_str())
			.and_then(|h| h.to_str().ok())
			.map(|groups| groups.split(',').map(|g| g.trim().to_string()).collect())
			.unwrap_or_default();

		Some(User::new(email).with_roles(roles))
	}
}

#[async_trait]
impl UserStore for OAuth2SecurityStore {
	fn id(&self) -> &'static str {
		"OAuth2SecurityStore"
	}

	fn ui_hint(&self) -> &'static str {
		"AutoLoginForm"
	}

	async fn load_from_request(&self, parts: &Parts) -> TrResult<Option<User>> {
		if self.cfg.trust_headers {
			return Ok(self.load_from_trusted_headers(parts));
		}

		for variant in &self.cfg.token_headers {
			let Some(raw) =
				parts.headers.get(variant.name.as_str()).and_then(|h| h.to_str().ok())
			else {
				continue;
			};
			let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

			let claims = match decode_unverified(token) {
				Ok(claims) => claims,
				Err(err) => {
					debug!("Header {} does not carry a decodable token: {}", variant.name, err);
					continue;
				}
			};

			if let Some(user) = self.user_from_variant(variant, &claims, token) {
				return Ok(Some(user));
			}
		}

		Ok(None)
	}

	fn as_logout_capable(&self) -> Option<&dyn LogoutCapable> {
		Some(self)
	}
}

impl LogoutCapable for OAuth2SecurityStore {
	fn logout(&self, _user: &User) -> LogoutPayload {
		let mut payload = LogoutPayload::default();
		if let Some(cookie_name) = &self.cfg.cookie_name {
			payload.cookies.push(ClearCookie { name: cookie_name.as_str().into() });
		}
		if let Some(signout_url) = &self.cfg.signout_url {
			payload.data.insert("redirect".to_string(), Value::String(signout_url.clone()));
		}
		payload
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
	use serde_json::json;

	fn token(claims: Value) -> String {
		encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"secret"))
			.unwrap()
	}

	fn request_parts(headers: &[(&str, String)]) -> Parts {
		let mut builder = axum::http::Request::builder();
		for (name, value) in headers {
			builder = builder.header(*name, value);
		}
		let (parts, _) = builder.body(()).unwrap().into_parts();
		parts
	}

	fn variant(name: &str) -> OAuth2HeaderSettings {
		OAuth2HeaderSettings {
			name: name.into(),
			email_fields: vec!["email".into()],
			roles_fields: vec!["roles".into(), "groups".into()],
			properties_fields: vec!["sub".into()],
		}
	}

	fn store(cfg: OAuth2StoreSettings) -> OAuth2SecurityStore {
		OAuth2SecurityStore::new(cfg)
	}

	#[tokio::test]
	async fn test_resolves_user_from_token_header() {
		let cfg = OAuth2StoreSettings {
			token_headers: vec![variant("X-Forwarded-Access-Token")],
			..OAuth2StoreSettings::default()
		};
		let parts = request_parts(&[(
			"X-Forwarded-Access-Token",
			token(json!({ "email": "admin@localhost", "sub": "admin", "groups": ["role1", "role2"] })),
		)]);

		let user = store(cfg).load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "admin@localhost");
		assert_eq!(user.roles, vec!["role1".to_string(), "role2".to_string()]);
		assert_eq!(user.properties["sub"], json!("admin"));
		assert!(user.oauth2_access_token.is_some());
	}

	#[tokio::test]
	async fn test_bearer_prefix_is_stripped() {
		let cfg = OAuth2StoreSettings {
			token_headers: vec![variant("X-Forwarded-Access-Token")],
			..OAuth2StoreSettings::default()
		};
		let parts = request_parts(&[(
			"X-Forwarded-Access-Token",
			format!("Bearer {}", token(json!({ "email": "admin@localhost" }))),
		)]);

		let user = store(cfg).load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "admin@localhost");
	}

	#[tokio::test]
	async fn test_header_variants_tried_in_declared_order() {
		let cfg = OAuth2StoreSettings {
			token_headers: vec![
				variant("X-Forwarded-Access-Token"),
				variant("X-Forwarded-Access-Token-2"),
				variant("X-Forwarded-Access-Token-3"),
			],
			..OAuth2StoreSettings::default()
		};
		let store = store(cfg);

		// An invalid first header falls through to the last one.
		let parts = request_parts(&[
			("X-Forwarded-Access-Token", "Invalid header".to_string()),
			("X-Forwarded-Access-Token-3", token(json!({ "email": "admin-3@localhost", "sub": "admin-3" }))),
		]);
		let user = store.load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "admin-3@localhost");
		assert_eq!(user.properties["sub"], json!("admin-3"));

		// With all headers present the first configured one wins.
		let parts = request_parts(&[
			("X-Forwarded-Access-Token", token(json!({ "email": "admin@localhost", "sub": "admin" }))),
			("X-Forwarded-Access-Token-2", token(json!({ "email": "admin-2@localhost", "sub": "admin-2" }))),
			("X-Forwarded-Access-Token-3", token(json!({ "email": "admin-3@localhost", "sub": "admin-3" }))),
		]);
		let user = store.load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "admin@localhost");
	}

	#[tokio::test]
	async fn test_token_without_id_field_falls_through() {
		let cfg = OAuth2StoreSettings {
			token_headers: vec![variant("X-Token-A"), variant("X-Token-B")],
			..OAuth2StoreSettings::default()
		};
		let parts = request_parts(&[
			("X-Token-A", token(json!({ "sub": "no-email-here" }))),
			("X-Token-B", token(json!({ "email": "fallback@localhost" }))),
		]);
		let user = store(cfg).load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "fallback@localhost");
	}

	#[tokio::test]
	async fn test_scalar_roles_field_is_skipped() {
		let cfg = OAuth2StoreSettings {
			token_headers: vec![variant("X-Forwarded-Access-Token")],
			..OAuth2StoreSettings::default()
		};
		let parts = request_parts(&[(
			"X-Forwarded-Access-Token",
			token(json!({ "email": "admin@localhost", "roles": "admin", "groups": ["g1"] })),
		)]);
		let user = store(cfg).load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.roles, vec!["g1".to_string()]);
	}

	#[tokio::test]
	async fn test_trust_headers_mode() {
		let cfg = OAuth2StoreSettings { trust_headers: true, ..OAuth2StoreSettings::default() };
		let parts = request_parts(&[
			("X-Forwarded-Email", "admin@localhost".to_string()),
			("X-Forwarded-Groups", "role1, role2".to_string()),
		]);
		let user = store(cfg).load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "admin@localhost");
		assert_eq!(user.roles, vec!["role1".to_string(), "role2".to_string()]);
	}
}

// vim: ts=4
