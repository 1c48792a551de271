//! The typed settings tree.
//!
//! The effective configuration is assembled by [`super::merge`] from
//! built-in defaults, plugin-declared fragments, the workspace file, and
//! the environment overlay. Known sections deserialize into the structs
//! below; plugin sections are retained in a flattened map so they stay
//! queryable without the core knowing their shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Accepts either a single string or a list of strings. Candidate claim
/// field lists are commonly written as a bare string in workspace files.
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum StringOrVec {
		One(String),
		Many(Vec<String>),
	}

	Ok(match StringOrVec::deserialize(deserializer)? {
		StringOrVec::One(s) => vec![s],
		StringOrVec::Many(v) => v,
	})
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunEnv {
	Development,
	#[default]
	Production,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenLocation {
	Headers,
	Cookies,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
	Lax,
	Strict,
	None,
}

impl SameSite {
	pub fn as_str(&self) -> &'static str {
		match self {
			SameSite::Lax => "Lax",
			SameSite::Strict => "Strict",
			SameSite::None => "None",
		}
	}
}

/// Pattern-based suppression of plugins and individual extensions.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DisableSettings {
	/// Full-match regexes against plugin ids.
	pub plugins: Vec<String>,
	pub extensions: Vec<DisableRule>,
}

/// A rule suppressing individual extensions: either a full-match regex
/// against the extension id, or a map of field name to regex where every
/// field must match the corresponding extension attribute. The literal
/// field name `type` matches the extension kind.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DisableRule {
	Pattern(String),
	Fields(BTreeMap<String, String>),
}

/// A credential entry of the dummy store. `password` is the hex-encoded
/// SHA-512 digest of the plaintext password concatenated with `salt`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DummyUserEntry {
	pub name: String,
	pub salt: String,
	pub password: String,
	#[serde(default)]
	pub roles: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DummyStoreSettings {
	pub enable: bool,
	pub users: Vec<DummyUserEntry>,
}

impl Default for DummyStoreSettings {
	fn default() -> Self {
		DummyStoreSettings {
			enable: false,
			users: vec![
				DummyUserEntry {
					name: "admin".into(),
					salt: "dcf46ce914154a44b1557eba91c1f50d".into(),
					password: "e464485eeeca97927191bd77e38137cc5870c53efb05c8ec027faa8d47f0c0ee23e733ea5e494cb045ca46b0f3b6f695b7261a34f46ba3797cde67724d78522a".into(),
					roles: vec!["admin".into()],
				},
				DummyUserEntry {
					name: "bob".into(),
					salt: "35c63c3121b04aaba8c735ee302e9f9d".into(),
					password: "8cb741b1e6b8cd5eb41767146876de16c736bf0a1af9505a9c44fc662d21ca48a4c9e922cc4454e3034906a27918adc20265063cc3e279b31c59afd74f6e8233".into(),
					roles: vec!["bob".into()],
				},
				DummyUserEntry {
					name: "alice".into(),
					salt: "b955b2adba0c4b599338af5e087931a9".into(),
					password: "15ee8aa9740221def6fa31c1aa775b170e11e35409edcc86faf7bc437c006be0b4ff372ad42675e8a9c5889d2f99b5b9b5fce8af57740cfaa42519bf74ba2f44".into(),
					roles: vec!["alice".into()],
				},
			],
		}
	}
}

/// Reverse-proxy header store (ALB-style) settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbStoreSettings {
	pub enable: bool,
	/// IdP session cookie to clear on logout.
	pub cookie_name: Option<String>,
	/// Redirect URL triggered after logout, for federated sign-out.
	pub signout_url: Option<String>,
	/// Header carrying the signed identity token.
	pub token_header_name: String,
	/// Header carrying the upstream access token.
	pub access_token_header_name: String,
	/// Candidate claim fields for the user id, tried in order.
	#[serde(deserialize_with = "string_or_vec")]
	pub email_token_fields: Vec<String>,
	/// Claim fields copied into the user's properties.
	pub properties_fields: Vec<String>,
	/// Verify the token signature against the public key fetched from the
	/// region endpoint. Disable only behind a trusted proxy.
	pub verify_signature: bool,
	/// Region of the load balancer to fetch the public key from.
	pub region: String,
	pub decode_algorithms: Vec<String>,
	pub audience: Option<String>,
	pub issuer: Option<String>,
}

impl Default for AlbStoreSettings {
	fn default() -> Self {
		AlbStoreSettings {
			enable: false,
			cookie_name: None,
			signout_url: None,
			token_header_name: "X-Amzn-Oidc-Data".into(),
			access_token_header_name: "X-Amzn-Oidc-Accesstoken".into(),
			email_token_fields: vec!["email".into()],
			properties_fields: Vec::new(),
			verify_signature: true,
			region: "eu-central-1".into(),
			decode_algorithms: vec!["ES256".into()],
			audience: None,
			issuer: None,
		}
	}
}

/// One OAuth2 token-header variant, tried in declared order.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuth2HeaderSettings {
	pub name: String,
	#[serde(deserialize_with = "string_or_vec")]
	pub email_fields: Vec<String>,
	/// Candidate claim fields for roles; the first whose value is a list
	/// of strings wins.
	pub roles_fields: Vec<String>,
	pub properties_fields: Vec<String>,
}

impl Default for OAuth2HeaderSettings {
	fn default() -> Self {
		OAuth2HeaderSettings {
			name: "X-Forwarded-Access-Token".into(),
			email_fields: vec!["email".into()],
			roles_fields: vec!["roles".into(), "groups".into()],
			properties_fields: Vec::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuth2StoreSettings {
	pub enable: bool,
	pub cookie_name: Option<String>,
	pub signout_url: Option<String>,
	pub token_headers: Vec<OAuth2HeaderSettings>,
	/// Trust forwarded identity headers directly instead of decoding a
	/// token (for proxies that only forward plain email/group headers).
	pub trust_headers: bool,
	pub email_header_name: String,
	pub groups_header_name: String,
}

impl Default for OAuth2StoreSettings {
	fn default() -> Self {
		OAuth2StoreSettings {
			enable: false,
			cookie_name: None,
			signout_url: None,
			token_headers: vec![OAuth2HeaderSettings::default()],
			trust_headers: false,
			email_header_name: "X-Forwarded-Email".into(),
			groups_header_name: "X-Forwarded-Groups".into(),
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NoSecurityStoreSettings {
	pub enable: bool,
	pub user: String,
	pub roles: Vec<String>,
	pub properties: Map<String, Value>,
}

impl Default for NoSecurityStoreSettings {
	fn default() -> Self {
		NoSecurityStoreSettings {
			enable: false,
			user: "admin".into(),
			roles: Vec::new(),
			properties: Map::new(),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
	pub dummy_store: DummyStoreSettings,
	pub alb_security_store: AlbStoreSettings,
	pub oauth2_security_store: OAuth2StoreSettings,
	pub no_security_store: NoSecurityStoreSettings,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SecuritySettings {
	pub store: StoreSettings,
}

/// The `trellis_core` settings section.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreSettings {
	/// The main application plugin; inferred when unset.
	pub main_app: Option<String>,
	/// Overrides the root log level without replacing the whole filter.
	pub log_level: Option<String>,
	/// Allow-list of plugin ids. When non-empty it overrides the disable
	/// patterns: everything not listed is disabled.
	pub enabled_plugins: Vec<String>,
	pub disable: DisableSettings,
	pub security: SecuritySettings,
	/// Overlay served by `GET /api/clientConfig`.
	pub client_config: Option<Value>,
}

/// The full typed settings tree.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalSettings {
	pub env: RunEnv,
	/// Set to true in CI environments.
	pub ci: bool,
	pub secret_key: String,

	// Session-token options, environment-overridable as flat keys.
	pub jwt_token_location: Vec<TokenLocation>,
	pub jwt_expire_in_seconds: i64,
	pub jwt_refresh_if_expiring_in_seconds: i64,
	pub jwt_algorithm: String,
	pub jwt_access_cookie_name: String,
	pub jwt_header_name: String,
	pub jwt_header_type: String,
	pub jwt_cookie_secure: bool,
	pub jwt_cookie_samesite: Option<SameSite>,
	pub jwt_access_cookie_path: String,

	pub trellis_core: CoreSettings,

	/// Plugin sections keyed by plugin id, kept as raw trees.
	#[serde(flatten)]
	pub sections: BTreeMap<String, Value>,
}

impl Default for GlobalSettings {
	fn default() -> Self {
		GlobalSettings {
			env: RunEnv::Production,
			ci: false,
			secret_key: "INSECURE_DEFAULT_c2VjcmV0X2tleV9jaGFuZ2VfbWU".into(),
			jwt_token_location: vec![TokenLocation::Headers, TokenLocation::Cookies],
			jwt_expire_in_seconds: 24 * 60 * 60,
			jwt_refresh_if_expiring_in_seconds: 30 * 60,
			jwt_algorithm: "HS256".into(),
			jwt_access_cookie_name: "tr_access_token".into(),
			jwt_header_name: "Authorization".into(),
			jwt_header_type: "Bearer".into(),
			jwt_cookie_secure: false,
			jwt_cookie_samesite: Some(SameSite::Strict),
			jwt_access_cookie_path: "/".into(),
			trellis_core: CoreSettings::default(),
			sections: BTreeMap::new(),
		}
	}
}

impl GlobalSettings {
	pub fn is_development_mode(&self) -> bool {
		self.env == RunEnv::Development
	}
}

/// The effective settings: the typed tree plus the raw merged tree it was
/// deserialized from, kept for path-based lookups into plugin sections.
#[derive(Clone, Debug)]
pub struct Settings {
	global: GlobalSettings,
	raw: Value,
}

impl Settings {
	pub fn new(global: GlobalSettings, raw: Value) -> Settings {
		Settings { global, raw }
	}

	/// The raw merged settings tree.
	pub fn raw(&self) -> &Value {
		&self.raw
	}

	/// Retrieves the value at a `.`-separated path from the raw merged
	/// tree. Legacy accessor; typed fields should be used where they
	/// exist.
	pub fn get_nested(&self, key: &str) -> Option<&Value> {
		let mut current = &self.raw;
		for part in key.split('.') {
			current = current.as_object()?.get(part)?;
		}
		Some(current)
	}
}

impl std::ops::Deref for Settings {
	type Target = GlobalSettings;

	fn deref(&self) -> &GlobalSettings {
		&self.global
	}
}

impl Default for Settings {
	fn default() -> Self {
		let global = GlobalSettings::default();
		let raw = serde_json::to_value(&global).unwrap_or_default();
		Settings { global, raw }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_roundtrip() {
		let defaults = GlobalSettings::default();
		let value = serde_json::to_value(&defaults).unwrap();
		let back: GlobalSettings = serde_json::from_value(value).unwrap();
		assert_eq!(back.jwt_algorithm, "HS256");
		assert_eq!(back.jwt_expire_in_seconds, 24 * 60 * 60);
		assert!(back.trellis_core.enabled_plugins.is_empty());
	}

	#[test]
	fn test_email_fields_accept_bare_string() {
		let settings: AlbStoreSettings =
			serde_json::from_value(serde_json::json!({ "email_token_fields": "upn" })).unwrap();
		assert_eq!(settings.email_token_fields, vec!["upn".to_string()]);
	}

	#[test]
	fn test_disable_rule_shapes() {
		let rules: Vec<DisableRule> = serde_json::from_value(serde_json::json!([
			"vendor_.*",
			{ "type": "router", "id": "legacy_.*" }
		]))
		.unwrap();
		assert!(matches!(rules[0], DisableRule::Pattern(_)));
		assert!(matches!(rules[1], DisableRule::Fields(_)));
	}

	#[test]
	fn test_unknown_sections_are_retained() {
		let global: GlobalSettings = serde_json::from_value(serde_json::json!({
			"my_plugin": { "answer": 42 }
		}))
		.unwrap();
		assert_eq!(global.sections["my_plugin"]["answer"], 42);
	}
}

// vim: ts=4
