//! The resolved user model and logout payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

/// Principal name of the anonymous sentinel user.
pub const ANONYMOUS: &str = "anonymous";

/// A user as resolved by a security store.
///
/// Constructed fresh by whichever store resolves the request and never
/// mutated afterwards; a token refresh issues a new instance.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct User {
	/// The principal, also exposed as `name`.
	pub id: String,
	#[serde(default)]
	pub roles: Vec<String>,
	/// Set when the user logged in via the native session-token mechanism.
	pub access_token: Option<String>,
	/// Access token issued by an upstream IdP (reverse-proxy and OAuth2
	/// stores only parse an already existing token). Usable for downstream
	/// requests to other services.
	pub oauth2_access_token: Option<String>,
	/// Arbitrary properties mapped onto the user, e.g. claim fields copied
	/// from a forwarded token.
	#[serde(default)]
	pub properties: Map<String, Value>,
}

impl User {
	pub fn new(id: impl Into<String>) -> User {
		User { id: id.into(), ..User::default() }
	}

	pub fn with_roles(mut self, roles: Vec<String>) -> User {
		self.roles = roles;
		self
	}

	pub fn anonymous() -> User {
		User::new(ANONYMOUS)
	}

	pub fn name(&self) -> &str {
		&self.id
	}

	pub fn is_anonymous(&self) -> bool {
		self.id == ANONYMOUS
	}

	pub fn has_role(&self, role: &str) -> bool {
		self.roles.iter().any(|r| r == role)
	}
}

/// Instruction to clear a cookie on the client.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClearCookie {
	pub name: Box<str>,
}

/// Returned by a store-driven logout: extra response data (e.g. a
/// `redirect` URL for federated sign-out) plus cookies to clear.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LogoutPayload {
	#[serde(default)]
	pub data: Map<String, Value>,
	#[serde(default)]
	pub cookies: Vec<ClearCookie>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_anonymous_user() {
		let user = User::anonymous();
		assert!(user.is_anonymous());
		assert_eq!(user.name(), "anonymous");
		assert!(!user.has_role("admin"));
	}

	#[test]
	fn test_has_role() {
		let user = User::new("admin").with_roles(vec!["admin".into()]);
		assert!(!user.is_anonymous());
		assert!(user.has_role("admin"));
		assert!(!user.has_role("bob"));
	}
}

// vim: ts=4
