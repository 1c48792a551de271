//! Store resolving every request to one statically configured identity.
//!
//! For open or demo deployments where authentication is intentionally
//! switched off.

use async_trait::async_trait;
use axum::http::request::Parts;
use serde_json::{Map, Value};
use std::sync::Arc;

use trellis_types::user_store::UserStore;

use crate::prelude::*;
use crate::settings::Settings;

#[derive(Debug)]
pub struct NoSecurityStore {
	user: String,
	roles: Vec<String>,
	properties: Map<String, Value>,
}

impl NoSecurityStore {
	pub fn new(user: String, roles: Vec<String>, properties: Map<String, Value>) -> NoSecurityStore {
		NoSecurityStore { user, roles, properties }
	}

	pub fn create(settings: &Settings) -> Option<Arc<dyn UserStore>> {
		let cfg = &settings.trellis_core.security.store.no_security_store;
		if cfg.enable {
			info!("Adding NoSecurityStore");
			Some(Arc::new(NoSecurityStore::new(
				cfg.user.clone(),
				cfg.roles.clone(),
				cfg.properties.clone(),
			)))
		} else {
			None
		}
	}
}

#[async_trait]
impl UserStore for NoSecurityStore {
	fn id(&self) -> &'static str {
		"NoSecurityStore"
	}

	fn ui_hint(&self) -> &'static str {
		"AutoLoginForm"
	}

	async fn load_from_request(&self, _parts: &Parts) -> TrResult<Option<User>> {
		let mut user = User::new(self.user.clone()).with_roles(self.roles.clone());
		user.properties = self.properties.clone();
		Ok(Some(user))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn test_always_resolves_configured_identity() {
		let mut properties = Map::new();
		properties.insert("id".into(), json!(123));
		let store = NoSecurityStore::new("test_name".into(), vec!["test_role".into()], properties);

		let (parts, _) = axum::http::Request::new(()).into_parts();
		let user = store.load_from_request(&parts).await.unwrap().unwrap();
		assert_eq!(user.id, "test_name");
		assert_eq!(user.roles, vec!["test_role".to_string()]);
		assert_eq!(user.properties["id"], json!(123));
	}
}

// vim: ts=4
