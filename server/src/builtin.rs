//! The built-in core plugin.
//!
//! Registers the stock security stores as `user_store` extensions. The
//! stores themselves stay disabled until the settings enable them; the
//! factories re-check the effective settings because the configuration
//! is merged only after the plugin list is known.

use serde_json::json;
use std::sync::Arc;

use trellis_core::security::UserStoreFactory;
use trellis_core::security::pubkey::HttpKeyFetcher;
use trellis_core::security::store::{
	AlbSecurityStore, DummyStore, NoSecurityStore, OAuth2SecurityStore,
};
use trellis_types::plugin::{Extension, ExtensionCollector, Plugin};

use crate::prelude::*;

pub struct CorePlugin;

impl Plugin for CorePlugin {
	fn id(&self) -> &str {
		"trellis_core"
	}

	fn version(&self) -> &str {
		crate::app::VERSION
	}

	fn register(&self, collector: &mut ExtensionCollector) -> TrResult<()> {
		let dummy: UserStoreFactory = Arc::new(|settings| Ok(DummyStore::create(settings)));
		collector.append(
			Extension::new("user_store", "DummyStore", "trellis_core::security::store::dummy_store::create")
				.with_payload(dummy),
		);

		let alb: UserStoreFactory = Arc::new(|settings| {
			if !settings.trellis_core.security.store.alb_security_store.enable {
				return Ok(None);
			}
			let fetcher = Arc::new(HttpKeyFetcher::new()?);
			Ok(AlbSecurityStore::create(settings, fetcher))
		});
		collector.append(
			Extension::new("user_store", "AlbSecurityStore", "trellis_core::security::store::alb_store::create")
				.with_payload(alb),
		);

		let oauth2: UserStoreFactory =
			Arc::new(|settings| Ok(OAuth2SecurityStore::create(settings)));
		collector.append(
			Extension::new("user_store", "OAuth2SecurityStore", "trellis_core::security::store::oauth2_store::create")
				.with_payload(oauth2),
		);

		let no_security: UserStoreFactory =
			Arc::new(|settings| Ok(NoSecurityStore::create(settings)));
		collector.append(
			Extension::new("user_store", "NoSecurityStore", "trellis_core::security::store::no_security_store::create")
				.with_payload(no_security),
		);

		Ok(())
	}

	fn client_config(&self) -> Option<serde_json::Value> {
		Some(json!({ "e2e": false }))
	}
}

// vim: ts=4
