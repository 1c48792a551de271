//! Startup composition: settings, plugins, registry, stores, gate.
//!
//! The order matters: the workspace and environment are merged first so
//! the disable rules can filter the plugin list, then the settings are
//! rebuilt with every active plugin's declared defaults, and only then
//! are the registry, the store chain, and the router assembled. Any
//! error here aborts startup; a partially composed application never
//! serves traffic.

use serde_json::{Map, Value, json};
use std::sync::Arc;

use trellis_core::plugin::catalog;
use trellis_core::security::store::DummyStore;
use trellis_core::security::{AuthGate, SessionCookie, UserStoreFactory};
use trellis_core::settings::{build_settings, deep_merge, load_workspace_config};
use trellis_core::{Registry, SecurityManager};
use trellis_types::plugin::{Plugin, StaticPluginSource};
use trellis_types::user_store::UserStore;

use crate::app::{AfterServerStartedHook, App, AppState};
use crate::builtin::CorePlugin;
use crate::prelude::*;
use crate::routes;

/// Options for composing the application.
#[derive(Default)]
pub struct ServerOpts {
	/// The main application plugin; falls back to the `main_app` setting
	/// and then to the core plugin.
	pub main_app: Option<String>,
	/// Overrides the workspace configuration file. Tests hand in an
	/// in-memory tree.
	pub workspace_config: Option<Value>,
	/// Overrides the process environment for the settings overlay.
	pub env_vars: Option<Vec<(String, String)>>,
	/// Application plugins installed on top of the built-in core plugin.
	pub plugins: Vec<Arc<dyn Plugin>>,
}

/// Composes the application and its router.
pub async fn build_app(opts: ServerOpts) -> TrResult<(App, axum::Router)> {
	let workspace = match opts.workspace_config {
		Some(tree) => tree,
		None => load_workspace_config()?,
	};
	let env_vars: Vec<(String, String)> =
		opts.env_vars.unwrap_or_else(|| std::env::vars().collect());

	let mut installed: Vec<Arc<dyn Plugin>> = vec![Arc::new(CorePlugin)];
	installed.extend(opts.plugins);
	let source = StaticPluginSource::new(installed);

	// First pass without plugin fragments, enough to evaluate the
	// disable rules during discovery.
	let bootstrap_settings = build_settings(&[], workspace.clone(), env_vars.clone())?;
	let plugins = catalog::discover(&source, &bootstrap_settings)?;

	// Second pass: every active plugin contributes its settings fragment
	// keyed by plugin id, below workspace and environment.
	let fragments: Vec<Value> = plugins
		.iter()
		.map(|plugin| {
			let mut fragment = Map::new();
			fragment.insert(
				plugin.id().to_string(),
				plugin.default_settings().unwrap_or_else(|| json!({})),
			);
			Value::Object(fragment)
		})
		.collect();
	let settings = build_settings(&fragments, workspace, env_vars)?;

	let main_app = opts
		.main_app
		.or_else(|| settings.trellis_core.main_app.clone())
		.unwrap_or_else(|| "trellis_core".to_string());
	let main_plugin = plugins
		.iter()
		.find(|plugin| plugin.id() == main_app)
		.ok_or_else(|| Error::Internal(format!("Main app plugin {} not found", main_app)))?;
	info!(
		"Starting {}@{} in {} mode",
		main_plugin.id(),
		main_plugin.version(),
		if settings.is_development_mode() { "development" } else { "production" }
	);
	let main_plugin = (Box::from(main_plugin.id()), Box::from(main_plugin.version()));

	let registry = Registry::build(plugins.clone(), &settings)?;

	// Instantiate the enabled stores in registration order.
	let mut stores: Vec<Arc<dyn UserStore>> = Vec::new();
	for ext in registry.list("user_store") {
		let Some(factory) = ext.payload_as::<UserStoreFactory>() else {
			warn!("Extension {} carries no user-store factory, skipping", ext.id);
			continue;
		};
		if let Some(store) = factory(&settings)? {
			stores.push(store);
		}
	}
	if stores.is_empty() {
		info!("No security store enabled, falling back to the dummy store");
		stores.push(Arc::new(DummyStore::new(
			settings.trellis_core.security.store.dummy_store.users.clone(),
		)));
	}

	let security = Arc::new(SecurityManager::new(&settings, stores)?);

	let plugin_paths: Vec<String> = plugins
		.iter()
		.flat_map(|plugin| {
			plugin.paths_without_authentication().iter().map(|path| (*path).to_string())
		})
		.collect();
	let cookie = SessionCookie::from_settings(&settings);
	let gate = Arc::new(AuthGate::new(security.clone(), plugin_paths, cookie.clone()));

	// Client-config fragments merge in plugin order.
	let mut client_config = json!({});
	for plugin in &plugins {
		if let Some(fragment) = plugin.client_config() {
			deep_merge(&mut client_config, fragment);
		}
	}

	let app: App = Arc::new(AppState {
		settings,
		registry,
		security,
		cookie,
		client_config,
		main_plugin,
	});

	let router = routes::init(app.clone(), gate);

	// After-server-started hooks run in the background once the
	// application is fully composed.
	let hooks: Vec<AfterServerStartedHook> = app
		.registry
		.list("after_server_started")
		.iter()
		.filter_map(|ext| ext.payload_as::<AfterServerStartedHook>().cloned())
		.collect();
	if !hooks.is_empty() {
		info!("Found {} after_server_started extension(s) to run", hooks.len());
		let app = app.clone();
		tokio::spawn(async move {
			for hook in hooks {
				hook(&app);
			}
		});
	}

	Ok((app, router))
}

// vim: ts=4
