//! Plugin composition through the full server bootstrap: contributed
//! routers, exempt paths, disable rules, build info, and fail-fast
//! registration.

mod common;

use axum::routing::get;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use trellis_server::app::{AfterServerStartedHook, RouterFactory};
use trellis_server::bootstrap::{ServerOpts, build_app};
use trellis_types::error::{Error, TrResult};
use trellis_types::plugin::{Extension, ExtensionCollector, Plugin};

use common::get as http_get;

struct HelloPlugin;

impl Plugin for HelloPlugin {
	fn id(&self) -> &str {
		"hello_plugin"
	}

	fn version(&self) -> &str {
		"2.1.0"
	}

	fn register(&self, collector: &mut ExtensionCollector) -> TrResult<()> {
		let factory: RouterFactory = Arc::new(|| {
			axum::Router::new()
				.route("/api/hello", get(|| async { "hello" }))
				.route("/api/hello/public", get(|| async { "public hello" }))
		});
		collector.append(
			Extension::new("router", "hello", "hello_plugin::routes").with_payload(factory),
		);
		Ok(())
	}

	fn default_settings(&self) -> Option<serde_json::Value> {
		Some(json!({ "greeting": "hello", "loud": false }))
	}

	fn paths_without_authentication(&self) -> &[&str] {
		&["/api/hello/public"]
	}

	fn client_config(&self) -> Option<serde_json::Value> {
		Some(json!({ "hello_enabled": true }))
	}
}

struct VendorPlugin;

impl Plugin for VendorPlugin {
	fn id(&self) -> &str {
		"vendor_extra"
	}

	fn version(&self) -> &str {
		"0.9.0"
	}

	fn register(&self, _collector: &mut ExtensionCollector) -> TrResult<()> {
		Ok(())
	}
}

struct BrokenPlugin;

impl Plugin for BrokenPlugin {
	fn id(&self) -> &str {
		"broken_plugin"
	}

	fn version(&self) -> &str {
		"0.0.1"
	}

	fn register(&self, _collector: &mut ExtensionCollector) -> TrResult<()> {
		Err(Error::Internal("this plugin cannot register".to_string()))
	}
}

async fn build(
	workspace: serde_json::Value,
	plugins: Vec<Arc<dyn Plugin>>,
) -> TrResult<(trellis_server::App, axum::Router)> {
	build_app(ServerOpts {
		workspace_config: Some(workspace),
		env_vars: Some(Vec::new()),
		plugins,
		..ServerOpts::default()
	})
	.await
}

#[tokio::test]
async fn test_plugin_router_is_mounted_and_gated() {
	let (_app, router) = build(json!({}), vec![Arc::new(HelloPlugin)]).await.unwrap();

	// The contributed route sits behind the auth gate...
	assert_eq!(http_get(&router, "/api/hello", &[]).await.status, 401);

	// ...except for the path the plugin declared exempt.
	let response = http_get(&router, "/api/hello/public", &[]).await;
	assert_eq!(response.status, 200);
	assert_eq!(response.text, "public hello");

	let auth = common::basic_auth("admin", "admin");
	let response = http_get(&router, "/api/hello", &[("Authorization", &auth)]).await;
	assert_eq!(response.status, 200);
	assert_eq!(response.text, "hello");
}

#[tokio::test]
async fn test_plugin_settings_fragment_is_merged() {
	// Plugin defaults sit below the workspace file.
	let (app, _router) = build(
		json!({ "hello_plugin": { "loud": true } }),
		vec![Arc::new(HelloPlugin)],
	)
	.await
	.unwrap();

	assert_eq!(app.settings.get_nested("hello_plugin.greeting"), Some(&json!("hello")));
	assert_eq!(app.settings.get_nested("hello_plugin.loud"), Some(&json!(true)));
}

#[tokio::test]
async fn test_disable_pattern_removes_plugin() {
	let (app, _router) = build(
		json!({ "trellis_core": { "disable": { "plugins": ["vendor_.*"] } } }),
		vec![Arc::new(HelloPlugin), Arc::new(VendorPlugin)],
	)
	.await
	.unwrap();

	let ids: Vec<&str> = app.registry.plugins().iter().map(|p| p.id()).collect();
	assert!(ids.contains(&"hello_plugin"));
	assert!(ids.contains(&"trellis_core"));
	assert!(!ids.contains(&"vendor_extra"));
}

#[tokio::test]
async fn test_enabled_plugins_allow_list() {
	// The core plugin itself is subject to the allow-list.
	let (app, _router) = build(
		json!({ "trellis_core": { "enabled_plugins": ["trellis_core"] } }),
		vec![Arc::new(VendorPlugin)],
	)
	.await
	.unwrap();

	let ids: Vec<&str> = app.registry.plugins().iter().map(|p| p.id()).collect();
	assert_eq!(ids, vec!["trellis_core"]);
}

#[tokio::test]
async fn test_broken_registration_aborts_startup() {
	let result = build(json!({}), vec![Arc::new(BrokenPlugin)]).await;
	match result {
		Err(Error::Registration { plugin, .. }) => assert_eq!(&*plugin, "broken_plugin"),
		Err(other) => panic!("unexpected error: {other}"),
		Ok(_) => panic!("startup must fail when a plugin cannot register"),
	}
}

#[tokio::test]
async fn test_build_info_lists_plugins() {
	let (_app, router) =
		build(json!({}), vec![Arc::new(HelloPlugin), Arc::new(VendorPlugin)]).await.unwrap();

	let info = http_get(&router, "/api/buildInfo.json", &[]).await.json();
	assert_eq!(info["name"], json!("trellis_core"));
	let plugins = info["plugins"].as_array().unwrap();
	assert!(plugins.contains(&json!({ "name": "hello_plugin", "version": "2.1.0" })));
	assert!(plugins.contains(&json!({ "name": "vendor_extra", "version": "0.9.0" })));
}

#[tokio::test]
async fn test_client_config_composition() {
	let (_app, router) = build(
		json!({ "trellis_core": { "client_config": { "beta_banner": true } } }),
		vec![Arc::new(HelloPlugin)],
	)
	.await
	.unwrap();

	let config = http_get(&router, "/api/clientConfig", &[]).await.json();
	assert_eq!(config["env"], json!("production"));
	assert_eq!(config["e2e"], json!(false));
	assert_eq!(config["hello_enabled"], json!(true));
	assert_eq!(config["beta_banner"], json!(true));
}

struct StartupHookPlugin {
	started: Arc<AtomicBool>,
}

impl Plugin for StartupHookPlugin {
	fn id(&self) -> &str {
		"startup_hook_plugin"
	}

	fn version(&self) -> &str {
		"1.0.0"
	}

	fn register(&self, collector: &mut ExtensionCollector) -> TrResult<()> {
		let started = self.started.clone();
		let hook: AfterServerStartedHook = Arc::new(move |_app| {
			started.store(true, Ordering::SeqCst);
		});
		collector.append(
			Extension::new("after_server_started", "mark_started", "startup_hook_plugin::on_started")
				.with_payload(hook),
		);
		Ok(())
	}
}

#[tokio::test]
async fn test_after_server_started_hook_runs() {
	let started = Arc::new(AtomicBool::new(false));
	let (_app, _router) =
		build(json!({}), vec![Arc::new(StartupHookPlugin { started: started.clone() })])
			.await
			.unwrap();

	// The hook runs in a background task once composition finishes.
	for _ in 0..100 {
		if started.load(Ordering::SeqCst) {
			break;
		}
		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}
	assert!(started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_disable_extension_rule_drops_router() {
	let (_app, router) = build(
		json!({ "trellis_core": { "disable": { "extensions": [{ "type": "router", "id": "hello" }] } } }),
		vec![Arc::new(HelloPlugin)],
	)
	.await
	.unwrap();

	// The plugin stays active but its router extension is filtered out.
	let auth = common::basic_auth("admin", "admin");
	let response = http_get(&router, "/api/hello", &[("Authorization", &auth)]).await;
	assert_eq!(response.status, 404);
}

// vim: ts=4
