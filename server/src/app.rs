//! Application state and the extension payload types the server consumes.

use serde_json::Value;
use std::sync::Arc;

use trellis_core::security::SessionCookie;
use trellis_core::{Registry, SecurityManager, Settings};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process-wide application state, constructed once at startup and
/// threaded through every handler. There is no ambient global state.
pub struct AppState {
	pub settings: Settings,
	pub registry: Registry,
	pub security: Arc<SecurityManager>,
	pub cookie: SessionCookie,
	/// Merged client-config fragments contributed by the plugins.
	pub client_config: Value,
	/// Id and version of the main application plugin.
	pub main_plugin: (Box<str>, Box<str>),
}

pub type App = Arc<AppState>;

/// Payload type of `router` extensions: builds an axum router merged
/// into the application at startup.
pub type RouterFactory = Arc<dyn Fn() -> axum::Router<App> + Send + Sync>;

/// Payload type of `after_server_started` extensions: run once in the
/// background after the application is fully composed.
pub type AfterServerStartedHook = Arc<dyn Fn(&App) + Send + Sync>;

// vim: ts=4
