use axum::{
	Router, middleware,
	routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use trellis_core::AuthGate;
use trellis_core::security::gate;

use crate::app::{App, RouterFactory};
use crate::handler;

pub fn init(app: App, auth_gate: Arc<AuthGate>) -> Router {
	let mut router = Router::new()
		.route("/api/health", get(handler::get_health))
		.route("/health", get(handler::get_health_deprecated))
		.route("/api/buildInfo.json", get(handler::get_build_info))
		.route("/api/clientConfig", get(handler::get_client_config))
		.route("/api/security/stores", get(handler::get_security_stores))
		.route("/api/login", get(handler::get_login).post(handler::post_login))
		.route("/api/logout", post(handler::post_logout))
		.route("/api/loggedinas", get(handler::get_loggedinas));

	// Routers contributed by plugins
	for ext in app.registry.list("router") {
		if let Some(factory) = ext.payload_as::<RouterFactory>() {
			router = router.merge(factory());
		}
	}

	router
		.layer(middleware::from_fn_with_state(auth_gate, gate::protect))
		.layer(TraceLayer::new_for_http())
		.with_state(app)
}

// vim: ts=4
