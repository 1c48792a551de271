//! The core HTTP handlers: health, build info, client config, and the
//! authentication endpoints.

use axum::{
	Form, Json,
	body::Body,
	extract::State,
	http::{Request, header},
	response::AppendHeaders,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use serde_with::skip_serializing_none;

use trellis_core::security::jwt::SessionClaims;
use trellis_core::security::manager::{LoginOutcome, Resolution};
use trellis_core::security::{CurrentUser, SessionCookie};
use trellis_core::settings::deep_merge;

use crate::prelude::*;

/// User info returned by login and `/api/loggedinas`. `payload` carries
/// the decoded session-token claims when the session came from a token.
#[skip_serializing_none]
#[derive(Serialize)]
pub struct UserInfo {
	name: String,
	roles: Vec<String>,
	access_token: Option<String>,
	payload: Option<SessionClaims>,
	properties: Map<String, Value>,
}

impl UserInfo {
	fn from_resolution(resolution: &Resolution) -> UserInfo {
		UserInfo {
			name: resolution.user.id.clone(),
			roles: resolution.user.roles.clone(),
			access_token: resolution.user.access_token.clone(),
			payload: resolution.claims.clone(),
			properties: resolution.user.properties.clone(),
		}
	}

	fn from_login(outcome: &LoginOutcome) -> UserInfo {
		UserInfo {
			name: outcome.user.id.clone(),
			roles: outcome.user.roles.clone(),
			access_token: Some(outcome.token.clone()),
			payload: Some(outcome.claims.clone()),
			properties: outcome.user.properties.clone(),
		}
	}
}

/// # GET /api/health
pub async fn get_health() -> &'static str {
	"ok"
}

/// # GET /health
pub async fn get_health_deprecated() -> &'static str {
	warn!("Using deprecated /health endpoint. Consider switching to /api/health.");
	"ok"
}

/// # GET /api/buildInfo.json
pub async fn get_build_info(State(app): State<App>) -> Json<Value> {
	let (main_id, main_version) = &app.main_plugin;
	let plugins: Vec<Value> = app
		.registry
		.plugins()
		.iter()
		.filter(|plugin| plugin.id() != &**main_id)
		.map(|plugin| json!({ "name": plugin.id(), "version": plugin.version() }))
		.collect();

	Json(json!({
		"name": main_id,
		"version": main_version,
		"plugins": plugins,
	}))
}

/// # GET /api/clientConfig
///
/// Plugin fragments merged at startup, overlaid with the
/// `trellis_core.client_config` setting.
pub async fn get_client_config(State(app): State<App>) -> Json<Value> {
	let mut config = json!({
		"env": if app.settings.is_development_mode() { "development" } else { "production" },
	});
	deep_merge(&mut config, app.client_config.clone());
	if let Some(overlay) = &app.settings.trellis_core.client_config {
		deep_merge(&mut config, overlay.clone());
	}
	Json(config)
}

fn store_listing(app: &App) -> Vec<Value> {
	app.security
		.stores()
		.iter()
		.map(|store| {
			json!({
				"id": store.id(),
				"ui": store.ui_hint(),
				"configuration": store.configuration(),
			})
		})
		.collect()
}

/// # GET /api/security/stores
pub async fn get_security_stores(State(app): State<App>) -> Json<Vec<Value>> {
	Json(store_listing(&app))
}

/// # GET /api/login
///
/// The enabled stores, so a client can render the matching login form.
pub async fn get_login(State(app): State<App>) -> Json<Vec<Value>> {
	Json(store_listing(&app))
}

/// # POST /api/login
#[derive(Deserialize)]
pub struct LoginReq {
	username: String,
	password: String,
}

pub async fn post_login(
	State(app): State<App>,
	Form(login): Form<LoginReq>,
) -> TrResult<(AppendHeaders<Vec<(header::HeaderName, String)>>, Json<UserInfo>)> {
	let Some(outcome) = app.security.login(&login.username, &login.password).await else {
		// Deliberately generic: no user-enumeration leakage, and a small
		// delay against credential stuffing.
		tokio::time::sleep(std::time::Duration::from_secs(1)).await;
		return Err(Error::Unauthorized);
	};

	info!("User {} logged in via {}", outcome.user.id, outcome.store.id());
	let headers = vec![(header::SET_COOKIE, app.cookie.set(&outcome.token))];

	Ok((AppendHeaders(headers), Json(UserInfo::from_login(&outcome))))
}

/// # POST /api/logout
///
/// Clears the session cookie and merges the resolving store's logout
/// payload (e.g. a federated sign-out redirect) into the response.
pub async fn post_logout(
	State(app): State<App>,
	req: Request<Body>,
) -> TrResult<(AppendHeaders<Vec<(header::HeaderName, String)>>, Json<Value>)> {
	let (parts, _body) = req.into_parts();
	let resolution = app.security.load_from_request(&parts).await;

	let payload = resolution
		.as_ref()
		.map(|resolution| app.security.logout(resolution))
		.unwrap_or_default();
	if let Some(resolution) = &resolution {
		info!("User {} logged out", resolution.user.id);
	}

	let mut headers = vec![(header::SET_COOKIE, app.cookie.clear())];
	for cookie in &payload.cookies {
		headers.push((header::SET_COOKIE, SessionCookie::clear_named(&cookie.name)));
	}

	Ok((AppendHeaders(headers), Json(Value::Object(payload.data))))
}

/// # GET /api/loggedinas
pub async fn get_loggedinas(CurrentUser(resolution): CurrentUser) -> Json<UserInfo> {
	Json(UserInfo::from_resolution(&resolution))
}

// vim: ts=4
