use std::{env, process};

use tracing_subscriber::EnvFilter;

use trellis_core::settings::{build_settings, load_workspace_config};
use trellis_server::bootstrap::{ServerOpts, build_app};

use tracing::{error, info};

/// `RUST_LOG` wins; otherwise the `trellis_core.log_level` setting; the
/// default is `info`.
fn log_filter() -> EnvFilter {
	if let Ok(filter) = EnvFilter::try_from_default_env() {
		return filter;
	}

	let level = load_workspace_config()
		.and_then(|workspace| build_settings(&[], workspace, env::vars()))
		.ok()
		.and_then(|settings| settings.trellis_core.log_level.clone())
		.unwrap_or_else(|| "info".to_string());

	EnvFilter::new(level)
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt().with_env_filter(log_filter()).init();

	let (_app, router) = match build_app(ServerOpts::default()).await {
		Ok(built) => built,
		Err(err) => {
			error!("FATAL: failed to start: {}", err);
			process::exit(1);
		}
	};

	let listen = env::var("TRELLIS_LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
	let listener = match tokio::net::TcpListener::bind(&listen).await {
		Ok(listener) => listener,
		Err(err) => {
			error!("FATAL: cannot listen on {}: {}", listen, err);
			process::exit(1);
		}
	};

	info!("Listening on {}", listen);
	if let Err(err) = axum::serve(listener, router).await {
		error!("FATAL: server error: {}", err);
		process::exit(1);
	}
}

// vim: ts=4
