//! Configuration loading and merging.
//!
//! The effective settings tree is assembled in fixed priority order:
//! built-in defaults, then plugin-declared fragments, then the workspace
//! file, then the environment overlay. Maps merge key-wise recursively;
//! any other value (including lists) is replaced wholesale by the
//! higher-priority source.

use serde_json::{Map, Value};

use crate::prelude::*;
use crate::settings::model::{GlobalSettings, Settings};

/// Environment variables whose name ends with this suffix (case
/// insensitive) are stored verbatim instead of being parsed as JSON.
const AS_STRING_SUFFIX: &str = "_as_string";

/// Loads the workspace configuration file at `TRELLIS_CONFIG_PATH`
/// (defaults to `config.json`). A missing file yields an empty tree; an
/// unreadable or malformed file is an error.
pub fn load_workspace_config() -> TrResult<Value> {
	let path =
		std::env::var("TRELLIS_CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());

	if std::path::Path::new(&path).exists() {
		info!("Loading workspace config from {}", path);
		let text = std::fs::read_to_string(&path)?;
		Ok(serde_json::from_str(&text)?)
	} else {
		info!("No {} found, using empty config", path);
		Ok(Value::Object(Map::new()))
	}
}

/// Merges `overlay` into `base`: objects merge key-wise recursively,
/// everything else is replaced by `overlay`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
	if let Value::Object(overlay_map) = overlay {
		if let Value::Object(base_map) = base {
			for (key, value) in overlay_map {
				deep_merge(base_map.entry(key).or_insert(Value::Null), value);
			}
		} else {
			*base = Value::Object(overlay_map);
		}
	} else {
		*base = overlay;
	}
}

fn parse_env_value(raw: &str) -> Value {
	let trimmed = raw.trim();
	// Accept the capitalizations booleans commonly arrive in from shell
	// environments before falling back to strict JSON.
	if trimmed.eq_ignore_ascii_case("true") {
		return Value::Bool(true);
	}
	if trimmed.eq_ignore_ascii_case("false") {
		return Value::Bool(false);
	}
	match serde_json::from_str(trimmed) {
		Ok(value) => value,
		Err(err) => {
			debug!("Environment value {:?} is not JSON ({}), keeping raw string", raw, err);
			Value::String(raw.to_string())
		}
	}
}

fn insert_env_value(tree: &mut Value, path: &[String], raw: &str) {
	let Some((leaf, parents)) = path.split_last() else {
		return;
	};

	let mut current = tree;
	for part in parents {
		if !current.is_object() {
			*current = Value::Object(Map::new());
		}
		if let Value::Object(map) = current {
			current = map.entry(part.clone()).or_insert_with(|| Value::Object(Map::new()));
		}
	}
	if !current.is_object() {
		*current = Value::Object(Map::new());
	}
	let Value::Object(map) = current else {
		return;
	};

	match leaf.strip_suffix(AS_STRING_SUFFIX) {
		Some(stripped) if !stripped.is_empty() => {
			// Store the raw string under the stripped key and, for
			// backward compatibility, under the suffixed key as well.
			// Both forms stay queryable.
			map.insert(stripped.to_string(), Value::String(raw.to_string()));
			map.insert(leaf.clone(), Value::String(raw.to_string()));
		}
		_ => {
			map.insert(leaf.clone(), parse_env_value(raw));
		}
	}
}

/// Builds the environment overlay tree.
///
/// Variables containing the `__` nested delimiter map onto a settings
/// path with every segment lowercased. Variables without the delimiter
/// only apply when they name a known top-level key (e.g. `SECRET_KEY`),
/// so unrelated process environment does not leak into the settings.
pub fn env_overlay<I>(vars: I, known_top_level: &[String]) -> Value
where
	I: IntoIterator<Item = (String, String)>,
{
	let mut overlay = Value::Object(Map::new());

	for (name, raw) in vars {
		if name.contains("__") {
			let path: Vec<String> =
				name.split("__").map(|part| part.to_ascii_lowercase()).collect();
			insert_env_value(&mut overlay, &path, &raw);
		} else {
			let key = name.to_ascii_lowercase();
			if known_top_level.contains(&key) {
				insert_env_value(&mut overlay, std::slice::from_ref(&key), &raw);
			}
		}
	}

	overlay
}

/// Assembles the effective settings from plugin fragments, the workspace
/// tree, and the given environment variables.
pub fn build_settings<I>(
	plugin_fragments: &[Value],
	workspace: Value,
	env_vars: I,
) -> TrResult<Settings>
where
	I: IntoIterator<Item = (String, String)>,
{
	let defaults = serde_json::to_value(GlobalSettings::default())?;
	let known_top_level: Vec<String> = defaults
		.as_object()
		.map(|map| map.keys().cloned().collect())
		.unwrap_or_default();

	let mut raw = defaults;
	for fragment in plugin_fragments {
		deep_merge(&mut raw, fragment.clone());
	}
	deep_merge(&mut raw, workspace);
	deep_merge(&mut raw, env_overlay(env_vars, &known_top_level));

	let global: GlobalSettings = serde_json::from_value(raw.clone())?;
	Ok(Settings::new(global, raw))
}


// vim: ts=4
