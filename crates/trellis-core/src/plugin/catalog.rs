//! Plugin discovery and disable-rule filtering.
//!
//! Discovery enumerates plugins through the injected [`PluginSource`],
//! sorts them by id, and drops the ones suppressed by configuration. An
//! explicit `enabled_plugins` allow-list overrides the pattern rules
//! entirely.

use itertools::Itertools;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use trellis_types::plugin::{Extension, Plugin, PluginSource};

use crate::prelude::*;
use crate::settings::{DisableRule, Settings};

/// Matches `value` against `pattern` anchored at both ends. An invalid
/// pattern is logged and treated as non-matching.
fn full_match(pattern: &str, value: &str) -> bool {
	match Regex::new(&format!("^(?:{})$", pattern)) {
		Ok(regex) => regex.is_match(value),
		Err(err) => {
			warn!("Ignoring invalid disable pattern {:?}: {}", pattern, err);
			false
		}
	}
}

/// Renders an attribute for regex matching: strings match their content,
/// everything else its JSON form.
fn attribute_str(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Whether a plugin is suppressed by configuration.
///
/// A non-empty `enabled_plugins` allow-list disables everything not
/// listed, regardless of the disable patterns.
pub fn is_disabled_plugin(plugin_id: &str, settings: &Settings) -> bool {
	let core = &settings.trellis_core;
	if !core.enabled_plugins.is_empty() {
		return !core.enabled_plugins.iter().any(|id| id == plugin_id);
	}

	core.disable.plugins.iter().any(|pattern| full_match(pattern, plugin_id))
}

/// Whether an extension is suppressed, either because its owning plugin
/// is disabled or because a disable rule matches it.
pub fn is_disabled_extension(
	ext: &Extension,
	kind: &str,
	plugin_id: &str,
	settings: &Settings,
) -> bool {
	if is_disabled_plugin(plugin_id, settings) {
		return true;
	}

	settings.trellis_core.disable.extensions.iter().any(|rule| match rule {
		DisableRule::Pattern(pattern) => full_match(pattern, &ext.id),
		DisableRule::Fields(fields) => fields.iter().all(|(field, pattern)| {
			if field == "type" {
				full_match(pattern, kind)
			} else {
				ext.attributes
					.get(field)
					.is_some_and(|value| full_match(pattern, &attribute_str(value)))
			}
		}),
	})
}

/// Enumerates all installable plugins, sorted by id, with disabled ones
/// filtered out. A broken enumeration mechanism is fatal.
pub fn discover(
	source: &dyn PluginSource,
	settings: &Settings,
) -> TrResult<Vec<Arc<dyn Plugin>>> {
	let mut plugins: Vec<Arc<dyn Plugin>> = source
		.plugins()
		.map_err(|err| Error::Discovery(err.to_string()))?
		.into_iter()
		.filter(|p| !is_disabled_plugin(p.id(), settings))
		.collect();
	plugins.sort_by(|a, b| a.id().cmp(b.id()));

	info!(
		"Discovered {} plugin(s): {}",
		plugins.len(),
		plugins.iter().map(|p| format!("{}@{}", p.id(), p.version())).join(", ")
	);

	Ok(plugins)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use trellis_types::plugin::{ExtensionCollector, StaticPluginSource};

	struct TestPlugin {
		id: &'static str,
	}

	impl Plugin for TestPlugin {
		fn id(&self) -> &str {
			self.id
		}

		fn version(&self) -> &str {
			"1.0.0"
		}

		fn register(&self, _collector: &mut ExtensionCollector) -> TrResult<()> {
			Ok(())
		}
	}

	fn settings(core: Value) -> Settings {
		let raw = json!({ "trellis_core": core });
		crate::settings::build_settings(&[], raw, Vec::<(String, String)>::new()).unwrap()
	}

	fn source() -> StaticPluginSource {
		StaticPluginSource::new(vec![
			Arc::new(TestPlugin { id: "vendor_extra" }),
			Arc::new(TestPlugin { id: "core_plugin" }),
		])
	}

	#[test]
	fn test_disable_pattern_hides_matching_plugin() {
		let settings = settings(json!({ "disable": { "plugins": ["vendor_.*"] } }));
		let plugins = discover(&source(), &settings).unwrap();
		let ids: Vec<&str> = plugins.iter().map(|p| p.id()).collect();
		assert_eq!(ids, vec!["core_plugin"]);
	}

	#[test]
	fn test_disable_pattern_is_full_match() {
		let settings = settings(json!({ "disable": { "plugins": ["vendor"] } }));
		let plugins = discover(&source(), &settings).unwrap();
		assert_eq!(plugins.len(), 2, "a prefix must not match the full id");
	}

	#[test]
	fn test_enabled_plugins_allow_list_overrides_patterns() {
		let settings = settings(json!({
			"enabled_plugins": ["vendor_extra"],
			"disable": { "plugins": ["vendor_.*"] }
		}));
		let plugins = discover(&source(), &settings).unwrap();
		let ids: Vec<&str> = plugins.iter().map(|p| p.id()).collect();
		assert_eq!(ids, vec!["vendor_extra"]);
	}

	#[test]
	fn test_discovery_sorts_by_id() {
		let settings = settings(json!({}));
		let plugins = discover(&source(), &settings).unwrap();
		let ids: Vec<&str> = plugins.iter().map(|p| p.id()).collect();
		assert_eq!(ids, vec!["core_plugin", "vendor_extra"]);
	}

	#[test]
	fn test_extension_disable_by_id_pattern() {
		let settings = settings(json!({ "disable": { "extensions": ["legacy_.*"] } }));
		let ext = Extension::new("router", "legacy_api", "p::routes");
		assert!(is_disabled_extension(&ext, "router", "core_plugin", &settings));
		let ext = Extension::new("router", "api", "p::routes");
		assert!(!is_disabled_extension(&ext, "router", "core_plugin", &settings));
	}

	#[test]
	fn test_extension_disable_by_field_rule() {
		let settings = settings(json!({
			"disable": { "extensions": [{ "type": "user_store", "vendor": "acme.*" }] }
		}));
		let ext = Extension::new("user_store", "AcmeStore", "p::store")
			.with_attribute("vendor", json!("acme-corp"));
		assert!(is_disabled_extension(&ext, "user_store", "core_plugin", &settings));
		// Same attributes but different kind: the `type` field must match
		// the extension kind, not an attribute.
		assert!(!is_disabled_extension(&ext, "router", "core_plugin", &settings));
		// A rule field without a corresponding attribute never matches.
		let ext = Extension::new("user_store", "OtherStore", "p::store");
		assert!(!is_disabled_extension(&ext, "user_store", "core_plugin", &settings));
	}

	#[test]
	fn test_extension_of_disabled_plugin_is_disabled() {
		let settings = settings(json!({ "disable": { "plugins": ["vendor_.*"] } }));
		let ext = Extension::new("router", "api", "p::routes");
		assert!(is_disabled_extension(&ext, "router", "vendor_extra", &settings));
	}

	#[test]
	fn test_invalid_pattern_is_ignored() {
		let settings = settings(json!({ "disable": { "plugins": ["(unclosed"] } }));
		assert!(!is_disabled_plugin("core_plugin", &settings));
	}
}

// vim: ts=4
