//! Plugin descriptors, extensions, and the plugin source.
//!
//! A plugin contributes typed capability entries ("extensions") through a
//! registration callback. Extensions carry a `(kind, id)` pair, free-form
//! attributes, and an optional type-erased payload holding the actual
//! factory value, which consumers downcast to the type agreed for that
//! kind.

use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

use crate::error::TrResult;

/// A typed capability entry contributed by a plugin.
///
/// `(kind, id)` pairs need not be globally unique across plugins;
/// consumers typically select the first match or aggregate all.
/// Read-only after the registration phase ends.
#[derive(Clone)]
pub struct Extension {
	pub kind: Box<str>,
	pub id: Box<str>,
	/// Human-readable reference to the factory backing this extension,
	/// e.g. a fully qualified function path. Diagnostic only; the actual
	/// factory value travels in `payload`.
	pub factory: Box<str>,
	pub attributes: Map<String, Value>,
	/// Plugin that registered this extension. Stamped by the collector.
	pub plugin_id: Box<str>,
	pub payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Extension {
	pub fn new(kind: &str, id: &str, factory: &str) -> Extension {
		Extension {
			kind: kind.into(),
			id: id.into(),
			factory: factory.into(),
			attributes: Map::new(),
			plugin_id: "".into(),
			payload: None,
		}
	}

	pub fn with_attribute(mut self, key: &str, value: Value) -> Extension {
		self.attributes.insert(key.to_string(), value);
		self
	}

	pub fn with_payload<T: Send + Sync + 'static>(mut self, payload: T) -> Extension {
		self.payload = Some(Arc::new(payload));
		self
	}

	/// Downcasts the payload to the type agreed for this extension kind.
	pub fn payload_as<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.payload.as_ref()?.downcast_ref::<T>()
	}
}

impl std::fmt::Debug for Extension {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Extension")
			.field("kind", &self.kind)
			.field("id", &self.id)
			.field("factory", &self.factory)
			.field("attributes", &self.attributes)
			.field("plugin_id", &self.plugin_id)
			.field("payload", &self.payload.as_ref().map(|_| "..."))
			.finish()
	}
}

/// Collects the extensions a single plugin registers.
pub struct ExtensionCollector {
	plugin_id: Box<str>,
	extensions: Vec<Extension>,
}

impl ExtensionCollector {
	pub fn new(plugin_id: &str) -> ExtensionCollector {
		ExtensionCollector { plugin_id: plugin_id.into(), extensions: Vec::new() }
	}

	pub fn append(&mut self, mut ext: Extension) {
		ext.plugin_id = self.plugin_id.clone();
		self.extensions.push(ext);
	}

	pub fn into_extensions(self) -> Vec<Extension> {
		self.extensions
	}
}

/// A Trellis plugin.
///
/// Discovered once at startup through a [`PluginSource`] and immutable
/// thereafter. The registration callback is invoked exactly once; a
/// failure there is fatal to startup.
pub trait Plugin: Send + Sync {
	/// Unique plugin id, also the key of its settings section.
	fn id(&self) -> &str;

	fn version(&self) -> &str;

	/// Registers this plugin's extensions with the collector.
	fn register(&self, collector: &mut ExtensionCollector) -> TrResult<()>;

	/// Default settings fragment for this plugin's section, merged below
	/// the workspace configuration.
	fn default_settings(&self) -> Option<Value> {
		None
	}

	/// Paths this plugin exposes without authentication, unioned into the
	/// auth-gate exemption set.
	fn paths_without_authentication(&self) -> &[&str] {
		&[]
	}

	/// Static client-config fragment served by `GET /api/clientConfig`.
	fn client_config(&self) -> Option<Value> {
		None
	}
}

/// Enumerates the installable plugins of the host environment.
///
/// The production implementation scans the host-provided registration
/// list; tests hand in an in-memory list. A failure here aborts startup.
pub trait PluginSource: Send + Sync {
	fn plugins(&self) -> TrResult<Vec<Arc<dyn Plugin>>>;
}

/// A `PluginSource` over a fixed, in-memory plugin list.
pub struct StaticPluginSource {
	plugins: Vec<Arc<dyn Plugin>>,
}

impl StaticPluginSource {
	pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> StaticPluginSource {
		StaticPluginSource { plugins }
	}
}

impl PluginSource for StaticPluginSource {
	fn plugins(&self) -> TrResult<Vec<Arc<dyn Plugin>>> {
		Ok(self.plugins.clone())
	}
}


// vim: ts=4
