//! The extension registry.
//!
//! Built once at startup from the active plugin list. Registration is
//! fail-fast: if any plugin's registration callback errors, the whole
//! build errors and no partial registry escapes.

use std::sync::Arc;

use trellis_types::plugin::{Extension, ExtensionCollector, Plugin};

use crate::plugin::catalog::is_disabled_extension;
use crate::prelude::*;
use crate::settings::Settings;

pub struct Registry {
	plugins: Vec<Arc<dyn Plugin>>,
	/// Flat extension list in registration order: plugin order first,
	/// then collection order within a plugin.
	extensions: Vec<Extension>,
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registry")
			.field("plugins", &self.plugins.len())
			.field("extensions", &self.extensions.len())
			.finish()
	}
}

impl Registry {
	/// Asks every active plugin to register its extensions and filters
	/// them through the disable rules.
	pub fn build(plugins: Vec<Arc<dyn Plugin>>, settings: &Settings) -> TrResult<Registry> {
		let mut extensions = Vec::new();

		for plugin in &plugins {
			let mut collector = ExtensionCollector::new(plugin.id());
			plugin.register(&mut collector).map_err(|err| Error::Registration {
				plugin: plugin.id().into(),
				source: Box::new(err),
			})?;

			let kept: Vec<Extension> = collector
				.into_extensions()
				.into_iter()
				.filter(|ext| {
					let kind = ext.kind.clone();
					!is_disabled_extension(ext, &kind, plugin.id(), settings)
				})
				.collect();

			info!("Plugin {} registered {} extension(s)", plugin.id(), kept.len());
			extensions.extend(kept);
		}

		Ok(Registry { plugins, extensions })
	}

	/// The active plugins in catalog order.
	pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
		&self.plugins
	}

	/// All non-filtered extensions of the given kind, in registration
	/// order. Stable and side-effect-free.
	pub fn list(&self, kind: &str) -> Vec<&Extension> {
		self.extensions.iter().filter(|ext| &*ext.kind == kind).collect()
	}

	/// Extensions registered by a single plugin.
	pub fn plugin_extensions(&self, plugin_id: &str) -> Vec<&Extension> {
		self.extensions.iter().filter(|ext| &*ext.plugin_id == plugin_id).collect()
	}
}


// vim: ts=4
