//! Settings subsystem: typed model and the configuration merger

pub mod merge;
pub mod model;

pub use merge::{build_settings, deep_merge, env_overlay, load_workspace_config};
pub use model::{
	AlbStoreSettings, CoreSettings, DisableRule, DisableSettings, DummyStoreSettings,
	DummyUserEntry, GlobalSettings, NoSecurityStoreSettings, OAuth2HeaderSettings,
	OAuth2StoreSettings, RunEnv, SameSite, SecuritySettings, Settings, StoreSettings,
	TokenLocation,
};

// vim: ts=4
