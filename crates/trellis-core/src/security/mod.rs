//! Security subsystem: stores, session tokens, manager, and the auth gate

pub mod extract;
pub mod gate;
pub mod jwt;
pub mod manager;
pub mod pubkey;
pub mod store;

use std::sync::Arc;

use trellis_types::error::TrResult;
use trellis_types::user_store::UserStore;

use crate::settings::Settings;

pub use extract::CurrentUser;
pub use gate::{AuthGate, SessionCookie};
pub use jwt::{SessionClaims, SessionTokens};
pub use manager::{Resolution, SecurityManager};

/// Payload type of `user_store` extensions. The factory inspects the
/// settings and returns `Ok(None)` when its store is not enabled.
pub type UserStoreFactory =
	Arc<dyn Fn(&Settings) -> TrResult<Option<Arc<dyn UserStore>>> + Send + Sync>;

// vim: ts=4
