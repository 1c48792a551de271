//! Credential store over a configured user list.
//!
//! Resolves only through key-based lookup (`username:secret`) and
//! explicit login; it never inspects the request itself. Passwords are
//! stored as salted SHA-512 digests.

use async_trait::async_trait;
use axum::http::request::Parts;
use sha2::{Digest, Sha512};
use std::sync::Arc;

use trellis_types::user_store::{KeyResolvable, UserStore};

use crate::prelude::*;
use crate::settings::{DummyUserEntry, Settings};

/// Hex-encoded SHA-512 digest of `password + salt`.
pub fn hash_password(password: &str, salt: &str) -> String {
	let digest = Sha512::digest(format!("{}{}", password, salt).as_bytes());
	digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A fresh random salt for new credential entries.
pub fn generate_salt() -> String {
	use rand::Rng;
	let mut bytes = [0u8; 16];
	rand::rng().fill_bytes(&mut bytes);
	bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug)]
pub struct DummyStore {
	users: Vec<DummyUserEntry>,
}

impl DummyStore {
	pub fn new(users: Vec<DummyUserEntry>) -> DummyStore {
		DummyStore { users }
	}

	/// Instantiates the store when enabled in the settings.
	pub fn create(settings: &Settings) -> Option<Arc<dyn UserStore>> {
		let cfg = &settings.trellis_core.security.store.dummy_store;
		if cfg.enable {
			info!("Adding DummyStore");
			Some(Arc::new(DummyStore::new(cfg.users.clone())))
		} else {
			None
		}
	}

	fn check(&self, username: &str, password: &str) -> Option<User> {
		self.users
			.iter()
			.find(|entry| entry.name == username)
			.filter(|entry| entry.password == hash_password(password, &entry.salt))
			.map(|entry| User::new(entry.name.clone()).with_roles(entry.roles.clone()))
	}
}

#[async_trait]
impl UserStore for DummyStore {
	fn id(&self) -> &'static str {
		"DummyStore"
	}

	async fn load_from_request(&self, _parts: &Parts) -> TrResult<Option<User>> {
		Ok(None)
	}

	fn as_key_resolvable(&self) -> Option<&dyn KeyResolvable> {
		Some(self)
	}
}

#[async_trait]
impl KeyResolvable for DummyStore {
	async fn load_from_key(&self, key: &str) -> TrResult<Option<User>> {
		let Some((username, password)) = key.split_once(':') else {
			return Ok(None);
		};
		Ok(self.check(username, password))
	}
}


// vim: ts=4
