//! Public-key retrieval for reverse-proxy token verification.
//!
//! Keys are fetched from the region-specific endpoint of the load
//! balancer and memoized for the process lifetime. Keys are long-lived,
//! so stale entries are never invalidated.

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::prelude::*;

const KEY_CACHE_SIZE: usize = 64;

/// Fetches the public key identified by `kid` for the given region.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
	async fn fetch(&self, region: &str, kid: &str) -> TrResult<String>;
}

/// Production fetcher backed by an HTTPS client and an in-process cache.
pub struct HttpKeyFetcher {
	client: Client<hyper_rustls::HttpsConnector<HttpConnector>, Empty<Bytes>>,
	cache: Mutex<LruCache<Box<str>, String>>,
}

impl HttpKeyFetcher {
	pub fn new() -> TrResult<HttpKeyFetcher> {
		let https = hyper_rustls::HttpsConnectorBuilder::new()
			.with_native_roots()?
			.https_only()
			.enable_http1()
			.build();
		let client = Client::builder(TokioExecutor::new()).build(https);
		let cache =
			Mutex::new(LruCache::new(NonZeroUsize::new(KEY_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)));

		Ok(HttpKeyFetcher { client, cache })
	}
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
	async fn fetch(&self, region: &str, kid: &str) -> TrResult<String> {
		let cache_key: Box<str> = format!("{}/{}", region, kid).into();
		if let Some(key) = self.cache.lock().get(&cache_key) {
			return Ok(key.clone());
		}

		let url = format!("https://public-keys.auth.elb.{}.amazonaws.com/{}", region, kid);
		let uri: hyper::Uri = url
			.parse()
			.map_err(|_| Error::ValidationError(format!("invalid key endpoint: {}", url)))?;

		debug!("Fetching public key from {}", url);
		let response = self
			.client
			.get(uri)
			.await
			.map_err(|err| Error::Internal(format!("public key fetch failed: {}", err)))?;
		if !response.status().is_success() {
			return Err(Error::Internal(format!(
				"public key fetch returned {}",
				response.status()
			)));
		}

		let body = response
			.into_body()
			.collect()
			.await
			.map_err(|err| Error::Internal(format!("public key fetch failed: {}", err)))?
			.to_bytes();
		let key = String::from_utf8(body.to_vec())
			.map_err(|_| Error::Internal("public key is not valid utf-8".to_string()))?;

		self.cache.lock().put(cache_key, key.clone());
		Ok(key)
	}
}

/// In-memory fetcher for tests and air-gapped deployments.
#[derive(Debug, Default)]
pub struct StaticKeyFetcher {
	keys: HashMap<Box<str>, String>,
}

impl StaticKeyFetcher {
	pub fn new() -> StaticKeyFetcher {
		StaticKeyFetcher::default()
	}

	pub fn with_key(mut self, kid: &str, pem: &str) -> StaticKeyFetcher {
		self.keys.insert(kid.into(), pem.to_string());
		self
	}
}

#[async_trait]
impl KeyFetcher for StaticKeyFetcher {
	async fn fetch(&self, _region: &str, kid: &str) -> TrResult<String> {
		self.keys
			.get(kid)
			.cloned()
			.ok_or_else(|| Error::NotFound)
	}
}


// vim: ts=4
