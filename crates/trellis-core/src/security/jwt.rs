//! Session-token encoding and decoding, plus the sliding-refresh policy.

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::prelude::*;
use crate::settings::Settings;

/// Claims carried by an issued session token. Extra claims contributed
/// by registered claims loaders travel in the flattened map.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionClaims {
	pub sub: String,
	#[serde(default)]
	pub roles: Vec<String>,
	pub exp: i64,
	pub iat: i64,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl SessionClaims {
	pub fn remaining_validity(&self) -> i64 {
		self.exp - Timestamp::now().0
	}
}

/// Signs, validates, and refreshes session tokens with the configured
/// secret and algorithm.
pub struct SessionTokens {
	secret: String,
	algorithm: Algorithm,
	expire_in_seconds: i64,
	refresh_if_expiring_in_seconds: i64,
}

impl SessionTokens {
	pub fn from_settings(settings: &Settings) -> TrResult<SessionTokens> {
		let algorithm = settings.jwt_algorithm.parse::<Algorithm>().map_err(|_| {
			Error::Internal(format!("Unsupported JWT algorithm: {}", settings.jwt_algorithm))
		})?;

		Ok(SessionTokens {
			secret: settings.secret_key.clone(),
			algorithm,
			expire_in_seconds: settings.jwt_expire_in_seconds,
			refresh_if_expiring_in_seconds: settings.jwt_refresh_if_expiring_in_seconds,
		})
	}

	/// Mints a token for the user. Reserved claim names in `extra` are
	/// dropped so loaders cannot clobber the token lifecycle fields.
	pub fn issue(&self, user: &User, mut extra: Map<String, Value>) -> TrResult<(String, SessionClaims)> {
		for reserved in ["sub", "roles", "exp", "iat"] {
			extra.remove(reserved);
		}

		let iat = Timestamp::now().0;
		let claims = SessionClaims {
			sub: user.id.clone(),
			roles: user.roles.clone(),
			exp: iat + self.expire_in_seconds,
			iat,
			extra,
		};
		let token = encode(
			&Header::new(self.algorithm),
			&claims,
			&EncodingKey::from_secret(self.secret.as_bytes()),
		)?;

		Ok((token, claims))
	}

	/// Validates signature and expiry. Any failure means "no user", not
	/// an error the caller has to special-case.
	pub fn decode(&self, token: &str) -> TrResult<SessionClaims> {
		let data = decode::<SessionClaims>(
			token,
			&DecodingKey::from_secret(self.secret.as_bytes()),
			&Validation::new(self.algorithm),
		)?;
		Ok(data.claims)
	}

	/// Whether remaining validity has dropped below the refresh threshold.
	pub fn needs_refresh(&self, claims: &SessionClaims) -> bool {
		claims.remaining_validity() < self.refresh_if_expiring_in_seconds
	}
}

fn decode_segment(segment: &str) -> TrResult<Map<String, Value>> {
	// Tokens minted by proxies are not always strict about the base64
	// alphabet and padding, so accept both common encodings.
	let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
		.decode(segment)
		.or_else(|_| base64::engine::general_purpose::STANDARD.decode(segment))
		.map_err(|err| Error::ValidationError(format!("malformed token segment: {}", err)))?;
	Ok(serde_json::from_slice(&bytes)?)
}

/// Decodes the header segment of a JWT without any verification, e.g.
/// to read the `kid` before the matching public key is known.
pub fn decode_jwt_header(token: &str) -> TrResult<Map<String, Value>> {
	let header = token
		.split('.')
		.next()
		.ok_or_else(|| Error::ValidationError("malformed token".to_string()))?;
	decode_segment(header)
}

/// Decodes the payload of a JWT without verifying its signature or
/// expiry. Only valid behind a trusted proxy that already validated the
/// token.
pub fn decode_unverified(token: &str) -> TrResult<Map<String, Value>> {
	let mut segments = token.split('.');
	let payload = segments
		.nth(1)
		.ok_or_else(|| Error::ValidationError("malformed token".to_string()))?;
	decode_segment(payload)
}


// vim: ts=4
