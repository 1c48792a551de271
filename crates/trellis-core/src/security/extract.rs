//! Axum extractor for the request's resolved user.
//!
//! The auth gate resolves the user once per request and stores the
//! resolution in the request extensions; handlers pick it up through
//! this extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::prelude::*;
use crate::security::manager::Resolution;

/// The user resolved for the in-flight request.
#[derive(Clone)]
pub struct CurrentUser(pub Arc<Resolution>);

impl<S> FromRequestParts<S> for CurrentUser
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts.extensions.get::<CurrentUser>().cloned().ok_or(Error::Unauthorized)
	}
}

// vim: ts=4
