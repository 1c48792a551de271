//! Trellis is the extensible backend scaffolding of a web-application
//! framework.
//!
//! # Features
//!
//! - Plugin discovery and registration
//!		- typed extension points (`user_store`, `router`, hooks)
//!		- pattern-based disable rules for plugins and extensions
//!	- Settings composition
//!		- built-in defaults, plugin fragments, workspace file, environment
//!		- JSON-aware environment overlay with nested paths
//!	- Pluggable authentication
//!		- ordered user-store chain (credential, no-auth, reverse-proxy,
//!		  OAuth2 header stores)
//!		- signed session tokens with sliding refresh
//!		- path-based exemptions enforced once per application

#![forbid(unsafe_code)]

pub mod app;
pub mod bootstrap;
pub mod builtin;
pub mod handler;
pub mod prelude;
pub mod routes;

pub use crate::app::{App, AppState};
pub use crate::bootstrap::{ServerOpts, build_app};

// vim: ts=4
