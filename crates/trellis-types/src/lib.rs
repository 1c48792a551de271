//! Shared types, plugin traits, and core utilities for the Trellis scaffolding.
//!
//! This crate contains the foundational types that are shared between the
//! server crate and all plugin implementations. Extracting these into a
//! separate crate allows plugin crates to compile in parallel with the
//! server's feature modules.

pub mod error;
pub mod plugin;
pub mod prelude;
pub mod types;
pub mod user;
pub mod user_store;

// vim: ts=4
