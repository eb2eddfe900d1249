//! Delicious Core - Shared domain types.
//!
//! This crate provides the types used across all Delicious components:
//! - `web` - The store directory web server
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Validation rules live here so that the server
//! and the CLI reject the same inputs.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, slugs, geographic points and validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
