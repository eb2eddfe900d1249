//! Delicious web server library.
//!
//! A store directory: people add stores with a photo, tags and a map
//! position, browse them by tag, search them by text or proximity, and heart
//! their favorites. The binary in `main.rs` wires this library to a
//! `PostgreSQL` pool; tests drive the same router on the in-memory backend.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
