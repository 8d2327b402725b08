//! ClanHub server library.
//!
//! Schema-tolerant member profile synchronisation against a hosted
//! table/auth backend, plus the HTTP API the community site calls.

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
