//! Backend client tests against a mock HTTP server.
//!
//! Run with: cargo test --test backend_clients

mod gotrue;
mod rest_store;
