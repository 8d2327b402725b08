//! Business logic services.

pub mod profiles;
