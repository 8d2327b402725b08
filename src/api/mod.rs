//! API endpoint modules.

pub mod admin;
pub mod health;
pub mod members;
pub mod openapi;
pub mod profile;

pub use admin::configure_routes as configure_admin_routes;
pub use health::configure_health_routes;
pub use members::configure_routes as configure_member_routes;
pub use openapi::ApiDoc;
pub use profile::configure_routes as configure_profile_routes;

use actix_web::web;

/// Every route under `/api/v1`.
pub fn configure_v1(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_profile_routes)
        .configure(configure_member_routes)
        .configure(configure_admin_routes);
}
