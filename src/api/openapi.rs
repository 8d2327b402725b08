//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ClanHub Server",
        version = "0.3.0",
        description = "Member profiles and directory for the clan community site"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        api::health::info,
        // Profile endpoints
        api::profile::get_profile,
        api::profile::put_profile,
        // Member directory
        api::members::list_members,
        api::members::get_member,
        // Admin
        api::admin::set_role,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::health::ServerInfoResponse,
            // Profiles
            models::ProfileRole,
            models::ProfileSource,
            models::Profile,
            models::ProfileView,
            models::ProfilePatch,
            models::RowStatus,
            models::ProfileUpdateResponse,
            models::MemberListResponse,
            models::RoleUpdateRequest,
            models::RoleUpdateResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Profile", description = "The signed-in member's own profile"),
        (name = "Members", description = "Member directory"),
        (name = "Admin", description = "Role management")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add bearer token and admin key security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Admin-Key"))),
            );
        }
    }
}
