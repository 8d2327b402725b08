//! Admin endpoints.

use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::auth::{AdminKey, OptionalSession};
use crate::backend::Backend;
use crate::config::ADMIN_KEY_HEADER;
use crate::error::{AppError, AppResult};
use crate::models::{ProfileRole, RoleUpdateRequest, RoleUpdateResponse};
use crate::services::profiles::{assign_role, is_admin};

/// Who is performing an admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCaller {
    /// The bootstrap admin key.
    BootstrapKey,
    /// A signed-in member whose profile has the admin role.
    Member(String),
}

/// Resolve the caller of an admin route or fail with 401/403.
///
/// The bootstrap key is checked first so the first admin can be appointed
/// before any profile carries the role.
pub async fn authorize_admin(
    req: &HttpRequest,
    session: OptionalSession,
    admin_key: &AdminKey,
    backend: &Backend,
) -> AppResult<AdminCaller> {
    if let Some(provided) = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return if admin_key.verify(provided) {
            Ok(AdminCaller::BootstrapKey)
        } else {
            Err(AppError::Unauthorized("Invalid admin key".to_string()))
        };
    }

    let Some(session) = session.0 else {
        return Err(AppError::Unauthorized(
            "Sign in or provide the X-Admin-Key header".to_string(),
        ));
    };

    let store = backend.profiles(Some(&session));
    if is_admin(store.as_ref(), &session.user_id).await {
        Ok(AdminCaller::Member(session.user_id))
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}

/// Set a member's community role.
///
/// Backend failures are reported with their detail.
#[utoipa::path(
    put,
    path = "/api/v1/admin/members/{user_id}/role",
    tag = "Admin",
    params(
        ("user_id" = String, Path, description = "Member identity key")
    ),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role assigned", body = RoleUpdateResponse),
        (status = 400, description = "Unknown role", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Not an admin", body = crate::error::ErrorResponse),
        (status = 404, description = "No such member", body = crate::error::ErrorResponse),
        (status = 502, description = "Backend refused the change", body = crate::error::ErrorResponse),
        (status = 503, description = "Profile table does not exist", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer" = []),
        ("admin_key" = [])
    )
)]
pub async fn set_role(
    req: HttpRequest,
    session: OptionalSession,
    admin_key: web::Data<AdminKey>,
    backend: web::Data<Backend>,
    path: web::Path<String>,
    body: web::Json<RoleUpdateRequest>,
) -> AppResult<HttpResponse> {
    let caller = authorize_admin(&req, session, &admin_key, &backend).await?;

    let user_id = path.into_inner();
    let role = ProfileRole::parse(&body.role).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Unknown role '{}'. Use member, moderator or admin",
            body.role
        ))
    })?;

    let store = backend.admin_profiles();
    let identity = backend.identity();
    let assignment = assign_role(store.as_ref(), identity.as_ref(), &user_id, role)
        .await
        .map_err(AppError::admin)?;

    info!(caller = ?caller, user_id = %user_id, role = %role, "Member role changed");

    Ok(HttpResponse::Ok().json(RoleUpdateResponse {
        user_id: assignment.user_id,
        role: assignment.role,
        metadata_warning: assignment.metadata_error,
    }))
}

/// Configure admin routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/admin/members/{user_id}/role").route(web::put().to(set_role)));
}
