//! Member directory endpoints.

use actix_web::{HttpResponse, web};

use crate::backend::Backend;
use crate::error::{AppError, AppResult};
use crate::models::{MemberListResponse, MembersQuery, Profile};
use crate::services::profiles::{ProfileError, find_member, search_members};

/// List or search members.
///
/// Without `q` (or with a blank one) the newest members are listed. At most
/// 20 members are returned. `available` is false when the profile table does
/// not exist.
#[utoipa::path(
    get,
    path = "/api/v1/members",
    tag = "Members",
    params(
        ("q" = Option<String>, Query, description = "Name to search for")
    ),
    responses(
        (status = 200, description = "Members", body = MemberListResponse),
        (status = 502, description = "Profile backend error", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_members(
    backend: web::Data<Backend>,
    query: web::Query<MembersQuery>,
) -> AppResult<HttpResponse> {
    let store = backend.profiles(None);
    let q = query.into_inner().q.unwrap_or_default();

    let response = match search_members(store.as_ref(), backend.search_function(), &q).await {
        Ok(members) => MemberListResponse {
            members,
            available: true,
        },
        Err(ProfileError::StoreMissing) => MemberListResponse {
            members: Vec::new(),
            available: false,
        },
        Err(err) => return Err(err.into()),
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Get one member's profile.
#[utoipa::path(
    get,
    path = "/api/v1/members/{user_id}",
    tag = "Members",
    params(
        ("user_id" = String, Path, description = "Member identity key")
    ),
    responses(
        (status = 200, description = "Member profile", body = Profile),
        (status = 404, description = "No such member", body = crate::error::ErrorResponse),
        (status = 503, description = "Profile table does not exist", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_member(
    backend: web::Data<Backend>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let store = backend.profiles(None);

    match find_member(store.as_ref(), &user_id).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Err(AppError::NotFound(format!("Member {}", user_id))),
    }
}

/// Configure member routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/members").route(web::get().to(list_members)))
        .service(web::resource("/members/{user_id}").route(web::get().to(get_member)));
}
