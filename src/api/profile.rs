//! Own profile endpoints.

use actix_web::{HttpResponse, web};
use tracing::{debug, warn};

use crate::auth::SessionAuth;
use crate::backend::Backend;
use crate::error::{AppError, AppResult};
use crate::models::{
    Profile, ProfilePatch, ProfileRole, ProfileSource, ProfileUpdateResponse, ProfileView,
    RowStatus, Session,
};
use crate::services::profiles::{
    ProfileSeed, RowPatch, find_member, reconcile_profile, update_profile,
};
use crate::store::RecordStore;

/// Fallback display name when neither the row nor the session has one.
const ANONYMOUS_MEMBER: &str = "Member";

/// Merge a profile row (if any) with the session's identity metadata.
///
/// Row fields win; session metadata fills the gaps.
pub fn profile_view(session: &Session, profile: Option<&Profile>) -> ProfileView {
    let metadata = &session.metadata;
    let display_name = profile
        .and_then(|p| p.username.clone())
        .or_else(|| metadata.full_name.clone())
        .or_else(|| session.email.clone())
        .unwrap_or_else(|| ANONYMOUS_MEMBER.to_string());

    let role = match profile {
        Some(p) => p.role,
        None => metadata
            .role
            .as_deref()
            .and_then(ProfileRole::parse)
            .unwrap_or_default(),
    };

    ProfileView {
        user_id: session.user_id.clone(),
        display_name,
        email: session.email.clone(),
        avatar_url: profile
            .and_then(|p| p.avatar_url.clone())
            .or_else(|| metadata.avatar_url.clone()),
        role,
        member_since: profile.and_then(|p| p.joined().map(str::to_string)),
        steam_id: metadata.steam_id.clone(),
        discord_username: metadata.discord_username.clone(),
        favorite_server: metadata.favorite_server.clone(),
        source: if profile.is_some() {
            ProfileSource::Store
        } else {
            ProfileSource::Session
        },
    }
}

/// Read the caller's row, degrading to session data on any failure.
async fn load_view(store: &dyn RecordStore, session: &Session) -> ProfileView {
    match find_member(store, &session.user_id).await {
        Ok(profile) => profile_view(session, profile.as_ref()),
        Err(err) => {
            debug!(user_id = %session.user_id, error = %err, "Serving session-only profile");
            profile_view(session, None)
        }
    }
}

/// Get the signed-in member's profile.
///
/// Creates the profile row on first visit when the table exists.
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Own profile", body = ProfileView),
        (status = 401, description = "Not signed in", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn get_profile(
    auth: SessionAuth,
    backend: web::Data<Backend>,
) -> AppResult<HttpResponse> {
    let session = auth.session;
    let store = backend.profiles(Some(&session));

    if let Err(err) = reconcile_profile(store.as_ref(), &ProfileSeed::from_session(&session)).await
    {
        warn!(user_id = %session.user_id, error = %err, "Could not ensure profile");
    }

    Ok(HttpResponse::Ok().json(load_view(store.as_ref(), &session).await))
}

/// Update the signed-in member's profile.
///
/// Identity metadata is always updated; the profile row is patched with the
/// fields its table can hold.
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Profile updated", body = ProfileUpdateResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorResponse),
        (status = 502, description = "Auth service refused the update", body = crate::error::ErrorResponse),
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn put_profile(
    auth: SessionAuth,
    backend: web::Data<Backend>,
    body: web::Json<ProfilePatch>,
) -> AppResult<HttpResponse> {
    let mut session = auth.session;
    let patch = body.into_inner();
    validate_patch(&patch)?;

    let store = backend.profiles(Some(&session));
    let identity = backend.identity();
    let outcome = update_profile(store.as_ref(), identity.as_ref(), &session, &patch).await?;

    // The token still carries the old metadata.
    session.metadata.merge(&patch.to_metadata());

    let (row_status, row_error) = match outcome.row {
        RowPatch::Applied => (RowStatus::Applied, None),
        RowPatch::Skipped => (RowStatus::Skipped, None),
        RowPatch::Failed(detail) => (RowStatus::Failed, Some(detail)),
    };

    Ok(HttpResponse::Ok().json(ProfileUpdateResponse {
        profile: load_view(store.as_ref(), &session).await,
        row_status,
        row_error,
    }))
}

fn validate_patch(patch: &ProfilePatch) -> AppResult<()> {
    if patch.to_metadata().is_empty() {
        return Err(AppError::InvalidInput(
            "Provide at least one profile field".to_string(),
        ));
    }
    if let Some(avatar) = patch.avatar_url.as_deref()
        && !avatar.is_empty()
        && !(avatar.starts_with("https://") || avatar.starts_with("http://"))
    {
        return Err(AppError::InvalidInput(
            "avatar_url must be an http(s) URL".to_string(),
        ));
    }
    Ok(())
}

/// Configure profile routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/profile")
            .route(web::get().to(get_profile))
            .route(web::put().to(put_profile)),
    );
}
