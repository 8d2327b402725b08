//! Actix-web extractors for session authentication.
//!
//! The access token is read from `Authorization: Bearer` first, then from the
//! cookie the site keeps it in. It is wrapped in `SecretString` immediately
//! and never logged.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};

use super::TokenVerifier;
use crate::config::ACCESS_TOKEN_COOKIE;
use crate::error::ErrorResponse;
use crate::models::Session;

/// Extract the access token from the request, if any.
fn extract_access_token(req: &HttpRequest) -> Option<SecretString> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer
        .or_else(|| {
            req.cookie(ACCESS_TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
        })
        .map(SecretString::from)
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl AuthError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

fn resolve_session(req: &HttpRequest) -> Result<Option<Session>, AuthError> {
    let Some(verifier) = req.app_data::<web::Data<TokenVerifier>>() else {
        return Err(AuthError::new("Internal configuration error"));
    };

    let Some(token) = extract_access_token(req) else {
        return Ok(None);
    };

    let claims = verifier.verify(token.expose_secret()).map_err(AuthError::new)?;
    if claims.sub.is_empty() {
        return Err(AuthError::new("Access token has no subject"));
    }

    Ok(Some(Session::from_claims(claims, token)))
}

/// Extractor that requires a signed-in user.
///
/// ```ignore
/// async fn handler(auth: SessionAuth) -> impl Responder {
///     // auth.session.user_id is the verified identity key
/// }
/// ```
pub struct SessionAuth {
    pub session: Session,
}

impl FromRequest for SessionAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match resolve_session(req) {
            Ok(Some(session)) => Ok(SessionAuth { session }),
            Ok(None) => Err(AuthError::new(
                "Missing access token. Sign in and provide an Authorization: Bearer header.",
            )),
            Err(e) => Err(e),
        })
    }
}

/// Extractor for routes that also accept anonymous callers.
///
/// A present but invalid token is still rejected.
pub struct OptionalSession(pub Option<Session>);

impl FromRequest for OptionalSession {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve_session(req).map(OptionalSession))
    }
}
