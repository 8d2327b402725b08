//! Per-request logging middleware.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{ACCESS_TOKEN_COOKIE, ADMIN_KEY_HEADER};

/// How the caller identified itself. Never the credential itself.
fn credential_kind(req: &ServiceRequest) -> &'static str {
    let headers = req.headers();
    if headers.contains_key(ADMIN_KEY_HEADER) {
        "admin-key"
    } else if headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
    {
        "bearer"
    } else if req.cookie(ACCESS_TOKEN_COOKIE).is_some() {
        "cookie"
    } else {
        "none"
    }
}

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        let credential = credential_kind(&req);

        info!(
            target: "api",
            method = %method,
            path = %path,
            query = %req.query_string(),
            remote_addr = %remote_addr,
            credential,
            "→ Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let duration_ms = start.elapsed().as_millis() as u64;
            let status = res.status();

            if status.is_success() {
                info!(target: "api", method = %method, path = %path,
                    status = status.as_u16(), duration_ms, "← Request completed");
            } else if status.is_client_error() {
                warn!(target: "api", method = %method, path = %path,
                    status = status.as_u16(), duration_ms, "← Client error");
            } else {
                warn!(target: "api", method = %method, path = %path,
                    status = status.as_u16(), duration_ms, "← Server error");
            }

            Ok(res)
        })
    }
}
