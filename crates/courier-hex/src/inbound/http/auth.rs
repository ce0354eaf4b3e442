use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use courier_types::ports::store::CourierStore;

use super::server::AppState;
use crate::errors::AppError;

/// Verified caller, inserted into request extensions by [`require_identity`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub email: String,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_identity<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized access".into()))?;
    let identity = state.identity.verify(&token).await?;
    tracing::debug!(email = %identity.email, "identity verified");
    req.extensions_mut().insert(Principal {
        email: identity.email,
    });
    Ok(next.run(req).await)
}

/// Must run inside [`require_identity`].
pub async fn require_admin<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Unauthorized access".into()))?;
    if !state.users.is_admin(&principal.email).await? {
        tracing::warn!(email = %principal.email, path = %req.uri().path(), "admin route refused");
        return Err(AppError::Forbidden("Forbidden access".into()));
    }
    Ok(next.run(req).await)
}
