use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use axum_extra::typed_header::TypedHeaderRejection;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, warn};

use vitalis_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::extract::Caller;

/// Validates the bearer token, resolves it to a stored identity and attaches
/// that identity to the request. Nothing downstream runs on failure.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::Authentication("Missing bearer token".into()))?;

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Authentication("Invalid or expired token".into())
    })?
    .claims;

    let db = state.clone();
    let user_id = claims.sub;
    let identity = blocking(move || Ok(db.db.get_identity(&user_id)?))
        .await?
        .ok_or_else(|| {
            warn!("Token for unknown user {}", user_id);
            ApiError::Authentication("Invalid or expired token".into())
        })?;

    if identity.role() != claims.role {
        warn!("Token role mismatch for user {}", identity.id);
        return Err(ApiError::Authentication("Invalid or expired token".into()));
    }

    req.extensions_mut().insert(Caller(identity));
    Ok(next.run(req).await)
}
