use axum::{extract::Request, middleware::Next, response::Response};
use jsonwebtoken::{DecodingKey, Validation, decode};

use waggle_types::api::Claims;

use crate::error::ApiError;

/// Signing secret for access tokens. Shared by token creation, the REST
/// middleware and the gateway upgrade.
pub fn jwt_secret() -> String {
    std::env::var("WAGGLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string())
}

pub fn decode_token(token: &str) -> Result<Claims, ApiError> {
    let secret = jwt_secret();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

/// Validates the `Authorization: Bearer <token>` header and stashes the
/// decoded claims in request extensions for the handler.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(token)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
