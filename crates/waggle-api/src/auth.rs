use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use waggle_types::api::{ApiResponse, AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::{ApiError, ApiResult};
use crate::middleware;
use crate::state::AppState;
use crate::users;

/// Issued tokens stay valid for seven days.
const TOKEN_TTL_DAYS: i64 = 7;

pub fn create_token(user_id: Uuid, name: &str) -> ApiResult<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp,
    };
    let secret = middleware::jwt_secret();
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("token encoding failed: {}", e))?;

    Ok(token)
}

/// POST /api/v1/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(ApiError::Validation("Name must not be empty".to_string()));
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::Validation(
            "Email address is not valid".to_string(),
        ));
    }
    if req.password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        // The UNIQUE(email) constraint is the arbiter; no separate existence
        // check, so two concurrent registrations cannot both pass it.
        if !db.create_user(&user_id.to_string(), &name, &email, &password_hash)? {
            return Err(ApiError::Conflict(
                "Email is already registered".to_string(),
            ));
        }
        Ok(())
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let user = users::load_user_private(&state, user_id).await?;
    let token = create_token(user_id, &user.name)?;
    info!("Registered user {} ({})", user.name, user_id);
    Ok(Json(ApiResponse::success(AuthResponse { user, token })))
}

/// POST /api/v1/users/login — one Unauthorized for both unknown email and bad
/// password, so the response does not reveal which.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let email = req.email.trim().to_lowercase();
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.get_user_by_email(&email))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??
        .ok_or(ApiError::Unauthorized)?;

    let parsed = PasswordHash::new(&row.password).map_err(|e| {
        anyhow::anyhow!("stored password hash for {} is unreadable: {}", row.email, e)
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(ApiError::Unauthorized);
    }

    let user_id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("user id '{}' is not a uuid: {}", row.id, e))?;
    let user = users::load_user_private(&state, user_id).await?;
    let token = create_token(user_id, &user.name)?;
    Ok(Json(ApiResponse::success(AuthResponse { user, token })))
}
