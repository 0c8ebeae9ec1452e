use axum::{Extension, Json, extract::State};
use tracing::{info, warn};
use uuid::Uuid;

use waggle_db::Database;
use waggle_db::models::UserRow;
use waggle_types::api::{
    ApiResponse, AuthResponse, Claims, UpdateProfileRequest, UserPrivate, UserPublic,
};
use waggle_types::time;

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, AppStateInner};

// -- Projections --

/// A profile counts as complete once name, email and bio are filled in and the
/// user has flagged pet ownership. Derived on the way out, never stored.
fn profile_complete(row: &UserRow) -> bool {
    !row.name.trim().is_empty()
        && !row.email.trim().is_empty()
        && row.bio.as_deref().is_some_and(|bio| !bio.trim().is_empty())
        && row.has_pet
}

pub(crate) fn parse_id_list(raw: Vec<String>, context: &str) -> Vec<Uuid> {
    raw.into_iter()
        .filter_map(|id| match id.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed {} id '{}': {}", context, id, e);
                None
            }
        })
        .collect()
}

/// Builds the owner-facing projection. Runs follow-up queries, so callers keep
/// it on a blocking thread.
pub(crate) fn user_private_blocking(db: &Database, row: &UserRow) -> anyhow::Result<UserPrivate> {
    let photo_ids = parse_id_list(db.photo_ids_for_user(&row.id)?, "photo");
    let pet_ids = parse_id_list(
        db.pets_for_user(&row.id)?
            .into_iter()
            .map(|pet| pet.id)
            .collect(),
        "pet",
    );

    Ok(UserPrivate {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Malformed user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        name: row.name.clone(),
        email: row.email.clone(),
        bio: row.bio.clone(),
        has_pet: row.has_pet,
        has_profile: profile_complete(row),
        created_at: time::parse_sqlite_datetime_lossy(
            &row.created_at,
            &format!("user '{}'", row.id),
        ),
        photo_ids,
        pet_ids,
    })
}

/// Same as [`user_private_blocking`] minus the owner-only fields.
pub(crate) fn user_public_blocking(db: &Database, row: &UserRow) -> anyhow::Result<UserPublic> {
    let photo_ids = parse_id_list(db.photo_ids_for_user(&row.id)?, "photo");
    let pet_ids = parse_id_list(
        db.pets_for_user(&row.id)?
            .into_iter()
            .map(|pet| pet.id)
            .collect(),
        "pet",
    );

    Ok(UserPublic {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Malformed user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        name: row.name.clone(),
        bio: row.bio.clone(),
        has_pet: row.has_pet,
        photo_ids,
        pet_ids,
    })
}

pub async fn load_user_private(state: &AppStateInner, user_id: Uuid) -> ApiResult<UserPrivate> {
    let db = state.db.clone();
    let id = user_id.to_string();
    let user = tokio::task::spawn_blocking(move || -> ApiResult<UserPrivate> {
        let row = db.get_user_by_id(&id)?.ok_or(ApiError::NotFound)?;
        Ok(user_private_blocking(&db, &row)?)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(user)
}

// -- Handlers --

/// GET /api/v1/users/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<UserPrivate>>> {
    let user = load_user_private(&state, claims.sub).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PATCH /api/v1/users/profile — replaces the editable fields and issues a
/// fresh token so clients can swap it in immediately.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let UpdateProfileRequest { name, bio, has_pet } = req;
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Name must not be empty".to_string()));
    }

    let db = state.db.clone();
    let id = claims.sub.to_string();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        if db.get_user_by_id(&id)?.is_none() {
            return Err(ApiError::NotFound);
        }
        db.update_user_profile(&id, &name, bio.as_deref(), has_pet)?;
        Ok(())
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let user = load_user_private(&state, claims.sub).await?;
    let token = auth::create_token(user.id, &user.name)?;
    Ok(Json(ApiResponse::success(AuthResponse { user, token })))
}

/// DELETE /api/v1/users/me — blobs first, then the row; everything else goes
/// via FK cascade.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let db = state.db.clone();
    let id = claims.sub.to_string();
    let storage_ids = tokio::task::spawn_blocking(move || -> ApiResult<Vec<String>> {
        if db.get_user_by_id(&id)?.is_none() {
            return Err(ApiError::NotFound);
        }
        Ok(db.storage_ids_for_user(&id)?)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    for raw in storage_ids {
        match raw.parse::<Uuid>() {
            Ok(storage_id) => state.storage.delete(storage_id).await?,
            Err(e) => warn!("Skipping malformed storage id '{}': {}", raw, e),
        }
    }

    let db = state.db.clone();
    let id = claims.sub.to_string();
    tokio::task::spawn_blocking(move || db.delete_user(&id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    info!("Deleted account {}", claims.sub);
    Ok(Json(ApiResponse::success(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, email: &str, bio: Option<&str>, has_pet: bool) -> UserRow {
        UserRow {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
            bio: bio.map(str::to_string),
            has_pet,
            created_at: "2026-08-25 10:30:00".to_string(),
        }
    }

    #[test]
    fn profile_complete_needs_every_field() {
        assert!(profile_complete(&row(
            "Ada",
            "ada@example.com",
            Some("loves dogs"),
            true
        )));
        assert!(!profile_complete(&row(
            "Ada",
            "ada@example.com",
            None,
            true
        )));
        assert!(!profile_complete(&row("Ada", "ada@example.com", Some("  "), true)));
        assert!(!profile_complete(&row(
            "Ada",
            "ada@example.com",
            Some("loves dogs"),
            false
        )));
        assert!(!profile_complete(&row("", "ada@example.com", Some("bio"), true)));
    }

    #[test]
    fn parse_id_list_drops_garbage() {
        let good = Uuid::new_v4();
        let ids = parse_id_list(vec![good.to_string(), "not-a-uuid".to_string()], "photo");
        assert_eq!(ids, vec![good]);
    }
}
