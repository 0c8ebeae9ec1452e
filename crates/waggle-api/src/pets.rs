use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::{info, warn};
use uuid::Uuid;

use waggle_db::Database;
use waggle_db::models::PetRow;
use waggle_types::api::{ApiResponse, Claims, CreatePetRequest, PetResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users;

pub(crate) fn pet_response_blocking(db: &Database, row: PetRow) -> anyhow::Result<PetResponse> {
    let photo_ids = users::parse_id_list(db.photo_ids_for_pet(&row.id)?, "photo");

    Ok(PetResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Malformed pet id '{}': {}", row.id, e);
            Uuid::default()
        }),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Malformed user id '{}': {}", row.user_id, e);
            Uuid::default()
        }),
        name: row.name,
        species: row.species,
        age: row.age,
        gender: row.gender,
        photo_ids,
    })
}

/// POST /api/v1/users/pets — creating a pet also flips the owner's has_pet
/// flag on.
pub async fn create_pet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePetRequest>,
) -> ApiResult<Json<ApiResponse<PetResponse>>> {
    let CreatePetRequest {
        name,
        species,
        age,
        gender,
    } = req;
    let name = name.trim().to_string();
    let species = species.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Pet name must not be empty".to_string()));
    }
    if species.is_empty() {
        return Err(ApiError::Validation(
            "Pet species must not be empty".to_string(),
        ));
    }
    if age < 0 {
        return Err(ApiError::Validation(
            "Pet age must not be negative".to_string(),
        ));
    }

    let pet_id = Uuid::new_v4();
    let owner = claims.sub;
    let db = state.db.clone();
    let pet = tokio::task::spawn_blocking(move || -> ApiResult<PetResponse> {
        let owner_id = owner.to_string();
        if db.get_user_by_id(&owner_id)?.is_none() {
            return Err(ApiError::NotFound);
        }
        db.insert_pet(
            &pet_id.to_string(),
            &owner_id,
            &name,
            &species,
            age,
            gender.as_deref(),
        )?;
        db.set_user_has_pet(&owner_id, true)?;
        Ok(PetResponse {
            id: pet_id,
            user_id: owner,
            name,
            species,
            age,
            gender,
            photo_ids: Vec::new(),
        })
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    info!("Registered pet {} for {}", pet.id, owner);
    Ok(Json(ApiResponse::success(pet)))
}

/// GET /api/v1/users/pets
pub async fn list_pets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<PetResponse>>>> {
    let db = state.db.clone();
    let owner = claims.sub.to_string();
    let pets = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<PetResponse>> {
        db.pets_for_user(&owner)?
            .into_iter()
            .map(|row| pet_response_blocking(&db, row))
            .collect()
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(ApiResponse::success(pets)))
}

/// DELETE /api/v1/users/pets/{pet_id} — owner only. Photo blobs go first;
/// photo rows cascade with the pet row.
pub async fn delete_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let db = state.db.clone();
    let caller = claims.sub.to_string();
    let id = pet_id.to_string();
    let storage_ids = tokio::task::spawn_blocking(move || -> ApiResult<Vec<String>> {
        let pet = db.get_pet(&id)?.ok_or(ApiError::NotFound)?;
        if pet.user_id != caller {
            return Err(ApiError::Unauthorized);
        }
        Ok(db.storage_ids_for_pet(&id)?)
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
    let id = pet_id.to_string();
    tokio::task::spawn_blocking(move || db.delete_pet(&id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    info!("Deleted pet {} for {}", pet_id, claims.sub);
    Ok(Json(ApiResponse::success(())))
}
