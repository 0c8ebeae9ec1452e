use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use waggle_db::Database;
use waggle_db::models::PhotoRow;
use waggle_types::api::{ApiResponse, Claims, PhotoResponse};
use waggle_types::time;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, AppStateInner};

/// 5 MB upload limit for photos.
const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

/// Subject of an upload: the caller's own profile or one of their pets.
#[derive(Debug, Clone, Copy)]
pub enum PhotoOwner {
    User(Uuid),
    Pet(Uuid),
}

pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn parse_opt(raw: Option<&str>, context: &str) -> Option<Uuid> {
    raw.and_then(|id| match id.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Malformed {} id '{}': {}", context, id, e);
            None
        }
    })
}

pub(crate) fn photo_response(row: PhotoRow) -> PhotoResponse {
    PhotoResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Malformed photo id '{}': {}", row.id, e);
            Uuid::default()
        }),
        file_name: row.file_name,
        content_type: row.content_type,
        user_id: parse_opt(row.user_id.as_deref(), "user"),
        pet_id: parse_opt(row.pet_id.as_deref(), "pet"),
        uploaded_at: time::parse_sqlite_datetime_lossy(
            &row.uploaded_at,
            &format!("photo '{}'", row.id),
        ),
    }
}

/// POST /api/v1/photos/user — multipart body with a single `file` field.
pub async fn upload_user_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<PhotoResponse>>> {
    let upload = read_photo_field(multipart).await?;
    let photo = store_photo(&state, claims.sub, PhotoOwner::User(claims.sub), upload).await?;
    Ok(Json(ApiResponse::success(photo)))
}

/// POST /api/v1/photos/pets/{pet_id} — as above, for a pet the caller owns.
pub async fn upload_pet_photo(
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<PhotoResponse>>> {
    let upload = read_photo_field(multipart).await?;
    let photo = store_photo(&state, claims.sub, PhotoOwner::Pet(pet_id), upload).await?;
    Ok(Json(ApiResponse::success(photo)))
}

/// Pulls the `file` field out of the multipart body; validation happens in
/// [`store_photo`].
async fn read_photo_field(mut multipart: Multipart) -> ApiResult<PhotoUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field.content_type().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Could not read upload: {}", e)))?;

        return Ok(PhotoUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::Validation(
        "Multipart field 'file' is required".to_string(),
    ))
}

/// Validates the upload, writes the blob, then the photo row. Pet uploads
/// require ownership of the pet before anything is stored.
pub async fn store_photo(
    state: &AppStateInner,
    caller: Uuid,
    owner: PhotoOwner,
    upload: PhotoUpload,
) -> ApiResult<PhotoResponse> {
    if upload.content_type != "image/jpeg" && upload.content_type != "image/png" {
        return Err(ApiError::Validation(
            "Only JPEG and PNG photos are accepted".to_string(),
        ));
    }
    if upload.bytes.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".to_string()));
    }
    if upload.bytes.len() > MAX_PHOTO_SIZE {
        return Err(ApiError::Validation(
            "Photo exceeds the 5 MB limit".to_string(),
        ));
    }

    if let PhotoOwner::Pet(pet_id) = owner {
        let db = state.db.clone();
        let id = pet_id.to_string();
        let caller_id = caller.to_string();
        tokio::task::spawn_blocking(move || -> ApiResult<()> {
            let pet = db.get_pet(&id)?.ok_or(ApiError::NotFound)?;
            if pet.user_id != caller_id {
                return Err(ApiError::Unauthorized);
            }
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;
    }

    let storage_id = state.storage.put(&upload.bytes).await?;
    let size = upload.bytes.len();

    let photo_id = Uuid::new_v4();
    let db = state.db.clone();
    let (user_id, pet_id) = match owner {
        PhotoOwner::User(id) => (Some(id), None),
        PhotoOwner::Pet(id) => (None, Some(id)),
    };
    let PhotoUpload {
        file_name,
        content_type,
        ..
    } = upload;
    let row = tokio::task::spawn_blocking(move || -> anyhow::Result<PhotoRow> {
        let user_param = user_id.map(|id| id.to_string());
        let pet_param = pet_id.map(|id| id.to_string());
        db.insert_photo(
            &photo_id.to_string(),
            &file_name,
            &content_type,
            &storage_id.to_string(),
            user_param.as_deref(),
            pet_param.as_deref(),
        )?;
        db.get_photo(&photo_id.to_string())?
            .ok_or_else(|| anyhow::anyhow!("photo {} vanished after insert", photo_id))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    info!("Stored photo {} ({} bytes)", photo_id, size);
    Ok(photo_response(row))
}

/// A photo is visible to its subject's owner, to anyone holding a confirmed
/// match with the subject, and to anyone the subject currently appears to in
/// discovery.
fn photo_visible_blocking(
    db: &Database,
    caller: &str,
    row: &PhotoRow,
    reappear_days: u32,
) -> anyhow::Result<bool> {
    let subject = match (&row.user_id, &row.pet_id) {
        (Some(user_id), _) => user_id.clone(),
        (None, Some(pet_id)) => match db.get_pet(pet_id)? {
            Some(pet) => pet.user_id,
            None => return Ok(false),
        },
        (None, None) => return Ok(false),
    };

    if subject == caller {
        return Ok(true);
    }
    if db.confirmed_match_exists(caller, &subject)? {
        return Ok(true);
    }

    let excluded = db.excluded_target_ids(caller, reappear_days)?;
    Ok(!excluded.contains(&subject))
}

/// GET /api/v1/photos/{photo_id} — raw image bytes with the stored content
/// type, no envelope.
pub async fn get_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type) = fetch_photo(&state, claims.sub, photo_id).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

pub async fn fetch_photo(
    state: &AppStateInner,
    caller: Uuid,
    photo_id: Uuid,
) -> ApiResult<(Vec<u8>, String)> {
    let db = state.db.clone();
    let caller_id = caller.to_string();
    let id = photo_id.to_string();
    let reappear_days = state.reappear_days;
    let row = tokio::task::spawn_blocking(move || -> ApiResult<PhotoRow> {
        let row = db.get_photo(&id)?.ok_or(ApiError::NotFound)?;
        if !photo_visible_blocking(&db, &caller_id, &row, reappear_days)? {
            return Err(ApiError::Unauthorized);
        }
        Ok(row)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let storage_id = row.storage_id.parse::<Uuid>().map_err(|e| {
        anyhow::anyhow!(
            "photo {} has malformed storage id '{}': {}",
            row.id,
            row.storage_id,
            e
        )
    })?;
    let bytes = state.storage.get(storage_id).await?;

    Ok((bytes, row.content_type))
}

/// DELETE /api/v1/photos/{photo_id} — owner (or pet owner) only; blob first,
/// then the row.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<()>>> {
    remove_photo(&state, claims.sub, photo_id).await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn remove_photo(state: &AppStateInner, caller: Uuid, photo_id: Uuid) -> ApiResult<()> {
    let db = state.db.clone();
    let caller_id = caller.to_string();
    let id = photo_id.to_string();
    let row = tokio::task::spawn_blocking(move || -> ApiResult<PhotoRow> {
        let row = db.get_photo(&id)?.ok_or(ApiError::NotFound)?;
        let owned = match (&row.user_id, &row.pet_id) {
            (Some(user_id), _) => user_id == &caller_id,
            (None, Some(pet_id)) => db
                .get_pet(pet_id)?
                .is_some_and(|pet| pet.user_id == caller_id),
            (None, None) => false,
        };
        if !owned {
            return Err(ApiError::Unauthorized);
        }
        Ok(row)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    match row.storage_id.parse::<Uuid>() {
        Ok(storage_id) => state.storage.delete(storage_id).await?,
        Err(e) => warn!(
            "Photo {} has malformed storage id '{}': {}",
            row.id, row.storage_id, e
        ),
    }

    let db = state.db.clone();
    let id = photo_id.to_string();
    tokio::task::spawn_blocking(move || db.delete_photo(&id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(())
}
