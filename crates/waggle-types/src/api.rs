use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims carried by every bearer token, read by the REST middleware and
/// the WebSocket upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Response envelope --

/// Uniform response body. `status` is `"success"` or `"error"`; error bodies
/// carry `data: null` and a message, success bodies the reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserPrivate,
    pub token: String,
}

// -- Users --

/// Profile projection returned to its owner. `has_profile` is derived on the
/// way out (name, email and bio present plus the has_pet flag), never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrivate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub has_pet: bool,
    pub has_profile: bool,
    pub created_at: DateTime<Utc>,
    pub photo_ids: Vec<Uuid>,
    pub pet_ids: Vec<Uuid>,
}

/// Profile projection shown to other users. No email, no derived flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub has_pet: bool,
    pub photo_ids: Vec<Uuid>,
    pub pet_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub bio: Option<String>,
    pub has_pet: bool,
}

// -- Pets --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePetRequest {
    pub name: String,
    pub species: String,
    pub age: i64,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub species: String,
    pub age: i64,
    pub gender: Option<String>,
    pub photo_ids: Vec<Uuid>,
}

// -- Photos --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub user_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

// -- Swipes & matches --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwipeRequest {
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub liked: bool,
}

/// Outcome of one swipe evaluation. `match_id` is absent unless this swipe
/// confirmed a mutual match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: Option<Uuid>,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub id: Uuid,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub user: UserPublic,
}

// -- Discovery --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverCard {
    pub user: UserPublic,
    pub pet: Option<PetResponse>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub match_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}
