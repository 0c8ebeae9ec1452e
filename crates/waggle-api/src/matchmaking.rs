use axum::{Extension, Json, extract::State};
use tracing::{info, warn};
use uuid::Uuid;

use waggle_types::api::{ApiResponse, Claims, MatchResult, SwipeRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, AppStateInner};

/// POST /api/v1/matches — one swipe, evaluated atomically.
pub async fn swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SwipeRequest>,
) -> ApiResult<Json<ApiResponse<MatchResult>>> {
    let result = evaluate_swipe(&state, claims.sub, req).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Records the swipe and reports its match consequences. A confirmed match
/// notifies both parties through the gateway; delivery failure never rolls
/// the match back.
pub async fn evaluate_swipe(
    state: &AppStateInner,
    caller: Uuid,
    req: SwipeRequest,
) -> ApiResult<MatchResult> {
    if req.actor_id != caller {
        return Err(ApiError::Unauthorized);
    }
    if req.actor_id == req.target_id {
        return Err(ApiError::Validation("Cannot swipe on yourself".to_string()));
    }

    let db = state.db.clone();
    let swipe_id = Uuid::new_v4();
    let match_id = Uuid::new_v4();
    let actor = req.actor_id.to_string();
    let target = req.target_id.to_string();
    let liked = req.liked;
    let confirmed_id = tokio::task::spawn_blocking(move || -> ApiResult<Option<String>> {
        if db.get_user_by_id(&target)?.is_none() {
            return Err(ApiError::NotFound);
        }
        Ok(db.apply_swipe(
            &swipe_id.to_string(),
            &match_id.to_string(),
            &actor,
            &target,
            liked,
        )?)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let result = match confirmed_id {
        Some(raw) => MatchResult {
            match_id: Some(raw.parse().unwrap_or_else(|e| {
                warn!("Malformed match id '{}': {}", raw, e);
                Uuid::default()
            })),
            confirmed: true,
        },
        None => MatchResult {
            match_id: None,
            confirmed: false,
        },
    };

    if result.confirmed {
        info!(
            "Match confirmed between {} and {}",
            req.actor_id, req.target_id
        );
        state
            .dispatcher
            .send_match_notification(req.actor_id, req.target_id, &result)
            .await;
    }

    Ok(result)
}
