use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use waggle_types::api::{ApiResponse, Claims, DiscoverCard};

use crate::error::ApiResult;
use crate::pets;
use crate::state::{AppState, AppStateInner};
use crate::users;

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverParams {
    pub max_distance_km: Option<u32>,
    pub preferred_pet_type: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// GET /api/v1/matches/discover
pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<DiscoverCard>>>> {
    let cards = discover_cards(&state, claims.sub, params).await?;
    Ok(Json(ApiResponse::success(cards)))
}

/// Builds the swipe deck: everyone not excluded by the caller's swipe history,
/// optionally narrowed to owners of a given pet species. Each card carries the
/// public profile and the first pet.
pub async fn discover_cards(
    state: &AppStateInner,
    caller: Uuid,
    params: DiscoverParams,
) -> ApiResult<Vec<DiscoverCard>> {
    // Profiles carry no verified coordinates, so the distance cap cannot
    // narrow the pool yet.
    if let Some(km) = params.max_distance_km {
        debug!("Ignoring max_distance_km={}", km);
    }

    let db = state.db.clone();
    let caller_id = caller.to_string();
    let reappear_days = state.reappear_days;
    let species = params.preferred_pet_type.clone();
    let cards = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<DiscoverCard>> {
        let excluded = db.excluded_target_ids(&caller_id, reappear_days)?;
        let candidates = db.discover_candidates(&caller_id, &excluded, species.as_deref())?;

        let mut cards = Vec::with_capacity(candidates.len());
        for row in candidates {
            let pet = db
                .pets_for_user(&row.id)?
                .into_iter()
                .next()
                .map(|first| pets::pet_response_blocking(&db, first))
                .transpose()?;
            cards.push(DiscoverCard {
                user: users::user_public_blocking(&db, &row)?,
                pet,
            });
        }
        Ok(cards)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    // Offset and limit are applied to the in-memory list after the detail
    // load, not pushed into SQL.
    let offset = params.offset.unwrap_or(0);
    let mut page: Vec<DiscoverCard> = cards.into_iter().skip(offset).collect();
    if let Some(limit) = params.limit {
        page.truncate(limit);
    }

    Ok(page)
}
