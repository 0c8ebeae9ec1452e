use axum::{Extension, Json, extract::State};
use tracing::warn;
use uuid::Uuid;

use waggle_types::api::{ApiResponse, Claims, MatchSummary};
use waggle_types::time;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::users;

/// GET /api/v1/matches — confirmed matches with the counterpart's public card.
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let db = state.db.clone();
    let caller = claims.sub.to_string();
    let summaries = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<MatchSummary>> {
        let rows = db.matches_for_user(&caller)?;
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let other = if row.user_lo == caller {
                &row.user_hi
            } else {
                &row.user_lo
            };
            let Some(user_row) = db.get_user_by_id(other)? else {
                warn!("Match {} references missing user {}", row.id, other);
                continue;
            };
            summaries.push(MatchSummary {
                id: row.id.parse().unwrap_or_else(|e| {
                    warn!("Malformed match id '{}': {}", row.id, e);
                    Uuid::default()
                }),
                confirmed: row.confirmed,
                created_at: time::parse_sqlite_datetime_lossy(
                    &row.created_at,
                    &format!("match '{}'", row.id),
                ),
                user: users::user_public_blocking(&db, &user_row)?,
            });
        }
        Ok(summaries)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(ApiResponse::success(summaries)))
}
