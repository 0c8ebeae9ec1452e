use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use waggle_db::models::{MatchRow, MessageRow};
use waggle_types::api::{ApiResponse, Claims, MessageResponse, SendMessageRequest};
use waggle_types::time;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, AppStateInner};

/// Default page size for chat history.
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

fn counterpart(m: &MatchRow, caller: &str) -> Option<String> {
    if m.user_lo == caller {
        Some(m.user_hi.clone())
    } else if m.user_hi == caller {
        Some(m.user_lo.clone())
    } else {
        None
    }
}

pub(crate) fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Malformed message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        sender_id: row.sender_id.parse().unwrap_or_else(|e| {
            warn!("Malformed sender id '{}': {}", row.sender_id, e);
            Uuid::default()
        }),
        recipient_id: row.recipient_id.parse().unwrap_or_else(|e| {
            warn!("Malformed recipient id '{}': {}", row.recipient_id, e);
            Uuid::default()
        }),
        content: row.content,
        sent_at: time::parse_sqlite_datetime_lossy(
            &row.sent_at,
            &format!("message '{}'", row.id),
        ),
        read: row.read,
    }
}

/// POST /api/v1/messages — send into a match. The caller must be a member;
/// the recipient is the match counterpart.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let message = send_to_match(&state, claims.sub, req).await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn send_to_match(
    state: &AppStateInner,
    caller: Uuid,
    req: SendMessageRequest,
) -> ApiResult<MessageResponse> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation(
            "Message content must not be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let caller_id = caller.to_string();
    let match_id = req.match_id.to_string();
    let row = tokio::task::spawn_blocking(move || -> ApiResult<MessageRow> {
        let m = db.get_match(&match_id)?.ok_or(ApiError::NotFound)?;
        let recipient = counterpart(&m, &caller_id).ok_or(ApiError::Unauthorized)?;
        // Both sides must still exist; no row is written otherwise.
        if db.get_user_by_id(&caller_id)?.is_none() || db.get_user_by_id(&recipient)?.is_none() {
            return Err(ApiError::NotFound);
        }
        Ok(db.insert_message(
            &Uuid::new_v4().to_string(),
            &caller_id,
            &recipient,
            &content,
        )?)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let message = message_response(row);
    state
        .dispatcher
        .send_message_notification(message.recipient_id, &message)
        .await;

    Ok(message)
}

/// GET /api/v1/messages/{match_id}
pub async fn get_messages(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<MessageResponse>>>> {
    let messages = history_for_match(&state, claims.sub, match_id, params).await?;
    Ok(Json(ApiResponse::success(messages)))
}

/// Full pair history in ascending order, then offset/limit applied in memory.
pub async fn history_for_match(
    state: &AppStateInner,
    caller: Uuid,
    match_id: Uuid,
    params: HistoryParams,
) -> ApiResult<Vec<MessageResponse>> {
    let db = state.db.clone();
    let caller_id = caller.to_string();
    let id = match_id.to_string();
    let rows = tokio::task::spawn_blocking(move || -> ApiResult<Vec<MessageRow>> {
        let m = db.get_match(&id)?.ok_or(ApiError::NotFound)?;
        let other = counterpart(&m, &caller_id).ok_or(ApiError::Unauthorized)?;
        Ok(db.messages_between(&caller_id, &other)?)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(rows
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(message_response)
        .collect())
}

/// POST /api/v1/messages/{message_id}/read — recipient only.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<()>>> {
    mark_message_read(&state, claims.sub, message_id).await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn mark_message_read(
    state: &AppStateInner,
    caller: Uuid,
    message_id: Uuid,
) -> ApiResult<()> {
    let db = state.db.clone();
    let caller_id = caller.to_string();
    let id = message_id.to_string();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        let row = db.get_message(&id)?.ok_or(ApiError::NotFound)?;
        if row.recipient_id != caller_id {
            return Err(ApiError::Unauthorized);
        }
        db.mark_message_read(&id)?;
        Ok(())
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(lo: &str, hi: &str) -> MatchRow {
        MatchRow {
            id: Uuid::new_v4().to_string(),
            user_lo: lo.to_string(),
            user_hi: hi.to_string(),
            confirmed: true,
            created_at: "2026-08-25 10:30:00".to_string(),
        }
    }

    #[test]
    fn counterpart_resolves_members_only() {
        let m = pair("a", "b");
        assert_eq!(counterpart(&m, "a").as_deref(), Some("b"));
        assert_eq!(counterpart(&m, "b").as_deref(), Some("a"));
        assert_eq!(counterpart(&m, "c"), None);
    }
}
