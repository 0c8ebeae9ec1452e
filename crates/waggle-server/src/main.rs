use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Query, State, WebSocketUpgrade},
    http::{HeaderMap, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use waggle_api::error::ApiError;
use waggle_api::middleware::require_auth;
use waggle_api::state::{AppState, AppStateInner};
use waggle_api::{auth, discover, matches, matchmaking, messages, pets, photos, users};
use waggle_gateway::connection;
use waggle_gateway::dispatcher::Dispatcher;
use waggle_storage::Storage;

// Multipart framing needs headroom over the 5 MB photo cap.
const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waggle=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("WAGGLE_DB_PATH").unwrap_or_else(|_| "waggle.db".into());
    let storage_dir =
        std::env::var("WAGGLE_STORAGE_DIR").unwrap_or_else(|_| "waggle-data".into());
    let host = std::env::var("WAGGLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WAGGLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let reappear_days: u32 = std::env::var("WAGGLE_REAPPEAR_DAYS")
        .unwrap_or_else(|_| "90".into())
        .parse()?;

    // Init database and blob storage
    let db = Arc::new(waggle_db::Database::open(&PathBuf::from(&db_path))?);
    let storage = Storage::new(PathBuf::from(&storage_dir)).await?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        dispatcher: Dispatcher::new(),
        reappear_days,
    });

    // Routes
    let public_routes = Router::new()
        .route("/api/v1/users/register", post(auth::register))
        .route("/api/v1/users/login", post(auth::login));

    let protected_routes = Router::new()
        .route(
            "/api/v1/users/me",
            get(users::me).delete(users::delete_account),
        )
        .route("/api/v1/users/profile", patch(users::update_profile))
        .route(
            "/api/v1/users/pets",
            post(pets::create_pet).get(pets::list_pets),
        )
        .route("/api/v1/users/pets/{pet_id}", delete(pets::delete_pet))
        .route(
            "/api/v1/matches",
            post(matchmaking::swipe).get(matches::list_matches),
        )
        .route("/api/v1/matches/discover", get(discover::discover))
        .route("/api/v1/messages", post(messages::send_message))
        .route("/api/v1/messages/{id}", get(messages::get_messages))
        .route("/api/v1/messages/{id}/read", post(messages::mark_read))
        .route("/api/v1/photos/user", post(photos::upload_user_photo))
        .route("/api/v1/photos/pets/{pet_id}", post(photos::upload_pet_photo))
        .route(
            "/api/v1/photos/{photo_id}",
            get(photos::get_photo).delete(photos::delete_photo),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(middleware::from_fn(require_auth));

    let ws_route = Router::new().route("/gateway", get(ws_upgrade));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Waggle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct GatewayParams {
    token: Option<String>,
}

/// Upgrades `/gateway` after validating the bearer token from the `token`
/// query parameter or the Authorization header.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<GatewayParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let token = params
        .token
        .or_else(|| bearer_token(&headers))
        .ok_or(ApiError::Unauthorized)?;
    let claims = waggle_api::middleware::decode_token(&token)?;

    let dispatcher = state.dispatcher.clone();
    let db = state.db.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, db, claims.sub, claims.name)
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}
