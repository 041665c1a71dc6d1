//! HTTP request handlers
//!
//! Every mutating handler checks the actor's role, delegates to the
//! coordinator, and returns the post-mutation snapshot. Errors map to HTTP
//! status codes through the `Error` type.

use crate::api::server::AppContext;
use crate::auth::{self, AuthUser, Role};
use crate::db::tracks::{self, Track};
use crate::error::Result;
use crate::playback::PlaybackUpdate;
use crate::snapshot::Snapshot;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Roles allowed to mutate the queue
const QUEUE_ROLES: &[Role] = &[Role::Admin, Role::Host, Role::User];
/// Roles allowed to control playback
const PLAYBACK_ROLES: &[Role] = &[Role::Admin, Role::Host];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    access_token: String,
    token_type: String,
    role: Role,
    username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackSearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterTrackRequest {
    title: String,
    #[serde(default)]
    artist: String,
    filename: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    entry_id: Uuid,
    to_position: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "jukebox".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /auth/login - Exchange credentials for a bearer token
pub async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let role =
        auth::resolve_login(&ctx.db_pool, &ctx.config.auth, &req.username, &req.password).await?;
    let token = auth::issue_token(&req.username, role, &ctx.config.auth)?;
    info!("Login: {} as {}", req.username, role.as_str());

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        role,
        username: req.username,
    }))
}

/// GET /tracks - List the track catalog, optionally filtered
pub async fn list_tracks(
    State(ctx): State<AppContext>,
    Query(params): Query<TrackSearchParams>,
) -> Result<Json<Vec<Track>>> {
    let search = (!params.q.is_empty()).then_some(params.q.as_str());
    let tracks = tracks::list(&ctx.db_pool, search).await?;
    Ok(Json(tracks))
}

/// POST /tracks - Register track metadata (admin only)
///
/// Metadata only; media storage is handled elsewhere.
pub async fn register_track(
    State(ctx): State<AppContext>,
    user: AuthUser,
    Json(req): Json<RegisterTrackRequest>,
) -> Result<Json<Track>> {
    user.require(&[Role::Admin])?;

    let title = req.title.trim();
    let artist = req.artist.trim();
    let artist = if artist.is_empty() { "Unknown" } else { artist };
    let track = tracks::insert(&ctx.db_pool, title, artist, &req.filename, &req.mime_type).await?;
    info!("Registered track '{}' by '{}'", track.title, track.artist);
    Ok(Json(track))
}

/// DELETE /tracks/:track_id - Remove a track and its queue entries (admin only)
pub async fn delete_track(
    State(ctx): State<AppContext>,
    user: AuthUser,
    Path(track_id): Path<Uuid>,
) -> Result<Json<Snapshot>> {
    user.require(&[Role::Admin])?;
    let snapshot = ctx.coordinator.remove_track(track_id).await?;
    info!("Deleted track {}", track_id);
    Ok(Json(snapshot))
}

/// GET /queue - Current full state snapshot
pub async fn get_queue(State(ctx): State<AppContext>) -> Result<Json<Snapshot>> {
    Ok(Json(ctx.coordinator.current_snapshot().await?))
}

/// POST /queue/:id - Enqueue a track (rate limited per actor)
pub async fn add_to_queue(
    State(ctx): State<AppContext>,
    user: AuthUser,
    Path(track_id): Path<Uuid>,
) -> Result<Json<Snapshot>> {
    user.require(QUEUE_ROLES)?;
    let snapshot = ctx.coordinator.enqueue(track_id, &user.username).await?;
    info!("{} enqueued track {}", user.username, track_id);
    Ok(Json(snapshot))
}

/// DELETE /queue/:id - Remove a queue entry
pub async fn remove_queue_entry(
    State(ctx): State<AppContext>,
    user: AuthUser,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Snapshot>> {
    user.require(QUEUE_ROLES)?;
    let snapshot = ctx.coordinator.remove_entry(entry_id).await?;
    info!("{} removed queue entry {}", user.username, entry_id);
    Ok(Json(snapshot))
}

/// POST /queue/reorder - Move a queue entry to a new position
pub async fn reorder_queue(
    State(ctx): State<AppContext>,
    user: AuthUser,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Snapshot>> {
    user.require(QUEUE_ROLES)?;
    let snapshot = ctx
        .coordinator
        .reorder_entry(req.entry_id, req.to_position)
        .await?;
    info!(
        "{} moved queue entry {} toward position {}",
        user.username, req.entry_id, req.to_position
    );
    Ok(Json(snapshot))
}

/// PATCH /playback - Partial playback state update
pub async fn update_playback(
    State(ctx): State<AppContext>,
    user: AuthUser,
    Json(update): Json<PlaybackUpdate>,
) -> Result<Json<Snapshot>> {
    user.require(PLAYBACK_ROLES)?;
    let snapshot = ctx.coordinator.update_playback(update).await?;
    Ok(Json(snapshot))
}
