//! # HTTP Routes
//!
//! | Method | Path | Auth | Rate limited |
//! |--------|------|------|--------------|
//! | GET | `/health` | no | no |
//! | GET | `/metrics` | no | yes |
//! | GET | `/tournaments/:id/standings` | no | yes |
//! | GET | `/tournaments/:id/statistics` | no | yes |
//! | POST | `/tournaments/:id/recalculate` | bearer | yes |
//! | POST | `/matches` | bearer | yes |
//!
//! Read endpoints are read-through cached under the keys in
//! [`cache_keys`]. Layer order, outermost first: trace, timeout, request
//! metrics, authentication, rate limiting, handler.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        MatchedPath, Path, Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use shared_bus::{MatchCompleted, PublishOutcome};
use shared_types::{MatchResult, TournamentId};
use std::sync::Arc;
use tm_01_standings::{MatchResultSource, StandingsApi, StandingsError};
use tm_03_rate_limiter::{AuthenticatedUser, RateLimitLayer};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::auth::AuthLayer;
use super::error::ApiError;
use crate::adapters::cache_keys;
use crate::container::SubsystemContainer;

type AppState = Arc<SubsystemContainer>;

/// Full HTTP surface of the node.
pub fn router(node: AppState) -> Router {
    let api = Router::new()
        .route("/metrics", get(metrics))
        .route("/tournaments/:id/standings", get(standings))
        .route("/tournaments/:id/statistics", get(statistics))
        .route("/tournaments/:id/recalculate", post(recalculate))
        .route("/matches", post(record_match))
        .layer(RateLimitLayer::new(Arc::clone(&node.limiter)))
        .layer(AuthLayer::new(Arc::clone(&node.identity)));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&node),
            track_requests,
        ))
        .layer(TimeoutLayer::new(node.config.http.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn track_requests(State(node): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let response = next.run(req).await;
    node.metrics
        .record_http_request(&route, response.status().as_u16());
    response
}

fn tournament_id(path: Result<Path<u64>, PathRejection>) -> Result<TournamentId, ApiError> {
    path.map(|Path(id)| TournamentId(id))
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn require_user(user: Option<Extension<AuthenticatedUser>>) -> Result<AuthenticatedUser, ApiError> {
    user.map(|Extension(user)| user)
        .ok_or(ApiError::Unauthenticated)
}

async fn health(State(node): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": node.config.bus.service_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics(State(node): State<AppState>) -> Result<Response, ApiError> {
    node.refresh_metrics();
    let body = node
        .metrics
        .render()
        .map_err(|e| ApiError::Metrics(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

async fn standings(
    State(node): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = tournament_id(path)?;
    let service = Arc::clone(&node.standings);
    let rows = node
        .cache
        .remember(
            &cache_keys::standings_key(id),
            &cache_keys::standings_tags(id),
            None,
            move || async move { service.standings(id).await },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "tournament_id": id,
        "standings": rows,
    })))
}

async fn statistics(
    State(node): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = tournament_id(path)?;
    let service = Arc::clone(&node.standings);
    let stats = node
        .cache
        .remember(
            &cache_keys::statistics_key(id),
            &cache_keys::statistics_tags(id),
            Some(node.config.standings.statistics_ttl),
            move || async move { service.statistics(id).await },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "statistics": stats,
    })))
}

async fn recalculate(
    State(node): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(user)?;
    let id = tournament_id(path)?;
    let summary = node.standings.recalc_tournament(id).await?;
    info!(
        user = %user.id,
        tournament = %id,
        replayed = summary.matches_replayed,
        "standings recalculated on request"
    );
    Ok(Json(json!({
        "success": true,
        "summary": summary,
    })))
}

/// Record a result as history, then announce it; standings follow the event.
async fn record_match(
    State(node): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    body: Result<Json<MatchResult>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = require_user(user)?;
    let Json(result) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if result.home_team_id == result.away_team_id {
        return Err(StandingsError::SameTeam {
            match_id: result.match_id,
            team_id: result.home_team_id,
        }
        .into());
    }

    node.results.append(result.clone()).await?;
    let outcome = node.publisher.publish_event(&MatchCompleted(result.clone())).await;
    if let PublishOutcome::Failed { attempts, error } = &outcome {
        warn!(
            match_id = %result.match_id,
            tournament = %result.tournament_id,
            attempts,
            error = %error,
            "match recorded but not announced; recalculate to catch up"
        );
    } else {
        info!(
            user = %user.id,
            match_id = %result.match_id,
            tournament = %result.tournament_id,
            "match recorded"
        );
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "match_id": result.match_id,
            "published": outcome.is_accepted(),
        })),
    ))
}
