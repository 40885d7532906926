use axum::{
  extract::{Path, Request, State},
  http::{HeaderValue, StatusCode},
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::coordination::CacheError;
use crate::service::NewsService;
use crate::types::{NewsFields, NewsRecord};

#[derive(Clone)]
pub struct AppState {
  pub service: NewsService,
}

/// Build the news API router
pub fn build_router(state: AppState) -> Router {
  Router::new()
    .route("/news", get(list_news).post(create_news))
    .route(
      "/news/{id}",
      get(get_news).put(update_news).delete(delete_news),
    )
    .route("/cache/stats", get(cache_stats))
    .route("/health", get(health_check))
    .layer(middleware::from_fn(worker_pid_header))
    .with_state(state)
}

/// Tag every response with the serving process, so load-balanced
/// instances can be told apart.
async fn worker_pid_header(req: Request, next: Next) -> Response {
  let pid = std::process::id();
  tracing::info!(pid, method = %req.method(), path = %req.uri().path(), "request");
  let mut response = next.run(req).await;
  response
    .headers_mut()
    .insert("x-worker-pid", HeaderValue::from(pid));
  response
}

async fn health_check() -> StatusCode {
  StatusCode::OK
}

async fn list_news(State(state): State<AppState>) -> Result<Response, AppError> {
  let (records, source) = state.service.list().await?;
  let mut response = Json(records).into_response();
  response
    .headers_mut()
    .insert("x-cache", HeaderValue::from_static(source.as_str()));
  Ok(response)
}

async fn get_news(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<NewsRecord>, AppError> {
  let id = parse_id(&id)?;
  match state.service.get(id).await? {
    Some(record) => Ok(Json(record)),
    None => Err(AppError::NotFound("News not found".into())),
  }
}

#[derive(Serialize)]
struct CreatedResponse {
  id: i64,
  message: &'static str,
}

#[derive(Serialize)]
struct MessageResponse {
  message: &'static str,
}

async fn create_news(
  State(state): State<AppState>,
  Json(fields): Json<NewsFields>,
) -> Result<Json<CreatedResponse>, AppError> {
  let id = state.service.create(fields).await?;
  Ok(Json(CreatedResponse {
    id,
    message: "News created",
  }))
}

async fn update_news(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(fields): Json<NewsFields>,
) -> Result<Json<MessageResponse>, AppError> {
  let id = parse_id(&id)?;
  if !state.service.update(id, fields).await? {
    return Err(AppError::NotFound("News not found".into()));
  }
  Ok(Json(MessageResponse {
    message: "News updated",
  }))
}

async fn delete_news(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
  let id = parse_id(&id)?;
  if !state.service.delete(id).await? {
    return Err(AppError::NotFound("News not found".into()));
  }
  Ok(Json(MessageResponse {
    message: "News deleted",
  }))
}

#[derive(Serialize)]
struct CacheStatsResponse {
  version: i64,
  hit_rate: f64,
  #[serde(flatten)]
  stats: CacheStats,
}

async fn cache_stats(State(state): State<AppState>) -> Result<Json<CacheStatsResponse>, AppError> {
  let version = state.service.coordinator().current_version().await?;
  let stats = state.service.cache().info().await;
  Ok(Json(CacheStatsResponse {
    version,
    hit_rate: stats.hit_rate(),
    stats,
  }))
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
  raw
    .parse()
    .map_err(|_| AppError::BadRequest("Invalid news id".into()))
}

pub enum AppError {
  Internal(anyhow::Error),
  NotFound(String),
  BadRequest(String),
}

impl From<CacheError> for AppError {
  fn from(e: CacheError) -> Self {
    Self::Internal(e.into())
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, msg) = match self {
      Self::Internal(e) => {
        tracing::error!(error = %format!("{:#}", e), "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "Internal Server Error".to_string(),
        )
      }
      Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
    };
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
  }
}
