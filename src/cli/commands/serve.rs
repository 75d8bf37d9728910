//! HTTP API server.
//!
//! Provides REST endpoints for ingestion, questions and store management.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::GlimtError;
use crate::models::{Video, VideoId};
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Glimt API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Ingest", "POST   /upload");
    Output::kv("Ask", "POST   /chat");
    Output::kv("List videos", "GET    /videos");
    Output::kv("Get video", "GET    /videos/{video_id}");
    Output::kv("Delete video", "DELETE /videos/{video_id}");
    Output::kv("Summary", "GET    /summary");
    Output::kv("Clear", "DELETE /highlights");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .route("/videos", get(list_videos))
        .route("/videos/{video_id}", get(get_video).delete(delete_video))
        .route("/summary", get(summary))
        .route("/highlights", delete(clear))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct UploadRequest {
    /// Local path of the video file
    path: String,
}

#[derive(Serialize)]
struct UploadResponse {
    video: Video,
    visual_highlights: usize,
    audio_highlights: usize,
    summary_stored: bool,
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    video_id: Option<VideoId>,
}

#[derive(Deserialize)]
struct ScopeQuery {
    #[serde(default)]
    video_id: Option<VideoId>,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<Video>,
    total: usize,
}

#[derive(Serialize)]
struct VideoDetailResponse {
    #[serde(flatten)]
    video: Video,
    highlight_count: usize,
}

#[derive(Serialize)]
struct SummaryResponse {
    video_id: VideoId,
    summary: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: GlimtError) -> Response {
    let status = match &e {
        GlimtError::VideoNotFound(_) => StatusCode::NOT_FOUND,
        GlimtError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload(State(state): State<Arc<AppState>>, Json(req): Json<UploadRequest>) -> Response {
    let path = Settings::expand_path(&req.path);
    match state.orchestrator.ingest(&path).await {
        Ok(report) => Json(UploadResponse {
            video: report.video,
            visual_highlights: report.visual_highlights,
            audio_highlights: report.audio_highlights,
            summary_stored: report.summary_stored,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    if req.query.trim().is_empty() {
        return error_response(GlimtError::InvalidInput("query must not be empty".to_string()));
    }

    match state.orchestrator.ask(&req.query, req.video_id).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_videos(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.list_videos().await {
        Ok(videos) => Json(VideoListResponse {
            total: videos.len(),
            videos,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_video(State(state): State<Arc<AppState>>, Path(video_id): Path<VideoId>) -> Response {
    match state.orchestrator.video_details(video_id).await {
        Ok(Some((video, highlight_count))) => Json(VideoDetailResponse {
            video,
            highlight_count,
        })
        .into_response(),
        Ok(None) => error_response(GlimtError::VideoNotFound(video_id.to_string())),
        Err(e) => error_response(e),
    }
}

async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<VideoId>,
) -> Response {
    match state.orchestrator.delete_video(video_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(GlimtError::VideoNotFound(video_id.to_string())),
        Err(e) => error_response(e),
    }
}

async fn summary(State(state): State<Arc<AppState>>, Query(scope): Query<ScopeQuery>) -> Response {
    match state.orchestrator.summary(scope.video_id).await {
        Ok(Some(summary)) => Json(SummaryResponse {
            video_id: summary.video_id,
            summary: summary.summary,
        })
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No summary available".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn clear(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.clear().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
