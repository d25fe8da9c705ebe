use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Form, Json, Router};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

mod auth;
mod completion;
mod config;
mod context;
mod directive;
mod error;
mod models;
mod store;
mod timeparse;

use auth::AuthClient;
use completion::{Completion, CompletionClient};
use config::Config;
use context::{assemble_context, build_prompt};
use directive::dispatch_completion;
use error::ApiError;
use models::{ChatForm, EventForm, NoteCreate, NoteUpdate};
use store::Store;
use timeparse::NaturalTimeParser;

type AppState = Arc<AppData>;

struct AppData {
    auth: AuthClient,
    store: Store,
    ai: CompletionClient,
    time_parser: NaturalTimeParser,
}

impl AppData {
    fn new(config: &Config) -> Self {
        let http = reqwest::Client::new();
        AppData {
            auth: AuthClient::new(http.clone(), config),
            store: Store::new(http.clone(), config),
            ai: CompletionClient::new(http, config),
            time_parser: NaturalTimeParser,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let app_state = AppState::new(AppData::new(&config));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/notes", post(create_note))
        .route("/notes", get(get_notes))
        .route("/notes/:id", put(update_note))
        .route("/notes/:id", delete(delete_note))
        .route("/events", post(create_event))
        .route("/events", get(get_events))
        .route("/events/:id", delete(delete_event))
        .route("/chat", post(chat))
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)) // 2MB limit
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    log::info!("Notepad server starting on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "Backend running successfully",
        "service": "Properties Dashboard API with AI",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_model": "Pollinations.ai text completion"
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn create_note(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<NoteCreate>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user = state.auth.verify(&headers).await?;

    let created = state
        .store
        .insert(
            "notes",
            &serde_json::json!({
                "title": req.title,
                "content": req.content,
                "status": req.status.as_str(),
                "user_id": user.id,
            }),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_notes(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let user = state.auth.verify(&headers).await?;

    let notes = state
        .store
        .select_by_owner("notes", user.id, "*", None, None)
        .await?;

    Ok(Json(notes))
}

async fn update_note(
    headers: HeaderMap,
    Path(note_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<NoteUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state.auth.verify(&headers).await?;

    let patch = req
        .to_patch()
        .ok_or(ApiError::Validation("No fields provided to update"))?;

    let updated = state
        .store
        .update_by_id_and_owner("notes", &note_id, user.id, &patch)
        .await?
        .ok_or(ApiError::NotFound("Note"))?;

    Ok(Json(updated))
}

async fn delete_note(
    headers: HeaderMap,
    Path(note_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state.auth.verify(&headers).await?;

    let deleted = state
        .store
        .delete_by_id_and_owner("notes", &note_id, user.id)
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Note"));
    }

    Ok(Json(serde_json::json!({"message": "Note deleted successfully"})))
}

async fn create_event(
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(req): Form<EventForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user = state.auth.verify(&headers).await?;

    let created = state
        .store
        .insert(
            "events",
            &serde_json::json!({
                "title": req.title,
                "description": req.description,
                "start_time": req.start_time,
                "end_time": req.end_time,
                "user_id": user.id,
            }),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_events(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let user = state.auth.verify(&headers).await?;

    let events = state
        .store
        .select_by_owner("events", user.id, "*", Some("start_time.asc"), None)
        .await?;

    Ok(Json(events))
}

async fn delete_event(
    headers: HeaderMap,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state.auth.verify(&headers).await?;

    let deleted = state
        .store
        .delete_by_id_and_owner("events", &event_id, user.id)
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Event"));
    }

    Ok(Json(serde_json::json!({"message": "Event deleted successfully"})))
}

// One chat turn: verify, assemble context, fetch a completion, then let the
// directive dispatcher decide between a plain reply and a single store write.
// AI failures degrade to a conversational reply; this endpoint never returns
// a 5xx for a downstream AI problem.
async fn chat(
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(req): Form<ChatForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state.auth.verify(&headers).await?;

    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty"));
    }

    let context = assemble_context(&state.store, user.id).await;
    let prompt = build_prompt(&context, message);

    let reply = match state.ai.complete(&prompt).await {
        Completion::Text(text) => {
            dispatch_completion(&text, user.id, &state.store, &state.time_parser, Utc::now())
                .await
        }
        Completion::Timeout => "⏱️ AI request timed out. Please try again.".to_string(),
        Completion::UpstreamError(status) => {
            format!("⚠️ AI Error ({}). Please try again.", status)
        }
        Completion::Transport(detail) => format!("❌ Error: {}", detail),
    };

    Ok(Json(serde_json::json!({"reply": reply})))
}
