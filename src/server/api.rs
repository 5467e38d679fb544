use crate::agent::{ ChatError, ChatGateway };
use crate::history::PUBLIC_SESSION;
use crate::models::api::{ ChatReply, ChatRequest, ErrorResponse, HealthResponse, PhotosResponse };
use crate::photos::{ PhotoError, PhotoLister };
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ Path, State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::{ HeaderMap, StatusCode },
};
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::ServeDir;
use log::{ error, warn };

pub const SESSION_HEADER: &str = "x-session-id";

const EMPTY_MESSAGE_REPLY: &str = "Message vide.";
const NOT_CONFIGURED_REPLY: &str = "Désolé, l'IA n'est pas configurée.";
const PROVIDER_FAILURE_REPLY: &str = "Une erreur est survenue avec l'IA.";
const SERVER_ERROR: &str = "Erreur serveur";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
    pub photos: Arc<PhotoLister>,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, reply) = match &self {
            ChatError::EmptyMessage => (StatusCode::BAD_REQUEST, EMPTY_MESSAGE_REPLY),
            // degraded mode still answers 200 so the front-end shows the text
            ChatError::NotConfigured => (StatusCode::OK, NOT_CONFIGURED_REPLY),
            ChatError::History(_) | ChatError::Provider(_) => {
                error!("Chat request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, PROVIDER_FAILURE_REPLY)
            }
        };
        (status, Json(ChatReply { reply: reply.to_string() })).into_response()
    }
}

impl IntoResponse for PhotoError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: SERVER_ERROR.to_string() }),
        ).into_response()
    }
}

pub fn router(state: AppState, assets_dir: impl Into<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/api/photos/{category}", get(photos_handler))
        .route("/health", get(health_handler))
        .nest_service("/assets", ServeDir::new(assets_dir.into()))
        .layer(cors)
        .with_state(state)
}

fn session_id(request: &ChatRequest, headers: &HeaderMap) -> String {
    request.session_id
        .as_deref()
        .or_else(|| headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(PUBLIC_SESSION)
        .to_string()
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(body)) => ChatRequest::from_value(&body),
        Err(rejection) => {
            warn!("Unreadable chat body: {}", rejection);
            ChatRequest::default()
        }
    };
    let session = session_id(&request, &headers);
    let message = request.message.as_deref().unwrap_or_default();

    match state.gateway.reply(&session, message).await {
        Ok(reply) => Json(ChatReply { reply }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn photos_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<PhotosResponse>, PhotoError> {
    let images = state.photos.list(&category).await?;
    Ok(Json(PhotosResponse { images }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        chat_enabled: state.gateway.is_enabled(),
        sessions: state.gateway.history_store().session_count().await,
    })
}
