use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use uuid::Uuid;

use super::server::AppState;

/// Passage preview length in the chat response, in characters.
const PREVIEW_CHARS: usize = 300;

const SUGGESTIONS: [&str; 8] = [
    "What plans do you offer?",
    "How is pricing calculated?",
    "Is support included with every plan?",
    "How do I reset my password?",
    "What is your refund policy?",
    "Can I export my data?",
    "How do I add team members?",
    "Is there an API available?",
];

#[derive(serde::Deserialize)]
pub(crate) struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(serde::Serialize)]
pub(crate) struct ChatResponse {
    answer: String,
    sources: Vec<SourceInfo>,
    session_id: Uuid,
}

#[derive(serde::Serialize)]
struct SourceInfo {
    source: String,
    chunk_index: usize,
    score: f32,
    preview: String,
}

#[derive(serde::Deserialize)]
pub(crate) struct ClearRequest {
    pub session_id: Uuid,
}

#[derive(serde::Serialize)]
struct ClearResponse {
    cleared: bool,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    index_ready: bool,
    passages: usize,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: &'static str,
}

pub(crate) async fn index_handler() -> impl IntoResponse {
    Html(include_str!("../ui/chat.html"))
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        index_ready: state.assistant.index_ready(),
        passages: state.assistant.passage_count().await,
    })
}

/// Answer a chat message. Assistant failures come back as status 200 with
/// the answer-shaped error string in `answer`, so the UI renders them like
/// any other reply.
pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> impl IntoResponse {
    if payload.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty",
            }),
        )
            .into_response();
    }

    let (session_id, session) = state.sessions.get_or_create(payload.session_id).await;
    let mut session = session.lock().await;

    match state.assistant.ask(&mut session, &payload.message).await {
        Ok(answer) => Json(ChatResponse {
            answer: answer.text,
            sources: answer
                .sources
                .iter()
                .map(|p| SourceInfo {
                    source: p.source.clone(),
                    chunk_index: p.chunk_index,
                    score: p.score,
                    preview: p.content.chars().take(PREVIEW_CHARS).collect(),
                })
                .collect(),
            session_id,
        })
        .into_response(),
        Err(err) => {
            tracing::warn!(session = %session_id, error = %err, "chat request failed");
            Json(ChatResponse {
                answer: err.user_message(),
                sources: Vec::new(),
                session_id,
            })
            .into_response()
        }
    }
}

pub(crate) async fn clear_handler(
    State(state): State<AppState>,
    Json(payload): Json<ClearRequest>,
) -> impl IntoResponse {
    state.sessions.clear(payload.session_id).await;
    Json(ClearResponse { cleared: true })
}

pub(crate) async fn suggestions_handler() -> impl IntoResponse {
    Json(SUGGESTIONS)
}
