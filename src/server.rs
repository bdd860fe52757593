//! HTTP API server.
//!
//! Thin JSON layer over the core: handlers validate the request shape, call
//! the gateways through the service traits, and translate error kinds to
//! status codes. This module is the only place a [`RajniError`] kind becomes
//! an HTTP status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use rajni_core::{
    config::{ServerConfig, StoreConfig},
    context::{Context, Conversation, ConversationTurn},
    error::RajniError,
    prefs::{self, UserPreferences},
    profile,
    prompt::{build_system_prompt, BASE_INSTRUCTIONS},
    traits::{KeyedStore, Provider, SpeechService},
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::ChatSessions;

/// Voice payloads arrive base64-encoded in JSON; allow room for them.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared server state: the three service seams plus session tracking.
pub struct AppState {
    pub store: Arc<dyn KeyedStore>,
    pub provider: Arc<dyn Provider>,
    pub speech: Arc<dyn SpeechService>,
    pub tables: StoreConfig,
    pub sessions: ChatSessions,
    pub started_at: Instant,
}

type SharedState = Arc<AppState>;

/// Error kind to HTTP status, with the detail in the body.
struct ApiError(RajniError);

impl From<RajniError> for ApiError {
    fn from(err: RajniError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            RajniError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            RajniError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            RajniError::Store(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "store failure", "details": detail }),
            ),
            RajniError::Provider(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "provider failure", "details": detail }),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal error", "details": other.to_string() }),
            ),
        };
        if status.is_server_error() {
            warn!("request failed: {}", self.0);
        }
        (status, Json(body)).into_response()
    }
}

fn validation(msg: &str) -> ApiError {
    ApiError(RajniError::Validation(msg.to_string()))
}

/// Pull a non-empty `userKey` out of query params or a JSON body field.
fn require_user_key(value: Option<&str>) -> Result<&str, ApiError> {
    match value.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(validation("userKey is required")),
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/preferences", get(get_preferences).post(save_preferences))
        .route("/api/profiles", get(get_profile).post(save_profile))
        .route("/api/voice/process", post(voice_process))
        .route("/api/voice/transcribe", post(voice_transcribe))
        .route("/api/voice/synthesize", post(voice_synthesize))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: SharedState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("rajni API listening on {addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "rajni",
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn get_preferences(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let user_key = require_user_key(params.get("userKey").map(String::as_str))?;

    match state
        .store
        .fetch(&state.tables.preferences_table, user_key)
        .await?
    {
        Some(record) => Ok(Json(prefs::to_client_shape(&record))),
        None => Err(ApiError(RajniError::NotFound(
            "No preferences found for this user".to_string(),
        ))),
    }
}

async fn save_preferences(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let user_key = require_user_key(body.get("userKey").and_then(Value::as_str))?;
    let payload = match body.get("preferences") {
        Some(v) if v.is_object() => v,
        _ => return Err(validation("preferences object is required")),
    };

    let saved = state
        .store
        .upsert(
            &state.tables.preferences_table,
            user_key,
            prefs::to_storage_shape(payload),
        )
        .await?;

    Ok(Json(json!({
        "message": "Preferences saved successfully",
        "data": prefs::to_client_shape(&saved),
    })))
}

async fn get_profile(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let user_key = require_user_key(params.get("userKey").map(String::as_str))?;

    match state
        .store
        .fetch(&state.tables.profiles_table, user_key)
        .await?
    {
        Some(record) => Ok(Json(profile::to_client_shape(&record))),
        None => Err(ApiError(RajniError::NotFound(
            "Profile not found".to_string(),
        ))),
    }
}

async fn save_profile(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let user_key = require_user_key(body.get("userKey").and_then(Value::as_str))?;
    let payload = match body.get("profile") {
        Some(v) if v.is_object() => v,
        _ => return Err(validation("profile object is required")),
    };

    let saved = state
        .store
        .upsert(
            &state.tables.profiles_table,
            user_key,
            profile::to_storage_shape(payload),
        )
        .await?;

    Ok(Json(json!({
        "message": "Profile saved successfully",
        "data": profile::to_client_shape(&saved),
    })))
}

async fn voice_process(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if message.is_empty() {
        return Err(validation("No message provided"));
    }

    let user_key = body
        .get("userKey")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let session = user_key.unwrap_or("anonymous");

    // One in-flight turn per (session, message text). Double-submits of the
    // same text get a conflict, not a second completion.
    let Some(_guard) = state.sessions.begin(session, message) else {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({ "error": "duplicate message in flight" })),
        )
            .into_response());
    };

    let request_id = Uuid::new_v4();

    let history: Vec<ConversationTurn> = match body.get("conversation") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|_| {
            validation("conversation must be a list of {role, content} turns")
        })?,
    };
    let mut conversation = Conversation::from_turns(history);

    // Clients may or may not have already appended the message they are
    // sending; only append when it is not already the trailing user turn.
    let already_appended = conversation
        .last()
        .map(|t| t.role == "user" && t.content == message)
        .unwrap_or(false);
    if !already_appended {
        conversation.append(ConversationTurn::user(message));
    }

    // Personalization is best-effort: a missing record or an unreachable
    // store degrades to the bare system prompt.
    let preferences = match user_key {
        Some(key) => match state
            .store
            .fetch(&state.tables.preferences_table, key)
            .await
        {
            Ok(Some(record)) => Some(UserPreferences::from_record(&record)),
            Ok(None) => None,
            Err(e) => {
                warn!(%request_id, "preferences unavailable, continuing without: {e}");
                None
            }
        },
        None => None,
    };

    let system_prompt = build_system_prompt(BASE_INSTRUCTIONS, preferences.as_ref());
    let context = Context::from_conversation(system_prompt, &conversation);
    let reply = state.provider.complete(&context).await?;

    info!(%request_id, turns = context.turns.len(), "chat turn completed");
    Ok(Json(json!({ "response": reply })).into_response())
}

async fn voice_transcribe(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let encoded = body
        .get("audio")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if encoded.is_empty() {
        return Err(validation("No audio data provided"));
    }

    let audio = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| validation("audio must be base64-encoded"))?;

    let text = state.speech.transcribe(&audio).await?;
    Ok(Json(json!({ "text": text })))
}

async fn voice_synthesize(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if text.is_empty() {
        return Err(validation("No text provided"));
    }

    let audio = state.speech.synthesize(text).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    /// In-memory store keyed by (table, user key).
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<(String, String), Value>>,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl KeyedStore for MemoryStore {
        async fn fetch(&self, table: &str, key: &str) -> Result<Option<Value>, RajniError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.get(&(table.to_string(), key.to_string())).cloned())
        }

        async fn upsert(
            &self,
            table: &str,
            key: &str,
            record: Value,
        ) -> Result<Value, RajniError> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            let mut stored = record;
            if let Some(map) = stored.as_object_mut() {
                map.insert("user_id".to_string(), json!(key));
            }
            self.rows
                .lock()
                .unwrap()
                .insert((table.to_string(), key.to_string()), stored.clone());
            Ok(stored)
        }
    }

    /// Canned provider that records every context it sees.
    struct MockProvider {
        reply: String,
        calls: AtomicUsize,
        contexts: Mutex<Vec<Context>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                contexts: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(reply: &str, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(reply)
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, context: &Context) -> Result<String, RajniError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(context.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(self.reply.clone())
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    struct MockSpeech;

    #[async_trait]
    impl SpeechService for MockSpeech {
        async fn transcribe(&self, audio: &[u8]) -> Result<String, RajniError> {
            Ok(format!("heard {} bytes", audio.len()))
        }

        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, RajniError> {
            Ok(text.as_bytes().to_vec())
        }
    }

    struct Harness {
        app: Router,
        store: Arc<MemoryStore>,
        provider: Arc<MockProvider>,
    }

    fn harness_with_provider(provider: MockProvider) -> Harness {
        let store = Arc::new(MemoryStore::default());
        let provider = Arc::new(provider);
        let state = Arc::new(AppState {
            store: store.clone(),
            provider: provider.clone(),
            speech: Arc::new(MockSpeech),
            tables: StoreConfig::default(),
            sessions: ChatSessions::new(),
            started_at: Instant::now(),
        });
        Harness {
            app: build_router(state),
            store,
            provider,
        }
    }

    fn harness() -> Harness {
        harness_with_provider(MockProvider::new("On it!"))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let h = harness();
        let response = h.app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_preferences_requires_user_key() {
        let h = harness();
        let response = h.app.oneshot(get("/api/preferences")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "userKey is required");
    }

    #[tokio::test]
    async fn test_get_preferences_for_unseen_user_is_404_without_mutation() {
        let h = harness();
        let response = h
            .app
            .oneshot(get("/api/preferences?userKey=nobody"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No preferences found for this user");
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preferences_round_trip_fills_defaults() {
        let h = harness();
        let save = post_json(
            "/api/preferences",
            json!({
                "userKey": "user-1",
                "preferences": {
                    "groceryApps": ["BigBasket"],
                    "isVegetarian": 1,
                }
            }),
        );
        let response = h.app.clone().oneshot(save).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Preferences saved successfully");
        assert_eq!(body["data"]["groceryApps"], json!(["BigBasket"]));

        let response = h
            .app
            .oneshot(get("/api/preferences?userKey=user-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["groceryApps"], json!(["BigBasket"]));
        assert_eq!(body["isVegetarian"], json!(true));
        // Untouched fields come back as declared defaults, never absent.
        assert_eq!(body["foodApps"], json!([]));
        assert_eq!(body["homeLocation"], json!(""));
        assert_eq!(body["usualMealTimes"], json!({}));
    }

    #[tokio::test]
    async fn test_save_preferences_rejects_missing_payload() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json("/api/preferences", json!({ "userKey": "user-1" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "preferences object is required");
    }

    #[tokio::test]
    async fn test_profile_round_trip_applies_enum_and_nudge_defaults() {
        let h = harness();
        let save = post_json(
            "/api/profiles",
            json!({
                "userKey": "user-1",
                "profile": {
                    "fullName": "Asha Rao",
                    "aiPersonality": "professional",
                    "budgetLevel": "NONSENSE",
                }
            }),
        );
        let response = h.app.clone().oneshot(save).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h
            .app
            .oneshot(get("/api/profiles?userKey=user-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["fullName"], "Asha Rao");
        assert_eq!(body["aiPersonality"], "PROFESSIONAL");
        assert_eq!(body["budgetLevel"], "MEDIUM");
        assert_eq!(body["nudgePermission"], json!(true));
    }

    #[tokio::test]
    async fn test_get_profile_for_unseen_user_is_404() {
        let h = harness();
        let response = h
            .app
            .oneshot(get("/api/profiles?userKey=nobody"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Profile not found");
    }

    #[tokio::test]
    async fn test_voice_process_requires_message() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json("/api/voice/process", json!({ "message": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No message provided");
    }

    #[tokio::test]
    async fn test_voice_process_returns_provider_reply() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/process",
                json!({ "message": "book me a cab", "userKey": "user-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response"], "On it!");
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_voice_process_windows_history_to_last_five_turns() {
        let h = harness();
        let conversation: Vec<Value> = (0..8)
            .map(|i| {
                json!({
                    "role": if i % 2 == 0 { "user" } else { "assistant" },
                    "content": format!("msg {i}"),
                })
            })
            .collect();
        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/process",
                json!({ "message": "what next?", "conversation": conversation }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let contexts = h.provider.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 1);
        let turns = &contexts[0].turns;
        assert_eq!(turns.len(), 5);
        assert_eq!(turns.last().unwrap().content, "what next?");
        assert_eq!(turns[0].content, "msg 4");
    }

    #[tokio::test]
    async fn test_voice_process_personalizes_prompt_from_stored_preferences() {
        let h = harness();
        let save = post_json(
            "/api/preferences",
            json!({
                "userKey": "user-1",
                "preferences": { "homeLocation": "HSR Layout" }
            }),
        );
        h.app.clone().oneshot(save).await.unwrap();

        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/process",
                json!({ "message": "take me home", "userKey": "user-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let contexts = h.provider.contexts.lock().unwrap();
        let prompt = &contexts[0].system_prompt;
        assert!(prompt.contains("User Profile:"), "prompt was: {prompt}");
        assert!(prompt.contains("- Home: HSR Layout"));
    }

    #[tokio::test]
    async fn test_voice_process_without_user_key_uses_bare_prompt() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/process",
                json!({ "message": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let contexts = h.provider.contexts.lock().unwrap();
        assert!(!contexts[0].system_prompt.contains("User Profile:"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_in_flight_message_conflicts_once() {
        let gate = Arc::new(Notify::new());
        let h = harness_with_provider(MockProvider::gated("done", gate.clone()));

        let first_app = h.app.clone();
        let first = tokio::spawn(async move {
            first_app
                .oneshot(post_json(
                    "/api/voice/process",
                    json!({ "message": "book a cab", "userKey": "user-1" }),
                ))
                .await
                .unwrap()
        });

        // Let the first request reach the provider and park on the gate.
        while h.provider.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let second = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/voice/process",
                json!({ "message": "book a cab", "userKey": "user-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = body_json(second).await;
        assert_eq!(body["error"], "duplicate message in flight");

        gate.notify_waiters();
        let first = first.await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);

        // Slot released after completion: the same text goes through again.
        gate.notify_one();
        let retry = h
            .app
            .oneshot(post_json(
                "/api/voice/process",
                json!({ "message": "book a cab", "userKey": "user-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(retry.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_transcribe_requires_audio() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json("/api/voice/transcribe", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No audio data provided");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_invalid_base64() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/transcribe",
                json!({ "audio": "!!! not base64 !!!" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transcribe_decodes_and_returns_text() {
        let h = harness();
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"hello audio");
        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/transcribe",
                json!({ "audio": encoded }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["text"], "heard 11 bytes");
    }

    #[tokio::test]
    async fn test_synthesize_requires_text() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json("/api/voice/synthesize", json!({ "text": "" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No text provided");
    }

    #[tokio::test]
    async fn test_synthesize_streams_mpeg_audio() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/voice/synthesize",
                json!({ "text": "hello there" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "audio/mpeg"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello there");
    }
}
