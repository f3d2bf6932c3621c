//! HTTP server for the card store and review scheduler.
//!
//! Routes:
//! - `GET    /health`
//! - `POST   /cards`              create a card from `{front, back}`
//! - `GET    /cards`              `{total, cards}`
//! - `GET    /cards/due`          cards due now
//! - `GET    /cards/{id}`
//! - `POST   /cards/{id}/review`  record `{outcome: "correct" | "incorrect"}` or `{correct: bool}`
//! - `DELETE /cards/{id}`
//! - `GET    /stats`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

use crate::config::{ConfigError, ServerConfig};
use crate::flashcards::algorithm::describe_interval;
use crate::flashcards::{Card, CardStore, CardStoreError, Outcome, StoreStats};

/// Server state shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CardStore>,
}

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Card not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CardStoreError> for ApiError {
    fn from(err: CardStoreError) -> Self {
        match err {
            CardStoreError::CardNotFound(id) => Self::NotFound(id.to_string()),
            CardStoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Create card request.
#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
}

/// Review request. Accepts `{"outcome": "correct"}` or `{"correct": true}`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub outcome: Option<Outcome>,
    pub correct: Option<bool>,
}

impl ReviewRequest {
    pub fn outcome(&self) -> ApiResult<Outcome> {
        match (self.outcome, self.correct) {
            (Some(outcome), None) => Ok(outcome),
            (None, Some(correct)) => Ok(Outcome::from_correct(correct)),
            (Some(outcome), Some(correct)) if outcome == Outcome::from_correct(correct) => Ok(outcome),
            (Some(_), Some(_)) => Err(ApiError::InvalidInput(
                "outcome and correct disagree".to_string(),
            )),
            (None, None) => Err(ApiError::InvalidInput("missing field `outcome`".to_string())),
        }
    }
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Card listing response.
#[derive(Serialize)]
pub struct CardListResponse {
    pub total: usize,
    pub cards: Vec<Card>,
}

/// Review response.
#[derive(Serialize)]
pub struct ReviewResponse {
    pub interval_days: u32,
    pub next_due_at: DateTime<Utc>,
    pub next_review_in: String,
    pub card: Card,
}

/// Delete response.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: Uuid,
}

/// Run a store call on the blocking pool; mutations may write the snapshot file.
async fn with_store<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&CardStore) -> Result<T, CardStoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Any id that is not a UUID cannot name a stored card.
fn parse_card_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(raw.to_string()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn create_card(
    State(state): State<AppState>,
    payload: Result<Json<CreateCardRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let Json(request) = payload?;
    let card = with_store(&state, move |store| store.create(request.front, request.back)).await?;
    log::info!("Created card {}", card.id);
    Ok((StatusCode::CREATED, Json(card)))
}

async fn list_cards(State(state): State<AppState>) -> Json<CardListResponse> {
    let cards = state.store.list_all();
    Json(CardListResponse {
        total: cards.len(),
        cards,
    })
}

async fn due_cards(State(state): State<AppState>) -> Json<Vec<Card>> {
    Json(state.store.due(Utc::now()))
}

async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Card>> {
    let id = parse_card_id(&id)?;
    Ok(Json(state.store.get(id)?))
}

async fn review_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewResponse>> {
    let id = parse_card_id(&id)?;
    let Json(request) = payload?;
    let outcome = request.outcome()?;

    let (update, card) = with_store(&state, move |store| store.review(id, outcome, Utc::now())).await?;
    log::info!(
        "Reviewed card {} as {:?}, next review in {} days",
        id,
        outcome,
        update.interval_days
    );

    Ok(Json(ReviewResponse {
        interval_days: update.interval_days,
        next_due_at: update.next_due_at,
        next_review_in: describe_interval(update.interval_days),
        card,
    }))
}

async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_card_id(&id)?;
    with_store(&state, move |store| store.delete(id)).await?;
    log::info!("Deleted card {}", id);
    Ok(Json(DeleteResponse { deleted: id }))
}

async fn stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.store.stats(Utc::now()))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Create the HTTP router.
pub fn create_router(store: Arc<CardStore>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cards", post(create_card).get(list_cards))
        .route("/cards/due", get(due_cards))
        .route("/cards/{id}", get(get_card).delete(delete_card))
        .route("/cards/{id}/review", post(review_card))
        .route("/stats", get(stats))
        .layer(cors_layer(cors_origins))
        .with_state(AppState { store })
}

/// Running server handle.
pub struct CardServer {
    /// Address the server is listening on.
    pub addr: SocketAddr,
    /// Shutdown signal sender.
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CardServer {
    /// Get the base URL for this server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server gracefully and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            log::warn!("Server task ended abnormally: {}", e);
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// Start the HTTP server in a background task.
pub async fn start_server(
    config: &ServerConfig,
    store: Arc<CardStore>,
) -> Result<CardServer, ServerError> {
    let app = create_router(store, &config.cors_origins);

    let listener = TcpListener::bind(config.socket_addr()?).await?;
    let addr = listener.local_addr()?;

    log::info!("Card server started on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                log::info!("Card server shutting down");
            })
            .await;
        if let Err(e) = result {
            log::error!("Card server error: {}", e);
        }
    });

    Ok(CardServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
