//! API route handlers.
//!
//! All endpoints speak JSON. State is shared via `Arc<ApiState>`.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{BracketPhase, BracketSession, RandomSource, SelectionOutcome};
use crate::storage::BracketService;
use crate::types::{BracketCategory, BracketError, BracketRecord, BracketStatus, Goal, Matchup};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Minutes a session may sit untouched before it is swept.
pub const DEFAULT_SESSION_TTL_MINS: i64 = 120;

/// A live session and when it was last created or played.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: BracketSession,
    pub touched: DateTime<Utc>,
}

impl SessionEntry {
    fn new(session: BracketSession) -> Self {
        Self {
            session,
            touched: Utc::now(),
        }
    }
}

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    pub service: BracketService,
    pub rng: Mutex<Box<dyn RandomSource + Send>>,
    session_ttl: Duration,
}

impl ApiState {
    pub fn new(service: BracketService, rng: Box<dyn RandomSource + Send>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            service,
            rng: Mutex::new(rng),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINS),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

/// Drop sessions idle for at least `ttl`. Returns how many were removed.
pub fn sweep_idle_sessions(
    sessions: &mut HashMap<Uuid, SessionEntry>,
    ttl: Duration,
    now: DateTime<Utc>,
) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| now - entry.touched < ttl);
    before - sessions.len()
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What the caller was doing, for user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Play,
    Save,
    List,
}

#[derive(Debug)]
pub struct ApiError {
    pub error: BracketError,
    pub action: Action,
}

impl ApiError {
    pub fn new(error: BracketError, action: Action) -> Self {
        Self { error, action }
    }

    fn status(&self) -> StatusCode {
        match self.error {
            BracketError::InvalidArgument(_)
            | BracketError::Validation(_)
            | BracketError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
            BracketError::NotFound(_) => StatusCode::NOT_FOUND,
            BracketError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BracketError::RemoteFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match (&self.error, self.action) {
            (BracketError::Unauthorized(_), Action::List) => {
                "Please sign in to view your brackets".to_string()
            }
            (BracketError::Unauthorized(_), _) => "Please sign in to save your bracket".to_string(),
            (BracketError::RemoteFailure(_), Action::List) => {
                "Failed to load your brackets. Please try again.".to_string()
            }
            (BracketError::RemoteFailure(_), _) => {
                "Failed to save bracket. Please try again later.".to_string()
            }
            (other, _) => other.to_string(),
        }
    }
}

impl From<BracketError> for ApiError {
    fn from(error: BracketError) -> Self {
        Self::new(error, Action::Play)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(BracketError::Validation(rejection.body_text()), Action::Play)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.error, "Request failed");
        }
        let body = ErrorBody {
            error: self.message(),
            retryable: self.error.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// `Json` body extractor whose rejections use the `ErrorBody` shape.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub title: String,
    #[serde(default)]
    pub category: Option<BracketCategory>,
    pub goals: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    pub matchup_id: Uuid,
    pub selected: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryView {
    pub value: BracketCategory,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub title: String,
    pub category: BracketCategory,
    pub goals: Vec<Goal>,
    pub phase: BracketPhase,
    pub current_round: u32,
    pub planned_rounds: u32,
    pub current_matchups: Vec<Matchup>,
    pub matchups: Vec<Matchup>,
    pub winner: Option<Goal>,
}

impl SessionView {
    pub fn new(id: Uuid, session: &BracketSession) -> Self {
        Self {
            id,
            title: session.title().to_string(),
            category: session.category(),
            goals: session.goals().to_vec(),
            phase: session.phase(),
            current_round: session.current_round(),
            planned_rounds: session.planned_rounds().unwrap_or(0),
            current_matchups: session.current_round_matchups(),
            matchups: session.matchups().to_vec(),
            winner: session.winner().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionResponse {
    pub outcome: SelectionOutcome,
    pub session: SessionView,
}

fn session_not_found(id: Uuid) -> ApiError {
    BracketError::NotFound(format!("Session {id}")).into()
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/categories
pub async fn list_categories() -> Json<Vec<CategoryView>> {
    Json(
        BracketCategory::ALL
            .iter()
            .map(|c| CategoryView {
                value: *c,
                label: c.label(),
            })
            .collect(),
    )
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let mut session = BracketSession::new();
    session.set_title(req.title);
    if let Some(category) = req.category {
        session.set_category(category);
    }
    for goal in &req.goals {
        session.add_goal(goal)?;
    }

    {
        let mut rng = state.rng.lock().await;
        session.start(&mut **rng)?;
    }

    let id = Uuid::new_v4();
    let view = SessionView::new(id, &session);
    let live = {
        let mut sessions = state.sessions.write().await;
        let swept = sweep_idle_sessions(&mut sessions, state.session_ttl, Utc::now());
        if swept > 0 {
            debug!(swept, "Idle sessions dropped");
        }
        sessions.insert(id, SessionEntry::new(session));
        sessions.len()
    };

    info!(session_id = %id, goals = view.goals.len(), live, "Session created");
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(SessionView::new(id, &entry.session)))
}

/// POST /api/sessions/:id/selections
pub async fn select(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<SelectRequest>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    entry.touched = Utc::now();

    let outcome = {
        let mut rng = state.rng.lock().await;
        entry.session.select(req.matchup_id, &req.selected, &mut **rng)?
    };

    Ok(Json(SelectionResponse {
        outcome,
        session: SessionView::new(id, &entry.session),
    }))
}

/// POST /api/sessions/:id/save
///
/// A won session is released once its bracket is stored; an unfinished
/// one stays live so it can be played on and saved again.
pub async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<BracketRecord>), ApiError> {
    // snapshot so the lock is not held across the store call
    let session = state
        .sessions
        .read()
        .await
        .get(&id)
        .map(|entry| entry.session.clone())
        .ok_or_else(|| session_not_found(id))?;

    let record = state
        .service
        .save(&session)
        .await
        .map_err(|e| ApiError::new(e, Action::Save))?;

    if record.status == BracketStatus::Completed {
        state.sessions.write().await.remove(&id);
        info!(session_id = %id, record = %record, "Won session released after save");
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            info!(session_id = %id, "Session discarded");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(session_not_found(id)),
    }
}

/// GET /api/brackets
pub async fn list_brackets(
    State(state): State<AppState>,
) -> Result<Json<Vec<BracketRecord>>, ApiError> {
    let records = state
        .service
        .list_recent()
        .await
        .map_err(|e| ApiError::new(e, Action::List))?;
    Ok(Json(records))
}
