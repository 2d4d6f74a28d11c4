//! Remote REST backend for saved brackets.
//!
//! Endpoints (relative to the configured base URL):
//! - `POST /brackets`: body is the new bracket plus `owner`; returns the
//!   stored record.
//! - `GET /brackets`: the caller's records; owner sent in `X-Owner-Id`.
//!
//! Auth: `Authorization: Bearer {token}` when a token is configured.
//! 401/403, or any error body mentioning "not authorized", is reported as
//! `Unauthorized`; every other failure is a `RemoteFailure`. No retries:
//! the user retries by hand.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::BracketStore;
use crate::types::{BracketError, BracketRecord, NewBracket, Principal};

const STORE_NAME: &str = "remote";
const OWNER_HEADER: &str = "X-Owner-Id";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    owner: &'a str,
    #[serde(flatten)]
    bracket: &'a NewBracket,
}

pub struct HttpBracketStore {
    http: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl HttpBracketStore {
    pub fn new(
        base_url: &str,
        api_token: Option<SecretString>,
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(
                timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .user_agent("goal-bracket/0.1.0")
            .build()
            .context("Failed to build HTTP client for bracket store")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn url(&self) -> String {
        format!("{}/brackets", self.base_url)
    }

    fn authorize(&self, req: RequestBuilder, owner: &Principal) -> RequestBuilder {
        let req = req.header(OWNER_HEADER, &owner.id);
        match &self.api_token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    /// Map a non-success response onto the error taxonomy.
    async fn check(resp: Response) -> Result<Response, BracketError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || body.to_lowercase().contains("not authorized")
        {
            return Err(BracketError::Unauthorized(format!("HTTP {status}: {body}")));
        }
        Err(BracketError::RemoteFailure(format!("HTTP {status}: {body}")))
    }
}

fn transport_failure(e: reqwest::Error) -> BracketError {
    BracketError::RemoteFailure(format!("Request error: {e}"))
}

#[async_trait]
impl BracketStore for HttpBracketStore {
    async fn create(
        &self,
        owner: &Principal,
        bracket: NewBracket,
    ) -> Result<BracketRecord, BracketError> {
        let url = self.url();
        debug!(url = %url, owner = %owner, "Creating bracket");

        let body = CreateRequest {
            owner: &owner.id,
            bracket: &bracket,
        };
        let resp = self
            .authorize(self.http.post(&url), owner)
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        Self::check(resp)
            .await?
            .json::<BracketRecord>()
            .await
            .map_err(|e| BracketError::RemoteFailure(format!("Failed to parse created bracket: {e}")))
    }

    async fn list(&self, owner: &Principal) -> Result<Vec<BracketRecord>, BracketError> {
        let url = self.url();
        debug!(url = %url, owner = %owner, "Listing brackets");

        let resp = self
            .authorize(self.http.get(&url), owner)
            .send()
            .await
            .map_err(transport_failure)?;

        Self::check(resp)
            .await?
            .json::<Vec<BracketRecord>>()
            .await
            .map_err(|e| BracketError::RemoteFailure(format!("Failed to parse bracket list: {e}")))
    }

    fn name(&self) -> &str {
        STORE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BracketCategory, BracketStatus};
    use axum::{
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Json, Router,
    };
    use chrono::Utc;
    use serde_json::Value;

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn new_bracket() -> NewBracket {
        NewBracket {
            title: "Family".into(),
            category: BracketCategory::Family,
            goals: vec!["call mum".into(), "trip".into()],
            matchups: Vec::new(),
            winner: None,
            round: 1,
            status: BracketStatus::InProgress,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_sends_owner_token_and_body() {
        let app = Router::new().route(
            "/brackets",
            axum::routing::post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer s3cret");
                assert_eq!(headers["x-owner-id"], "dana");
                assert_eq!(body["owner"], "dana");
                assert_eq!(body["category"], "FAMILY");
                assert_eq!(body["status"], "IN_PROGRESS");
                let mut record = body.clone();
                record["id"] = Value::from("srv-1");
                Json(record)
            }),
        );
        let base = serve(app).await;
        let store =
            HttpBracketStore::new(&base, Some(SecretString::new("s3cret".into())), Some(5)).unwrap();

        let record = store.create(&Principal::new("dana"), new_bracket()).await.unwrap();
        assert_eq!(record.id, "srv-1");
        assert_eq!(record.owner, "dana");
        assert_eq!(record.category, Some(BracketCategory::Family));
    }

    #[tokio::test]
    async fn test_list_parses_records() {
        let app = Router::new().route(
            "/brackets",
            get(|| async {
                Json(serde_json::json!([{
                    "id": "r1",
                    "owner": "dana",
                    "title": "Fitness",
                    "category": "FITNESS",
                    "goals": ["run", "lift"],
                    "matchups": [],
                    "winner": "run",
                    "round": 1,
                    "status": "COMPLETED",
                    "createdAt": "2026-01-02T03:04:05Z"
                }]))
            }),
        );
        let base = serve(app).await;
        let store = HttpBracketStore::new(&format!("{base}/"), None, None).unwrap();

        let records = store.list(&Principal::new("dana")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].winner.as_deref(), Some("run"));
        assert_eq!(records[0].status, BracketStatus::Completed);
    }

    #[tokio::test]
    async fn test_unauthorized_statuses() {
        let app = Router::new()
            .route("/brackets", get(|| async { (AxumStatus::FORBIDDEN, "denied") }));
        let base = serve(app).await;
        let store = HttpBracketStore::new(&base, None, None).unwrap();

        let err = store.list(&Principal::new("x")).await.unwrap_err();
        assert!(matches!(err, BracketError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_not_authorized_body_is_unauthorized() {
        let app = Router::new().route(
            "/brackets",
            get(|| async { (AxumStatus::BAD_REQUEST, "User is Not Authorized to access list") }),
        );
        let base = serve(app).await;
        let store = HttpBracketStore::new(&base, None, None).unwrap();

        let err = store.list(&Principal::new("x")).await.unwrap_err();
        assert!(matches!(err, BracketError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_remote_failure() {
        let app = Router::new().route(
            "/brackets",
            get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(app).await;
        let store = HttpBracketStore::new(&base, None, None).unwrap();

        let err = store.list(&Principal::new("x")).await.unwrap_err();
        assert!(matches!(err, BracketError::RemoteFailure(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_remote_failure() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpBracketStore::new(&format!("http://{addr}"), None, Some(2)).unwrap();
        let err = store.list(&Principal::new("x")).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
