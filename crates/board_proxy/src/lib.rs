pub mod account;
pub mod board;
pub mod query;

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

pub use account::{transform, Account};
pub use query::{BoardQuery, Fetched, HttpTransport, RawResponse, Transport, Verified};

pub const ACCOUNTS_PATH: &str = "/api/monday/accounts";
pub const DEFAULT_ENDPOINT: &str = "https://api.monday.com/v2";
pub const DEFAULT_BOARD_ID: u64 = 8247982294;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const TOKEN_VAR: &str = "MONDAY_API_TOKEN";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0} is not configured")]
    Configuration(&'static str),
    #[error("board API error: {status} - {body}")]
    Transport { status: u16, body: String },
    #[error("board API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Upstream(String),
    #[error("Board not found with ID {0}")]
    NotFound(u64),
    #[error("unexpected board API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PartialEq for ProxyError {
    fn eq(&self, other: &ProxyError) -> bool {
        self.to_string() == other.to_string()
    }
}

pub type Result<T> = ::std::result::Result<T, ProxyError>;

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            cors_headers(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Connection settings for the board API.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub api_token: Option<String>,
    pub endpoint: Url,
    pub board_id: u64,
    pub page_size: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            board_id: DEFAULT_BOARD_ID,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Accounts for one request. `retry_after` is set when the board API
/// throttled the full query and the list is empty as a result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountList {
    pub accounts: Vec<Account>,
    pub retry_after: Option<String>,
}

pub struct AccountProxy<T: Transport = HttpTransport> {
    config: ProxyConfig,
    transport: T,
}

impl AccountProxy<HttpTransport> {
    pub fn new(config: ProxyConfig) -> Self {
        let transport = HttpTransport::new(config.endpoint.clone());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport + 'static> AccountProxy<T> {
    pub fn with_transport(config: ProxyConfig, transport: T) -> Self {
        Self { config, transport }
    }

    fn token(&self) -> Result<&str> {
        self.config
            .api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProxyError::Configuration(TOKEN_VAR))
    }

    /// Runs the probe and the full board query, then flattens the board.
    pub async fn accounts(&self) -> Result<AccountList> {
        let token = self.token()?;
        let query = BoardQuery::new(
            &self.transport,
            token,
            self.config.board_id,
            self.config.page_size,
        );

        let verified = query.verify().await?;
        match query.fetch(&verified).await? {
            Fetched::Throttled { retry_after } => Ok(AccountList {
                accounts: vec![],
                retry_after,
            }),
            Fetched::Board(board) => {
                if board.groups.is_empty() {
                    info!(board = %board.name, "board has no groups");
                }
                let accounts = transform(&board);
                info!(count = accounts.len(), "accounts transformed");

                Ok(AccountList {
                    accounts,
                    retry_after: None,
                })
            }
        }
    }

    pub fn start(self) -> Router {
        Router::new()
            .route(ACCOUNTS_PATH, get(list_accounts::<T>).options(preflight))
            .layer(Extension(Arc::new(self)))
    }
}

pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers
}

#[tracing::instrument(skip(proxy))]
async fn list_accounts<T: Transport + 'static>(
    proxy: Extension<Arc<AccountProxy<T>>>,
) -> Response {
    match proxy.accounts().await {
        Ok(list) => {
            let mut headers = cors_headers();
            if let Some(hint) = list.retry_after {
                if let Ok(value) = HeaderValue::from_str(&hint) {
                    headers.insert(header::RETRY_AFTER, value);
                }
            }
            (StatusCode::OK, headers, Json(list.accounts)).into_response()
        }
        Err(err) => {
            error!(error = %err, "account query failed");
            err.into_response()
        }
    }
}

async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, cors_headers())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::query::tests::{probe_ok, Canned};

    fn config(token: Option<&str>) -> ProxyConfig {
        ProxyConfig {
            api_token: token.map(str::to_string),
            ..ProxyConfig::default()
        }
    }

    async fn call(router: Router, method: Method) -> (StatusCode, HeaderMap, Vec<u8>) {
        let resp = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(ACCOUNTS_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization"
        );
        assert_eq!(headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn missing_credential_is_a_uniform_error() {
        for token in [None, Some(""), Some("   ")] {
            let proxy = AccountProxy::with_transport(config(token), Canned::default());
            let (status, headers, body) = call(proxy.start(), Method::GET).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_cors(&headers);
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(
                body,
                json!({ "error": "MONDAY_API_TOKEN is not configured" })
            );
        }
    }

    #[tokio::test]
    async fn serves_transformed_accounts() {
        let transport = Canned::new(vec![
            (200, probe_ok()),
            (
                200,
                json!({ "data": { "boards": [{
                    "id": "8247982294",
                    "name": "Transitions",
                    "columns": [{ "id": "c1", "title": "Account ID", "type": "text" }],
                    "groups": [{
                        "id": "g1",
                        "title": "Queued",
                        "items_page": { "cursor": null, "items": [
                            { "id": "i1", "name": "Acme", "column_values": [{ "id": "c1", "text": "A-100", "value": "\"A-100\"" }] }
                        ] }
                    }]
                }] } }),
            ),
        ]);
        let proxy = AccountProxy::with_transport(config(Some("secret")), transport);
        let (status, headers, body) = call(proxy.start(), Method::GET).await;

        assert_eq!(status, StatusCode::OK);
        assert_cors(&headers);
        assert!(headers.get("retry-after").is_none());
        let accounts: Vec<Account> = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            accounts,
            vec![Account {
                id: "i1".to_string(),
                name: "Acme".to_string(),
                account_id: "A-100".to_string(),
                ..Account::default()
            }]
        );
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_empty_list_with_retry_hint() {
        let transport = Canned::new(vec![
            (200, probe_ok()),
            (
                200,
                json!({ "errors": [{
                    "message": "Complexity budget exhausted",
                    "extensions": { "code": "COMPLEXITY_BUDGET_EXHAUSTED", "retry_in_seconds": 12 }
                }] }),
            ),
        ]);
        let proxy = AccountProxy::with_transport(config(Some("secret")), transport);
        let (status, headers, body) = call(proxy.start(), Method::GET).await;

        assert_eq!(status, StatusCode::OK);
        assert_cors(&headers);
        assert_eq!(headers["retry-after"], "12");
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn budget_exhaustion_without_hint_omits_retry_header() {
        let transport = Canned::new(vec![
            (200, probe_ok()),
            (
                200,
                json!({ "errors": [{
                    "message": "Complexity budget exhausted",
                    "extensions": { "code": "COMPLEXITY_BUDGET_EXHAUSTED" }
                }] }),
            ),
        ]);
        let proxy = AccountProxy::with_transport(config(Some("secret")), transport);
        let (status, headers, body) = call(proxy.start(), Method::GET).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.get("retry-after").is_none());
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn board_without_groups_is_an_empty_list() {
        let transport = Canned::new(vec![
            (200, probe_ok()),
            (
                200,
                json!({ "data": { "boards": [{ "id": "8247982294", "name": "Transitions", "columns": [], "groups": [] }] } }),
            ),
        ]);
        let proxy = AccountProxy::with_transport(config(Some("secret")), transport);

        assert_eq!(proxy.accounts().await.unwrap(), AccountList::default());
    }

    #[tokio::test]
    async fn probe_failure_skips_full_query() {
        let transport = Canned::new(vec![(
            200,
            json!({ "errors": [{ "message": "Not Authenticated" }] }),
        )]);
        let proxy = AccountProxy::with_transport(config(Some("secret")), transport);

        assert_eq!(
            proxy.accounts().await.unwrap_err(),
            ProxyError::Upstream("Not Authenticated".to_string())
        );
        assert_eq!(proxy.transport.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upstream_errors_share_the_error_shape() {
        let transport = Canned::raw(502, "bad gateway");
        let proxy = AccountProxy::with_transport(config(Some("secret")), transport);
        let (status, headers, body) = call(proxy.start(), Method::GET).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&headers);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({ "error": "board API error: 502 - bad gateway" })
        );
    }

    #[tokio::test]
    async fn preflight_has_cors_and_empty_body() {
        let proxy = AccountProxy::with_transport(config(None), Canned::default());
        let (status, headers, body) = call(proxy.start(), Method::OPTIONS).await;

        assert_eq!(status, StatusCode::OK);
        assert_cors(&headers);
        assert!(body.is_empty());
    }
}
