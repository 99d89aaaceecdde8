//! The two-step exchange with the board API.
//!
//! A cheap probe confirms the credential and the board before the full board
//! query runs. [`BoardQuery::fetch`] only accepts the probe's [`Verified`]
//! result, so the order cannot be skipped.

use axum::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::board::{Board, BoardData, BoardSummary, Envelope, ProbeData, User};
use crate::{ProxyError, Result};

/// A raw upstream reply, before any GraphQL decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts a GraphQL document to the board API.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, token: &str, query: &str) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, token: &str, query: &str) -> Result<RawResponse> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;

        Ok(RawResponse { status, body })
    }
}

/// Result of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub user: Option<User>,
    pub board: BoardSummary,
}

/// Result of the full board query.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Board(Board),
    /// The upstream query budget ran out; carries the `retry_in_seconds` hint.
    Throttled { retry_after: Option<String> },
}

pub fn probe_query(board_id: u64) -> String {
    format!(
        r#"query {{
  me {{ name }}
  boards(ids: {}) {{
    id
    name
    workspace {{ id name }}
  }}
}}"#,
        board_id
    )
}

pub fn board_query(board_id: u64, page_size: u32) -> String {
    format!(
        r#"query {{
  boards(ids: {}) {{
    id
    name
    columns {{ id title type }}
    groups {{
      id
      title
      items_page(limit: {}) {{
        cursor
        items {{
          id
          name
          column_values {{ id text value }}
        }}
      }}
    }}
  }}
}}"#,
        board_id, page_size
    )
}

pub struct BoardQuery<'a, T: Transport> {
    transport: &'a T,
    token: &'a str,
    board_id: u64,
    page_size: u32,
}

impl<'a, T: Transport> BoardQuery<'a, T> {
    pub fn new(transport: &'a T, token: &'a str, board_id: u64, page_size: u32) -> Self {
        Self {
            transport,
            token,
            board_id,
            page_size,
        }
    }

    /// Confirms the credential works and the board exists.
    #[tracing::instrument(skip(self), fields(board_id = self.board_id))]
    pub async fn verify(&self) -> Result<Verified> {
        let raw = self
            .transport
            .post(self.token, &probe_query(self.board_id))
            .await?;
        debug!(status = raw.status, "probe response received");

        if !raw.is_success() {
            return Err(ProxyError::Transport {
                status: raw.status,
                body: raw.body,
            });
        }

        let envelope: Envelope<ProbeData> = decode(&raw)?;
        if !envelope.errors.is_empty() {
            let messages: Vec<&str> = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect();
            return Err(ProxyError::Upstream(messages.join(", ")));
        }

        let data = envelope.data.unwrap_or_default();
        let id = self.board_id.to_string();
        let board = data
            .boards
            .into_iter()
            .find(|b| b.id == id)
            .ok_or(ProxyError::NotFound(self.board_id))?;

        info!(
            user = data.me.as_ref().map(|u| u.name.as_str()).unwrap_or(""),
            board = %board.name,
            "authenticated against board API"
        );

        Ok(Verified {
            user: data.me,
            board,
        })
    }

    /// Fetches the board with one page of items per group.
    #[tracing::instrument(skip(self, verified), fields(board_id = %verified.board.id))]
    pub async fn fetch(&self, verified: &Verified) -> Result<Fetched> {
        let raw = self
            .transport
            .post(self.token, &board_query(self.board_id, self.page_size))
            .await?;
        debug!(status = raw.status, "board response received");

        let envelope: Envelope<BoardData> = decode(&raw)?;
        if !raw.is_success() || !envelope.errors.is_empty() {
            if let Some(err) = envelope.errors.first().filter(|e| e.is_budget_exhausted()) {
                let retry_after = err.retry_in_seconds();
                warn!(?retry_after, "complexity budget exhausted");
                return Ok(Fetched::Throttled { retry_after });
            }

            let detail = if envelope.errors.is_empty() {
                raw.status.to_string()
            } else {
                serde_json::to_string(&envelope.errors)?
            };
            return Err(ProxyError::Upstream(format!(
                "Failed to fetch board data: {}",
                detail
            )));
        }

        let board = envelope
            .data
            .and_then(|d| d.boards.into_iter().next())
            .ok_or(ProxyError::NotFound(self.board_id))?;

        debug!(
            groups = board.groups.len(),
            columns = board.columns.len(),
            "board fetched"
        );

        Ok(Fetched::Board(board))
    }
}

/// Decodes a GraphQL body; a body that is not JSON at all is a transport
/// failure rather than a decoding one.
fn decode<T: DeserializeOwned>(raw: &RawResponse) -> Result<Envelope<T>> {
    let value: serde_json::Value =
        serde_json::from_str(&raw.body).map_err(|_| ProxyError::Transport {
            status: raw.status,
            body: raw.body.clone(),
        })?;

    Ok(serde_json::from_value(value)?)
}
