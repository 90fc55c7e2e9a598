//! Paginated source client for the Bubble Data API.
//!
//! The source system exposes each entity type at `GET {base}/obj/{entity}`
//! with `cursor` and `limit` query parameters and a hard per-page maximum.
//! Responses are wrapped in `{ "response": { results, count, remaining } }`.

mod record;

pub use record::SourceRecord;

use crate::config::SourceConfig;
use crate::error::{MigrateError, Result};
use crate::transform::EntityType;
use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One page of source records.
#[derive(Debug)]
pub struct Page {
    /// Records in this page, in source iteration order.
    pub results: Vec<SourceRecord>,

    /// Number of records in this page.
    pub count: i64,

    /// Records not yet returned at the time of the call. May be stale on
    /// some deployments; termination also guards on an empty page.
    pub remaining: i64,
}

/// Trait for source API operations.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Fetch one page of records starting at `cursor`, sized `limit`
    /// (clamped to the source system's per-page maximum).
    async fn list(&self, entity: EntityType, cursor: i64, limit: i64) -> Result<Page>;

    /// Total record count for an entity type. Used to size progress
    /// reporting only; never authoritative for termination.
    async fn count_all(&self, entity: EntityType) -> Result<i64> {
        let page = self.list(entity, 0, 1).await?;
        Ok(page.count + page.remaining)
    }
}

/// Produce successive pages as a lazy stream, advancing the cursor by the
/// number of records actually returned. Terminates when the source reports
/// `remaining == 0` or a page comes back empty, whichever happens first.
///
/// The stream is finite and forward-only; it never fetches the next page
/// before the caller has consumed the current one.
pub fn stream_pages(
    api: Arc<dyn SourceApi>,
    entity: EntityType,
    batch_size: i64,
) -> impl Stream<Item = Result<Vec<SourceRecord>>> {
    futures::stream::try_unfold((api, 0i64, false), move |(api, cursor, done)| async move {
        if done {
            return Ok(None);
        }
        let page = api.list(entity, cursor, batch_size).await?;
        let fetched = page.results.len() as i64;
        debug!(
            "{}: fetched page at cursor {} ({} records, {} remaining)",
            entity, cursor, fetched, page.remaining
        );
        if fetched == 0 {
            return Ok(None);
        }
        let done = page.remaining == 0;
        Ok(Some((page.results, (api, cursor + fetched, done))))
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    results: Vec<SourceRecord>,
    count: i64,
    remaining: i64,
}

/// HTTP client for the Bubble Data API.
pub struct BubbleClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    page_max: i64,
    /// JSON-encoded constraints array applied to every list call, if
    /// configured (server-side filtering).
    constraints: Option<String>,
}

impl BubbleClient {
    /// Create a client from source configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let constraints = config
            .constraints
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            page_max: config.page_max,
            constraints,
        })
    }
}

#[async_trait]
impl SourceApi for BubbleClient {
    async fn list(&self, entity: EntityType, cursor: i64, limit: i64) -> Result<Page> {
        let limit = limit.clamp(1, self.page_max);
        let url = format!("{}/obj/{}", self.base_url, entity.object_name());

        let mut request = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("cursor", cursor.to_string()), ("limit", limit.to_string())]);

        if let Some(constraints) = &self.constraints {
            request = request.query(&[("constraints", constraints.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(300);
            return Err(MigrateError::Api {
                entity: entity.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = response.json().await?;
        Ok(Page {
            results: envelope.response.results,
            count: envelope.response.count,
            remaining: envelope.response.remaining,
        })
    }
}
