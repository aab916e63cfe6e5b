use async_trait::async_trait;
use engine_core::retry::{BackoffPolicy, Fatal, RetryDisposition};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors from delivering a document to the search sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sink rejected document {id} with status {status}")]
    Rejected { id: Uuid, status: u16 },
}

impl SinkError {
    /// A connection-level failure or a `5xx` is retryable; a `4xx` means
    /// the document itself is malformed and retrying will not help.
    pub fn disposition(&self) -> RetryDisposition {
        match self {
            SinkError::Transport(err) => {
                if err.is_connect() || err.is_timeout() {
                    RetryDisposition::Retry
                } else {
                    RetryDisposition::Stop
                }
            }
            SinkError::Rejected { status, .. } => {
                if (500..600).contains(status) {
                    RetryDisposition::Retry
                } else {
                    RetryDisposition::Stop
                }
            }
        }
    }
}

/// The destination a pipeline stage upserts documents into. `document` is
/// already-shaped JSON (field renames and drops are the caller's job);
/// merge-vs-replace for partial documents is the sink's decision, not
/// this crate's.
#[async_trait]
pub trait SearchSink: Send + Sync {
    async fn upsert(&self, index: &str, id: Uuid, document: Value) -> Result<(), SinkError>;
}

/// Upserts one document as `PUT /{index}/_doc/{id}` against an
/// Elasticsearch-compatible HTTP endpoint, under the same backoff policy
/// used for database queries.
pub struct HttpSearchSink {
    client: reqwest::Client,
    base_url: String,
    backoff: BackoffPolicy,
}

impl HttpSearchSink {
    pub fn new(base_url: impl Into<String>, backoff: BackoffPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            backoff,
        }
    }

    async fn put(&self, index: &str, id: Uuid, document: &Value) -> Result<(), SinkError> {
        let url = format!("{}/{}/_doc/{}", self.base_url, index, id);
        let response = self.client.put(&url).json(document).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected {
                id,
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl SearchSink for HttpSearchSink {
    async fn upsert(&self, index: &str, id: Uuid, document: Value) -> Result<(), SinkError> {
        self.backoff
            .run(|| self.put(index, id, &document), SinkError::disposition)
            .await
            .map_err(|Fatal(err)| err)
    }
}
