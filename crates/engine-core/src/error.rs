use crate::state::StateStoreError;
use model::ValidationError;
use thiserror::Error;

/// The top-level error taxonomy, unified at the pipeline driver boundary.
/// Malformed config is surfaced earlier, by [`engine_config::Config::load`],
/// before a pipeline ever starts running — it never reaches this enum.
/// Transient I/O and sink failures are recovered locally by
/// [`crate::retry::BackoffPolicy`] and never reach here either; everything
/// that does reach here terminates the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Syntactic or column-reference failure from the driver.
    #[error("SQL error in `{query}`: {source}")]
    Sql {
        query: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A row failed to project into a typed record.
    #[error("data validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Cursor sidecar could not be read or written.
    #[error("cursor state error: {0}")]
    State(#[from] StateStoreError),
}
