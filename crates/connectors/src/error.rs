use engine_core::retry::RetryDisposition;
use thiserror::Error;

/// Errors from opening or re-opening the database connection.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("connection error: {0}")]
    Connection(#[from] tokio_postgres::Error),
}

/// Errors from the query layer, distinguishing retryable I/O failure from
/// fatal SQL failure.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

impl DbError {
    /// Classifies this failure: connection loss / operational errors
    /// reconnect-and-retry; syntax or column-reference errors are fatal
    /// and propagate.
    pub fn disposition(&self) -> RetryDisposition {
        match self {
            DbError::Connector(_) => RetryDisposition::Retry,
            DbError::Postgres(err) => {
                if is_operational(err) {
                    RetryDisposition::Retry
                } else {
                    RetryDisposition::Stop
                }
            }
        }
    }
}

/// tokio-postgres folds connection-level failures and backend errors into
/// one `Error` type; `Error::is_closed` and the absence of a structured
/// `DbError` (a `SqlState`) are the signals the driver gives for "the
/// connection is gone", as opposed to a backend-reported syntax/semantic
/// error which always carries a `DbError` with a SQLSTATE code.
fn is_operational(err: &tokio_postgres::Error) -> bool {
    err.is_closed() || err.code().is_none()
}
