use crate::error::{ConnectorError, DbError};
use crate::query::params::refs;
use crate::query::templates::BoundQuery;
use crate::row::Row;
use async_trait::async_trait;
use engine_core::retry::{BackoffPolicy, Fatal, RetryDisposition};
use tokio::sync::Mutex;
use tokio_postgres::{Client, Config, NoTls};
use tracing::{error, info, warn};

/// A query-capable connection to the source database, exposed independently
/// of the concrete driver so `engine-processing` can be tested against an
/// in-memory fake — the seam between pipeline logic and I/O.
#[async_trait]
pub trait DbSession: Send + Sync {
    async fn query(&self, bound: &BoundQuery) -> Result<Vec<Row>, DbError>;

    /// Releases the underlying connection. The default no-op suits fakes
    /// with nothing to release; [`PgSession`] drops its client.
    async fn close(&self) {}
}

/// `Disconnected` / `Connected` session state machine: a lost connection
/// drops the client and the next query re-establishes it under
/// [`BackoffPolicy`], rather than surfacing the loss to the caller.
enum State {
    Disconnected,
    Connected(Client),
}

/// A single session, single concurrent query at a time: every operation
/// takes the same mutex, so a query blocks a concurrent caller rather
/// than racing it onto a second connection.
pub struct PgSession {
    url: String,
    backoff: BackoffPolicy,
    state: Mutex<State>,
}

impl PgSession {
    pub fn new(url: impl Into<String>, backoff: BackoffPolicy) -> Self {
        Self {
            url: url.into(),
            backoff,
            state: Mutex::new(State::Disconnected),
        }
    }

    /// Opens a fresh client, spawning the driver's connection future onto
    /// the runtime so its I/O keeps progressing in the background.
    async fn connect(&self) -> Result<Client, ConnectorError> {
        let config: Config = self
            .url
            .parse()
            .map_err(|e: tokio_postgres::Error| ConnectorError::InvalidUrl(e.to_string()))?;
        let (client, connection) = config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(%err, "postgres connection driver exited with error");
            }
        });
        info!("connected to postgres");
        Ok(client)
    }

    /// Runs one attempt of `bound`, reconnecting first if the session was
    /// left `Disconnected` by a prior operational failure. A connection-
    /// level failure during the query itself drops the client so the next
    /// attempt reconnects rather than reusing a dead socket.
    async fn try_query(&self, bound: &BoundQuery) -> Result<Vec<Row>, DbError> {
        let mut guard = self.state.lock().await;
        if matches!(*guard, State::Disconnected) {
            let client = self.connect().await.map_err(DbError::Connector)?;
            *guard = State::Connected(client);
        }
        let client = match &*guard {
            State::Connected(client) => client,
            State::Disconnected => unreachable!("just connected above"),
        };
        let params = refs(&bound.params);
        match client.query(bound.sql, &params).await {
            Ok(rows) => Ok(rows.into_iter().map(Row::postgres).collect()),
            Err(err) => {
                let db_err = DbError::from(err);
                if matches!(db_err.disposition(), RetryDisposition::Retry) {
                    warn!(query = bound.name, "dropping connection after operational error");
                    *guard = State::Disconnected;
                }
                Err(db_err)
            }
        }
    }
}

#[async_trait]
impl DbSession for PgSession {
    async fn query(&self, bound: &BoundQuery) -> Result<Vec<Row>, DbError> {
        self.backoff
            .run(|| self.try_query(bound), DbError::disposition)
            .await
            .map_err(|Fatal(err)| err)
    }

    async fn close(&self) {
        let mut guard = self.state.lock().await;
        if matches!(*guard, State::Connected(_)) {
            info!("closing postgres session");
        }
        *guard = State::Disconnected;
    }
}

/// RAII guard ensuring [`DbSession::close`] runs on every exit path,
/// including an unwinding panic mid-run — scoped acquisition, guaranteed
/// release. `close` is async, so `drop` spawns it rather than awaiting it
/// directly.
pub struct SessionGuard {
    session: std::sync::Arc<dyn DbSession>,
}

impl SessionGuard {
    pub fn new(session: std::sync::Arc<dyn DbSession>) -> Self {
        Self { session }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session = std::sync::Arc::clone(&self.session);
        tokio::spawn(async move {
            session.close().await;
        });
    }
}
