pub mod error;
pub mod query;
pub mod row;
pub mod session;
pub mod sink;

pub use error::{ConnectorError, DbError};
pub use row::{MockRow, MockValue, Row};
pub use session::{DbSession, PgSession, SessionGuard};
pub use sink::{HttpSearchSink, SearchSink, SinkError};
