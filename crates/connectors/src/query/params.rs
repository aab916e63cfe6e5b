use chrono::{DateTime, Utc};
use tokio_postgres::types::ToSql;
use uuid::Uuid;

/// A positionally-bound value backing one `$n` in a rendered query. The
/// named placeholders are the public contract the stages' constructor
/// parameters expose; `Param` exists only inside this crate to drive
/// `tokio_postgres`'s positional `$n` binding.
#[derive(Debug, Clone)]
pub enum Param {
    Timestamp(DateTime<Utc>),
    Integer(i64),
    Uuid(Uuid),
    UuidArray(Vec<Uuid>),
}

impl Param {
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Param::Timestamp(v) => v,
            Param::Integer(v) => v,
            Param::Uuid(v) => v,
            Param::UuidArray(v) => v,
        }
    }
}

pub fn refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(Param::as_sql).collect()
}
