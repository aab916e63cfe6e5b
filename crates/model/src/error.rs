use thiserror::Error;

/// A row failed to project into a typed record.
///
/// The default policy is fatal: the caller surfaces this with the field
/// name and stops the run. The error carries enough to let a future caller
/// demote it to a per-row skip-with-counter without changing call sites.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("field `{field}` on `{record}` is NOT NULL but the row did not populate it")]
pub struct ValidationError {
    pub record: &'static str,
    pub field: &'static str,
}

impl ValidationError {
    pub fn new(record: &'static str, field: &'static str) -> Self {
        Self { record, field }
    }
}
