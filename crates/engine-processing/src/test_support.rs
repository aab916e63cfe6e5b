//! A scripted [`DbSession`] fake for this crate's own unit tests —
//! `engine-tests` builds a richer fixture-backed fake, but that crate
//! depends on this one, not the other way around, so Producer/Enricher/
//! Merger get their own minimal stand-in here.
#![cfg(test)]

use connectors::error::DbError;
use connectors::query::BoundQuery;
use connectors::row::Row;
use connectors::DbSession;
use std::sync::Mutex;

pub struct ScriptedSession {
    pages: Mutex<std::collections::VecDeque<Vec<Row>>>,
}

impl ScriptedSession {
    pub fn new(pages: Vec<Vec<Row>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
        }
    }
}

#[async_trait::async_trait]
impl DbSession for ScriptedSession {
    async fn query(&self, _bound: &BoundQuery) -> Result<Vec<Row>, DbError> {
        Ok(self.pages.lock().expect("poisoned").pop_front().unwrap_or_default())
    }
}

pub fn mock_row(id: uuid::Uuid, updated_at: chrono::DateTime<chrono::Utc>) -> Row {
    Row::Mock(
        connectors::row::MockRow::new()
            .with("id", connectors::row::MockValue::Uuid(id))
            .with("updated_at", connectors::row::MockValue::Timestamp(updated_at)),
    )
}
