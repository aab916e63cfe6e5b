use crate::fetch::execute;
use chrono::{DateTime, Utc};
use connectors::DbSession;
use connectors::query::BoundQuery;
use connectors::row::Row;
use engine_core::error::PipelineError;
use futures::stream::{Stream, try_unfold};
use model::{CursorAnchor, Cursor, CursorTieBreak, ValidationError};
use std::sync::Arc;
use uuid::Uuid;

/// Cursor-paged first-stage extractor. Generic over the record type
/// projected from each row — `FilmWork` for the direct pipeline,
/// `BaseRecord` for the two nested pipelines, where only the `id`
/// ultimately matters downstream.
pub struct Producer<R> {
    session: Arc<dyn DbSession>,
    build_query: Box<dyn Fn(CursorTieBreak, DateTime<Utc>, Uuid, i64) -> BoundQuery + Send + Sync>,
    project: Box<dyn Fn(&Row) -> Result<R, ValidationError> + Send + Sync>,
    tie_break: CursorTieBreak,
    cursor: Cursor,
    limit: i64,
}

impl<R> Producer<R>
where
    R: CursorAnchor + Send + 'static,
{
    pub fn new(
        session: Arc<dyn DbSession>,
        tie_break: CursorTieBreak,
        limit: i64,
        build_query: impl Fn(CursorTieBreak, DateTime<Utc>, Uuid, i64) -> BoundQuery + Send + Sync + 'static,
        project: impl Fn(&Row) -> Result<R, ValidationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            session,
            build_query: Box::new(build_query),
            project: Box::new(project),
            tie_break,
            cursor: Cursor::epoch(),
            limit,
        }
    }

    /// Resumes from a previously persisted high-water mark instead of the
    /// epoch.
    pub fn resume_from(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    async fn fetch_page(&self) -> Result<Vec<R>, PipelineError> {
        let after_id = self.cursor.id.unwrap_or_else(Uuid::nil);
        let bound = (self.build_query)(self.tie_break, self.cursor.updated_at, after_id, self.limit);
        execute(self.session.as_ref(), bound, |row| (self.project)(row)).await
    }

    /// Fetch, terminate on an empty batch, otherwise yield and advance the
    /// cursor to the last row's `(updated_at, id)`. Lazy and
    /// non-restartable.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<R>, PipelineError>> {
        try_unfold(self, |mut this| async move {
            let batch = this.fetch_page().await?;
            if batch.is_empty() {
                return Ok(None);
            }
            if let Some(last) = batch.last() {
                this.cursor.advance(last.updated_at(), last.id());
            }
            Ok(Some((batch, this)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedSession, mock_row};
    use connectors::row::project_base_record;
    use futures::stream::TryStreamExt;
    use model::BaseRecord;

    fn id_at(secs: i64) -> (Uuid, DateTime<Utc>) {
        (Uuid::new_v4(), DateTime::<Utc>::from_timestamp(secs, 0).unwrap())
    }

    fn noop_query(_tie_break: CursorTieBreak, _after: DateTime<Utc>, _after_id: Uuid, _limit: i64) -> BoundQuery {
        BoundQuery {
            name: "nested_pre",
            sql: "",
            params: vec![],
        }
    }

    #[tokio::test]
    async fn advances_cursor_across_pages_and_terminates_on_empty_batch() {
        let (id_a, t_a) = id_at(10);
        let (id_b, t_b) = id_at(20);
        let (id_c, t_c) = id_at(30);

        let session = Arc::new(ScriptedSession::new(vec![
            vec![mock_row(id_a, t_a), mock_row(id_b, t_b)],
            vec![mock_row(id_c, t_c)],
            vec![],
        ]));

        let producer = Producer::new(session, CursorTieBreak::Id, 2, noop_query, project_base_record);

        let batches: Vec<Vec<BaseRecord>> = producer.into_stream().try_collect().await.unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].iter().map(|r| r.id).collect::<Vec<_>>(), vec![id_a, id_b]);
        assert_eq!(batches[1].iter().map(|r| r.id).collect::<Vec<_>>(), vec![id_c]);
    }

    #[tokio::test]
    async fn an_immediately_empty_page_yields_no_batches() {
        let session = Arc::new(ScriptedSession::new(vec![vec![]]));
        let producer = Producer::new(session, CursorTieBreak::Id, 10, noop_query, project_base_record);

        let batches: Vec<Vec<BaseRecord>> = producer.into_stream().try_collect().await.unwrap();
        assert!(batches.is_empty());
    }
}
