use crate::fetch::execute;
use connectors::DbSession;
use connectors::query::BoundQuery;
use connectors::row::Row;
use engine_core::error::PipelineError;
use futures::stream::{BoxStream, Stream, TryStreamExt, try_unfold};
use model::ValidationError;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Third-stage set-accumulating final query emitter: deduplicates ids
/// surfacing from a variable-cardinality fan-out and amortizes the final
/// aggregation query over batches of `set_limit` ids.
pub struct Merger<R> {
    session: Arc<dyn DbSession>,
    upstream: BoxStream<'static, Result<Vec<Uuid>, PipelineError>>,
    build_query: Box<dyn Fn(Vec<Uuid>) -> BoundQuery + Send + Sync>,
    project: Box<dyn Fn(&Row) -> Result<R, ValidationError> + Send + Sync>,
    set_limit: usize,
}

struct State<R> {
    merger: Merger<R>,
    acc: HashSet<Uuid>,
    upstream_done: bool,
}

impl<R> Merger<R>
where
    R: Send + 'static,
{
    pub fn new(
        session: Arc<dyn DbSession>,
        upstream: impl Stream<Item = Result<Vec<Uuid>, PipelineError>> + Send + 'static,
        set_limit: usize,
        build_query: impl Fn(Vec<Uuid>) -> BoundQuery + Send + Sync + 'static,
        project: impl Fn(&Row) -> Result<R, ValidationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            session,
            upstream: Box::pin(upstream),
            build_query: Box::new(build_query),
            project: Box::new(project),
            set_limit,
        }
    }

    async fn flush(&self, acc: &mut HashSet<Uuid>) -> Result<Vec<R>, PipelineError> {
        let ids: Vec<Uuid> = acc.drain().collect();
        let bound = (self.build_query)(ids);
        execute(self.session.as_ref(), bound, |row| (self.project)(row)).await
    }

    /// Accumulate ids into a set, flush once it exceeds `set_limit`, and
    /// flush once more on upstream exhaustion if anything remains.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<R>, PipelineError>> {
        let state = State {
            merger: self,
            acc: HashSet::new(),
            upstream_done: false,
        };
        try_unfold(state, |mut state| async move {
            if state.upstream_done {
                return Ok(None);
            }
            loop {
                match state.merger.upstream.try_next().await? {
                    Some(batch) => {
                        state.acc.extend(batch);
                        if state.acc.len() > state.merger.set_limit {
                            let batch = state.merger.flush(&mut state.acc).await?;
                            return Ok(Some((batch, state)));
                        }
                    }
                    None => {
                        state.upstream_done = true;
                        if state.acc.is_empty() {
                            return Ok(None);
                        }
                        let batch = state.merger.flush(&mut state.acc).await?;
                        return Ok(Some((batch, state)));
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedSession, mock_row};
    use connectors::row::project_base_record;
    use futures::stream::{self, TryStreamExt};

    fn epoch() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap()
    }

    #[tokio::test]
    async fn dedupes_accumulated_ids_before_flushing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // set_limit=1, so the 2 distinct ids accumulated from two upstream
        // batches (`a` repeated, then `b`) must trigger exactly one flush.
        let session = Arc::new(ScriptedSession::new(vec![vec![mock_row(a, epoch()), mock_row(b, epoch())]]));
        let upstream = stream::iter(vec![Ok(vec![a, a]), Ok(vec![b])]);

        let merger = Merger::new(
            session,
            upstream,
            1,
            |_ids| BoundQuery {
                name: "fw_persons",
                sql: "",
                params: vec![],
            },
            project_base_record,
        );

        let batches: Vec<Vec<_>> = merger.into_stream().try_collect().await.unwrap();
        let mut ids: Vec<Uuid> = batches.into_iter().flatten().map(|r| r.id).collect();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn flushes_remainder_once_upstream_is_exhausted() {
        let a = Uuid::new_v4();
        let session = Arc::new(ScriptedSession::new(vec![vec![mock_row(a, epoch())]]));
        let upstream = stream::iter(vec![Ok(vec![a])]);

        let merger = Merger::new(
            session,
            upstream,
            100,
            |_ids| BoundQuery {
                name: "fw_persons",
                sql: "",
                params: vec![],
            },
            project_base_record,
        );

        let batches: Vec<Vec<_>> = merger.into_stream().try_collect().await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].id, a);
    }
}
