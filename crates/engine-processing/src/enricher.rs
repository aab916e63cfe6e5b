use crate::fetch::execute;
use connectors::DbSession;
use connectors::query::BoundQuery;
use connectors::row::project_base_record;
use engine_core::error::PipelineError;
use futures::stream::{BoxStream, Stream, TryStreamExt, try_unfold};
use model::{BaseRecord, CursorAnchor};
use std::sync::Arc;
use uuid::Uuid;

/// Second-stage fan-out: for each upstream batch of ids, an `OFFSET`-paged
/// lookup of related film_work ids, offset reset to 0 at the start of
/// every outer batch.
pub struct Enricher {
    session: Arc<dyn DbSession>,
    upstream: BoxStream<'static, Result<Vec<Uuid>, PipelineError>>,
    build_query: Box<dyn Fn(Vec<Uuid>, i64, i64) -> BoundQuery + Send + Sync>,
    limit: i64,
}

struct State {
    enricher: Enricher,
    current_ids: Option<Vec<Uuid>>,
    offset: i64,
}

impl Enricher {
    pub fn new(
        session: Arc<dyn DbSession>,
        upstream: impl Stream<Item = Result<Vec<Uuid>, PipelineError>> + Send + 'static,
        limit: i64,
        build_query: impl Fn(Vec<Uuid>, i64, i64) -> BoundQuery + Send + Sync + 'static,
    ) -> Self {
        Self {
            session,
            upstream: Box::pin(upstream),
            build_query: Box::new(build_query),
            limit,
        }
    }

    async fn fetch_inner_page(&self, data_ids: Vec<Uuid>, offset: i64) -> Result<Vec<BaseRecord>, PipelineError> {
        let bound = (self.build_query)(data_ids, self.limit, offset);
        execute(self.session.as_ref(), bound, project_base_record).await
    }

    /// A single flattened pull loop over the outer producer stream instead
    /// of inheriting its iteration contract.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Uuid>, PipelineError>> {
        let state = State {
            enricher: self,
            current_ids: None,
            offset: 0,
        };
        try_unfold(state, |mut state| async move {
            loop {
                if let Some(ids) = state.current_ids.clone() {
                    let records = state.enricher.fetch_inner_page(ids, state.offset).await?;
                    if records.is_empty() {
                        state.current_ids = None;
                        state.offset = 0;
                        continue;
                    }
                    state.offset += state.enricher.limit;
                    let out_ids: Vec<Uuid> = records.iter().map(CursorAnchor::id).collect();
                    return Ok(Some((out_ids, state)));
                }

                match state.enricher.upstream.try_next().await? {
                    Some(outer_ids) => {
                        state.current_ids = Some(outer_ids);
                        state.offset = 0;
                    }
                    None => return Ok(None),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedSession, mock_row};
    use connectors::query::Param;
    use futures::stream::{self, TryStreamExt};

    fn ts(secs: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0).unwrap()
    }

    /// Two outer batches of one id each, the first needing two inner pages
    /// before exhausting — the offset must reset to 0 once the second outer
    /// batch starts, not keep climbing from the first.
    #[tokio::test]
    async fn offset_resets_between_outer_batches() {
        let outer_id_1 = Uuid::new_v4();
        let outer_id_2 = Uuid::new_v4();
        let inner_a = Uuid::new_v4();
        let inner_b = Uuid::new_v4();
        let inner_c = Uuid::new_v4();

        let session = Arc::new(ScriptedSession::new(vec![
            vec![mock_row(inner_a, ts(1))],
            vec![],
            vec![mock_row(inner_b, ts(2)), mock_row(inner_c, ts(3))],
            vec![],
        ]));

        let upstream = stream::iter(vec![Ok(vec![outer_id_1]), Ok(vec![outer_id_2])]);

        let enricher = Enricher::new(session, upstream, 1, |ids, limit, offset| BoundQuery {
            name: "nested_fw_ids",
            sql: "",
            params: vec![Param::UuidArray(ids), Param::Integer(limit), Param::Integer(offset)],
        });

        let batches: Vec<Vec<Uuid>> = enricher.into_stream().try_collect().await.unwrap();
        let flattened: Vec<Uuid> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, vec![inner_a, inner_b, inner_c]);
    }

    #[tokio::test]
    async fn empty_upstream_yields_no_batches() {
        let session = Arc::new(ScriptedSession::new(vec![]));
        let upstream = stream::iter(Vec::<Result<Vec<Uuid>, PipelineError>>::new());

        let enricher = Enricher::new(session, upstream, 10, |ids, limit, offset| BoundQuery {
            name: "nested_fw_ids",
            sql: "",
            params: vec![Param::UuidArray(ids), Param::Integer(limit), Param::Integer(offset)],
        });

        let batches: Vec<Vec<Uuid>> = enricher.into_stream().try_collect().await.unwrap();
        assert!(batches.is_empty());
    }
}
