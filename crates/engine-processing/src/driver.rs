use crate::enricher::Enricher;
use crate::merger::Merger;
use crate::producer::Producer;
use connectors::query::entity::{Entity, RelatedEntity};
use connectors::query::{BoundQuery, fw_full, fw_genres, fw_persons, nested_fw_ids, nested_pre};
use connectors::row::{Row, project_base_record, project_film_work, project_film_work_genres, project_film_work_persons};
use connectors::{DbSession, SearchSink};
use engine_core::error::PipelineError;
use engine_core::state::CursorStore;
use futures::stream::TryStreamExt;
use model::{Cursor, CursorAnchor, CursorTieBreak, FilmWork, FilmWorkGenres, FilmWorkPersons, ValidationError};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Counters surfaced per pipeline run: rows read off Postgres and
/// documents actually upserted into the sink. They diverge
/// for the two nested pipelines, where many enriched ids can collapse
/// into fewer final documents once deduplicated by the Merger.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunCounters {
    pub rows_read: u64,
    pub documents_emitted: u64,
}

const INDEX: &str = "movies";

/// Runs the direct pipeline: `Producer(fw_full)` straight to the sink, one
/// upsert per full film_work document.
pub async fn run_direct(
    session: Arc<dyn DbSession>,
    sink: Arc<dyn SearchSink>,
    tie_break: CursorTieBreak,
    limit: i64,
    cursor_store: &CursorStore,
) -> Result<RunCounters, PipelineError> {
    const PIPELINE: &str = "direct";
    let cursor = cursor_store.load(PIPELINE)?;
    let producer = Producer::new(session, tie_break, limit, fw_full, project_film_work).resume_from(cursor);

    let mut counters = RunCounters::default();
    let mut last_cursor = cursor;
    let mut stream = Box::pin(producer.into_stream());

    while let Some(batch) = stream.try_next().await? {
        for record in &batch {
            last_cursor.advance(record.updated_at(), record.id());
            upsert(&sink, record.id, film_work_document(record)).await?;
            counters.documents_emitted += 1;
        }
        counters.rows_read += batch.len() as u64;
    }

    cursor_store.save(PIPELINE, last_cursor)?;
    log_completion(PIPELINE, counters);
    Ok(counters)
}

/// Runs the via-person pipeline: `Producer(nested_pre(person))` →
/// `Enricher(nested_fw_ids(person))` → `Merger(fw_persons)`.
pub async fn run_via_person(
    session: Arc<dyn DbSession>,
    sink: Arc<dyn SearchSink>,
    tie_break: CursorTieBreak,
    limit: i64,
    set_limit: usize,
    cursor_store: &CursorStore,
) -> Result<RunCounters, PipelineError> {
    run_nested(
        session,
        sink,
        tie_break,
        limit,
        set_limit,
        cursor_store,
        "via_person",
        Entity::Person,
        RelatedEntity::Person,
        fw_persons,
        project_film_work_persons,
        persons_document,
    )
    .await
}

/// Runs the via-genre pipeline: `Producer(nested_pre(genre))` →
/// `Enricher(nested_fw_ids(genre))` → `Merger(fw_genres)`.
pub async fn run_via_genre(
    session: Arc<dyn DbSession>,
    sink: Arc<dyn SearchSink>,
    tie_break: CursorTieBreak,
    limit: i64,
    set_limit: usize,
    cursor_store: &CursorStore,
) -> Result<RunCounters, PipelineError> {
    run_nested(
        session,
        sink,
        tie_break,
        limit,
        set_limit,
        cursor_store,
        "via_genre",
        Entity::Genre,
        RelatedEntity::Genre,
        fw_genres,
        project_film_work_genres,
        genres_document,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn run_nested<R>(
    session: Arc<dyn DbSession>,
    sink: Arc<dyn SearchSink>,
    tie_break: CursorTieBreak,
    limit: i64,
    set_limit: usize,
    cursor_store: &CursorStore,
    pipeline_name: &'static str,
    outer_entity: Entity,
    related_entity: RelatedEntity,
    build_merge_query: impl Fn(Vec<Uuid>) -> BoundQuery + Send + Sync + 'static,
    project: impl Fn(&Row) -> Result<R, ValidationError> + Send + Sync + 'static,
    to_document: impl Fn(&R) -> (Uuid, Value) + Send + Sync + 'static,
) -> Result<RunCounters, PipelineError>
where
    R: Send + 'static,
{
    let cursor = cursor_store.load(pipeline_name)?;
    let cursor_cell = Arc::new(Mutex::new(cursor));

    let producer = Producer::new(
        Arc::clone(&session),
        tie_break,
        limit,
        move |tie_break, after, after_id, limit| nested_pre(outer_entity, tie_break, after, after_id, limit),
        project_base_record,
    )
    .resume_from(cursor);

    // Advancing cursor_cell here, not inside Producer, is what lets the
    // outer scan's high-water mark survive past the ids it emits through
    // the Enricher and Merger below.
    let cursor_cell_writer = Arc::clone(&cursor_cell);
    let ids_stream = producer.into_stream().map_ok(move |batch| {
        if let Some(last) = batch.last() {
            *cursor_cell_writer.lock().expect("cursor cell poisoned") = Cursor::new(last.updated_at(), last.id());
        }
        batch.into_iter().map(|record| record.id).collect::<Vec<Uuid>>()
    });

    let enricher = Enricher::new(Arc::clone(&session), ids_stream, limit, move |ids, limit, offset| {
        nested_fw_ids(related_entity, ids, limit, offset)
    });

    let merger = Merger::new(session, enricher.into_stream(), set_limit, build_merge_query, project);

    let mut counters = RunCounters::default();
    let mut stream = Box::pin(merger.into_stream());

    while let Some(batch) = stream.try_next().await? {
        for record in &batch {
            let (id, document) = to_document(record);
            upsert(&sink, id, document).await?;
            counters.documents_emitted += 1;
        }
        counters.rows_read += batch.len() as u64;
    }

    let final_cursor = *cursor_cell.lock().expect("cursor cell poisoned");
    cursor_store.save(pipeline_name, final_cursor)?;
    log_completion(pipeline_name, counters);
    Ok(counters)
}

async fn upsert(sink: &Arc<dyn SearchSink>, id: Uuid, document: Value) -> Result<(), PipelineError> {
    sink.upsert(INDEX, id, document).await.map_err(|err| PipelineError::Sql {
        query: "sink upsert",
        source: Box::new(err),
    })
}

fn log_completion(pipeline: &'static str, counters: RunCounters) {
    info!(
        pipeline,
        rows_read = counters.rows_read,
        documents_emitted = counters.documents_emitted,
        "pipeline complete"
    );
}

fn film_work_document(record: &FilmWork) -> Value {
    json!({
        "id": record.id,
        "imdb_rating": record.imdb_rating,
        "title": record.title,
        "description": record.description,
        "genre": record.genres,
        "director": record.director,
        "actors_names": record.actors_names,
        "writers_names": record.writers_names,
        "actors": record.actors,
        "writers": record.writers,
    })
}

fn persons_document(record: &FilmWorkPersons) -> (Uuid, Value) {
    let document = json!({
        "id": record.fw_id,
        "director": record.director,
        "actors_names": record.actors_names,
        "writers_names": record.writers_names,
        "actors": record.actors,
        "writers": record.writers,
    });
    (record.fw_id, document)
}

fn genres_document(record: &FilmWorkGenres) -> (Uuid, Value) {
    let document = json!({
        "id": record.fw_id,
        "genre": record.genres,
    });
    (record.fw_id, document)
}
