use connectors::DbSession;
use connectors::query::BoundQuery;
use connectors::row::Row;
use engine_core::error::PipelineError;
use model::ValidationError;

/// Executes `bound` against `session` and projects every returned row,
/// the operation every stage composes over instead of inheriting a shared
/// base class: Producer, Enricher, and Merger all bottom out here,
/// differing only in how they build `bound` and advance their own state
/// between calls.
pub async fn execute<R>(
    session: &dyn DbSession,
    bound: BoundQuery,
    project: impl Fn(&Row) -> Result<R, ValidationError>,
) -> Result<Vec<R>, PipelineError> {
    let query_name = bound.name;
    let rows = session
        .query(&bound)
        .await
        .map_err(|err| PipelineError::Sql {
            query: query_name,
            source: Box::new(err),
        })?;
    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(project(row)?);
    }
    Ok(records)
}
