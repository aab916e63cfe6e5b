use crate::fixture::Fixture;
use connectors::error::{ConnectorError, DbError};
use connectors::query::{BoundQuery, Param};
use connectors::row::{MockRow, MockValue, Row};
use connectors::DbSession;
use engine_core::retry::{BackoffPolicy, Fatal};
use std::sync::Mutex;
use uuid::Uuid;

/// An in-memory stand-in for [`PgSession`](connectors::PgSession), driven by
/// a [`Fixture`] instead of a live Postgres connection. Dispatches on
/// `BoundQuery::name` the same way the real templates are named, and sniffs
/// `BoundQuery::sql` for the table/relation a `nested_pre`/`nested_fw_ids`
/// call targets, since those two templates share one name across three
/// tables.
pub struct FakeSession {
    fixture: Fixture,
    backoff: BackoffPolicy,
    remaining_failures: Mutex<usize>,
}

impl FakeSession {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            backoff: BackoffPolicy::default(),
            remaining_failures: Mutex::new(0),
        }
    }

    /// The next `count` calls to [`query`](DbSession::query) fail with a
    /// retryable connector error before the underlying dispatch ever runs,
    /// simulating a connection drop mid-run.
    pub fn fail_next(self, count: usize) -> Self {
        *self.remaining_failures.lock().expect("poisoned") = count;
        self
    }

    fn try_query(&self, bound: &BoundQuery) -> Result<Vec<Row>, DbError> {
        let mut remaining = self.remaining_failures.lock().expect("poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(DbError::Connector(ConnectorError::InvalidUrl(
                "simulated connection drop".to_string(),
            )));
        }
        drop(remaining);
        Ok(dispatch(&self.fixture, bound))
    }
}

#[async_trait::async_trait]
impl DbSession for FakeSession {
    async fn query(&self, bound: &BoundQuery) -> Result<Vec<Row>, DbError> {
        self.backoff
            .run(|| async { self.try_query(bound) }, DbError::disposition)
            .await
            .map_err(|Fatal(err)| err)
    }
}

fn dispatch(fixture: &Fixture, bound: &BoundQuery) -> Vec<Row> {
    match bound.name {
        "fw_full" => fw_full_rows(fixture, bound),
        "nested_pre" => nested_pre_rows(fixture, bound),
        "nested_fw_ids" => nested_fw_ids_rows(fixture, bound),
        "fw_persons" => fw_persons_rows(fixture, bound),
        "fw_genres" => fw_genres_rows(fixture, bound),
        other => panic!("FakeSession: unrecognized query template {other}"),
    }
}

/// Pulls `(after, after_id, limit)` out of a tied cursor's bound params,
/// or `(after, None, limit)` out of an untied one.
fn cursor_params(params: &[Param]) -> (chrono::DateTime<chrono::Utc>, Option<Uuid>, i64) {
    match params {
        [Param::Timestamp(after), Param::Uuid(after_id), Param::Integer(limit)] => {
            (*after, Some(*after_id), *limit)
        }
        [Param::Timestamp(after), Param::Integer(limit)] => (*after, None, *limit),
        other => panic!("unexpected cursor params shape: {other:?}"),
    }
}

fn after_cursor(updated_at: chrono::DateTime<chrono::Utc>, id: Uuid, after: chrono::DateTime<chrono::Utc>, after_id: Option<Uuid>) -> bool {
    match after_id {
        Some(after_id) => (updated_at, id) > (after, after_id),
        None => updated_at > after,
    }
}

fn fw_full_rows(fixture: &Fixture, bound: &BoundQuery) -> Vec<Row> {
    let (after, after_id, limit) = cursor_params(&bound.params);
    let mut rows: Vec<_> = fixture
        .film_works
        .iter()
        .filter(|fw| after_cursor(fw.updated_at, fw.id, after, after_id))
        .collect();
    rows.sort_by_key(|fw| (fw.updated_at, fw.id));
    rows.truncate(limit as usize);

    rows.into_iter()
        .map(|fw| {
            let mock = MockRow::new()
                .with("fw_id", MockValue::Uuid(fw.id))
                .with("title", MockValue::Str(fw.title.clone()))
                .with("updated_at", MockValue::Timestamp(fw.updated_at))
                .with("genres", MockValue::StrList(fixture.genre_names(fw.id)))
                .with("director", MockValue::StrList(fixture.names_by_role(fw.id, model::Role::Director)))
                .with("actors_names", MockValue::StrList(fixture.names_by_role(fw.id, model::Role::Actor)))
                .with("writers_names", MockValue::StrList(fixture.names_by_role(fw.id, model::Role::Writer)))
                .with("actors", MockValue::People(fixture.people_by_role(fw.id, model::Role::Actor)))
                .with("writers", MockValue::People(fixture.people_by_role(fw.id, model::Role::Writer)));
            let mock = match fw.description.clone() {
                Some(description) => mock.with("description", MockValue::Str(description)),
                None => mock,
            };
            let mock = match fw.rating {
                Some(rating) => mock.with("imdb_rating", MockValue::F64(rating)),
                None => mock,
            };
            Row::Mock(mock)
        })
        .collect()
}

fn nested_pre_rows(fixture: &Fixture, bound: &BoundQuery) -> Vec<Row> {
    let (after, after_id, limit) = cursor_params(&bound.params);

    let mut rows: Vec<(Uuid, chrono::DateTime<chrono::Utc>)> = if bound.sql.contains("content.person") {
        fixture.persons.iter().map(|p| (p.id, p.updated_at)).collect()
    } else if bound.sql.contains("content.genre") {
        fixture.genres.iter().map(|g| (g.id, g.updated_at)).collect()
    } else if bound.sql.contains("content.film_work") {
        fixture.film_works.iter().map(|fw| (fw.id, fw.updated_at)).collect()
    } else {
        panic!("nested_pre: could not determine target table from sql");
    };

    rows.retain(|(id, updated_at)| after_cursor(*updated_at, *id, after, after_id));
    rows.sort_by_key(|(id, updated_at)| (*updated_at, *id));
    rows.truncate(limit as usize);

    rows.into_iter()
        .map(|(id, updated_at)| {
            Row::Mock(
                MockRow::new()
                    .with("id", MockValue::Uuid(id))
                    .with("updated_at", MockValue::Timestamp(updated_at)),
            )
        })
        .collect()
}

fn nested_fw_ids_rows(fixture: &Fixture, bound: &BoundQuery) -> Vec<Row> {
    let (data_ids, limit, offset) = match &bound.params[..] {
        [Param::UuidArray(ids), Param::Integer(limit), Param::Integer(offset)] => {
            (ids.clone(), *limit, *offset)
        }
        other => panic!("unexpected nested_fw_ids params shape: {other:?}"),
    };

    let via_person = bound.sql.contains("person_id");
    let mut film_work_ids: Vec<Uuid> = data_ids
        .into_iter()
        .flat_map(|id| {
            if via_person {
                fixture.film_work_ids_for_person(id)
            } else {
                fixture.film_work_ids_for_genre(id)
            }
        })
        .collect();
    film_work_ids.sort();
    film_work_ids.dedup();

    let mut rows: Vec<(Uuid, chrono::DateTime<chrono::Utc>)> = film_work_ids
        .into_iter()
        .filter_map(|id| fixture.film_work_by_id(id).map(|fw| (id, fw.updated_at)))
        .collect();
    rows.sort_by_key(|(_, updated_at)| *updated_at);

    let start = offset.max(0) as usize;
    let end = (start + limit.max(0) as usize).min(rows.len());
    let page = if start < rows.len() { &rows[start..end] } else { &[] };

    page.iter()
        .map(|(id, updated_at)| {
            Row::Mock(
                MockRow::new()
                    .with("id", MockValue::Uuid(*id))
                    .with("updated_at", MockValue::Timestamp(*updated_at)),
            )
        })
        .collect()
}

fn fw_persons_rows(fixture: &Fixture, bound: &BoundQuery) -> Vec<Row> {
    let ids = uuid_array_param(bound);
    ids.into_iter()
        .filter(|id| fixture.film_work_by_id(*id).is_some())
        .map(|id| {
            Row::Mock(
                MockRow::new()
                    .with("fw_id", MockValue::Uuid(id))
                    .with("director", MockValue::StrList(fixture.names_by_role(id, model::Role::Director)))
                    .with("actors_names", MockValue::StrList(fixture.names_by_role(id, model::Role::Actor)))
                    .with("writers_names", MockValue::StrList(fixture.names_by_role(id, model::Role::Writer)))
                    .with("actors", MockValue::People(fixture.people_by_role(id, model::Role::Actor)))
                    .with("writers", MockValue::People(fixture.people_by_role(id, model::Role::Writer))),
            )
        })
        .collect()
}

fn fw_genres_rows(fixture: &Fixture, bound: &BoundQuery) -> Vec<Row> {
    let ids = uuid_array_param(bound);
    ids.into_iter()
        .filter(|id| fixture.film_work_by_id(*id).is_some())
        .map(|id| {
            Row::Mock(
                MockRow::new()
                    .with("fw_id", MockValue::Uuid(id))
                    .with("genres", MockValue::StrList(fixture.genre_names(id))),
            )
        })
        .collect()
}

fn uuid_array_param(bound: &BoundQuery) -> Vec<Uuid> {
    match &bound.params[..] {
        [Param::UuidArray(ids)] => ids.clone(),
        other => panic!("expected a single UuidArray param, got {other:?}"),
    }
}
