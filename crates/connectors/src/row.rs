use chrono::{DateTime, Utc};
use model::{BaseRecord, FilmWork, FilmWorkGenres, FilmWorkPersons, Person, ValidationError};
use std::collections::HashMap;
use tokio_postgres::types::Json;
use uuid::Uuid;

/// One materialized result row, from either the real driver or an
/// in-memory fixture. Rows are mapping-like so they can be splatted into
/// typed records by field name. `engine-processing`'s projection
/// functions below are generic over this instead of `tokio_postgres::Row`
/// directly so the extraction layer — the seam between pipeline logic and
/// I/O — can be driven by a fixed in-memory dataset in tests, since
/// `tokio_postgres::Row` only comes from a live connection and cannot be
/// constructed by hand.
pub enum Row {
    Postgres(tokio_postgres::Row),
    Mock(MockRow),
}

impl Row {
    pub fn postgres(row: tokio_postgres::Row) -> Self {
        Row::Postgres(row)
    }
}

/// A hand-built row for fixture data, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct MockRow(HashMap<&'static str, MockValue>);

#[derive(Debug, Clone)]
pub enum MockValue {
    Uuid(Uuid),
    F64(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
    StrList(Vec<String>),
    People(Vec<Person>),
}

impl MockRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &'static str, value: MockValue) -> Self {
        self.0.insert(field, value);
        self
    }
}

/// Decodes one column into `Self`, either via the driver's `FromSql` or via
/// a [`MockValue`] fixture. Implemented for exactly the column types the
/// five query templates ever project.
trait FromRowField: Sized {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error>;
    fn from_mock(row: &MockRow, field: &str) -> Option<Self>;
}

impl FromRowField for Uuid {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        match row.0.get(field) {
            Some(MockValue::Uuid(v)) => Some(*v),
            _ => None,
        }
    }
}

impl FromRowField for DateTime<Utc> {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        match row.0.get(field) {
            Some(MockValue::Timestamp(v)) => Some(*v),
            _ => None,
        }
    }
}

impl FromRowField for String {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        match row.0.get(field) {
            Some(MockValue::Str(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromRowField for f64 {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        match row.0.get(field) {
            Some(MockValue::F64(v)) => Some(*v),
            _ => None,
        }
    }
}

impl FromRowField for Vec<String> {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        match row.0.get(field) {
            Some(MockValue::StrList(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromRowField for Json<Vec<Person>> {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        match row.0.get(field) {
            Some(MockValue::People(v)) => Some(Json(v.clone())),
            _ => None,
        }
    }
}

/// `NULL` and "no such column" both decode to `None` — the column being
/// absent from a fixture row is exactly how an optional field is expressed.
impl<T: FromRowField> FromRowField for Option<T> {
    fn from_pg(row: &tokio_postgres::Row, field: &str) -> Result<Self, tokio_postgres::Error> {
        row.try_get(field)
    }

    fn from_mock(row: &MockRow, field: &str) -> Option<Self> {
        Some(T::from_mock(row, field))
    }
}

/// Fetches and decodes column `field` on `row`, turning any failure
/// (missing column, NULL in a NOT NULL slot, wrong wire type) into a
/// [`ValidationError`] naming `record` and `field`.
fn get<T: FromRowField>(row: &Row, record: &'static str, field: &'static str) -> Result<T, ValidationError> {
    match row {
        Row::Postgres(row) => T::from_pg(row, field).map_err(|_| ValidationError::new(record, field)),
        Row::Mock(row) => T::from_mock(row, field).ok_or_else(|| ValidationError::new(record, field)),
    }
}

/// `ARRAY_AGG(...) FILTER (...)` is NULL, not an empty array, when no row
/// matches the filter. That is not a missing-data error here, it is an
/// empty collection.
fn get_agg_list(row: &Row, record: &'static str, field: &'static str) -> Result<Vec<String>, ValidationError> {
    let value: Option<Vec<String>> = get(row, record, field)?;
    Ok(value.unwrap_or_default())
}

fn get_agg_people(row: &Row, record: &'static str, field: &'static str) -> Result<Vec<Person>, ValidationError> {
    let value: Option<Json<Vec<Person>>> = get(row, record, field)?;
    Ok(value.map(|Json(people)| people).unwrap_or_default())
}

pub fn project_base_record(row: &Row) -> Result<BaseRecord, ValidationError> {
    Ok(BaseRecord {
        id: get(row, "BaseRecord", "id")?,
        updated_at: get(row, "BaseRecord", "updated_at")?,
    })
}

/// Projects one row of `fw_full` into a [`FilmWork`], then runs its
/// required-field check.
pub fn project_film_work(row: &Row) -> Result<FilmWork, ValidationError> {
    let record = FilmWork {
        id: get(row, "FilmWork", "fw_id")?,
        imdb_rating: get(row, "FilmWork", "imdb_rating")?,
        title: get(row, "FilmWork", "title")?,
        description: get(row, "FilmWork", "description")?,
        updated_at: get(row, "FilmWork", "updated_at")?,
        genres: get_agg_list(row, "FilmWork", "genres")?,
        director: get_agg_list(row, "FilmWork", "director")?,
        actors_names: get_agg_list(row, "FilmWork", "actors_names")?,
        writers_names: get_agg_list(row, "FilmWork", "writers_names")?,
        actors: get_agg_people(row, "FilmWork", "actors")?,
        writers: get_agg_people(row, "FilmWork", "writers")?,
    };
    record
        .validate()
        .map_err(|_| ValidationError::new("FilmWork", "title"))?;
    Ok(record)
}

pub fn project_film_work_persons(row: &Row) -> Result<FilmWorkPersons, ValidationError> {
    Ok(FilmWorkPersons {
        fw_id: get(row, "FilmWorkPersons", "fw_id")?,
        director: get_agg_list(row, "FilmWorkPersons", "director")?,
        actors_names: get_agg_list(row, "FilmWorkPersons", "actors_names")?,
        writers_names: get_agg_list(row, "FilmWorkPersons", "writers_names")?,
        actors: get_agg_people(row, "FilmWorkPersons", "actors")?,
        writers: get_agg_people(row, "FilmWorkPersons", "writers")?,
    })
}

pub fn project_film_work_genres(row: &Row) -> Result<FilmWorkGenres, ValidationError> {
    Ok(FilmWorkGenres {
        fw_id: get(row, "FilmWorkGenres", "fw_id")?,
        genres: get_agg_list(row, "FilmWorkGenres", "genres")?,
    })
}
