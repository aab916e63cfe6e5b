use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal projection used as a Producer/Enricher paging cursor anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRecord {
    pub id: Uuid,
    pub updated_at: DateTime<Utc>,
}

/// Exposes the `(id, updated_at)` pair a Producer advances its cursor by,
/// regardless of how much else the record carries.
pub trait CursorAnchor {
    fn id(&self) -> Uuid;
    fn updated_at(&self) -> DateTime<Utc>;
}

impl CursorAnchor for BaseRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A person as carried inside `actors`/`writers` id+name lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
}

/// The full denormalized film_work document produced by the direct
/// pipeline (`fw_full`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmWork {
    pub id: Uuid,
    pub imdb_rating: Option<f64>,
    pub title: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub genres: Vec<String>,
    pub director: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub actors: Vec<Person>,
    pub writers: Vec<Person>,
}

impl FilmWork {
    /// NOT NULL fields this record requires: `id` and `title`. Everything
    /// else (rating, description, the aggregated lists) may legitimately
    /// be empty/null for a film_work with no genres, cast, or crew.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::new("FilmWork", "title"));
        }
        Ok(())
    }
}

impl CursorAnchor for FilmWork {
    fn id(&self) -> Uuid {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Partial document carrying only person-related fields, produced by the
/// via-person pipeline's final aggregation (`fw_persons`). Does not
/// include `genres` — this and the genre-fan-out document below are
/// partial upserts, not full replacements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmWorkPersons {
    pub fw_id: Uuid,
    pub director: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub actors: Vec<Person>,
    pub writers: Vec<Person>,
}

/// Partial document carrying only `{ fw_id, genres }`, produced by the
/// via-genre pipeline's final aggregation (`fw_genres`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmWorkGenres {
    pub fw_id: Uuid,
    pub genres: Vec<String>,
}

/// Projects a raw row into a typed record, or a [`ValidationError`] naming
/// the field that failed a NOT NULL check.
///
/// An explicit, per-query mapper bound to the query template, rather than
/// a generic reflection-based constructor that splats a row into a record
/// by keyword.
pub trait RowProjection: Sized {
    fn record_name() -> &'static str;
}

impl RowProjection for BaseRecord {
    fn record_name() -> &'static str {
        "BaseRecord"
    }
}

impl RowProjection for FilmWork {
    fn record_name() -> &'static str {
        "FilmWork"
    }
}

impl RowProjection for FilmWorkPersons {
    fn record_name() -> &'static str {
        "FilmWorkPersons"
    }
}

impl RowProjection for FilmWorkGenres {
    fn record_name() -> &'static str {
        "FilmWorkGenres"
    }
}
