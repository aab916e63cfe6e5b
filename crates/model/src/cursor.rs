use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a [`Cursor`] breaks ties between rows that share the same
/// `updated_at` value.
///
/// `None` is a strict `updated_at > :cursor` predicate with no secondary
/// key, which silently drops all-but-one row of a tied batch once the
/// first is consumed. `Id` is the recommended fix — a `(updated_at, id)`
/// tuple cursor that never loses a tied row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorTieBreak {
    None,
    #[default]
    Id,
}

/// The paging cursor a Producer/Enricher advances by value.
///
/// `id` is only meaningful when `tie_break` is `Id`; it is the id of the
/// last row consumed at `updated_at`, used to break ties deterministically
/// instead of skipping them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub updated_at: DateTime<Utc>,
    pub id: Option<Uuid>,
}

impl Cursor {
    /// The cursor before any row has ever been seen.
    pub fn epoch() -> Self {
        Self {
            updated_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            id: None,
        }
    }

    pub fn new(updated_at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            updated_at,
            id: Some(id),
        }
    }

    /// Advance the cursor to the last record of a freshly fetched batch.
    pub fn advance(&mut self, updated_at: DateTime<Utc>, id: Uuid) {
        self.updated_at = updated_at;
        self.id = Some(id);
    }
}
