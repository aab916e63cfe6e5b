pub mod cursor;
pub mod error;
pub mod record;
pub mod role;

pub use cursor::{Cursor, CursorTieBreak};
pub use error::ValidationError;
pub use record::{BaseRecord, CursorAnchor, FilmWork, FilmWorkGenres, FilmWorkPersons, Person, RowProjection};
pub use role::Role;
