/// The closed set of tables `nested_pre` may page over. Modeled as a Rust
/// enum rather than an interpolated table-name string, so an unrecognized
/// table can never reach `templates::nested_pre` in the first place — the
/// driver only ever constructs a literal variant, never parses one from a
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Person,
    Genre,
    FilmWork,
}

/// The closed mapping `nested_fw_ids` joins through: `person` →
/// (`person_film_work`, `person_id`), `genre` → (`genre_film_work`,
/// `genre_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedEntity {
    Person,
    Genre,
}
