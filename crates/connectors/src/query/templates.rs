use crate::query::entity::{Entity, RelatedEntity};
use crate::query::params::Param;
use chrono::{DateTime, Utc};
use model::CursorTieBreak;
use uuid::Uuid;

/// A query shape bound to its positional parameters. `name` is the
/// template's identity for logging, never the rendered SQL text itself —
/// bound values may include data the implementer doesn't want echoed
/// verbatim in logs.
pub struct BoundQuery {
    pub name: &'static str,
    pub sql: &'static str,
    pub params: Vec<Param>,
}

const FW_FULL_TIED: &str = "SELECT
    fw.id AS fw_id,
    fw.rating AS imdb_rating,
    fw.title,
    fw.description,
    fw.updated_at,
    ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL) AS genres,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'director') AS director,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'actor') AS actors_names,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'writer') AS writers_names,
    JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'actor') AS actors,
    JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'writer') AS writers
FROM content.film_work fw
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
WHERE (fw.updated_at, fw.id) > ($1, $2)
GROUP BY fw.id
ORDER BY fw.updated_at, fw.id
LIMIT $3";

const FW_FULL_UNTIED: &str = "SELECT
    fw.id AS fw_id,
    fw.rating AS imdb_rating,
    fw.title,
    fw.description,
    fw.updated_at,
    ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL) AS genres,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'director') AS director,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'actor') AS actors_names,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'writer') AS writers_names,
    JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'actor') AS actors,
    JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'writer') AS writers
FROM content.film_work fw
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
WHERE fw.updated_at > $1
GROUP BY fw.id
ORDER BY fw.updated_at
LIMIT $2";

/// Template 1: `fw_full` — the direct pipeline's full aggregation.
pub fn fw_full(
    tie_break: CursorTieBreak,
    after: DateTime<Utc>,
    after_id: Uuid,
    limit: i64,
) -> BoundQuery {
    match tie_break {
        CursorTieBreak::Id => BoundQuery {
            name: "fw_full",
            sql: FW_FULL_TIED,
            params: vec![
                Param::Timestamp(after),
                Param::Uuid(after_id),
                Param::Integer(limit),
            ],
        },
        CursorTieBreak::None => BoundQuery {
            name: "fw_full",
            sql: FW_FULL_UNTIED,
            params: vec![Param::Timestamp(after), Param::Integer(limit)],
        },
    }
}

/// Template 2: `fw_persons` — final aggregation for the via-person pipeline.
pub fn fw_persons(filmwork_ids: Vec<Uuid>) -> BoundQuery {
    BoundQuery {
        name: "fw_persons",
        sql: "SELECT
    fw.id AS fw_id,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'director') AS director,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'actor') AS actors_names,
    ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'writer') AS writers_names,
    JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'actor') AS actors,
    JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'writer') AS writers
FROM content.film_work fw
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
WHERE fw.id = ANY($1)
GROUP BY fw.id",
        params: vec![Param::UuidArray(filmwork_ids)],
    }
}

/// Template 3: `fw_genres` — final aggregation for the via-genre pipeline.
pub fn fw_genres(filmwork_ids: Vec<Uuid>) -> BoundQuery {
    BoundQuery {
        name: "fw_genres",
        sql: "SELECT
    fw.id AS fw_id,
    ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL) AS genres
FROM content.film_work fw
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
WHERE fw.id = ANY($1)
GROUP BY fw.id",
        params: vec![Param::UuidArray(filmwork_ids)],
    }
}

/// Template 4: `nested_pre(table)` — the Enricher's outer cursor-paged scan
/// of `person`/`genre`/`film_work`.
pub fn nested_pre(
    table: Entity,
    tie_break: CursorTieBreak,
    after: DateTime<Utc>,
    after_id: Uuid,
    limit: i64,
) -> BoundQuery {
    let (sql, params): (&'static str, Vec<Param>) = match (table, tie_break) {
        (Entity::Person, CursorTieBreak::Id) => (
            "SELECT id, updated_at FROM content.person WHERE (updated_at, id) > ($1, $2) ORDER BY updated_at, id LIMIT $3",
            vec![Param::Timestamp(after), Param::Uuid(after_id), Param::Integer(limit)],
        ),
        (Entity::Person, CursorTieBreak::None) => (
            "SELECT id, updated_at FROM content.person WHERE updated_at > $1 ORDER BY updated_at LIMIT $2",
            vec![Param::Timestamp(after), Param::Integer(limit)],
        ),
        (Entity::Genre, CursorTieBreak::Id) => (
            "SELECT id, updated_at FROM content.genre WHERE (updated_at, id) > ($1, $2) ORDER BY updated_at, id LIMIT $3",
            vec![Param::Timestamp(after), Param::Uuid(after_id), Param::Integer(limit)],
        ),
        (Entity::Genre, CursorTieBreak::None) => (
            "SELECT id, updated_at FROM content.genre WHERE updated_at > $1 ORDER BY updated_at LIMIT $2",
            vec![Param::Timestamp(after), Param::Integer(limit)],
        ),
        (Entity::FilmWork, CursorTieBreak::Id) => (
            "SELECT id, updated_at FROM content.film_work WHERE (updated_at, id) > ($1, $2) ORDER BY updated_at, id LIMIT $3",
            vec![Param::Timestamp(after), Param::Uuid(after_id), Param::Integer(limit)],
        ),
        (Entity::FilmWork, CursorTieBreak::None) => (
            "SELECT id, updated_at FROM content.film_work WHERE updated_at > $1 ORDER BY updated_at LIMIT $2",
            vec![Param::Timestamp(after), Param::Integer(limit)],
        ),
    };
    BoundQuery {
        name: "nested_pre",
        sql,
        params,
    }
}

/// Template 5: `nested_fw_ids(related_table, related_id)` — the Enricher's
/// inner, OFFSET-paged fan-out lookup.
pub fn nested_fw_ids(
    related: RelatedEntity,
    data_ids: Vec<Uuid>,
    limit: i64,
    offset: i64,
) -> BoundQuery {
    let sql = match related {
        RelatedEntity::Person => {
            "SELECT fw.id, fw.updated_at
FROM content.film_work fw
LEFT JOIN content.person_film_work rfw ON rfw.film_work_id = fw.id
WHERE rfw.person_id = ANY($1)
ORDER BY fw.updated_at
LIMIT $2 OFFSET $3"
        }
        RelatedEntity::Genre => {
            "SELECT fw.id, fw.updated_at
FROM content.film_work fw
LEFT JOIN content.genre_film_work rfw ON rfw.film_work_id = fw.id
WHERE rfw.genre_id = ANY($1)
ORDER BY fw.updated_at
LIMIT $2 OFFSET $3"
        }
    };
    BoundQuery {
        name: "nested_fw_ids",
        sql,
        params: vec![
            Param::UuidArray(data_ids),
            Param::Integer(limit),
            Param::Integer(offset),
        ],
    }
}
