use chrono::{DateTime, Utc};
use model::Role;
use uuid::Uuid;

/// A hand-built `content` schema snapshot: enough of
/// `film_work`/`person`/`genre` and their join tables to drive the five
/// query templates without a live Postgres instance.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub film_works: Vec<FilmWorkRow>,
    pub persons: Vec<PersonRow>,
    pub genres: Vec<GenreRow>,
    pub person_film_work: Vec<PersonFilmWorkRow>,
    pub genre_film_work: Vec<GenreFilmWorkRow>,
}

#[derive(Debug, Clone)]
pub struct FilmWorkRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PersonRow {
    pub id: Uuid,
    pub full_name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GenreRow {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PersonFilmWorkRow {
    pub film_work_id: Uuid,
    pub person_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct GenreFilmWorkRow {
    pub film_work_id: Uuid,
    pub genre_id: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn film_work(mut self, id: Uuid, title: &str, updated_at: DateTime<Utc>) -> Self {
        self.film_works.push(FilmWorkRow {
            id,
            title: title.to_string(),
            description: None,
            rating: None,
            updated_at,
        });
        self
    }

    pub fn person(mut self, id: Uuid, full_name: &str, updated_at: DateTime<Utc>) -> Self {
        self.persons.push(PersonRow {
            id,
            full_name: full_name.to_string(),
            updated_at,
        });
        self
    }

    pub fn genre(mut self, id: Uuid, name: &str, updated_at: DateTime<Utc>) -> Self {
        self.genres.push(GenreRow {
            id,
            name: name.to_string(),
            updated_at,
        });
        self
    }

    pub fn cast(mut self, film_work_id: Uuid, person_id: Uuid, role: Role) -> Self {
        self.person_film_work.push(PersonFilmWorkRow {
            film_work_id,
            person_id,
            role,
        });
        self
    }

    pub fn genre_of(mut self, film_work_id: Uuid, genre_id: Uuid) -> Self {
        self.genre_film_work.push(GenreFilmWorkRow { film_work_id, genre_id });
        self
    }

    pub fn film_work_by_id(&self, id: Uuid) -> Option<&FilmWorkRow> {
        self.film_works.iter().find(|fw| fw.id == id)
    }

    pub fn names_by_role(&self, film_work_id: Uuid, role: Role) -> Vec<String> {
        let mut names: Vec<String> = self
            .person_film_work
            .iter()
            .filter(|pfw| pfw.film_work_id == film_work_id && pfw.role == role)
            .filter_map(|pfw| self.persons.iter().find(|p| p.id == pfw.person_id))
            .map(|p| p.full_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn people_by_role(&self, film_work_id: Uuid, role: Role) -> Vec<model::Person> {
        let mut people: Vec<model::Person> = self
            .person_film_work
            .iter()
            .filter(|pfw| pfw.film_work_id == film_work_id && pfw.role == role)
            .filter_map(|pfw| self.persons.iter().find(|p| p.id == pfw.person_id))
            .map(|p| model::Person {
                id: p.id,
                name: p.full_name.clone(),
            })
            .collect();
        people.sort_by_key(|p| p.id);
        people.dedup_by_key(|p| p.id);
        people
    }

    pub fn genre_names(&self, film_work_id: Uuid) -> Vec<String> {
        let mut names: Vec<String> = self
            .genre_film_work
            .iter()
            .filter(|gfw| gfw.film_work_id == film_work_id)
            .filter_map(|gfw| self.genres.iter().find(|g| g.id == gfw.genre_id))
            .map(|g| g.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn film_work_ids_for_person(&self, person_id: Uuid) -> Vec<Uuid> {
        self.person_film_work
            .iter()
            .filter(|pfw| pfw.person_id == person_id)
            .map(|pfw| pfw.film_work_id)
            .collect()
    }

    pub fn film_work_ids_for_genre(&self, genre_id: Uuid) -> Vec<Uuid> {
        self.genre_film_work
            .iter()
            .filter(|gfw| gfw.genre_id == genre_id)
            .map(|gfw| gfw.film_work_id)
            .collect()
    }
}
