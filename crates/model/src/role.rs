use std::fmt;

/// A `person_film_work.role` value. The closed set of roles this system
/// understands; anything else in the table is simply not aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Director,
    Actor,
    Writer,
}

impl Role {
    /// The literal stored in `person_film_work.role`.
    pub fn as_sql_literal(&self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::Actor => "actor",
            Role::Writer => "writer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql_literal())
    }
}
