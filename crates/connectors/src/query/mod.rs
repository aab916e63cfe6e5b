pub mod entity;
pub mod params;
pub mod templates;

pub use entity::{Entity, RelatedEntity};
pub use params::Param;
pub use templates::{BoundQuery, fw_full, fw_genres, fw_persons, nested_fw_ids, nested_pre};
