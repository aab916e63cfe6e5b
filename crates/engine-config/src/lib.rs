pub mod config;
pub mod error;

pub use config::{BackoffConfig, Config, ElasticConfig, PgDatabaseConfig, SqlSettings};
pub use error::ConfigError;
