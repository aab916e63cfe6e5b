use engine_core::{error::PipelineError, state::StateStoreError};
use engine_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("cursor state error: {0}")]
    State(#[from] StateStoreError),
}
