use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("response is not a valid rate snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected snapshot shape: {0}")]
    DataShape(String),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl PipelineError {
    /// Process exit code for an error that escaped the pipeline.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Configuration(_) | PipelineError::InvalidTimezone(_) => 2,
            PipelineError::Decode(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
