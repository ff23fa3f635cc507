use std::path::PathBuf;

use kinetic_core::CoreError;

/// Failures of the on-disk asset store and renderer hand-off.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid asset id '{0}'")]
    InvalidId(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize render config: {0}")]
    Serialize(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Errors that end a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The script failed pre-flight checks. Nothing was generated.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An asset could not be generated after the retry policy gave up.
    #[error("Failed to generate {asset_id}: {cause}")]
    Generation { asset_id: String, cause: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Json(e) => Self::Validation(e.to_string()),
            CoreError::Io { path, source } => Self::Persistence(StoreError::Io { path, source }),
        }
    }
}
