use std::io;

use chipforge_core::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed feature document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feature '{feature}': {source}")]
    Feature {
        feature: String,
        #[source]
        source: TemplateError,
    },

    #[error("Unsupported document version '{0}'")]
    UnsupportedVersion(String),
}

pub type IoResult<T> = Result<T, IoError>;
