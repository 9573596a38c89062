use thiserror::Error;

/// Failures surfaced by schemas, templates and the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Missing parameter '{0}'")]
    MissingParameter(String),

    #[error("Parameter '{name}' must be a {expected}")]
    ParameterType { name: String, expected: &'static str },

    #[error("Layer '{0}' is not drawn by this template")]
    UnsupportedLayer(String),

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("No template registered as '{0}'")]
    UnknownTemplate(String),

    #[error("Template '{0}' is already registered")]
    DuplicateTemplate(String),

    #[error("Invalid schema for '{template}': {message}")]
    InvalidSchema { template: String, message: String },
}

pub type TemplateResult<T> = Result<T, TemplateError>;
