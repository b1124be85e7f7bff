//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template failed to parse or to render
    #[error("Template error: {0}")]
    Tera(String),

    /// Embedded template is not valid UTF-8
    #[error("Template {0} is not valid UTF-8")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
