//! Error types for the CV generation pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while turning CV data into a PDF.
#[derive(Debug, Error)]
pub enum CvError {
    /// The JSON data file does not exist.
    #[error("data file not found: {}", .0.display())]
    DataNotFound(PathBuf),

    /// The template file does not exist or the loader cannot resolve it.
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// IO error reading an input or writing an output.
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file is not well-formed JSON.
    #[error("invalid JSON in {}: {}", .path.display(), .source)]
    DataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The data file parsed, but its top level is not an object.
    #[error("data file must contain a JSON object at the top level")]
    DataRoot,

    /// Template syntax error or a failed include.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The HTML → PDF conversion failed.
    #[error("conversion failed: {0}")]
    Conversion(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, CvError>;
