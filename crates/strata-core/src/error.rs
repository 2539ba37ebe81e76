use thiserror::Error;

/// Error type shared across Strata crates.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Data or resource problem, tagged with the file, dataset or
    /// distribution spec that caused it.
    #[error("configuration error in {resource}: {message}")]
    Configuration { resource: String, message: String },
    /// The caller passed an argument the operation cannot honor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The strategy does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// Lifecycle violation (generate before init, use after close).
    #[error("illegal state: {0}")]
    IllegalState(String),
    /// Reading a resource failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub fn configuration(resource: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Configuration {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        GenerationError::Io {
            path: path.into(),
            source,
        }
    }

    /// Resource identifier carried by data errors, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            GenerationError::Configuration { resource, .. } => Some(resource.as_str()),
            GenerationError::Io { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }
}

/// Convenience alias for results returned by Strata crates.
pub type Result<T> = std::result::Result<T, GenerationError>;
