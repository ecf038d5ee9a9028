use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecallError {
    /// Primary tier has no room for the entry even after eviction
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Both storage tiers rejected the write
    #[error("Storage write failed for '{key}': primary: {primary}; fallback: {fallback}")]
    WriteFailed {
        key: String,
        primary: String,
        fallback: String,
    },

    /// The host context (background side of the messaging surface) is gone
    #[error("Extension context invalidated")]
    ContextInvalidated,

    /// A request over the messaging surface came back with success=false
    #[error("Messaging request '{action}' failed: {message}")]
    Messaging { action: String, message: String },

    /// A form index that is not part of the tracked form set
    #[error("No tracked form at index {0}")]
    UnknownForm(usize),

    #[error("No field named '{0}'")]
    UnknownField(String),

    #[error("Invalid page URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML error ({context}): {source}")]
    Yaml {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl RecallError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RecallError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        RecallError::Json {
            context: context.into(),
            source,
        }
    }

    pub fn yaml(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        RecallError::Yaml {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecallError>;
