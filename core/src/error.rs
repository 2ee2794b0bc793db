use std::path::PathBuf;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("engine failed to start at {url}: {reason}")]
    Start { url: String, reason: String },
    #[error("no element matches selector {0}")]
    NoSuchElement(String),
    #[error("no link labelled '{0}'")]
    NoSuchLabel(String),
    #[error("failed to capture {path:?}: {reason}")]
    Capture { path: PathBuf, reason: String },
    #[error("{0}")]
    Other(String),
}

/// Failure value returned by a step callback. The executor downgrades it to a
/// reported assertion failure; it never aborts the pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
    #[error("Expected {expected} but got {found}")]
    Mismatch { expected: String, found: String },
    #[error("{0}")]
    Assertion(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, thiserror::Error)]
pub enum BddError {
    #[error("no scenario named '{0}' has been defined")]
    UnknownScenario(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid scenario document: {0}")]
    Document(String),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
