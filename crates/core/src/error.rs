use crate::config::ConfigError;
use pageview_render::EngineError;

/// Errors that can occur while opening or driving a document session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Invalid page: {0}")]
    InvalidPage(usize),

    #[error("Failed to start render worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type SessionResult<T> = Result<T, SessionError>;
