use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipescopeError {
    #[error("API request failed with status {status}: {context}")]
    Api { status: u16, context: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, PipescopeError>;
