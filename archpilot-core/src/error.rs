#[derive(Debug, thiserror::Error)]
pub enum ArchError {
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Planning error: missing prerequisite '{missing}': {detail}")]
    Planning { missing: String, detail: String },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ArchError {
    pub fn planning(missing: impl Into<String>, detail: impl Into<String>) -> Self {
        ArchError::Planning { missing: missing.into(), detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, ArchError>;
