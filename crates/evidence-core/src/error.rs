use thiserror::Error;

/// Errors raised while building or querying the per-claim indexes
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Keyword index error: {0}")]
    Keyword(#[from] tantivy::TantivyError),

    #[error("Invalid tokenizer pattern: {0}")]
    Tokenizer(String),

    #[error("Vector index error: {0}")]
    Vector(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised by the model services (embedding, cross-encoder, NLI)
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model file not found: {0}")]
    MissingFile(String),

    #[error("Failed to resolve model '{repo}' from the hub: {message}")]
    Hub { repo: String, message: String },

    #[error("Invalid model config: {0}")]
    Config(String),

    #[error("Tokenization failed: {0}")]
    Tokenizer(String),

    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Unexpected model output: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while fetching a page for enrichment
///
/// These never reach the caller of the pipeline; the enrichment stage
/// converts every variant into "no text".
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Empty URL")]
    EmptyUrl,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Non-text content type: {0}")]
    ContentType(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("No extractable text")]
    NoText,
}

/// Fatal pipeline errors surfaced to the caller
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = EvidenceError> = std::result::Result<T, E>;
