use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {source}\n  body: {body}")]
    Parse {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Empty response from model (finish reason: {0})")]
    EmptyResponse(String),

    #[error("API key is empty")]
    MissingApiKey,
}
