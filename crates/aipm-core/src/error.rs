use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AipmError {
    #[error(
        "invalid identifier '{0}': must be kebab-case (lowercase letters, digits, hyphens; \
         starting with a letter), e.g. user-auth, payment-v2"
    )]
    InvalidIdentifier(String),

    #[error("document has no frontmatter: it must start with a '---' line")]
    MissingFrontmatter,

    #[error("frontmatter format error: missing closing '---' line")]
    MalformedFrontmatter,

    #[error("missing required frontmatter field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("file operation failed on {}: {source}", path.display())]
    FileOperation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("preconditions not met for step '{0}'")]
    Precondition(String),

    #[error("post-processing failed for step '{0}'")]
    PostProcess(String),

    #[error("missing required configuration: {0}")]
    MissingConfig(String),

    #[error("no local task file found for issue #{0}")]
    TaskNotFound(u64),

    #[error("tasks still open: {}", .0.join(", "))]
    OpenTasks(Vec<String>),

    #[error("input closed while waiting for: {0}")]
    InputClosed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AipmError {
    pub fn external(service: impl Into<String>, message: impl ToString) -> Self {
        AipmError::ExternalService {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AipmError>;
