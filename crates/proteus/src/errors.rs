use thiserror::Error;

/// Failures talking to an upstream collaborator (LLM runtime, vector store, search engine).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{service} is unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} returned {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },
}

impl ClientError {
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout { service }
        } else if err.is_decode() {
            ClientError::InvalidResponse {
                service,
                reason: err.to_string(),
            }
        } else {
            ClientError::Unavailable {
                service,
                reason: err.to_string(),
            }
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            ClientError::Unavailable { service, .. }
            | ClientError::Timeout { service }
            | ClientError::Http { service, .. }
            | ClientError::InvalidResponse { service, .. } => service,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
