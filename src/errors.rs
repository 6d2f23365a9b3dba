use thiserror::Error;

/// Everything that can go wrong while asking the remote model for an answer.
///
/// None of these reach the person typing: the resolver downgrades every variant
/// to the local advice table.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("No inference credential configured")]
    MissingCredential,
    #[error("Request to inference endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Inference request timed out")]
    Timeout,
    #[error("Inference endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected inference payload: {0}")]
    Format(String),
    #[error("Inference endpoint reported an error: {0}")]
    Api(String),
}

impl InferenceError {
    /// Short machine-friendly label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::MissingCredential => "configuration",
            InferenceError::Transport(_) | InferenceError::Timeout | InferenceError::Status { .. } => "transport",
            InferenceError::Format(_) => "format",
            InferenceError::Api(_) => "api",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A request is already being processed")]
    Busy,
    #[error("No suggestion at index {0}")]
    UnknownSuggestion(usize),
}
