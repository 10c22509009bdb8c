use serde::{Deserialize, Serialize};

/// Request payload for the ask endpoint
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

/// Response payload for the ask endpoint
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Response payload for the health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Service is healthy".to_string(),
        }
    }
}

impl AskRequest {
    /// The question with surrounding whitespace removed, if one was supplied
    /// and is not blank.
    pub fn trimmed_question(&self) -> Option<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

impl AskResponse {
    pub fn new(answer: String) -> Self {
        Self { answer }
    }
}
