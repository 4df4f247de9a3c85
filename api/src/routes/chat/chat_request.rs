use serde::{Deserialize, Serialize};

/// Request payload for /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Natural language question about Indian agriculture.
    pub question: String,
}

/// Response payload for /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Final model answer (plain text).
    pub answer: String,
    /// Model label, general knowledge, then any cited datasets.
    pub sources: Vec<String>,
}
