//! HTTP client for the note generation endpoint.
//!
//! [`NotesClient::request_note`] never fails: transport errors, error
//! responses and undecodable bodies all come back as a failed
//! [`GenerationResult`] carrying a message.

use reqwest::Client;
use serde::Deserialize;

use crate::models::{GenerationRequest, GenerationResult, NoteType};

const GENERATE_PATH: &str = "/api/ai/generate";
const FALLBACK_ERROR: &str = "Failed to generate note";

const GENERAL_SUGGESTIONS: &[&str] = &[
    "Write a summary about...",
    "Create notes about...",
    "Explain the concept of...",
    "List the key points of...",
];

const MEETING_SUGGESTIONS: &[&str] = &[
    "Meeting notes for [topic]",
    "Summarize the discussion about...",
    "Key decisions from [meeting name]",
    "Action items from the meeting on...",
];

const STUDY_SUGGESTIONS: &[&str] = &[
    "Study notes for [subject]",
    "Key concepts in [topic]",
    "Summary of [chapter/topic]",
    "Important points about...",
];

const IDEA_SUGGESTIONS: &[&str] = &[
    "Develop an idea about...",
    "Brainstorm solutions for...",
    "Explore the concept of...",
    "Expand on the idea of...",
];

const JOURNAL_SUGGESTIONS: &[&str] = &[
    "Reflect on...",
    "Write about my thoughts on...",
    "Journal entry about...",
    "Personal insights on...",
];

/// Example prompts shown for a note type, in display order.
pub fn suggestions_for(note_type: NoteType) -> &'static [&'static str] {
    match note_type {
        NoteType::General => GENERAL_SUGGESTIONS,
        NoteType::Meeting => MEETING_SUGGESTIONS,
        NoteType::Study => STUDY_SUGGESTIONS,
        NoteType::Idea => IDEA_SUGGESTIONS,
        NoteType::Journal => JOURNAL_SUGGESTIONS,
    }
}

/// Like [`suggestions_for`], keyed by wire tag; unknown tags get the general list.
pub fn suggestions_for_tag(tag: &str) -> &'static [&'static str] {
    suggestions_for(NoteType::from_tag(tag))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotesClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl NotesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[tracing::instrument(skip(self, prompt), fields(note_type = %note_type))]
    pub async fn request_note(&self, prompt: &str, note_type: NoteType) -> GenerationResult {
        match self.send(&GenerationRequest::new(prompt, note_type)).await {
            Ok(result) => result,
            Err(message) => {
                tracing::warn!(error = %message, "Note generation request failed");
                GenerationResult::failure(message)
            }
        }
    }

    async fn send(&self, request: &GenerationRequest) -> Result<GenerationResult, String> {
        let mut builder = self
            .client
            .post(format!("{}{}", self.base_url, GENERATE_PATH))
            .json(request);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| FALLBACK_ERROR.to_string());
            return Err(message);
        }

        serde_json::from_slice::<GenerationResult>(&body).map_err(|e| e.to_string())
    }
}
