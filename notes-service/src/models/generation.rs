//! Transient request/result types for AI-drafted notes.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Style of note the model is asked to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    General,
    Meeting,
    Study,
    Idea,
    Journal,
}

impl NoteType {
    pub const ALL: [NoteType; 5] = [
        NoteType::General,
        NoteType::Meeting,
        NoteType::Study,
        NoteType::Idea,
        NoteType::Journal,
    ];

    /// Parse a wire tag. Unknown tags are treated as `General`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "meeting" => NoteType::Meeting,
            "study" => NoteType::Study,
            "idea" => NoteType::Idea,
            "journal" => NoteType::Journal,
            _ => NoteType::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::General => "general",
            NoteType::Meeting => "meeting",
            NoteType::Study => "study",
            NoteType::Idea => "idea",
            NoteType::Journal => "journal",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Lenient: `null`, non-string values and unknown tags all mean `General`.
impl<'de> Deserialize<'de> for NoteType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(NoteType::from_tag).unwrap_or_default())
    }
}

/// A single generation request. Wire form: `{prompt, type?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, note_type: NoteType) -> Self {
        Self {
            prompt: prompt.into(),
            note_type,
        }
    }
}

/// Token counters reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounts {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Uniform outcome of a generation call as seen by callers.
///
/// `success` implies `error` is `None`; failure implies an empty
/// `generated_text`. Use the constructors to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default)]
    pub generated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn success(generated_text: String, usage: Option<UsageCounts>) -> Self {
        Self {
            success: true,
            generated_text,
            usage,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            generated_text: String::new(),
            usage: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_and_missing_tags_fall_back_to_general() {
        assert_eq!(NoteType::from_tag("recipe"), NoteType::General);
        assert_eq!(NoteType::from_tag(""), NoteType::General);
        assert_eq!(NoteType::from_tag(" Meeting "), NoteType::Meeting);

        let parsed: NoteType = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(parsed, NoteType::General);
        let parsed: NoteType = serde_json::from_value(json!("poem")).unwrap();
        assert_eq!(parsed, NoteType::General);
    }

    #[test]
    fn non_string_tags_fall_back_to_general() {
        for value in [json!(5), json!(true), json!({"type": "meeting"}), json!(["idea"])] {
            let parsed: NoteType = serde_json::from_value(value).unwrap();
            assert_eq!(parsed, NoteType::General);
        }
    }

    #[test]
    fn tags_round_trip_through_display() {
        for note_type in NoteType::ALL {
            assert_eq!(NoteType::from_tag(&note_type.to_string()), note_type);
        }
    }

    #[test]
    fn failure_has_empty_text_and_message() {
        let result = GenerationResult::failure("Rate limit exceeded");
        assert!(!result.success);
        assert!(result.generated_text.is_empty());
        assert_eq!(result.error.as_deref(), Some("Rate limit exceeded"));
    }

    #[test]
    fn success_serializes_camel_case_without_error() {
        let usage = UsageCounts {
            prompt_tokens: 5,
            completion_tokens: 1,
            total_tokens: 6,
        };
        let value = serde_json::to_value(GenerationResult::success("Hello".into(), Some(usage)))
            .unwrap();

        assert_eq!(
            value,
            json!({
                "success": true,
                "generatedText": "Hello",
                "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
            })
        );
    }

    #[test]
    fn request_serializes_type_tag() {
        let value = serde_json::to_value(GenerationRequest::new("x", NoteType::Study)).unwrap();
        assert_eq!(value, json!({"prompt": "x", "type": "study"}));
    }
}
