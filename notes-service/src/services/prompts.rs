//! System instructions steering the model per note type.

use crate::models::NoteType;

/// System instruction for a note type.
pub fn system_prompt(note_type: NoteType) -> &'static str {
    match note_type {
        NoteType::General => {
            "You are a helpful assistant that creates well-structured, informative notes. \
             Organize the content clearly with headings, bullet points, and logical flow."
        }
        NoteType::Meeting => {
            "You are a helpful assistant that creates structured meeting notes. \
             Include key points, decisions made, action items, and next steps. \
             Format it clearly with headings and bullet points."
        }
        NoteType::Study => {
            "You are a helpful assistant that creates comprehensive study notes. \
             Include key concepts, definitions, examples, and important points. \
             Organize information in a clear, educational format."
        }
        NoteType::Idea => {
            "You are a creative assistant that helps expand and develop ideas. \
             Provide detailed exploration of the concept, potential applications, \
             considerations, and next steps."
        }
        NoteType::Journal => {
            "You are a thoughtful writing assistant that helps create reflective journal entries. \
             Encourage self-reflection, insights, and personal growth."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_note_type_has_a_distinct_instruction() {
        let prompts: HashSet<&str> = NoteType::ALL.iter().map(|t| system_prompt(*t)).collect();
        assert_eq!(prompts.len(), NoteType::ALL.len());
        assert!(prompts.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn unknown_tag_uses_general_instruction() {
        assert_eq!(
            system_prompt(NoteType::from_tag("grocery-list")),
            system_prompt(NoteType::General)
        );
    }
}
