//! Domain models for notes-service.

mod generation;
mod note;
mod notebook;
mod user;

pub use generation::{GenerationRequest, GenerationResult, NoteType, UsageCounts};
pub use note::{Note, NoteInput, NoteRow};
pub use notebook::{Notebook, NotebookInput, NotebookSummary};
pub use user::{User, UserProfile};
