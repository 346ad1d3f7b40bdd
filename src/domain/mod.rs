pub mod note;
pub mod outcome;

pub use note::{Note, NoteKind, validate_draft};
pub use outcome::{Summary, Transcription};
