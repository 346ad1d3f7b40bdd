pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod utils {
    pub mod config;
    pub mod env;
}

pub use error::{Result, VoiceNotesError};
pub use utils::env::load_env;
