pub mod capture_service;
pub mod notes_service;
pub mod service_container;
pub mod traits;

pub use capture_service::{CaptureService, CaptureState};
pub use notes_service::NotesService;
pub use service_container::ServiceContainer;
