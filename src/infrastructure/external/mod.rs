pub mod firestore;
pub mod google_speech;
pub mod solar;

pub use firestore::FirestoreNoteStore;
pub use google_speech::GoogleSpeechClient;
pub use solar::SolarSummarizer;
