//! サービスコンテナ
//!
//! # 責任
//! - 全ての依存関係の構築と管理
//! - 本番グラフ（cpal / Firestore / Speech-to-Text / 要約）の組み立て
//! - テスト時のモック注入サポート

use crate::application::notes_service::NotesService;
use crate::application::traits::{NoteStore, SummarizationClient, TranscriptionClient};
use crate::error::Result;
use crate::infrastructure::audio::{CaptureBackend, CpalCaptureBackend};
use crate::infrastructure::external::{FirestoreNoteStore, GoogleSpeechClient, SolarSummarizer};
use crate::utils::config::EnvConfig;

/// サービスコンテナ
pub struct ServiceContainer<T: CaptureBackend> {
    /// ノートオーケストレーター
    pub notes: NotesService<T>,
}

impl ServiceContainer<CpalCaptureBackend> {
    /// 環境設定から本番構成のコンテナを作成
    pub fn new() -> Result<Self> {
        EnvConfig::init()?;

        let store = Box::new(FirestoreNoteStore::new()?);
        let transcription = Box::new(GoogleSpeechClient::new()?);
        let summarization = Box::new(SolarSummarizer::new()?);

        Ok(Self::with_dependencies(
            CpalCaptureBackend::default(),
            store,
            transcription,
            summarization,
        ))
    }
}

impl<T: CaptureBackend> ServiceContainer<T> {
    /// 依存関係を注入して作成（テスト用）
    pub fn with_dependencies(
        backend: T,
        store: Box<dyn NoteStore>,
        transcription: Box<dyn TranscriptionClient>,
        summarization: Box<dyn SummarizationClient>,
    ) -> Self {
        Self {
            notes: NotesService::new(backend, store, transcription, summarization),
        }
    }
}

/// テスト用のヘルパー実装
pub mod test_helpers {
    use super::*;
    use crate::domain::{Note, NoteKind, Summary, Transcription};
    use crate::error::VoiceNotesError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::error::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// テスト用のモックキャプチャバックエンド
    pub struct MockCaptureBackend {
        pub permission: bool,
        recording: AtomicBool,
        locator: String,
    }

    impl Default for MockCaptureBackend {
        fn default() -> Self {
            Self {
                permission: true,
                recording: AtomicBool::new(false),
                locator: "/tmp/voice_notes_mock.wav".to_string(),
            }
        }
    }

    impl CaptureBackend for MockCaptureBackend {
        fn request_permission(&self) -> std::result::Result<bool, Box<dyn Error>> {
            Ok(self.permission)
        }

        fn start(&self) -> std::result::Result<(), Box<dyn Error>> {
            self.recording.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> std::result::Result<String, Box<dyn Error>> {
            self.recording.store(false, Ordering::SeqCst);
            Ok(self.locator.clone())
        }

        fn is_recording(&self) -> bool {
            self.recording.load(Ordering::SeqCst)
        }
    }

    /// テスト用のインメモリノートストア
    ///
    /// `created_at` 降順のフェッチ、ID採番、本文一致のフォールバック削除まで
    /// 本番ストアと同じ契約を実装する。
    pub struct InMemoryNoteStore {
        notes: Mutex<Vec<Note>>,
        next_id: AtomicUsize,
        deleted: Mutex<Vec<String>>,
        fail_fetch: AtomicBool,
        fail_create: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl InMemoryNoteStore {
        pub fn new(seed: Vec<Note>) -> Self {
            Self {
                notes: Mutex::new(seed),
                next_id: AtomicUsize::new(1),
                deleted: Mutex::new(Vec::new()),
                fail_fetch: AtomicBool::new(false),
                fail_create: AtomicBool::new(false),
                fail_delete: AtomicBool::new(false),
            }
        }

        /// 全ドキュメントを破棄（「リモートが空になった」状況の再現）
        pub fn clear(&self) {
            self.notes.lock().unwrap().clear();
        }

        /// 次のフェッチを失敗させる
        pub fn fail_next_fetch(&self) {
            self.fail_fetch.store(true, Ordering::SeqCst);
        }

        /// 次の作成を失敗させる
        pub fn fail_next_create(&self) {
            self.fail_create.store(true, Ordering::SeqCst);
        }

        /// 次の削除を失敗させる
        pub fn fail_next_delete(&self) {
            self.fail_delete.store(true, Ordering::SeqCst);
        }

        /// これまでにID指定で削除されたドキュメントID
        pub fn deleted_ids(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }

        /// 現在のドキュメント数
        pub fn len(&self) -> usize {
            self.notes.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl NoteStore for InMemoryNoteStore {
        async fn fetch_all(&self) -> Result<Vec<Note>> {
            if self.fail_fetch.swap(false, Ordering::SeqCst) {
                return Err(VoiceNotesError::StoreError("mock fetch failure".into()));
            }
            let mut notes = self.notes.lock().unwrap().clone();
            notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(notes)
        }

        async fn create(&self, kind: NoteKind, title: &str, content: &str) -> Result<Note> {
            if self.fail_create.swap(false, Ordering::SeqCst) {
                return Err(VoiceNotesError::StoreError("mock create failure".into()));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let note = Note {
                id: Some(format!("note-{}", id)),
                title: title.to_string(),
                content: content.to_string(),
                kind,
                created_at: Utc::now(),
                updated_at: None,
            };
            self.notes.lock().unwrap().push(note.clone());
            Ok(note)
        }

        async fn update(&self, note: &Note) -> Result<bool> {
            if note.id.is_none() {
                return Ok(false);
            }
            let mut notes = self.notes.lock().unwrap();
            match notes.iter_mut().find(|n| n.id == note.id) {
                Some(entry) => {
                    *entry = note.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, note: &Note) -> Result<bool> {
            if self.fail_delete.swap(false, Ordering::SeqCst) {
                return Err(VoiceNotesError::StoreError("mock delete failure".into()));
            }
            let mut notes = self.notes.lock().unwrap();
            if let Some(id) = note.id.as_deref() {
                let before = notes.len();
                notes.retain(|n| n.id.as_deref() != Some(id));
                let removed = notes.len() < before;
                if removed {
                    self.deleted.lock().unwrap().push(id.to_string());
                }
                return Ok(removed);
            }

            // 本文一致のフォールバック: 一致を全て削除する
            let before = notes.len();
            notes.retain(|n| n.content != note.content);
            Ok(notes.len() < before)
        }
    }

    /// Arc越しでも注入できるようにする（テストがストアを観測するため）
    #[async_trait]
    impl NoteStore for Arc<InMemoryNoteStore> {
        async fn fetch_all(&self) -> Result<Vec<Note>> {
            NoteStore::fetch_all(&**self).await
        }

        async fn create(&self, kind: NoteKind, title: &str, content: &str) -> Result<Note> {
            NoteStore::create(&**self, kind, title, content).await
        }

        async fn update(&self, note: &Note) -> Result<bool> {
            NoteStore::update(&**self, note).await
        }

        async fn delete(&self, note: &Note) -> Result<bool> {
            NoteStore::delete(&**self, note).await
        }
    }

    /// テスト用のモック転写クライアント
    pub struct MockTranscriptionClient {
        outcome: Option<Transcription>,
    }

    impl MockTranscriptionClient {
        /// 固定の成功結果を返すクライアント
        pub fn new(outcome: Transcription) -> Self {
            Self {
                outcome: Some(outcome),
            }
        }

        /// トランスポート失敗を返すクライアント
        pub fn failing() -> Self {
            Self { outcome: None }
        }
    }

    #[async_trait]
    impl TranscriptionClient for MockTranscriptionClient {
        async fn transcribe(&self, _locator: &str) -> Result<Transcription> {
            match &self.outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => Err(VoiceNotesError::TranscriptionError(
                    "mock transport failure".into(),
                )),
            }
        }
    }

    /// テスト用のモック要約クライアント
    pub struct MockSummarizationClient {
        outcome: Option<Summary>,
    }

    impl MockSummarizationClient {
        pub fn new(outcome: Summary) -> Self {
            Self {
                outcome: Some(outcome),
            }
        }

        pub fn failing() -> Self {
            Self { outcome: None }
        }
    }

    #[async_trait]
    impl SummarizationClient for MockSummarizationClient {
        async fn summarize(&self, _text: &str) -> Result<Summary> {
            match &self.outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => Err(VoiceNotesError::SummarizationError(
                    "mock transport failure".into(),
                )),
            }
        }
    }

    /// テスト用のNotesServiceビルダー
    pub struct TestNotesServiceBuilder {
        store: Arc<InMemoryNoteStore>,
        transcription: Option<Transcription>,
        summary: Option<Summary>,
    }

    impl TestNotesServiceBuilder {
        pub fn new() -> Self {
            Self {
                store: Arc::new(InMemoryNoteStore::new(Vec::new())),
                transcription: Some(Transcription::Text("test transcription".into())),
                summary: Some(Summary::Text("test summary".into())),
            }
        }

        /// 初期ドキュメントを持つストアで構築する
        pub fn with_stored_notes(mut self, notes: Vec<Note>) -> Self {
            self.store = Arc::new(InMemoryNoteStore::new(notes));
            self
        }

        /// ストアを共有参照で注入する（テスト側で観測するため）
        pub fn with_store(mut self, store: Arc<InMemoryNoteStore>) -> Self {
            self.store = store;
            self
        }

        pub fn with_transcription(mut self, outcome: Transcription) -> Self {
            self.transcription = Some(outcome);
            self
        }

        pub fn with_transcription_failure(mut self) -> Self {
            self.transcription = None;
            self
        }

        pub fn with_summary(mut self, outcome: Summary) -> Self {
            self.summary = Some(outcome);
            self
        }

        pub fn with_summary_failure(mut self) -> Self {
            self.summary = None;
            self
        }

        pub fn build(self) -> NotesService<MockCaptureBackend> {
            let transcription: Box<dyn TranscriptionClient> = match self.transcription {
                Some(outcome) => Box::new(MockTranscriptionClient::new(outcome)),
                None => Box::new(MockTranscriptionClient::failing()),
            };
            let summarization: Box<dyn SummarizationClient> = match self.summary {
                Some(outcome) => Box::new(MockSummarizationClient::new(outcome)),
                None => Box::new(MockSummarizationClient::failing()),
            };

            NotesService::new(
                MockCaptureBackend::default(),
                Box::new(self.store),
                transcription,
                summarization,
            )
        }
    }

    impl Default for TestNotesServiceBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;
    use crate::domain::Transcription;

    /// モック注入でコンテナが組み上がる
    #[tokio::test]
    async fn container_builds_with_injected_dependencies() {
        let mut container = ServiceContainer::with_dependencies(
            MockCaptureBackend::default(),
            Box::new(InMemoryNoteStore::new(Vec::new())),
            Box::new(MockTranscriptionClient::new(Transcription::NoSpeech)),
            Box::new(MockSummarizationClient::failing()),
        );

        assert!(container.notes.notes().is_empty());
        assert!(container.notes.add_manual_note("T", "C").await);
        assert_eq!(container.notes.notes().len(), 1);
    }
}
