//! 音声キャプチャを管理するサービス
//!
//! # 責任
//! - 録音の開始・停止（idle ⇄ recording の状態機械）
//! - マイク許可の確認
//! - 停止時のデバイスリソース解放（失敗経路を含む）

use std::sync::{Arc, Mutex};

use crate::error::{Result, VoiceNotesError};
use crate::infrastructure::audio::CaptureBackend;

/// キャプチャ状態
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    /// 待機中
    Idle,
    /// 録音中
    Recording,
}

/// キャプチャサービス
///
/// 同時録音は1本のみ。録音中の `start_recording` は拒否する
/// （未定義動作にしないためのガード）。
pub struct CaptureService<T: CaptureBackend> {
    backend: T,
    state: Arc<Mutex<CaptureState>>,
}

impl<T: CaptureBackend> CaptureService<T> {
    /// バックエンドを注入して新しいCaptureServiceを作成
    pub fn new(backend: T) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(CaptureState::Idle)),
        }
    }

    /// 録音を開始
    ///
    /// マイク許可が得られない場合は `PermissionDenied`、
    /// デバイスの起動に失敗した場合は `DeviceError`。
    pub async fn start_recording(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| VoiceNotesError::SystemError(format!("State lock error: {}", e)))?;

        if *state != CaptureState::Idle {
            return Err(VoiceNotesError::InvalidState(
                "recording already active".to_string(),
            ));
        }

        // 許可の確認
        let granted = self
            .backend
            .request_permission()
            .map_err(|e| VoiceNotesError::DeviceError(e.to_string()))?;
        if !granted {
            return Err(VoiceNotesError::PermissionDenied);
        }

        // バックエンドを開始
        self.backend
            .start()
            .map_err(|e| VoiceNotesError::DeviceError(e.to_string()))?;

        *state = CaptureState::Recording;
        Ok(())
    }

    /// 録音を停止し、音声アーティファクトのロケーターを返す
    ///
    /// 録音中でなければ `InvalidState`。デバイスリソースと録音状態は
    /// バックエンドが失敗しても必ず解放される。
    pub async fn stop_recording(&self) -> Result<String> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| VoiceNotesError::SystemError(format!("State lock error: {}", e)))?;

        if *state != CaptureState::Recording {
            return Err(VoiceNotesError::InvalidState(
                "no active recording to stop".to_string(),
            ));
        }

        let result = self
            .backend
            .stop()
            .map_err(|e| VoiceNotesError::DeviceError(e.to_string()));

        // 失敗してもIdleに戻す。デバイス解放はバックエンドのstopが保証する。
        *state = CaptureState::Idle;

        result
    }

    /// 録音中かどうかを確認
    pub fn is_recording(&self) -> bool {
        self.state
            .lock()
            .map(|state| *state == CaptureState::Recording)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// テスト用のモックキャプチャバックエンド
    struct MockBackend {
        permission: bool,
        fail_start: bool,
        fail_stop: bool,
        recording: Arc<AtomicBool>,
        stop_calls: Arc<AtomicUsize>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                permission: true,
                fail_start: false,
                fail_stop: false,
                recording: Arc::new(AtomicBool::new(false)),
                stop_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureBackend for MockBackend {
        fn request_permission(&self) -> std::result::Result<bool, Box<dyn Error>> {
            Ok(self.permission)
        }

        fn start(&self) -> std::result::Result<(), Box<dyn Error>> {
            if self.fail_start {
                return Err("device busy".into());
            }
            self.recording.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> std::result::Result<String, Box<dyn Error>> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.recording.store(false, Ordering::SeqCst);
            if self.fail_stop {
                return Err("finalize failed".into());
            }
            Ok("/tmp/voice_notes_test.wav".to_string())
        }

        fn is_recording(&self) -> bool {
            self.recording.load(Ordering::SeqCst)
        }
    }

    /// 開始・停止の基本サイクル
    #[tokio::test]
    async fn start_stop_cycle_returns_locator() {
        let service = CaptureService::new(MockBackend::new());

        assert!(!service.is_recording());
        service.start_recording().await.unwrap();
        assert!(service.is_recording());

        let locator = service.stop_recording().await.unwrap();
        assert_eq!(locator, "/tmp/voice_notes_test.wav");
        assert!(!service.is_recording());
    }

    /// 録音中の二重開始は拒否される
    #[tokio::test]
    async fn double_start_is_rejected() {
        let service = CaptureService::new(MockBackend::new());
        service.start_recording().await.unwrap();

        let err = service.start_recording().await.unwrap_err();
        assert!(matches!(err, VoiceNotesError::InvalidState(_)));
        // 状態は保たれる
        assert!(service.is_recording());
    }

    /// 待機中の停止はInvalidState
    #[tokio::test]
    async fn stop_while_idle_is_invalid_state() {
        let service = CaptureService::new(MockBackend::new());
        let err = service.stop_recording().await.unwrap_err();
        assert!(matches!(err, VoiceNotesError::InvalidState(_)));
    }

    /// 許可拒否はPermissionDenied、状態はIdleのまま
    #[tokio::test]
    async fn permission_refusal_maps_to_permission_denied() {
        let mut backend = MockBackend::new();
        backend.permission = false;
        let service = CaptureService::new(backend);

        let err = service.start_recording().await.unwrap_err();
        assert!(matches!(err, VoiceNotesError::PermissionDenied));
        assert!(!service.is_recording());
    }

    /// デバイス起動失敗はDeviceError
    #[tokio::test]
    async fn start_failure_maps_to_device_error() {
        let mut backend = MockBackend::new();
        backend.fail_start = true;
        let service = CaptureService::new(backend);

        let err = service.start_recording().await.unwrap_err();
        assert!(matches!(err, VoiceNotesError::DeviceError(_)));
        assert!(!service.is_recording());
    }

    /// 停止が失敗してもIdleへ戻り、次の録音を開始できる
    #[tokio::test]
    async fn failing_stop_still_releases_the_session() {
        let mut backend = MockBackend::new();
        backend.fail_stop = true;
        let stop_calls = backend.stop_calls.clone();
        let service = CaptureService::new(backend);

        service.start_recording().await.unwrap();
        let err = service.stop_recording().await.unwrap_err();
        assert!(matches!(err, VoiceNotesError::DeviceError(_)));
        assert_eq!(stop_calls.load(Ordering::SeqCst), 1);

        // リソースは解放済み、再開始できる
        assert!(!service.is_recording());
        service.start_recording().await.unwrap();
    }
}
