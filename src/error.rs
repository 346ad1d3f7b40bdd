//! 統一エラーハンドリング
//!
//! このモジュールは voice_notes クレート全体で使用する統一エラー型を定義します。
//! アダプター層の個別エラーを一箇所に集約し、一貫したエラーハンドリングを提供します。

use thiserror::Error;

/// voice_notes クレート全体で使用する統一エラー型
#[derive(Debug, Error)]
pub enum VoiceNotesError {
    // ========================================
    // 録音デバイス関連エラー
    // ========================================
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("Invalid capture state: {0}")]
    InvalidState(String),

    // ========================================
    // 外部サービス関連エラー
    // ========================================
    #[error("Transcription failed: {0}")]
    TranscriptionError(String),

    #[error("Summarization failed: {0}")]
    SummarizationError(String),

    #[error("Note store error: {0}")]
    StoreError(String),

    // ========================================
    // 入力検証・内部エラー
    // ========================================
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("System error: {0}")]
    SystemError(String),
}

/// 統一Result型エイリアス
pub type Result<T> = std::result::Result<T, VoiceNotesError>;

// ========================================
// 利便性のための変換実装
// ========================================

/// String からの変換（文字列エラーとの互換性）
impl From<String> for VoiceNotesError {
    fn from(message: String) -> Self {
        VoiceNotesError::SystemError(message)
    }
}

/// &str からの変換（便利メソッド）
impl From<&str> for VoiceNotesError {
    fn from(message: &str) -> Self {
        VoiceNotesError::SystemError(message.to_string())
    }
}

/// String への変換（呼び出し側でのメッセージ表示用）
impl From<VoiceNotesError> for String {
    fn from(error: VoiceNotesError) -> Self {
        error.to_string()
    }
}

// ========================================
// ヘルパー関数
// ========================================

impl VoiceNotesError {
    /// エラーが再試行可能かどうかを判定
    ///
    /// トランスポート起因の失敗のみ再試行の意味がある。
    /// 「結果が空だった」等の定義済みの負の結果はそもそもエラーにならない。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoiceNotesError::TranscriptionError(_)
                | VoiceNotesError::SummarizationError(_)
                | VoiceNotesError::StoreError(_)
        )
    }

    /// エラーがユーザーアクションで解決可能かどうかを判定
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            VoiceNotesError::PermissionDenied | VoiceNotesError::ValidationError(_)
        )
    }

    /// エラーの重要度レベルを取得（ログレベル代替）
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VoiceNotesError::SystemError(_) => ErrorSeverity::Error,

            VoiceNotesError::StoreError(_)
            | VoiceNotesError::TranscriptionError(_)
            | VoiceNotesError::SummarizationError(_)
            | VoiceNotesError::DeviceError(_) => ErrorSeverity::Warning,

            _ => ErrorSeverity::Debug,
        }
    }
}

/// エラーの重要度レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    Error,
}
