use std::error::Error;

pub mod cpal_backend;
pub mod sound_player;
pub use cpal_backend::CpalCaptureBackend;
pub use sound_player::{Playback, PlaybackObserver, PlaybackStatus, play_audio, stop_audio};

/// 録音デバイス抽象。
/// 実装は `start`→`stop` が 1 対で呼ばれることを前提とする。
pub trait CaptureBackend {
    /// マイク使用許可を要求。拒否された場合は `Ok(false)`。
    fn request_permission(&self) -> Result<bool, Box<dyn Error>>;

    /// 録音を開始。
    fn start(&self) -> Result<(), Box<dyn Error>>;

    /// 録音を停止し、音声アーティファクトのロケーター（WAVファイルパス）を返します。
    /// デバイスリソースは成功・失敗どちらの経路でも解放すること。
    fn stop(&self) -> Result<String, Box<dyn Error>>;

    /// 現在録音中であれば `true`。
    fn is_recording(&self) -> bool;
}
