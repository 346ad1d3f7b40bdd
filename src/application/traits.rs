//! Application層の抽象化トレイト定義
//! 外部依存を抽象化し、テスト可能な構造を提供します

use crate::domain::{Note, NoteKind, Summary, Transcription};
use crate::error::Result;
use async_trait::async_trait;

/// 音声文字起こし機能の抽象化
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// 音声アーティファクトを文字起こし
    ///
    /// トランスポート/API失敗は `TranscriptionError`。
    /// サービスが結果ゼロ件を返した場合は `Ok(Transcription::NoSpeech)`。
    async fn transcribe(&self, locator: &str) -> Result<Transcription>;
}

/// テキスト要約機能の抽象化
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// テキストの要約を生成
    ///
    /// トランスポート/API失敗は `SummarizationError`。
    /// 応答に本文が無い場合は `Ok(Summary::Empty)`。
    async fn summarize(&self, text: &str) -> Result<Summary>;
}

/// リモートドキュメントストアの抽象化
///
/// 実装は状態を持たないゲートウェイであること。キャッシュは禁止で、
/// 各呼び出しは呼び出し時点のリモートの状態を反映する。
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// 全ノートを `created_at` 降順で取得。空ストアは空列（エラーではない）。
    async fn fetch_all(&self) -> Result<Vec<Note>>;

    /// ノートを作成し、ストア割り当てIDを含むノートを返す
    async fn create(&self, kind: NoteKind, title: &str, content: &str) -> Result<Note>;

    /// ノートを更新。IDが無い場合・永続化に失敗した場合は `Ok(false)`。
    /// 呼び出し側は必ず戻り値を確認すること。
    async fn update(&self, note: &Note) -> Result<bool>;

    /// ノートを削除。IDがあればID指定で削除する。
    /// IDが無い場合は本文一致で検索し、一致した「全て」を削除する
    /// （本文が重複するノートを巻き込む既知のハザード。意図的に温存）。
    async fn delete(&self, note: &Note) -> Result<bool>;
}
