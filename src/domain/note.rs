//! ノートのドメインモデル
//!
//! リモートドキュメントストアに永続化される単一レコードと、
//! その由来（手入力・音声転写・AI要約）を表します。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoiceNotesError};

/// ノートの由来タグ。作成後は不変。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// 手入力で作成されたノート
    Manual,
    /// 録音の転写から作成されたノート
    Audio,
    /// 既存ノートのAI要約から作成されたノート
    Summary,
}

impl NoteKind {
    /// ストア上の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Manual => "manual",
            NoteKind::Audio => "audio",
            NoteKind::Summary => "summary",
        }
    }

    /// ストア上の文字列表現から復元。未知の値は `None`。
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(NoteKind::Manual),
            "audio" => Some(NoteKind::Audio),
            "summary" => Some(NoteKind::Summary),
            _ => None,
        }
    }
}

/// 永続化されるノートレコード
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// ストアが作成時に割り当てるドキュメントID。初回永続化前は `None`。
    pub id: Option<String>,
    /// 表示タイトル（非空）
    pub title: String,
    /// 本文（非空）。生テキスト・転写・要約のいずれか。
    pub content: String,
    /// 由来タグ
    pub kind: NoteKind,
    /// 作成日時。一度設定されたら変更されない。
    pub created_at: DateTime<Utc>,
    /// 最終更新日時。一度も編集されていなければ `None`。
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// 指定のタイトル・本文・由来で未永続化のノートを作成
    pub fn new(kind: NoteKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            kind,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// タイトル・本文の入力検証
///
/// 空白のみの入力も空として扱う。呼び出し側（UI境界）のためのチェックで、
/// オーケストレーター自身は再検証しない。
pub fn validate_draft(title: &str, content: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(VoiceNotesError::ValidationError(
            "title must not be empty".to_string(),
        ));
    }
    if content.trim().is_empty() {
        return Err(VoiceNotesError::ValidationError(
            "content must not be empty".to_string(),
        ));
    }
    Ok(())
}
