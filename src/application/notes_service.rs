//! ノートオーケストレーター
//!
//! # 責任
//! - インメモリのノートコレクション（表示層が読む唯一の正）の所有
//! - キャプチャ・転写・要約・ストアの各アダプターの仲介
//! - 部分失敗時のローカル/リモート整合性の維持
//!
//! 変更操作は全て `&mut self` を経由する。表示層がコレクションを
//! 直接書き換える経路は存在しない。コレクションへの相互排他は
//! 持たないため、同時に複数の変更操作を発行しないこと（既知のギャップ）。

use chrono::{Local, Utc};
use std::sync::Arc;

use crate::application::capture_service::CaptureService;
use crate::application::traits::{NoteStore, SummarizationClient, TranscriptionClient};
use crate::domain::{Note, NoteKind, Summary, Transcription};
use crate::error::{Result, VoiceNotesError};
use crate::infrastructure::audio::{CaptureBackend, Playback, sound_player};

/// ノートオーケストレーター
pub struct NotesService<T: CaptureBackend> {
    /// ストアゲートウェイ（状態を持たない）
    store: Box<dyn NoteStore>,
    /// 転写クライアント
    transcription: Box<dyn TranscriptionClient>,
    /// 要約クライアント
    summarization: Box<dyn SummarizationClient>,
    /// キャプチャサービス
    capture: CaptureService<T>,
    /// インメモリのノートコレクション（先頭が最新）
    notes: Vec<Note>,
    /// 直近にキャプチャした音声アーティファクトのロケーター
    last_audio: Option<String>,
}

impl<T: CaptureBackend> NotesService<T> {
    /// 依存を注入して新しいNotesServiceを作成
    pub fn new(
        backend: T,
        store: Box<dyn NoteStore>,
        transcription: Box<dyn TranscriptionClient>,
        summarization: Box<dyn SummarizationClient>,
    ) -> Self {
        Self {
            store,
            transcription,
            summarization,
            capture: CaptureService::new(backend),
            notes: Vec::new(),
            last_audio: None,
        }
    }

    /// 現在のノートコレクション（先頭が最新）
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// 直近にキャプチャした音声のロケーター
    pub fn last_audio(&self) -> Option<&str> {
        self.last_audio.as_deref()
    }

    // ========================================
    // 読み込み・手動作成
    // ========================================

    /// ストアから全ノートを読み込む
    ///
    /// 取得結果が非空の場合のみコレクションを置き換える。空の結果では
    /// ローカルの非空コレクションを消さない（temporary空応答からの保護、
    /// 意図的に温存した挙動）。失敗はログに残して飲み込み、直前の状態を保つ。
    pub async fn load_notes(&mut self) {
        match self.store.fetch_all().await {
            Ok(notes) => {
                if !notes.is_empty() {
                    println!("Notes fetched: {}", notes.len());
                    self.notes = notes;
                }
            }
            Err(e) => {
                eprintln!("Error loading notes: {}", e);
            }
        }
    }

    /// 手入力ノートを作成してコレクション先頭に追加
    ///
    /// タイトル・本文の非空検証は呼び出し側（UI境界）で済んでいる前提。
    pub async fn add_manual_note(&mut self, title: &str, content: &str) -> bool {
        match self.store.create(NoteKind::Manual, title, content).await {
            Ok(note) => {
                self.notes.insert(0, note);
                true
            }
            Err(e) => {
                eprintln!("Error adding note: {}", e);
                false
            }
        }
    }

    // ========================================
    // 録音・転写パイプライン
    // ========================================

    /// 録音を開始
    pub async fn start_recording(&self) -> Result<()> {
        self.capture.start_recording().await
    }

    /// 録音を停止し、ロケーターを「直近の音声」として保持する
    pub async fn stop_recording(&mut self) -> Result<String> {
        let locator = self.capture.stop_recording().await?;
        self.last_audio = Some(locator.clone());
        Ok(locator)
    }

    /// 録音中かどうか
    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    /// 録音停止→転写→音声ノート作成の逐次パイプライン
    ///
    /// 途中の段階が失敗したらそこで中断してエラーを返す。
    /// 無音（転写結果ゼロ件）は `Ok(false)` で、ノートは作らない。
    pub async fn finish_recording_and_transcribe(&mut self) -> Result<bool> {
        let locator = self.stop_recording().await?;
        self.create_audio_note_from(&locator).await
    }

    /// 保持している直近の音声を転写して音声ノートを作成する
    ///
    /// キャプチャ済みの音声が無い場合は `InvalidState`。
    pub async fn transcribe_last_audio(&mut self) -> Result<bool> {
        let locator = self
            .last_audio
            .clone()
            .ok_or_else(|| VoiceNotesError::InvalidState("no captured audio".to_string()))?;
        self.create_audio_note_from(&locator).await
    }

    async fn create_audio_note_from(&mut self, locator: &str) -> Result<bool> {
        let transcript = match self.transcription.transcribe(locator).await? {
            Transcription::Text(text) => text,
            Transcription::NoSpeech => return Ok(false),
        };

        let title = format!("Audio Note {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let note = self.store.create(NoteKind::Audio, &title, &transcript).await?;
        self.notes.insert(0, note);
        println!("Note created and saved successfully");
        Ok(true)
    }

    // ========================================
    // 要約
    // ========================================

    /// 既存ノートの本文から要約ノートを作成する
    ///
    /// タイトルは本文が一致する最初のノートから導出する
    /// （本文一致・コレクション順の先頭。同一本文のノートが複数ある場合は
    /// 最初の一致に解決される）。一致が無ければ "Unknown Note"。
    /// 要約が空なら `Ok(false)` でノートは作らない。
    pub async fn summarize_note(&mut self, content: &str) -> Result<bool> {
        let original_title = self
            .notes
            .iter()
            .find(|note| note.content == content)
            .map(|note| note.title.clone())
            .unwrap_or_else(|| "Unknown Note".to_string());
        let title = format!("AI summary - {}", original_title);

        let summary = match self.summarization.summarize(content).await? {
            Summary::Text(text) => text,
            Summary::Empty => return Ok(false),
        };

        let note = self.store.create(NoteKind::Summary, &title, &summary).await?;
        self.notes.insert(0, note);
        Ok(true)
    }

    // ========================================
    // 更新・削除
    // ========================================

    /// ノートを更新する
    ///
    /// タイトル・本文・新しい更新日時をコピーにマージしてストアへ送り、
    /// 成功時のみID一致のエントリをその場で（位置を変えずに）置き換える。
    pub async fn update_note(&mut self, original: &Note, title: &str, content: &str) -> bool {
        let mut updated = original.clone();
        updated.title = title.to_string();
        updated.content = content.to_string();
        updated.updated_at = Some(Utc::now());

        match self.store.update(&updated).await {
            Ok(true) => {
                if let Some(entry) = self
                    .notes
                    .iter_mut()
                    .find(|note| note.id.is_some() && note.id == updated.id)
                {
                    *entry = updated;
                }
                true
            }
            Ok(false) => false,
            Err(e) => {
                eprintln!("Error updating note: {}", e);
                false
            }
        }
    }

    /// IDを指定してノートを削除する
    ///
    /// 削除は安定IDで解決する。IDがもはやコレクションに無ければ
    /// `Ok(false)` のノーオップ（位置ベースの参照を信用しない）。
    pub async fn delete_note(&mut self, id: &str) -> Result<bool> {
        let Some(position) = self
            .notes
            .iter()
            .position(|note| note.id.as_deref() == Some(id))
        else {
            return Ok(false);
        };

        let note = self.notes[position].clone();
        if self.store.delete(&note).await? {
            self.notes.remove(position);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 表示上の位置を指定してノートを削除する
    ///
    /// 呼び出し時点のコレクション順で位置を安定IDへ解決してから
    /// `delete_note` に委譲する。範囲外は `Ok(false)`。
    pub async fn delete_note_at(&mut self, index: usize) -> Result<bool> {
        let Some(id) = self.notes.get(index).and_then(|note| note.id.clone()) else {
            return Ok(false);
        };
        self.delete_note(&id).await
    }

    // ========================================
    // 再生
    // ========================================

    /// 直近にキャプチャした音声を再生する
    pub fn play_last_audio(&self) -> Result<Arc<Playback>> {
        let locator = self
            .last_audio
            .as_deref()
            .ok_or_else(|| VoiceNotesError::InvalidState("no captured audio".to_string()))?;
        sound_player::play_audio(locator)
            .map_err(|e| VoiceNotesError::DeviceError(e.to_string()))
    }
}
