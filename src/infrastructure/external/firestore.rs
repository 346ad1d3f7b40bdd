//! Firestore REST APIによるノートストア
//! Application層のNoteStoreトレイトを実装
//!
//! # 責任
//! - `notes` コレクションへのCRUD
//! - Firestoreドキュメント ⇔ ドメインモデルの相互変換
//! - 状態を持たないゲートウェイ（キャッシュ禁止）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::traits::NoteStore;
use crate::domain::{Note, NoteKind};
use crate::error::{Result, VoiceNotesError};
use crate::utils::config::EnvConfig;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const COLLECTION: &str = "notes";

// ========================================
// ワイヤ型
// ========================================

#[derive(Debug, Serialize, Deserialize)]
struct StringValue {
    #[serde(rename = "stringValue")]
    string_value: String,
}

impl StringValue {
    fn new(value: impl Into<String>) -> Self {
        Self {
            string_value: value.into(),
        }
    }
}

/// `notes` ドキュメントのフィールド。全てstringValueで持つ。
#[derive(Debug, Serialize, Deserialize)]
struct NoteFields {
    title: StringValue,
    content: StringValue,
    #[serde(rename = "createdAt")]
    created_at: StringValue,
    #[serde(rename = "type")]
    kind: StringValue,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<StringValue>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    /// `projects/<p>/databases/(default)/documents/notes/<id>` 形式の完全リソース名
    name: String,
    fields: NoteFields,
}

#[derive(Debug, Serialize)]
struct DocumentBody {
    fields: NoteFields,
}

/// `:runQuery` の応答要素。document以外の要素（readTime等）も返ってくる。
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

// ========================================
// 変換
// ========================================

/// リソース名の末尾セグメントをドキュメントIDとして取り出す
fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

/// Firestoreドキュメントをドメインモデルに変換します。
fn doc_to_note(doc: FirestoreDocument) -> std::result::Result<Note, String> {
    let kind = NoteKind::parse(&doc.fields.kind.string_value)
        .ok_or_else(|| format!("unknown note type: {}", doc.fields.kind.string_value))?;

    let created_at = parse_timestamp(&doc.fields.created_at.string_value)?;
    let updated_at = match doc.fields.updated_at {
        Some(value) => Some(parse_timestamp(&value.string_value)?),
        None => None,
    };

    Ok(Note {
        id: Some(document_id(&doc.name)),
        title: doc.fields.title.string_value,
        content: doc.fields.content.string_value,
        kind,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))
}

/// ドメインモデルをドキュメントフィールドに変換します。IDは含めない。
fn note_fields(note: &Note) -> NoteFields {
    NoteFields {
        title: StringValue::new(&note.title),
        content: StringValue::new(&note.content),
        created_at: StringValue::new(note.created_at.to_rfc3339()),
        kind: StringValue::new(note.kind.as_str()),
        updated_at: note.updated_at.map(|ts| StringValue::new(ts.to_rfc3339())),
    }
}

// ========================================
// ストア実装
// ========================================

/// Firestore RESTゲートウェイ
pub struct FirestoreNoteStore {
    client: reqwest::Client,
    api_key: String,
    /// `projects/<p>/databases/(default)/documents`
    documents_root: String,
    base_url: String,
}

impl FirestoreNoteStore {
    /// 環境設定からストアを作成
    pub fn new() -> Result<Self> {
        let config = EnvConfig::get();
        let project_id = config
            .firebase_project_id
            .clone()
            .ok_or_else(|| VoiceNotesError::StoreError("FIREBASE_PROJECT_ID not set".to_string()))?;
        let api_key = config
            .google_cloud_api_key
            .clone()
            .ok_or_else(|| VoiceNotesError::StoreError("GOOGLE_CLOUD_API_KEY not set".to_string()))?;
        Ok(Self::with_config(&project_id, api_key))
    }

    /// プロジェクトIDとAPIキーを指定して作成
    pub fn with_config(project_id: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            documents_root: format!("projects/{}/databases/(default)/documents", project_id),
            base_url: FIRESTORE_BASE_URL.to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, self.documents_root, COLLECTION)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn run_query_url(&self) -> String {
        format!("{}/{}:runQuery", self.base_url, self.documents_root)
    }

    /// `:runQuery` を実行し、返ってきたドキュメントを列挙します。
    async fn run_query(&self, structured_query: serde_json::Value) -> Result<Vec<FirestoreDocument>> {
        let response = self
            .client
            .post(self.run_query_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "structuredQuery": structured_query }))
            .send()
            .await
            .map_err(|e| VoiceNotesError::StoreError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceNotesError::StoreError(e.to_string()))?;

        if !status.is_success() {
            return Err(VoiceNotesError::StoreError(format!(
                "query failed with status {}: {}",
                status, body
            )));
        }

        let items: Vec<RunQueryItem> = serde_json::from_str(&body)
            .map_err(|e| VoiceNotesError::StoreError(format!("invalid query response: {}", e)))?;

        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    /// 完全リソース名を指定してドキュメントを削除します。
    async fn delete_by_name(&self, name: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self
            .client
            .delete(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| VoiceNotesError::StoreError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VoiceNotesError::StoreError(format!(
                "delete failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for FirestoreNoteStore {
    async fn fetch_all(&self) -> Result<Vec<Note>> {
        println!("Loading notes...");

        let documents = self
            .run_query(serde_json::json!({
                "from": [{ "collectionId": COLLECTION }],
                "orderBy": [{
                    "field": { "fieldPath": "createdAt" },
                    "direction": "DESCENDING"
                }]
            }))
            .await?;

        let mut notes = Vec::with_capacity(documents.len());
        for doc in documents {
            match doc_to_note(doc) {
                Ok(note) => notes.push(note),
                // 形式の合わないドキュメントは読み飛ばす（ストア全体を失敗にしない）
                Err(e) => eprintln!("Skipping malformed note document: {}", e),
            }
        }
        Ok(notes)
    }

    async fn create(&self, kind: NoteKind, title: &str, content: &str) -> Result<Note> {
        let note = Note::new(kind, title, content);
        let body = DocumentBody {
            fields: note_fields(&note),
        };

        let response = self
            .client
            .post(self.collection_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceNotesError::StoreError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VoiceNotesError::StoreError(e.to_string()))?;

        if !status.is_success() {
            return Err(VoiceNotesError::StoreError(format!(
                "create failed with status {}: {}",
                status, text
            )));
        }

        let created: FirestoreDocument = serde_json::from_str(&text)
            .map_err(|e| VoiceNotesError::StoreError(format!("invalid create response: {}", e)))?;

        println!("Note added to Firestore with ID: {}", document_id(&created.name));
        doc_to_note(created).map_err(VoiceNotesError::StoreError)
    }

    async fn update(&self, note: &Note) -> Result<bool> {
        let Some(id) = note.id.as_deref() else {
            eprintln!("Cannot update note: note ID is missing");
            return Ok(false);
        };

        // updatedAt は常に上書きする
        let mut updated = note.clone();
        updated.updated_at = Some(updated.updated_at.unwrap_or_else(Utc::now));

        let body = DocumentBody {
            fields: note_fields(&updated),
        };

        let mask = [
            ("updateMask.fieldPaths", "title"),
            ("updateMask.fieldPaths", "content"),
            ("updateMask.fieldPaths", "createdAt"),
            ("updateMask.fieldPaths", "type"),
            ("updateMask.fieldPaths", "updatedAt"),
        ];

        let result = self
            .client
            .patch(self.document_url(id))
            .query(&[("key", self.api_key.as_str())])
            .query(&mask)
            .json(&body)
            .send()
            .await;

        // 永続化失敗は例外ではなくfalseで返す。呼び出し側が真偽値を確認する。
        match result {
            Ok(response) if response.status().is_success() => {
                println!("Note updated successfully");
                Ok(true)
            }
            Ok(response) => {
                eprintln!("Error updating note in Firestore: status {}", response.status());
                Ok(false)
            }
            Err(e) => {
                eprintln!("Error updating note in Firestore: {}", e);
                Ok(false)
            }
        }
    }

    async fn delete(&self, note: &Note) -> Result<bool> {
        if let Some(id) = note.id.as_deref() {
            self.delete_by_name(&format!("{}/{}/{}", self.documents_root, COLLECTION, id))
                .await?;
            println!("Note deleted from Firestore with ID: {}", id);
            return Ok(true);
        }

        // ID不在時のフォールバック: 本文一致で検索し、一致を全て削除する。
        // 本文が同一の別ノートを巻き込む可能性がある（既知の制限）。
        let matches = self
            .run_query(serde_json::json!({
                "from": [{ "collectionId": COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "content" },
                        "op": "EQUAL",
                        "value": { "stringValue": note.content }
                    }
                }
            }))
            .await?;

        let mut deleted = false;
        for doc in matches {
            self.delete_by_name(&doc.name).await?;
            println!("Note deleted from Firestore with ID: {}", document_id(&doc.name));
            deleted = true;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document(json: &str) -> FirestoreDocument {
        serde_json::from_str(json).unwrap()
    }

    /// ドキュメント名の末尾セグメントがIDになる
    #[test]
    fn document_id_is_last_path_segment() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/notes/abc123"),
            "abc123"
        );
    }

    /// ドキュメントからノートへの変換
    #[test]
    fn document_maps_to_note() {
        let doc = sample_document(
            r#"{
                "name": "projects/p/databases/(default)/documents/notes/abc123",
                "fields": {
                    "title": {"stringValue": "T"},
                    "content": {"stringValue": "C"},
                    "createdAt": {"stringValue": "2024-05-01T10:00:00+00:00"},
                    "type": {"stringValue": "audio"}
                }
            }"#,
        );

        let note = doc_to_note(doc).unwrap();
        assert_eq!(note.id.as_deref(), Some("abc123"));
        assert_eq!(note.title, "T");
        assert_eq!(note.content, "C");
        assert_eq!(note.kind, NoteKind::Audio);
        assert!(note.updated_at.is_none());
    }

    /// updatedAtありのドキュメントも変換できる
    #[test]
    fn document_with_updated_at_maps_to_note() {
        let doc = sample_document(
            r#"{
                "name": "projects/p/databases/(default)/documents/notes/n1",
                "fields": {
                    "title": {"stringValue": "T"},
                    "content": {"stringValue": "C"},
                    "createdAt": {"stringValue": "2024-05-01T10:00:00+00:00"},
                    "updatedAt": {"stringValue": "2024-05-02T11:30:00+00:00"},
                    "type": {"stringValue": "manual"}
                }
            }"#,
        );

        let note = doc_to_note(doc).unwrap();
        let updated = note.updated_at.unwrap();
        assert_eq!(updated.to_rfc3339(), "2024-05-02T11:30:00+00:00");
    }

    /// 未知のtypeや壊れたタイムスタンプは変換エラー
    #[test]
    fn malformed_documents_are_rejected() {
        let bad_kind = sample_document(
            r#"{
                "name": "projects/p/databases/(default)/documents/notes/n1",
                "fields": {
                    "title": {"stringValue": "T"},
                    "content": {"stringValue": "C"},
                    "createdAt": {"stringValue": "2024-05-01T10:00:00+00:00"},
                    "type": {"stringValue": "video"}
                }
            }"#,
        );
        assert!(doc_to_note(bad_kind).is_err());

        let bad_timestamp = sample_document(
            r#"{
                "name": "projects/p/databases/(default)/documents/notes/n1",
                "fields": {
                    "title": {"stringValue": "T"},
                    "content": {"stringValue": "C"},
                    "createdAt": {"stringValue": "yesterday"},
                    "type": {"stringValue": "manual"}
                }
            }"#,
        );
        assert!(doc_to_note(bad_timestamp).is_err());
    }

    /// フィールド変換はIDを含めず、未編集ノートはupdatedAtを持たない
    #[test]
    fn note_fields_exclude_id_and_optional_updated_at() {
        let note = Note::new(NoteKind::Summary, "T", "C");
        let body = serde_json::to_value(DocumentBody {
            fields: note_fields(&note),
        })
        .unwrap();

        let fields = &body["fields"];
        assert_eq!(fields["title"]["stringValue"], "T");
        assert_eq!(fields["content"]["stringValue"], "C");
        assert_eq!(fields["type"]["stringValue"], "summary");
        assert!(fields.get("updatedAt").is_none());
        assert!(fields.get("id").is_none());
    }
}
