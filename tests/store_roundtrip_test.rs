//! ノートストア契約のラウンドトリップテスト
//!
//! ストア抽象に対する契約（作成→取得の同一性、ID無し削除のフォールバック等）を
//! インメモリ実装で検証する。

use voice_notes::application::service_container::test_helpers::InMemoryNoteStore;
use voice_notes::application::traits::NoteStore;
use voice_notes::domain::{Note, NoteKind};

/// 作成したノートが同じフィールドとストア割り当てIDで返ってくる
#[tokio::test]
async fn created_note_round_trips_through_fetch() {
    let store = InMemoryNoteStore::new(Vec::new());

    let created = store
        .create(NoteKind::Manual, "Shopping", "milk, eggs")
        .await
        .unwrap();
    assert!(created.id.is_some());
    assert!(created.updated_at.is_none());

    let fetched = store.fetch_all().await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, created.id);
    assert_eq!(fetched[0].title, "Shopping");
    assert_eq!(fetched[0].content, "milk, eggs");
    assert_eq!(fetched[0].kind, NoteKind::Manual);
}

/// 空ストアのフェッチは空列（エラーではない）
#[tokio::test]
async fn empty_store_yields_empty_sequence() {
    let store = InMemoryNoteStore::new(Vec::new());
    assert!(store.fetch_all().await.unwrap().is_empty());
}

/// ID無しノートの更新はfalse
#[tokio::test]
async fn update_without_id_is_refused() {
    let store = InMemoryNoteStore::new(Vec::new());
    let unsaved = Note::new(NoteKind::Manual, "T", "C");
    assert!(!store.update(&unsaved).await.unwrap());
}

/// ID無し削除のフォールバックは本文一致を「全て」消す（既知のハザード）
#[tokio::test]
async fn fallback_delete_removes_every_content_match() {
    let store = InMemoryNoteStore::new(Vec::new());
    store.create(NoteKind::Manual, "A", "duplicate body").await.unwrap();
    store.create(NoteKind::Manual, "B", "duplicate body").await.unwrap();
    store.create(NoteKind::Manual, "C", "unique body").await.unwrap();

    let id_less = Note::new(NoteKind::Manual, "A", "duplicate body");
    assert!(store.delete(&id_less).await.unwrap());

    let remaining = store.fetch_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "unique body");

    // 一致が無ければfalse
    let no_match = Note::new(NoteKind::Manual, "X", "gone");
    assert!(!store.delete(&no_match).await.unwrap());
}
