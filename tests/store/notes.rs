use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use notestore::error::codes;
use notestore::{ApiClient, CancelToken, ErrorKind, NoteInput, NotePatch, NotesStore};

use crate::support::{Backend, Failure, note};

#[tokio::test]
async fn load_replaces_items_in_server_order() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(3, "Third", "c"), note(1, "First", "a"), note(2, "Second", "b")]);
    let store = NotesStore::new(backend.client());

    store.load().await.unwrap();

    let state = store.snapshot();
    let ids: Vec<i64> = state.items.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn load_empty_list() {
    let backend = Backend::start().await;
    let store = NotesStore::new(backend.client());

    store.load().await.unwrap();

    let state = store.snapshot();
    assert!(state.items.is_empty());
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn loading_flag_only_while_fetching() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a")]);
    backend.set_delay(Duration::from_millis(150));
    let store = Arc::new(NotesStore::new(backend.client()));
    let mut rx = store.subscribe();

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().loading);

    task.await.unwrap().unwrap();
    assert!(!store.is_loading());
    assert_eq!(store.items().len(), 1);
}

#[tokio::test]
async fn failed_load_keeps_stale_items() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a"), note(2, "Second", "b")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();

    backend.fail_with(Failure::envelope(500, "DB_DOWN", "database unavailable"));
    let err = store.load().await.unwrap_err();

    assert_eq!(err.message, "database unavailable");
    assert_eq!(err.code, "DB_DOWN");
    assert_eq!(err.status_code, 500);

    let state = store.snapshot();
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.error.as_deref(), Some("database unavailable"));
    assert!(!state.loading);

    // A new load clears the old error
    backend.recover();
    store.load().await.unwrap();
    assert!(store.error().is_none());
}

#[tokio::test]
async fn create_shows_placeholder_then_confirmed_record() {
    let backend = Backend::start().await;
    backend.set_next_id(42);
    backend.set_delay(Duration::from_millis(150));
    let store = Arc::new(NotesStore::new(backend.client()));
    let mut rx = store.subscribe();

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.create(NoteInput::new("T", "C")).await }
    });

    rx.changed().await.unwrap();
    let pending = rx.borrow_and_update().clone();
    assert_eq!(pending.items.len(), 1);
    assert!(pending.items[0].id < 0, "placeholder should carry a temporary id");
    assert_eq!(pending.items[0].title, "T");
    assert!(!pending.loading);

    let created = task.await.unwrap().unwrap();
    assert_eq!(created, note(42, "T", "C"));
    assert_eq!(store.items(), vec![note(42, "T", "C")]);
}

#[tokio::test]
async fn create_keeps_placeholder_position() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a"), note(2, "Second", "b")]);
    backend.set_next_id(10);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();

    store.create(NoteInput::new("Third", "c")).await.unwrap();

    let ids: Vec<i64> = store.items().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 10]);
}

#[tokio::test]
async fn failed_create_removes_placeholder_and_reports() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();

    backend.fail_with(Failure::envelope(500, "500", "boom"));
    let err = store.create(NoteInput::new("T", "C")).await.unwrap_err();

    assert_eq!(err.message, "boom");
    let state = store.snapshot();
    assert_eq!(state.items, vec![note(1, "First", "a")]);
    assert_eq!(state.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn plain_text_error_gets_status_code() {
    let backend = Backend::start().await;
    let store = NotesStore::new(backend.client());

    backend.fail_with(Failure::PlainText(503));
    let err = store.create(NoteInput::new("Title", "Body")).await.unwrap_err();

    assert_eq!(err.code, "503");
    assert_eq!(err.status_code, 503);
    assert_eq!(err.message, "Service Unavailable");
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn concurrent_creates_never_duplicate_ids() {
    let backend = Backend::start().await;
    backend.set_delay(Duration::from_millis(20));
    let store = NotesStore::new(backend.client());

    let (a, b, c) = tokio::join!(
        store.create(NoteInput::new("Alpha", "1")),
        store.create(NoteInput::new("Beta", "2")),
        store.create(NoteInput::new("Gamma", "3")),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let mut ids: Vec<i64> = store.items().iter().map(|n| n.id).collect();
    assert!(ids.iter().all(|id| *id > 0));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn cancelled_create_reverts_without_error() {
    let backend = Backend::start().await;
    backend.set_delay(Duration::from_secs(5));
    let store = Arc::new(NotesStore::new(backend.client()));
    let mut rx = store.subscribe();
    let token = CancelToken::new();

    let task = tokio::spawn({
        let store = store.clone();
        let token = token.clone();
        async move { store.create_with(NoteInput::new("Later", "maybe"), Some(&token)).await }
    });

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().items.len(), 1);

    token.cancel();
    let err = task.await.unwrap().unwrap_err();

    assert!(err.is_cancelled());
    let state = store.snapshot();
    assert!(state.items.is_empty());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn abandoned_create_removes_placeholder() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();
    backend.set_delay(Duration::from_millis(300));

    let abandoned = timeout(Duration::from_millis(50), store.create(NoteInput::new("T", "C"))).await;

    assert!(abandoned.is_err());
    let state = store.snapshot();
    assert_eq!(state.items, vec![note(1, "First", "a")]);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn cancelled_load_keeps_items_and_clears_loading() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a")]);
    let store = Arc::new(NotesStore::new(backend.client()));
    store.load().await.unwrap();
    backend.seed_notes(vec![note(1, "First", "a"), note(2, "Second", "b")]);
    backend.set_delay(Duration::from_secs(5));
    let mut rx = store.subscribe();
    let token = CancelToken::new();

    let task = tokio::spawn({
        let store = store.clone();
        let token = token.clone();
        async move { store.load_with(Some(&token)).await }
    });

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().loading);

    token.cancel();
    let err = task.await.unwrap().unwrap_err();

    assert_eq!(err.code, codes::CANCELLED);
    let state = store.snapshot();
    assert_eq!(state.items, vec![note(1, "First", "a")]);
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn abandoned_load_does_not_stick_loading() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a")]);
    backend.set_delay(Duration::from_millis(300));
    let store = NotesStore::new(backend.client());

    assert!(timeout(Duration::from_millis(50), store.load()).await.is_err());
    assert!(!store.is_loading());

    backend.set_delay(Duration::ZERO);
    store.load().await.unwrap();

    let state = store.snapshot();
    assert!(!state.loading);
    assert_eq!(state.items, vec![note(1, "First", "a")]);
}

#[tokio::test]
async fn overlapping_loads_stay_loading_until_the_last_finishes() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "First", "a")]);
    backend.set_delay(Duration::from_millis(300));
    let store = Arc::new(NotesStore::new(backend.client()));
    let token = CancelToken::new();

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    let cancelled = tokio::spawn({
        let store = store.clone();
        let token = token.clone();
        async move { store.load_with(Some(&token)).await }
    });

    // Both requests are parked in the backend delay
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    assert!(cancelled.await.unwrap().unwrap_err().is_cancelled());
    assert!(store.is_loading());

    slow.await.unwrap().unwrap();
    assert!(!store.is_loading());
    assert_eq!(store.items().len(), 1);
}

#[tokio::test]
async fn update_keeps_optimistic_value_on_success() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "Title", "Body"), note(2, "Other", "x")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();

    let patch = NotePatch {
        title: Some("Renamed".to_string()),
        content: None,
    };
    let response = store.update(1, patch).await.unwrap();

    assert_eq!(response, Some(note(1, "Renamed", "Body")));
    assert_eq!(store.items(), vec![note(1, "Renamed", "Body"), note(2, "Other", "x")]);
}

#[tokio::test]
async fn failed_update_restores_snapshot() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "Title", "Body"), note(2, "Other", "x")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();

    backend.fail_with(Failure::envelope(422, "VALIDATION", "title taken"));
    let patch = NotePatch {
        title: Some("Renamed".to_string()),
        content: Some("Rewritten".to_string()),
    };
    let err = store.update(1, patch).await.unwrap_err();

    assert_eq!(err.status_code, 422);
    let state = store.snapshot();
    assert_eq!(state.items, vec![note(1, "Title", "Body"), note(2, "Other", "x")]);
    assert_eq!(state.error.as_deref(), Some("title taken"));
}

#[tokio::test]
async fn update_unknown_id_sends_nothing() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "Title", "Body")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();
    let before = backend.requests();

    let result = store
        .update(
            99,
            NotePatch {
                title: Some("Ghost".to_string()),
                content: None,
            },
        )
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(backend.requests(), before);
    assert_eq!(store.items(), vec![note(1, "Title", "Body")]);
}

#[tokio::test]
async fn cancelled_update_restores_snapshot() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "Title", "Body")]);
    let store = Arc::new(NotesStore::new(backend.client()));
    store.load().await.unwrap();
    backend.set_delay(Duration::from_secs(5));
    let mut rx = store.subscribe();
    let token = CancelToken::new();

    let task = tokio::spawn({
        let store = store.clone();
        let token = token.clone();
        async move {
            let patch = NotePatch {
                title: Some("Renamed".to_string()),
                content: None,
            };
            store.update_with(1, patch, Some(&token)).await
        }
    });

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().get(1).unwrap().title, "Renamed");

    token.cancel();
    assert!(task.await.unwrap().unwrap_err().is_cancelled());
    assert_eq!(store.items(), vec![note(1, "Title", "Body")]);
    assert!(store.error().is_none());
}

#[tokio::test]
async fn abandoned_update_restores_snapshot() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "Title", "Body")]);
    let store = NotesStore::new(backend.client());
    store.load().await.unwrap();
    backend.set_delay(Duration::from_millis(300));

    let patch = NotePatch {
        title: None,
        content: Some("Rewritten".to_string()),
    };
    assert!(timeout(Duration::from_millis(50), store.update(1, patch)).await.is_err());

    assert_eq!(store.items(), vec![note(1, "Title", "Body")]);
}

#[tokio::test]
async fn search_then_clear() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![
        note(1, "Rust ownership", "borrowing"),
        note(2, "Groceries", "milk & eggs"),
        note(3, "Async", "tokio and rust"),
    ]);
    let store = NotesStore::new(backend.client());

    store.search("rust").await.unwrap();
    let state = store.snapshot();
    assert_eq!(state.query.as_deref(), Some("rust"));
    let ids: Vec<i64> = state.items.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 3]);

    store.search("milk & eggs").await.unwrap();
    assert_eq!(store.items(), vec![note(2, "Groceries", "milk & eggs")]);

    store.clear_search().await.unwrap();
    let state = store.snapshot();
    assert!(state.query.is_none());
    assert_eq!(state.items.len(), 3);
}

#[tokio::test]
async fn blank_search_hits_bare_search_endpoint() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(1, "Rust ownership", "borrowing"), note(2, "Groceries", "milk")]);
    let store = NotesStore::new(backend.client());

    store.search("rust").await.unwrap();
    assert_eq!(store.snapshot().query.as_deref(), Some("rust"));

    store.search("").await.unwrap();
    assert!(store.snapshot().query.is_none());

    store.search("   ").await.unwrap();
    let state = store.snapshot();
    assert!(state.query.is_none());
    assert_eq!(state.items.len(), 2);

    assert_eq!(backend.searches(), vec![Some("rust".to_string()), None, None]);
}

#[tokio::test]
async fn non_json_success_is_invalid_response_type() {
    let backend = Backend::start().await;
    let store = NotesStore::new(backend.client());

    backend.fail_with(Failure::NotJson);
    let err = store.load().await.unwrap_err();

    assert_eq!(err.code, codes::INVALID_RESPONSE_TYPE);
    assert_eq!(err.kind(), ErrorKind::InvalidResponseType);
    assert_eq!(err.status_code, 200);
    assert!(err.message.contains("text/html"));
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let backend = Backend::start().await;
    let store = NotesStore::new(backend.client());

    backend.fail_with(Failure::BadJson);
    let err = store.load().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::JsonParse);
    assert_eq!(store.error(), Some(err.message));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let store = NotesStore::new(ApiClient::with_base_url("http://127.0.0.1:9").unwrap());

    let err = store.load().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.status_code, 0);
    assert!(store.error().is_some());
}

#[tokio::test]
async fn fetch_single_note() {
    let backend = Backend::start().await;
    backend.seed_notes(vec![note(5, "Five", "5")]);
    let client = backend.client();

    assert_eq!(client.fetch_note(5, None).await.unwrap(), note(5, "Five", "5"));

    let err = client.fetch_note(6, None).await.unwrap_err();
    assert_eq!(err.status_code, 404);
    assert_eq!(err.code, "NOT_FOUND");
    assert_eq!(err.message, "Note not found");
}
