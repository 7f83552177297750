// Notes endpoints and note-specific store operations

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use crate::api::ApiClient;
use crate::cancel::CancelToken;
use crate::error::ApiError;
use crate::models::{Note, NotePatch};
use crate::record::record_path;
use crate::store::Store;

/// Characters left alone by JavaScript's `encodeURIComponent`
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `GET /notes/search/?q=...`, or the bare search endpoint for an empty query
pub fn search_path(query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("/notes/search/?q={}", utf8_percent_encode(q, QUERY_COMPONENT)),
        None => "/notes/search/".to_string(),
    }
}

impl ApiClient {
    pub async fn fetch_note(&self, id: i64, cancel: Option<&CancelToken>) -> Result<Note, ApiError> {
        self.get(&record_path::<Note>(id), cancel).await
    }

    pub async fn patch_note(&self, id: i64, patch: &NotePatch, cancel: Option<&CancelToken>) -> Result<Note, ApiError> {
        self.patch(&record_path::<Note>(id), patch, cancel).await
    }
}

pub type NotesStore = Store<Note>;

impl Store<Note> {
    /// Replace the list with the notes matching `query`
    pub async fn search(&self, query: &str) -> Result<(), ApiError> {
        self.search_with(query, None).await
    }

    pub async fn search_with(&self, query: &str, cancel: Option<&CancelToken>) -> Result<(), ApiError> {
        let query = query.trim();
        self.set_query((!query.is_empty()).then(|| query.to_string()));
        self.replace_from(&search_path(Some(query)), cancel).await
    }

    /// Forget the search and reload every note
    pub async fn clear_search(&self) -> Result<(), ApiError> {
        self.set_query(None);
        self.load().await
    }

    /// Optimistically apply `patch`, then `PATCH /notes/{id}`.
    ///
    /// Returns `Ok(None)` without a request when no note has this id.
    pub async fn update(&self, id: i64, patch: NotePatch) -> Result<Option<Note>, ApiError> {
        self.update_with(id, patch, None).await
    }

    pub async fn update_with(
        &self,
        id: i64,
        patch: NotePatch,
        cancel: Option<&CancelToken>,
    ) -> Result<Option<Note>, ApiError> {
        debug!(id, ?patch, "Updating note");
        let request = self.api().patch_note(id, &patch, cancel);
        self.mutate(id, |note| patch.apply(note), request).await
    }
}
