// Generic optimistic mutation store
//
// Mutations are applied locally before the request is sent, then reconciled
// with the response (confirmed record or server-side failure). All state lives
// in one watch channel so readers always see whole snapshots.

use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::cancel::CancelToken;
use crate::error::ApiError;
use crate::record::{Record, collection_path};

/// Snapshot of a store, as handed to readers
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<R> {
    /// Records in insertion order, at most one per id
    pub items: Vec<R>,
    /// True only while a load or search is in flight
    pub loading: bool,
    /// Message of the most recent failure
    pub error: Option<String>,
    /// Active search query, if the list is a search result.
    /// Only note searches set it; other stores leave it `None`.
    pub query: Option<String>,
}

impl<R> Default for StoreState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            query: None,
        }
    }
}

impl<R: Record> StoreState<R> {
    pub fn get(&self, id: i64) -> Option<&R> {
        self.items.iter().find(|r| r.id() == id)
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|r| r.id() == id)
    }

    fn fail(&mut self, err: &ApiError) {
        // A cancelled caller has lost interest; nothing to display
        if !err.is_cancelled() {
            self.error = Some(err.message.clone());
        }
    }
}

/// Optimistic store over one collection of records.
///
/// Owns its state exclusively. Operations take `&self`, so a store can be
/// shared (e.g. in an `Arc`) and operations may run concurrently; they are
/// not queued. Two in-flight mutations of the same id race and the last one
/// to complete decides the visible value.
pub struct Store<R: Record> {
    api: ApiClient,
    state: watch::Sender<StoreState<R>>,
    next_temp_id: AtomicI64,
    loads_in_flight: AtomicUsize,
}

impl<R: Record> Store<R> {
    pub fn new(api: ApiClient) -> Self {
        let (state, _rx) = watch::channel(StoreState::default());
        Self {
            api,
            state,
            next_temp_id: AtomicI64::new(-1),
            loads_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> StoreState<R> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreState<R>> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<R> {
        self.state.borrow().items.clone()
    }

    pub fn get(&self, id: i64) -> Option<R> {
        self.state.borrow().get(id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    pub(crate) fn set_query(&self, query: Option<String>) {
        self.state.send_if_modified(|s| {
            let changed = s.query != query;
            s.query = query;
            changed
        });
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Replace all items with the server's list
    pub async fn load(&self) -> Result<(), ApiError> {
        self.load_with(None).await
    }

    pub async fn load_with(&self, cancel: Option<&CancelToken>) -> Result<(), ApiError> {
        self.replace_from(&collection_path::<R>(), cancel).await
    }

    /// Alias for [`Store::load`]
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.load().await
    }

    /// Fetch a list from `endpoint` and install it wholesale.
    ///
    /// On failure the previous items stay in place.
    #[instrument(skip_all, fields(collection = R::collection_name(), op = %Uuid::now_v7()))]
    pub(crate) async fn replace_from(&self, endpoint: &str, cancel: Option<&CancelToken>) -> Result<(), ApiError> {
        debug!(endpoint, "Loading");

        self.state.send_modify(|s| {
            self.loads_in_flight.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
            s.error = None;
        });
        let pending = Pending::new(&self.state, |s: &mut StoreState<R>| {
            let remaining = self.loads_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.loading = remaining > 0;
        });

        let result = self.api.get::<Vec<R>>(endpoint, cancel).await;

        pending.finish(|s| match &result {
            Ok(items) => s.items = items.clone(),
            Err(err) => s.fail(err),
        });

        match result {
            Ok(items) => {
                info!(count = items.len(), "Loaded");
                Ok(())
            }
            Err(err) => {
                warn!(code = %err.code, error = %err, "Load failed");
                Err(err)
            }
        }
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Insert a placeholder, POST `input`, then swap in the confirmed record.
    ///
    /// Input validation is the caller's job (see [`crate::Validate`]).
    pub async fn create(&self, input: R::Input) -> Result<R, ApiError> {
        self.create_with(input, None).await
    }

    #[instrument(skip_all, fields(collection = R::collection_name(), op = %Uuid::now_v7()))]
    pub async fn create_with(&self, input: R::Input, cancel: Option<&CancelToken>) -> Result<R, ApiError> {
        let temp_id = self.insert_placeholder(&input);
        let pending = Pending::new(&self.state, move |s: &mut StoreState<R>| {
            s.items.retain(|r| r.id() != temp_id);
        });
        debug!(temp_id, "Inserted placeholder");

        let result = self.api.post::<R, _>(&collection_path::<R>(), &input, cancel).await;

        match result {
            Ok(created) => {
                pending.disarm();
                self.state.send_modify(|s| confirm_created(s, temp_id, created.clone()));
                info!(temp_id, id = created.id(), "Created");
                Ok(created)
            }
            Err(err) => {
                pending.finish(|s| s.fail(&err));
                warn!(temp_id, code = %err.code, error = %err, "Create failed, placeholder removed");
                Err(err)
            }
        }
    }

    /// Allocate a temporary id and append the placeholder in one step
    fn insert_placeholder(&self, input: &R::Input) -> i64 {
        let mut temp_id = 0;
        self.state.send_modify(|s| {
            temp_id = loop {
                let candidate = self.next_temp_id.fetch_sub(1, Ordering::SeqCst);
                if s.position(candidate).is_none() {
                    break candidate;
                }
            };
            s.items.push(R::placeholder(temp_id, input));
        });
        temp_id
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Optimistically apply `patch` to the record `id`, then await `request`.
    ///
    /// `request` is lazy: it is only polled after the patch is visible, and is
    /// dropped unpolled when no record has this id (returns `Ok(None)`).
    /// On success the optimistic value is kept and the server's response is
    /// returned; on failure the record is restored to its exact prior value.
    #[instrument(skip_all, fields(collection = R::collection_name(), op = %Uuid::now_v7(), id = id))]
    pub async fn mutate<T, F, Fut>(&self, id: i64, patch: F, request: Fut) -> Result<Option<T>, ApiError>
    where
        F: FnOnce(&mut R),
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut snapshot: Option<R> = None;
        self.state.send_if_modified(|s| match s.items.iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                snapshot = Some(record.clone());
                patch(record);
                true
            }
            None => false,
        });

        let Some(snapshot) = snapshot else {
            debug!("No record to update, skipping");
            return Ok(None);
        };
        let pending = Pending::new(&self.state, move |s: &mut StoreState<R>| {
            if let Some(pos) = s.position(id) {
                s.items[pos] = snapshot;
            }
        });

        match request.await {
            Ok(response) => {
                pending.disarm();
                info!("Updated");
                Ok(Some(response))
            }
            Err(err) => {
                pending.finish(|s| s.fail(&err));
                warn!(code = %err.code, error = %err, "Update failed, rolled back");
                Err(err)
            }
        }
    }
}

/// Reverts an optimistic step when dropped.
///
/// The success and failure paths settle it explicitly; anything else (the
/// caller dropping the operation mid-flight) runs `revert` from `Drop`.
struct Pending<'a, R, F: FnOnce(&mut StoreState<R>)> {
    state: &'a watch::Sender<StoreState<R>>,
    revert: Option<F>,
}

impl<'a, R, F: FnOnce(&mut StoreState<R>)> Pending<'a, R, F> {
    fn new(state: &'a watch::Sender<StoreState<R>>, revert: F) -> Self {
        Self {
            state,
            revert: Some(revert),
        }
    }

    /// Revert, then apply `then`, as one state change
    fn finish(mut self, then: impl FnOnce(&mut StoreState<R>)) {
        if let Some(revert) = self.revert.take() {
            self.state.send_modify(|s| {
                revert(s);
                then(s);
            });
        }
    }

    /// Keep the optimistic step
    fn disarm(mut self) {
        self.revert = None;
    }
}

impl<R, F: FnOnce(&mut StoreState<R>)> Drop for Pending<'_, R, F> {
    fn drop(&mut self) {
        if let Some(revert) = self.revert.take() {
            debug!("Operation abandoned, reverting");
            self.state.send_modify(revert);
        }
    }
}

/// Swap the placeholder for the confirmed record, keeping its position.
///
/// If a wholesale load already dropped the placeholder, the list is left as
/// the server sent it. If the confirmed id is already listed, the placeholder
/// is dropped instead so ids stay unique.
fn confirm_created<R: Record>(state: &mut StoreState<R>, temp_id: i64, created: R) {
    let Some(pos) = state.position(temp_id) else {
        return;
    };
    if state.position(created.id()).is_some() {
        state.items.remove(pos);
    } else {
        state.items[pos] = created;
    }
}
