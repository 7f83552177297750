// Action item endpoints and the optimistic completion flow

use crate::api::ApiClient;
use crate::cancel::CancelToken;
use crate::error::ApiError;
use crate::models::ActionItem;
use crate::record::record_path;
use crate::store::Store;

impl ApiClient {
    /// `PUT /action-items/{id}/complete` with an empty object body
    pub async fn complete_action_item(&self, id: i64, cancel: Option<&CancelToken>) -> Result<ActionItem, ApiError> {
        let path = format!("{}/complete", record_path::<ActionItem>(id));
        self.put(&path, &serde_json::json!({}), cancel).await
    }
}

pub type ActionItemsStore = Store<ActionItem>;

impl Store<ActionItem> {
    /// Mark `id` completed locally, then confirm with the backend.
    ///
    /// Unknown ids are ignored (`Ok(None)`, no request). On failure the item
    /// is restored exactly as it was.
    pub async fn complete(&self, id: i64) -> Result<Option<ActionItem>, ApiError> {
        self.complete_with(id, None).await
    }

    pub async fn complete_with(&self, id: i64, cancel: Option<&CancelToken>) -> Result<Option<ActionItem>, ApiError> {
        let request = self.api().complete_action_item(id, cancel);
        self.mutate(id, |item| item.completed = true, request).await
    }
}
