// Generic record trait for anything the optimistic store can hold

use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use crate::error::ApiError;

/// Core trait that any storable record must implement
pub trait Record: Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Payload sent to the backend when creating a record
    type Input: Serialize + Clone + Debug + Send + Sync;

    /// Unique identifier. Server ids are positive, temporary ids negative.
    fn id(&self) -> i64;

    /// Collection name for this record type (e.g., "notes", "action-items")
    /// Determines the endpoint: /{collection}/
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Build the local stand-in shown while a create is in flight
    fn placeholder(id: i64, input: &Self::Input) -> Self
    where
        Self: Sized;
}

/// Client-side checks run before an input is submitted
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Endpoint for the whole collection
pub fn collection_path<R: Record>() -> String {
    format!("/{}/", R::collection_name())
}

/// Endpoint for a single record
pub fn record_path<R: Record>(id: i64) -> String {
    format!("/{}/{}", R::collection_name(), id)
}
