// NoteStore - Optimistic client-side state for a Notes and Action Items REST API

pub mod action_items;
pub mod api;
pub mod cancel;
pub mod config;
pub mod error;
pub mod models;
pub mod notes;
pub mod record;
pub mod store;

// Re-export main types for convenience
pub use action_items::ActionItemsStore;
pub use api::ApiClient;
pub use cancel::CancelToken;
pub use config::Config;
pub use error::{ApiError, ErrorKind};
pub use models::{ActionItem, ActionItemInput, Note, NoteInput, NotePatch};
pub use notes::NotesStore;
pub use record::{Record, Validate};
pub use store::{Store, StoreState};
