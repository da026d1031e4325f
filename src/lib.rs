// TaskList - task collection with filtered views and key-value persistence

pub mod blob;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod snapshot;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore};
pub use config::{Backend, Config};
pub use error::TaskError;
pub use filter::{Filter, FilterMode};
pub use models::{Priority, Task, TaskId};
pub use store::{DEFAULT_KEY, TaskStore};
pub use view::{EmptyReason, Stats, empty_reason, project, stats};
