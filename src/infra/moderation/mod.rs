// Infra implementations of the CommentStore port.

pub mod in_memory;
pub mod sqlite_store;

pub use in_memory::InMemoryCommentStore;
pub use sqlite_store::SqliteCommentStore;
