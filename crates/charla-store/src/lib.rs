//! SQLite-backed persistence for chat sessions and messages.
//!
//! The `ConversationStore` is the sole writer of both tables; callers never
//! hold live references into the database across operations.

pub mod db;
pub mod migrations;
pub mod store;

pub use db::Database;
pub use store::ConversationStore;
