//! cairn-server - HTTP layer for the cairn project tracker.
//!
//! The library half exists so integration tests can build the router
//! against an in-memory store; the binary in `main.rs` wires the same
//! router to SQLite and a TCP listener.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod sqlite;
pub mod state;

pub use routes::router;
pub use sqlite::SqliteStore;
pub use state::AppState;
