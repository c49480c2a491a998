//! Repository Module
//!
//! Data access layer for the server.
//! Jobs are stored through the dispatcher's `JobStore`; everything else goes
//! through the `DirectoryStore`.

pub mod directory;
pub mod job;
pub mod pg_directory;

pub use directory::{DirectoryError, DirectoryStore, InMemoryDirectoryStore};
pub use job::PgJobStore;
pub use pg_directory::PgDirectoryStore;
