// Database module
// SQLite holds the append-only interaction and search effectiveness tables

pub mod sqlite;

pub use sqlite::*;
