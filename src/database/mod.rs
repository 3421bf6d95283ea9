/*!
 * SQLite persistence for captions.
 *
 * - `connection`: opening the file and running work on the blocking pool
 * - `schema`: tables and version tracking
 * - `models`: row types
 * - `repository`: typed queries and the `CaptionStore` implementation
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{CaptionRecord, SubjectRecord};
pub use repository::Repository;
