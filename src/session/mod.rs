/*!
 * Caption edit sessions.
 *
 * This module provides:
 * - Entering add/edit mode on one caption at a time
 * - Staging field changes while the caption loops
 * - Commit with overlap check and persistence, or cancel with rollback
 */

pub mod edit_session;
pub mod models;

// Re-export main types
pub use edit_session::EditSession;
pub use models::{EditMode, EditSnapshot};
