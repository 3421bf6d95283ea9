/*!
 * Caption model and the per-video caption collection.
 *
 * - `model`: caption rows, ids, row types and patches
 * - `interval_set`: the ordered, numbered collection for one video
 * - `document`: JSON files and SRT export
 */

pub mod document;
pub mod interval_set;
pub mod model;

pub use document::CaptionDocument;
pub use interval_set::{InsertPolicy, IntervalSet};
pub use model::{Caption, CaptionId, CaptionPatch, MediaSubject, RowType};
