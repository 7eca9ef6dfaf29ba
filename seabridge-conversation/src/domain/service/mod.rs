pub mod merge;
pub mod reconcile;
pub mod timeline;

pub use merge::{apply_edit, merge_message, merge_translation};
pub use reconcile::{TranslationCandidate, select_candidates};
pub use timeline::{Timeline, UpsertOutcome};
