//! Reserved identifiers.
//!
//! Used in place of an empty parent reference so consumers never see a blank
//! id field.

/// Parent run id used when a run has no parent.
pub const NONE_RUN_ID: &str = "00000000-0000-4000-8000-000000000000";

/// Parent block id used when a block has no parent.
pub const NONE_BLOCK_ID: &str = "00000000-0000-4000-8000-100000000000";

/// Parent content id used when a content item has no parent.
pub const NONE_CONTENT_ID: &str = "00000000-0000-4000-8000-200000000000";

/// Substitute `sentinel` when `id` is empty.
pub fn or_none(id: &str, sentinel: &str) -> String {
    if id.is_empty() {
        sentinel.to_string()
    } else {
        id.to_string()
    }
}

/// Whether `id` is one of the reserved identifiers.
pub fn is_reserved(id: &str) -> bool {
    matches!(id, NONE_RUN_ID | NONE_BLOCK_ID | NONE_CONTENT_ID)
}
