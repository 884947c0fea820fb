//! Cursor-based pagination for list endpoints.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Resolve effective page size, clamped to `[1, MAX_PAGE_SIZE]`.
pub fn effective_count(count: Option<u32>) -> u32 {
    count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Encode a numeric offset into an opaque cursor string.
pub fn encode_cursor(offset: u64) -> String {
    URL_SAFE_NO_PAD.encode(offset.to_string())
}

/// Decode a cursor string back to a numeric offset.
pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(cursor).ok()?;
    std::str::from_utf8(&bytes).ok()?.parse().ok()
}

/// One page of a list response.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Slice `items` at `offset`, returning at most `count` items and the next
/// cursor when more remain.
pub fn paginate<T>(items: Vec<T>, offset: u64, count: u32) -> Page<T> {
    let total = items.len();
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(total);
    let end = start.saturating_add(count as usize).min(total);
    let cursor = (end < total).then(|| encode_cursor(end as u64));
    let items = items.into_iter().skip(start).take(end - start).collect();
    Page { items, cursor }
}
