pub mod embed;
pub mod error;
pub mod ledger;
pub mod links;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

pub use error::KbError;

use chrono::{SecondsFormat, Utc};

/// Current UTC time as a fixed-width RFC 3339 string (microsecond precision,
/// trailing `Z`). Fixed width keeps lexicographic order identical to
/// chronological order, which the `updated` index relies on.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Decode a raw embedding blob back into f32s. Trailing bytes that do not
/// fill a whole f32 are ignored.
pub fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(std::mem::size_of::<f32>())
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
