//! SHA256 content digests used as deduplication keys
//!
//! Both digests are lowercase hex strings. Row digests length-prefix each
//! field so that `("ab", "c")` and `("a", "bc")` never hash the same.

use sha2::{Digest, Sha256};

/// Digest over a whole file's bytes
pub fn file_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Digest over the four fields of a log record
pub fn row_digest(timestamp: &str, level: &str, module: &str, message: &str) -> String {
    row_digest_bytes([
        timestamp.as_bytes(),
        level.as_bytes(),
        module.as_bytes(),
        message.as_bytes(),
    ])
}

/// Digest over the undecoded bytes of timestamp, level, module and message
///
/// For UTF-8 fields this equals [`row_digest`] over the same text.
pub fn row_digest_bytes(fields: [&[u8]; 4]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    format!("{:x}", hasher.finalize())
}
