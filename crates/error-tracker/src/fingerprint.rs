//! Stable fingerprints for grouping error occurrences.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Compute the fingerprint of an error.
///
/// Hashes `title|message|<first stack line>` with SHA-256 and keeps the first
/// 16 hex characters. Only the first line of the stack takes part, so the
/// same error thrown through different call paths still groups together.
/// Inputs are not normalized: messages that embed ids or timestamps produce
/// distinct fingerprints.
pub fn fingerprint(title: &str, message: &str, stack: Option<&str>) -> String {
    let first_line = stack.and_then(|s| s.lines().next()).unwrap_or("");

    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(message.as_bytes());
    hasher.update(b"|");
    hasher.update(first_line.as_bytes());

    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(FINGERPRINT_LEN);
    hash
}
