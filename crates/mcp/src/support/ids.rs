#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<prefix>_<16 hex>`; the digest covers `parts`, the clock, and a process counter.
pub(crate) fn new_id(prefix: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(crate::now_ms_i64().to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(ID_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(prefix.len() + 17);
    out.push_str(prefix);
    out.push('_');
    for byte in digest.iter().take(8) {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = new_id("chunk", &["s1", "same content"]);
        let b = new_id("chunk", &["s1", "same content"]);
        assert!(a.starts_with("chunk_"));
        assert_eq!(a.len(), "chunk_".len() + 16);
        assert_ne!(a, b);
    }
}
