//! Content ids for writes that carry no path.

/// Lowercase blake3 hex digest of `bytes`.
pub fn content_id(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_stable() {
        let a = content_id(b"hello");
        assert_eq!(a, content_id(b"hello"));
        assert_ne!(a, content_id(b"hello!"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
