use sha2::{Digest, Sha256};

/// Generic SHA256 helper, returns a lowercase hex-encoded digest.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA256 fingerprint of `text` after collapsing whitespace runs.
///
/// Two readings with the same fingerprint tokenize identically.
pub fn text_fingerprint(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    sha256_hex(&collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_ignores_whitespace_layout() {
        assert_eq!(
            text_fingerprint("  the quick\n\tfox "),
            text_fingerprint("the quick fox")
        );
    }

    #[test]
    fn fingerprint_is_case_sensitive() {
        assert_ne!(text_fingerprint("The fox"), text_fingerprint("the fox"));
    }
}
