use aicon_db::models::ContentFingerprint;

/// Fingerprint source bytes: BLAKE3 hex digest plus byte length.
pub fn fingerprint(bytes: &[u8]) -> ContentFingerprint {
    ContentFingerprint {
        hash: blake3::hash(bytes).to_hex().to_string(),
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
    }
}
