/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Derive a filesystem-safe file stem from an arbitrary string key.
///
/// Keys such as `@scope/name@1.0.0` contain characters that are awkward or
/// invalid in file names on some platforms; the hex digest never is.
#[must_use]
pub fn key_file_stem(key: &str) -> String {
    blake3_bytes(key.as_bytes())
}
