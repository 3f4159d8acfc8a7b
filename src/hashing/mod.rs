//! Exact digests used for import hashes.

/// Computes the MD5 digest of the given data and returns it as lowercase hex.
pub fn md5_digest(data: &[u8]) -> String {
    format!("{:032x}", md5::compute(data))
}
