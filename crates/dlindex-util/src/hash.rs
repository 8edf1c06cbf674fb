use md5::Md5;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of a byte slice, returning a lowercase hex string.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the MD5 of a byte slice as lowercase hex.
///
/// This is what S3 reports as the ETag of a single-part upload.
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Strip the quotes S3 wraps around ETag values.
pub fn normalize_etag(etag: &str) -> &str {
    etag.trim().trim_matches('"')
}
