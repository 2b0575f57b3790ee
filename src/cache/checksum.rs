//! CRC32 checksums for cached artifact payloads
//!
//! Every read recomputes the checksum; a mismatch rejects the artifact.

use crc32fast::Hasher;

pub fn compute_checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

pub fn verify_checksum(payload: &[u8], expected: u32) -> bool {
    compute_checksum(payload) == expected
}
