//! Part compression and content hashing.
//!
//! Every pack artifact is a zstd frame over a tightly packed little-endian
//! payload; the compressed file is the unit that gets hashed and listed in
//! the manifest.

use std::io;

use sha2::{Digest, Sha256};

/// Compression level the reference packs are built with. Level is part of
/// the determinism contract: same input and level, same bytes out.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// zstd-compress a raw payload.
pub fn compress(bytes: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::stream::encode_all(bytes, level)
}

/// Inverse of [`compress`].
pub fn decompress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::decode_all(bytes)
}

/// Lowercase hex SHA-256 of a buffer.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
