//! File hashing utilities

use blake3::Hasher;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{PathContext, Result};
use crate::utils::config::HashingConsts;

/// Hash a file with blake3 and return `(hex digest, bytes hashed)`.
/// Uses memory-mapped I/O for files above threshold, chunked reading otherwise.
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).at(path)?;
    let size = file.metadata().at(path)?.len();
    let mut hasher = Hasher::new();

    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        // Memory-mapped I/O for large files (Blake3 already uses SIMD internally)
        let mmap = unsafe { Mmap::map(&file).at(path)? };
        hasher.update(&mmap);
    } else {
        let mut reader =
            std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buffer).at(path)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok((hasher.finalize().to_hex().to_string(), size))
}
