//! Streamed file hashing with per-path memoisation.
//!
//! SHA-256 is mandatory for every processed file; SHA-1 feeds the SPDX 2.3
//! checksum and verification code; MD5 exists for legacy consumers. All
//! digests are lowercase hex.

use heimdall_model::paths;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const BLOCK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha1,
    Md5,
}

/// Hashing service with a per-run memoisation cache.
///
/// The cache key is `(algorithm, canonical absolute path)` so relative
/// spellings and symlink aliases of the same file share one entry. The
/// service assumes a single mutator thread.
#[derive(Debug, Default)]
pub struct HashService {
    cache: HashMap<(HashAlgorithm, PathBuf), String>,
}

impl HashService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of the file at `path`, streamed in constant memory.
    pub fn file_digest(&mut self, algorithm: HashAlgorithm, path: &Path) -> io::Result<String> {
        let canonical = paths::canonicalize_or_input(path);
        let key = (algorithm, canonical);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }
        let file = File::open(&key.1)?;
        let digest = match algorithm {
            HashAlgorithm::Sha256 => digest_reader::<Sha256>(file)?,
            HashAlgorithm::Sha1 => digest_reader::<Sha1>(file)?,
            HashAlgorithm::Md5 => digest_reader::<Md5>(file)?,
        };
        self.cache.insert(key, digest.clone());
        Ok(digest)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// Digest of an in-memory byte sequence.
pub fn bytes_digest(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
        HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = D::new();
    let mut block = vec![0u8; BLOCK_SIZE];
    loop {
        let n = reader.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SPDX 2.3 package verification code: the SHA-1 of the concatenation, in
/// ascending lexical order, of the per-file SHA-1 hex digests. Files that
/// could not be hashed are listed by name in the documented excludes format.
pub fn verification_code(mut sha1_digests: Vec<String>, excluded_files: &[String]) -> String {
    sha1_digests.sort();
    let mut hasher = Sha1::new();
    for digest in &sha1_digests {
        hasher.update(digest.as_bytes());
    }
    let mut code = hex::encode(hasher.finalize());
    if !excluded_files.is_empty() {
        code.push_str(" (excludes: ");
        code.push_str(&excluded_files.join(", "));
        code.push(')');
    }
    code
}
