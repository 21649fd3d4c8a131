//! Streaming content hasher with a fixed algorithm preference order.
//!
//! # Overview
//!
//! [`Hasher`] reads a file in sequential fixed-size chunks and feeds each
//! chunk into an incremental accumulator, producing a [`ContentDigest`].
//! Three algorithms are supported, preferred in this order:
//!
//! 1. `xxh3` - xxh3-128, fast non-cryptographic (Cargo feature `xxh3`)
//! 2. `blake3` - fast cryptographic (Cargo feature `blake3`)
//! 3. `sha256` - always compiled in, the guaranteed fallback
//!
//! # Example
//!
//! ```no_run
//! use rustdedup::scanner::{HashAlgorithm, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::preferred(), 64 * 1024).unwrap();
//! let digest = hasher.digest(Path::new("file.txt")).unwrap();
//! println!("{digest}");
//! ```

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use super::HashError;

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// xxh3-128 (non-cryptographic)
    Xxh3,
    /// BLAKE3
    Blake3,
    /// SHA-256
    Sha256,
}

impl HashAlgorithm {
    /// All algorithms in preference order.
    pub const PREFERENCE: [HashAlgorithm; 3] = [Self::Xxh3, Self::Blake3, Self::Sha256];

    /// The first algorithm available in this build.
    #[must_use]
    pub fn preferred() -> Self {
        Self::PREFERENCE
            .into_iter()
            .find(|a| a.is_available())
            .unwrap_or(Self::Sha256)
    }

    /// Whether the algorithm was compiled into this build.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::Xxh3 => cfg!(feature = "xxh3"),
            Self::Blake3 => cfg!(feature = "blake3"),
            Self::Sha256 => true,
        }
    }

    /// Size of the digest in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Xxh3 => 16,
            Self::Blake3 | Self::Sha256 => 32,
        }
    }

    /// Stable lowercase name, also used in the index metadata.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Xxh3 => "xxh3",
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xxh3" | "xxhash" => Ok(Self::Xxh3),
            "blake3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("Unknown hash algorithm: '{other}'")),
        }
    }
}

/// Requested algorithm is not compiled into this build.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("hash algorithm '{0}' is not available in this build")]
pub struct UnavailableAlgorithm(pub HashAlgorithm);

/// Digest of a file's full contents.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(Vec<u8>);

impl ContentDigest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        self.0.iter().fold(String::with_capacity(self.0.len() * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    /// Parse a hex string produced by [`to_hex`](Self::to_hex).
    ///
    /// Returns `None` for odd lengths or non-hex characters.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() % 2 != 0 {
            return None;
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| hex.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Self)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Incremental accumulator for one digest computation.
enum Accumulator {
    #[cfg(feature = "xxh3")]
    Xxh3(Box<xxhash_rust::xxh3::Xxh3>),
    #[cfg(feature = "blake3")]
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            #[cfg(feature = "xxh3")]
            HashAlgorithm::Xxh3 => Self::Xxh3(Box::new(xxhash_rust::xxh3::Xxh3::new())),
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            // Hasher::new rejects unavailable algorithms
            #[allow(unreachable_patterns)]
            _ => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            #[cfg(feature = "xxh3")]
            Self::Xxh3(h) => h.update(chunk),
            #[cfg(feature = "blake3")]
            Self::Blake3(h) => {
                h.update(chunk);
            }
            Self::Sha256(h) => h.update(chunk),
        }
    }

    fn finalize(self) -> ContentDigest {
        match self {
            #[cfg(feature = "xxh3")]
            Self::Xxh3(h) => ContentDigest(h.digest128().to_be_bytes().to_vec()),
            #[cfg(feature = "blake3")]
            Self::Blake3(h) => ContentDigest(h.finalize().as_bytes().to_vec()),
            Self::Sha256(h) => ContentDigest(h.finalize().to_vec()),
        }
    }
}

/// Streaming file hasher.
///
/// Holds no state between calls; one instance can be shared by every
/// worker thread.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl Hasher {
    /// Create a hasher for `algorithm` reading `buffer_size` bytes per chunk.
    ///
    /// A zero buffer size is clamped to 1 byte.
    ///
    /// # Errors
    ///
    /// Returns [`UnavailableAlgorithm`] if the algorithm is not compiled in.
    pub fn new(algorithm: HashAlgorithm, buffer_size: usize) -> Result<Self, UnavailableAlgorithm> {
        if !algorithm.is_available() {
            return Err(UnavailableAlgorithm(algorithm));
        }
        Ok(Self {
            algorithm,
            buffer_size: buffer_size.max(1),
        })
    }

    /// Algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Read buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Hash the entire contents of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails.
    pub fn digest(&self, path: &Path) -> Result<ContentDigest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut buffer = vec![0u8; self.buffer_size];
        let mut acc = Accumulator::new(self.algorithm);

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => acc.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        Ok(acc.finalize())
    }

    /// Hash an in-memory byte slice with the same algorithm.
    #[must_use]
    pub fn digest_bytes(&self, bytes: &[u8]) -> ContentDigest {
        let mut acc = Accumulator::new(self.algorithm);
        for chunk in bytes.chunks(self.buffer_size) {
            acc.update(chunk);
        }
        acc.finalize()
    }
}
