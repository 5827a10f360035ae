//! Content fingerprints for early cutoff and cache validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

use crate::result::InternalError;

/// A 128-bit content fingerprint computed using XXH3.
///
/// Two values with the same `Fingerprint` are treated as equal for caching
/// purposes. Fingerprints are derived from content only, never from
/// timestamps or identity, so a file rewritten with the same bytes keeps its
/// fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// The fingerprint of "no value", used for absent files.
    pub const EMPTY: Fingerprint = Fingerprint([0; 16]);

    /// Computes a fingerprint from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a structural fingerprint of any serializable value.
    ///
    /// The value is encoded with `bincode` and the encoding is hashed. Values
    /// fingerprinted this way must serialize deterministically (ordered maps,
    /// no pointer identity).
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, InternalError> {
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| InternalError::new(format!("cannot fingerprint value: {e}")))?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Incremental builder for fingerprints over several parts.
///
/// Rules that fingerprint a semantic projection of their result (for example
/// an interface without source positions) feed only the relevant parts here.
pub struct Fingerprinter {
    state: Xxh3,
}

impl Fingerprinter {
    /// Creates an empty fingerprinter.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Feeds raw bytes.
    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        // length prefix keeps ("ab", "c") distinct from ("a", "bc")
        self.state.update(&(bytes.len() as u64).to_le_bytes());
        self.state.update(bytes);
        self
    }

    /// Feeds a string.
    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write(s.as_bytes())
    }

    /// Feeds another fingerprint.
    pub fn write_fingerprint(&mut self, fingerprint: Fingerprint) -> &mut Self {
        self.state.update(&fingerprint.0);
        self
    }

    /// Returns the combined fingerprint.
    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.state.digest128().to_le_bytes())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
