//! Skycoin address decoding.
//!
//! An address is the base58 (bitcoin alphabet) encoding of 25 bytes:
//! a 20-byte public key hash, a version byte, and a 4-byte checksum
//! taken from the SHA-256 of the key hash followed by the version.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

const KEY_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const ENCODED_LEN: usize = KEY_LEN + 1 + CHECKSUM_LEN;

/// Errors produced while decoding an address string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid base58 string")]
    InvalidBase58,

    #[error("Invalid address length")]
    InvalidLength,

    #[error("Address version invalid")]
    InvalidVersion,

    #[error("Invalid checksum")]
    InvalidChecksum,
}

/// A decoded skycoin address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    key: [u8; KEY_LEN],
    version: u8,
}

impl Address {
    /// Build an address from a public key hash. Only version 0 is valid.
    pub fn from_key_hash(key: [u8; KEY_LEN]) -> Self {
        Self { key, version: 0 }
    }

    /// Decode and verify a base58 address string.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::InvalidBase58);
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        if bytes.len() != ENCODED_LEN {
            return Err(AddressError::InvalidLength);
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes[..KEY_LEN]);
        let address = Self {
            key,
            version: bytes[KEY_LEN],
        };
        if address.version != 0 {
            return Err(AddressError::InvalidVersion);
        }
        if bytes[KEY_LEN + 1..] != address.checksum() {
            return Err(AddressError::InvalidChecksum);
        }

        Ok(address)
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update([self.version]);
        let digest = hasher.finalize();

        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[..CHECKSUM_LEN]);
        out
    }

    fn to_bytes(self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[..KEY_LEN].copy_from_slice(&self.key);
        out[KEY_LEN] = self.version;
        out[KEY_LEN + 1..].copy_from_slice(&self.checksum());
        out
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.to_bytes()).into_string())
    }
}
