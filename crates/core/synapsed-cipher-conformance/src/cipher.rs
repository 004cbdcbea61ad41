//! Contracts for the cipher under test
//!
//! The engine never implements a block cipher itself. It asks a
//! [`CipherProvider`] for a fresh [`CipherInstance`] per operation and drives
//! it through the calls below.

use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CipherError, CipherResult};
use crate::mode::ModeConfiguration;

/// Direction an instance is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Encryption
    Encrypt,
    /// Decryption
    Decrypt,
}

/// Code path a case asks the provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Acceleration {
    /// Portable implementation forced
    Portable,
    /// Accelerated implementation allowed
    Accelerated,
}

impl Acceleration {
    /// Short label used in case identifiers
    pub fn label(&self) -> &'static str {
        match self {
            Acceleration::Portable => "portable",
            Acceleration::Accelerated => "accelerated",
        }
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a provider needs to build one instance
#[derive(Debug, Clone, Copy)]
pub struct CipherRequest<'a> {
    /// Key bytes; the length selects the key-size variant
    pub key: &'a [u8],
    /// Validated mode configuration
    pub mode: &'a ModeConfiguration,
    /// Direction the instance will be used in
    pub direction: Direction,
    /// Requested tag length for AEAD modes
    pub tag_len: Option<usize>,
    /// Code path to exercise
    pub acceleration: Acceleration,
}

/// Factory for cipher instances
pub trait CipherProvider: Send + Sync {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Block size in bytes
    fn block_size(&self) -> usize;

    /// Build a fresh instance for one operation
    fn instantiate(&self, request: &CipherRequest<'_>) -> CipherResult<Box<dyn CipherInstance>>;
}

/// One configured cipher, used for a single operation and then dropped
///
/// AEAD instances expect the call order `update_associated_data*`, then the
/// payload call, then `digest` or `verify`.
pub trait CipherInstance: Send {
    /// Encrypt a chunk of payload
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>>;

    /// Decrypt a chunk of payload
    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>>;

    /// Authenticate one associated-data component
    fn update_associated_data(&mut self, _data: &[u8]) -> CipherResult<()> {
        Err(CipherError::Unsupported("associated data".into()))
    }

    /// Produce the tag after encryption
    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        Err(CipherError::Unsupported("digest".into()))
    }

    /// Check the tag after decryption
    fn verify(&mut self, _tag: &[u8]) -> CipherResult<()> {
        Err(CipherError::Unsupported("verify".into()))
    }

    /// Encrypt and produce the tag in one call
    fn encrypt_and_digest(&mut self, plaintext: &[u8]) -> CipherResult<(Vec<u8>, Vec<u8>)> {
        let ciphertext = self.encrypt(plaintext)?;
        let tag = self.digest()?;
        Ok((ciphertext, tag))
    }

    /// Decrypt and verify in one call; no plaintext is released on failure
    fn decrypt_and_verify(&mut self, ciphertext: &[u8], tag: &[u8]) -> CipherResult<Vec<u8>> {
        let mut plaintext = Zeroizing::new(self.decrypt(ciphertext)?);
        self.verify(tag)?;
        Ok(std::mem::take(&mut *plaintext))
    }
}
