//! Reference AES provider
//!
//! Builds every mode on top of the `aes` block cipher, with GCM, GHASH and
//! CMAC from the `aes-gcm`, `ghash` and `cmac` crates, so the engine has a
//! known-good cipher to drive. The `aes` crate selects its backend when the
//! binary is built, so the requested [`Acceleration`] is recorded in traces
//! but does not switch implementations.
//!
//! [`Acceleration`]: crate::cipher::Acceleration

pub mod aead;
pub mod block;
pub mod classic;
pub mod mac;

use tracing::trace;

use crate::cipher::{CipherInstance, CipherProvider, CipherRequest};
use crate::error::CipherResult;
use crate::mode::ModeConfiguration;

pub use block::{AesBlock, BLOCK_LEN};

/// AES with all ten modes
#[derive(Debug, Clone, Copy, Default)]
pub struct AesProvider;

impl AesProvider {
    /// Create the provider
    pub fn new() -> Self {
        Self
    }
}

impl CipherProvider for AesProvider {
    fn name(&self) -> &str {
        "aes"
    }

    fn block_size(&self) -> usize {
        BLOCK_LEN
    }

    fn instantiate(&self, request: &CipherRequest<'_>) -> CipherResult<Box<dyn CipherInstance>> {
        trace!(
            mode = %request.mode.mode_id(),
            key_bits = request.key.len() * 8,
            direction = ?request.direction,
            acceleration = %request.acceleration,
            "instantiating AES"
        );

        let direction = request.direction;
        let tag_len = request.tag_len;
        let instance: Box<dyn CipherInstance> = match request.mode {
            ModeConfiguration::Ecb => Box::new(classic::Ecb::new(AesBlock::new(request.key)?)),
            ModeConfiguration::Cbc { iv } => {
                Box::new(classic::Cbc::new(AesBlock::new(request.key)?, iv)?)
            }
            ModeConfiguration::Cfb {
                iv,
                segment_size_bits,
            } => Box::new(classic::Cfb::new(
                AesBlock::new(request.key)?,
                iv,
                *segment_size_bits,
            )?),
            ModeConfiguration::Ofb { iv } => {
                Box::new(classic::Ofb::new(AesBlock::new(request.key)?, iv)?)
            }
            ModeConfiguration::Ctr { counter } => Box::new(classic::Ctr::new(
                AesBlock::new(request.key)?,
                counter.clone(),
            )?),
            ModeConfiguration::OpenPgp { iv, encrypted_iv } => Box::new(classic::OpenPgp::new(
                request.key,
                iv,
                encrypted_iv.as_deref(),
                direction,
            )?),
            ModeConfiguration::Gcm { nonce } => aead::gcm(request.key, nonce, tag_len, direction)?,
            ModeConfiguration::Ccm { nonce } => Box::new(aead::Ccm::new(
                AesBlock::new(request.key)?,
                nonce,
                tag_len,
                direction,
            )?),
            ModeConfiguration::Eax { nonce } => Box::new(aead::Eax::new(
                request.key,
                nonce,
                tag_len,
                direction,
            )?),
            ModeConfiguration::Siv { nonce } => Box::new(aead::Siv::new(
                request.key,
                nonce.as_deref(),
                tag_len,
                direction,
            )?),
        };
        Ok(instance)
    }
}
