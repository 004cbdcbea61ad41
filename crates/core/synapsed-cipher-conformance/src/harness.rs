//! Drives a cipher under test through one operation
//!
//! Every call asks the provider for a fresh instance and drops it before
//! returning, so no mode state (feedback register, running counter, MAC
//! state) can leak from one operation into the next.

use std::fmt;
use tracing::debug;

use crate::cipher::{Acceleration, CipherInstance, CipherProvider, CipherRequest, Direction};
use crate::error::{ConformanceError, Result};
use crate::mode::{CounterSpec, ModeConfiguration};

/// Result of an encrypt call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    /// OpenPGP encrypted-IV prefix, split off the front of the output
    pub prefix: Option<Vec<u8>>,
    /// Ciphertext payload
    pub ciphertext: Vec<u8>,
    /// Tag for AEAD modes
    pub tag: Option<Vec<u8>>,
}

/// Configures and runs a cipher under test
#[derive(Clone, Copy)]
pub struct CipherHarness<'p> {
    provider: &'p dyn CipherProvider,
    acceleration: Acceleration,
}

impl fmt::Debug for CipherHarness<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherHarness")
            .field("provider", &self.provider.name())
            .field("acceleration", &self.acceleration)
            .finish()
    }
}

impl<'p> CipherHarness<'p> {
    /// Harness for one provider and code path
    pub fn new(provider: &'p dyn CipherProvider, acceleration: Acceleration) -> Self {
        Self {
            provider,
            acceleration,
        }
    }

    /// Code path this harness requests
    pub fn acceleration(&self) -> Acceleration {
        self.acceleration
    }

    /// Provider under test
    pub fn provider(&self) -> &'p dyn CipherProvider {
        self.provider
    }

    fn instance(
        &self,
        key: &[u8],
        config: &ModeConfiguration,
        direction: Direction,
        tag_len: Option<usize>,
    ) -> Result<Box<dyn CipherInstance>> {
        if let ModeConfiguration::Cfb {
            segment_size_bits, ..
        } = config
        {
            if segment_size_bits % 8 != 0 {
                return Err(ConformanceError::NotSupported(format!(
                    "CFB with a {segment_size_bits}-bit segment"
                )));
            }
        }
        let request = CipherRequest {
            key,
            mode: config,
            direction,
            tag_len,
            acceleration: self.acceleration,
        };
        Ok(self.provider.instantiate(&request)?)
    }

    fn feed_associated_data(
        instance: &mut dyn CipherInstance,
        config: &ModeConfiguration,
        associated_data: Option<&[Vec<u8>]>,
    ) -> Result<()> {
        match (config.is_aead(), associated_data) {
            (true, Some(components)) => {
                for component in components {
                    instance.update_associated_data(component)?;
                }
                Ok(())
            }
            (true, None) => Ok(()),
            (false, Some(_)) => Err(ConformanceError::invalid_config(
                config.mode_id(),
                "associated data given to a mode without authentication",
            )),
            (false, None) => Ok(()),
        }
    }

    /// Encrypt `plaintext`; AEAD modes also return the tag
    pub fn encrypt(
        &self,
        key: &[u8],
        config: &ModeConfiguration,
        associated_data: Option<&[Vec<u8>]>,
        plaintext: &[u8],
        tag_len: Option<usize>,
    ) -> Result<Observed> {
        let mut instance = self.instance(key, config, Direction::Encrypt, tag_len)?;
        Self::feed_associated_data(instance.as_mut(), config, associated_data)?;

        let observed = match config {
            ModeConfiguration::OpenPgp { .. } => {
                let mut output = instance.encrypt(plaintext)?;
                let split = self.provider.block_size() + 2;
                if output.len() < split {
                    return Err(ConformanceError::invalid_config(
                        config.mode_id(),
                        format!(
                            "output of {} bytes is shorter than the encrypted IV prefix",
                            output.len()
                        ),
                    ));
                }
                let ciphertext = output.split_off(split);
                Observed {
                    prefix: Some(output),
                    ciphertext,
                    tag: None,
                }
            }
            _ if config.is_aead() => {
                let (ciphertext, tag) = instance.encrypt_and_digest(plaintext)?;
                Observed {
                    prefix: None,
                    ciphertext,
                    tag: Some(tag),
                }
            }
            _ => Observed {
                prefix: None,
                ciphertext: instance.encrypt(plaintext)?,
                tag: None,
            },
        };
        debug!(
            mode = %config.mode_id(),
            acceleration = %self.acceleration,
            len = plaintext.len(),
            "encrypted"
        );
        Ok(observed)
    }

    /// Decrypt `ciphertext`; AEAD modes verify `tag` and release nothing on failure
    pub fn decrypt(
        &self,
        key: &[u8],
        config: &ModeConfiguration,
        associated_data: Option<&[Vec<u8>]>,
        ciphertext: &[u8],
        tag: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let tag_len = tag.map(<[u8]>::len);
        let mut instance = self.instance(key, config, Direction::Decrypt, tag_len)?;
        Self::feed_associated_data(instance.as_mut(), config, associated_data)?;

        let plaintext = if config.is_aead() {
            let tag = tag.ok_or_else(|| {
                ConformanceError::invalid_config(config.mode_id(), "decryption needs a tag")
            })?;
            instance.decrypt_and_verify(ciphertext, tag)?
        } else {
            if tag.is_some() {
                return Err(ConformanceError::invalid_config(
                    config.mode_id(),
                    "tag given to a mode without authentication",
                ));
            }
            instance.decrypt(ciphertext)?
        };
        Ok(plaintext)
    }

    /// CTR keystream built block by block through an independent ECB instance
    pub fn keystream(&self, key: &[u8], counter: &CounterSpec, len: usize) -> Result<Vec<u8>> {
        let mut ecb = self.instance(key, &ModeConfiguration::Ecb, Direction::Encrypt, None)?;
        let block_size = self.provider.block_size();
        let blocks = len.div_ceil(block_size);
        let mut counters = Vec::with_capacity(blocks * block_size);
        for i in 0..blocks {
            counters.extend_from_slice(&counter.counter_block(i as u128));
        }
        let mut keystream = ecb.encrypt(&counters)?;
        keystream.truncate(len);
        Ok(keystream)
    }
}
