//! Mode configuration
//!
//! A vector's parameter map is validated once, eagerly, into a
//! [`ModeConfiguration`]. Each variant carries only the fields its mode uses;
//! a missing required field, a field the mode does not use, or a key the
//! engine does not know all fail construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConformanceError, Field, Result};
use crate::parser::decode_hex;
use crate::vector::{RawCounterParams, RawParams};

/// Mode identifiers understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeId {
    /// Electronic codebook
    Ecb,
    /// Cipher block chaining
    Cbc,
    /// Cipher feedback
    Cfb,
    /// Output feedback
    Ofb,
    /// Counter
    Ctr,
    /// Counter with CBC-MAC
    Ccm,
    /// EAX
    Eax,
    /// Synthetic IV
    Siv,
    /// Galois/counter mode
    Gcm,
    /// OpenPGP CFB variant
    #[serde(rename = "OPENPGP")]
    OpenPgp,
}

impl ModeId {
    /// Every mode, in corpus order
    pub const ALL: [ModeId; 10] = [
        ModeId::Ecb,
        ModeId::Cbc,
        ModeId::Cfb,
        ModeId::Ofb,
        ModeId::Ctr,
        ModeId::Ccm,
        ModeId::Eax,
        ModeId::Siv,
        ModeId::Gcm,
        ModeId::OpenPgp,
    ];

    /// Canonical upper-case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeId::Ecb => "ECB",
            ModeId::Cbc => "CBC",
            ModeId::Cfb => "CFB",
            ModeId::Ofb => "OFB",
            ModeId::Ctr => "CTR",
            ModeId::Ccm => "CCM",
            ModeId::Eax => "EAX",
            ModeId::Siv => "SIV",
            ModeId::Gcm => "GCM",
            ModeId::OpenPgp => "OPENPGP",
        }
    }

    /// Authenticated modes with a detached tag
    pub fn is_aead(&self) -> bool {
        matches!(self, ModeId::Ccm | ModeId::Eax | ModeId::Siv | ModeId::Gcm)
    }

    /// Modes whose payload need not be a whole number of blocks
    pub fn is_stream_like(&self) -> bool {
        matches!(
            self,
            ModeId::Cfb | ModeId::Ofb | ModeId::Ctr | ModeId::OpenPgp
        )
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeId {
    type Err = ConformanceError;

    fn from_str(s: &str) -> Result<Self> {
        ModeId::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConformanceError::UnsupportedMode(s.to_string()))
    }
}

/// CTR counter block construction
///
/// A counter block is `prefix ++ BE(counter, nbits / 8) ++ suffix`, and
/// the counter advances modulo `2^nbits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSpec {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    nbits: u32,
    initial_value: u128,
}

impl CounterSpec {
    /// Validate a counter layout for the given block size
    pub fn new(
        prefix: Vec<u8>,
        suffix: Vec<u8>,
        nbits: u32,
        initial_value: u128,
        block_size: usize,
    ) -> Result<Self> {
        if nbits == 0 || nbits % 8 != 0 || nbits > 128 {
            return Err(ConformanceError::invalid_config(
                ModeId::Ctr,
                format!("counter width {nbits} is not a whole number of bytes up to 128 bits"),
            ));
        }
        let width = (nbits / 8) as usize;
        if prefix.len() + width + suffix.len() != block_size {
            return Err(ConformanceError::invalid_config(
                ModeId::Ctr,
                format!(
                    "prefix ({}) + counter ({}) + suffix ({}) bytes must equal the block size {}",
                    prefix.len(),
                    width,
                    suffix.len(),
                    block_size
                ),
            ));
        }
        let spec = Self {
            prefix,
            suffix,
            nbits,
            initial_value,
        };
        if initial_value & !spec.mask() != 0 {
            return Err(ConformanceError::invalid_config(
                ModeId::Ctr,
                format!("initial value {initial_value} does not fit in {nbits} bits"),
            ));
        }
        Ok(spec)
    }

    /// Counter width in bits
    pub fn nbits(&self) -> u32 {
        self.nbits
    }

    /// Bytes preceding the counter
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Bytes following the counter
    pub fn suffix(&self) -> &[u8] {
        &self.suffix
    }

    /// First counter value
    pub fn initial_value(&self) -> u128 {
        self.initial_value
    }

    /// Counter block length in bytes
    pub fn block_len(&self) -> usize {
        self.prefix.len() + (self.nbits / 8) as usize + self.suffix.len()
    }

    fn mask(&self) -> u128 {
        if self.nbits >= 128 {
            u128::MAX
        } else {
            (1u128 << self.nbits) - 1
        }
    }

    /// Counter value used for the `i`-th block, wrapped to the counter width
    pub fn counter_value(&self, i: u128) -> u128 {
        self.initial_value.wrapping_add(i) & self.mask()
    }

    /// Full counter block for the `i`-th keystream block
    pub fn counter_block(&self, i: u128) -> Vec<u8> {
        let width = (self.nbits / 8) as usize;
        let value = self.counter_value(i).to_be_bytes();
        let mut block = Vec::with_capacity(self.block_len());
        block.extend_from_slice(&self.prefix);
        block.extend_from_slice(&value[16 - width..]);
        block.extend_from_slice(&self.suffix);
        block
    }

    fn from_raw(raw: &RawCounterParams, block_size: usize) -> Result<Self> {
        let prefix = match &raw.prefix {
            Some(p) => decode_hex(Field::CounterPrefix, p)?,
            None => Vec::new(),
        };
        let suffix = match &raw.suffix {
            Some(s) => decode_hex(Field::CounterSuffix, s)?,
            None => Vec::new(),
        };
        let free_bytes = block_size.saturating_sub(prefix.len() + suffix.len());
        let nbits = match raw.nbits {
            Some(n) => n,
            None => u32::try_from(free_bytes * 8).map_err(|_| {
                ConformanceError::invalid_config(ModeId::Ctr, "block size too large for a counter")
            })?,
        };
        let initial_value = u128::from(raw.initial_value.unwrap_or(1));
        Self::new(prefix, suffix, nbits, initial_value, block_size)
    }
}

/// Validated per-vector mode configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeConfiguration {
    /// Plain block mode; the default when a vector has no parameters
    Ecb,
    /// CBC with a one-block IV
    Cbc {
        /// Initialization vector
        iv: Vec<u8>,
    },
    /// CFB with a one-block IV and a feedback segment size
    Cfb {
        /// Initialization vector
        iv: Vec<u8>,
        /// Feedback size in bits
        segment_size_bits: u16,
    },
    /// OFB with a one-block IV
    Ofb {
        /// Initialization vector
        iv: Vec<u8>,
    },
    /// CTR with an explicit counter layout
    Ctr {
        /// Counter block construction
        counter: CounterSpec,
    },
    /// CCM with a 7 to 13 byte nonce
    Ccm {
        /// Nonce
        nonce: Vec<u8>,
    },
    /// EAX with an arbitrary-length nonce
    Eax {
        /// Nonce
        nonce: Vec<u8>,
    },
    /// GCM with an arbitrary-length nonce
    Gcm {
        /// Nonce
        nonce: Vec<u8>,
    },
    /// SIV; without a nonce the mode is fully deterministic
    Siv {
        /// Optional nonce, authenticated as the last header component
        nonce: Option<Vec<u8>>,
    },
    /// OpenPGP CFB with its encrypted IV prefix
    OpenPgp {
        /// Cleartext IV used for encryption
        iv: Vec<u8>,
        /// IV as transmitted, used for decryption
        encrypted_iv: Option<Vec<u8>>,
    },
}

impl ModeConfiguration {
    /// Validate a raw parameter map; `None` selects ECB
    pub fn from_raw(params: Option<&RawParams>, block_size: usize) -> Result<Self> {
        let Some(params) = params else {
            return Ok(ModeConfiguration::Ecb);
        };
        let mode: ModeId = params.mode.parse()?;

        if let Some(key) = params.extra.keys().next() {
            return Err(ConformanceError::invalid_config(
                mode,
                format!("unrecognised parameter `{key}`"),
            ));
        }
        let allowed: &[&str] = match mode {
            ModeId::Ecb => &[],
            ModeId::Cbc | ModeId::Ofb => &["iv"],
            ModeId::Cfb => &["iv", "segment_size"],
            ModeId::Ctr => &["ctr_params"],
            ModeId::Ccm | ModeId::Eax | ModeId::Gcm | ModeId::Siv => &["nonce"],
            ModeId::OpenPgp => &["iv", "encrypted_iv"],
        };
        let present = [
            ("iv", params.iv.is_some()),
            ("nonce", params.nonce.is_some()),
            ("segment_size", params.segment_size.is_some()),
            ("ctr_params", params.ctr_params.is_some()),
            ("encrypted_iv", params.encrypted_iv.is_some()),
        ];
        for (name, set) in present {
            if set && !allowed.contains(&name) {
                return Err(ConformanceError::invalid_config(
                    mode,
                    format!("parameter `{name}` does not apply to this mode"),
                ));
            }
        }

        let config = match mode {
            ModeId::Ecb => ModeConfiguration::Ecb,
            ModeId::Cbc => ModeConfiguration::Cbc {
                iv: block_iv(mode, params, block_size)?,
            },
            ModeId::Ofb => ModeConfiguration::Ofb {
                iv: block_iv(mode, params, block_size)?,
            },
            ModeId::Cfb => {
                let iv = block_iv(mode, params, block_size)?;
                let segment_size_bits = params.segment_size.unwrap_or(8);
                let block_bits = block_size * 8;
                if segment_size_bits == 0 || usize::from(segment_size_bits) > block_bits {
                    return Err(ConformanceError::invalid_config(
                        mode,
                        format!("segment size {segment_size_bits} outside 1..={block_bits} bits"),
                    ));
                }
                ModeConfiguration::Cfb {
                    iv,
                    segment_size_bits,
                }
            }
            ModeId::Ctr => {
                let raw = params
                    .ctr_params
                    .as_ref()
                    .ok_or_else(|| ConformanceError::invalid_config(mode, "missing `ctr_params`"))?;
                ModeConfiguration::Ctr {
                    counter: CounterSpec::from_raw(raw, block_size)?,
                }
            }
            ModeId::Ccm => {
                let nonce = required_nonce(mode, params)?;
                if !(7..=13).contains(&nonce.len()) {
                    return Err(ConformanceError::invalid_config(
                        mode,
                        format!("nonce must be 7 to 13 bytes, got {}", nonce.len()),
                    ));
                }
                ModeConfiguration::Ccm { nonce }
            }
            ModeId::Eax => ModeConfiguration::Eax {
                nonce: required_nonce(mode, params)?,
            },
            ModeId::Gcm => ModeConfiguration::Gcm {
                nonce: required_nonce(mode, params)?,
            },
            ModeId::Siv => ModeConfiguration::Siv {
                nonce: params
                    .nonce
                    .as_deref()
                    .map(|n| decode_hex(Field::Nonce, n))
                    .transpose()?,
            },
            ModeId::OpenPgp => {
                let iv = block_iv(mode, params, block_size)?;
                let encrypted_iv = match &params.encrypted_iv {
                    Some(text) => {
                        let eiv = decode_hex(Field::EncryptedIv, text)?;
                        if eiv.len() != block_size + 2 {
                            return Err(ConformanceError::invalid_config(
                                mode,
                                format!(
                                    "encrypted_iv must be {} bytes, got {}",
                                    block_size + 2,
                                    eiv.len()
                                ),
                            ));
                        }
                        Some(eiv)
                    }
                    None => None,
                };
                ModeConfiguration::OpenPgp { iv, encrypted_iv }
            }
        };
        Ok(config)
    }

    /// Mode identifier of this configuration
    pub fn mode_id(&self) -> ModeId {
        match self {
            ModeConfiguration::Ecb => ModeId::Ecb,
            ModeConfiguration::Cbc { .. } => ModeId::Cbc,
            ModeConfiguration::Cfb { .. } => ModeId::Cfb,
            ModeConfiguration::Ofb { .. } => ModeId::Ofb,
            ModeConfiguration::Ctr { .. } => ModeId::Ctr,
            ModeConfiguration::Ccm { .. } => ModeId::Ccm,
            ModeConfiguration::Eax { .. } => ModeId::Eax,
            ModeConfiguration::Gcm { .. } => ModeId::Gcm,
            ModeConfiguration::Siv { .. } => ModeId::Siv,
            ModeConfiguration::OpenPgp { .. } => ModeId::OpenPgp,
        }
    }

    /// True for modes with associated data and a detached tag
    pub fn is_aead(&self) -> bool {
        self.mode_id().is_aead()
    }
}

fn block_iv(mode: ModeId, params: &RawParams, block_size: usize) -> Result<Vec<u8>> {
    let text = params
        .iv
        .as_deref()
        .ok_or_else(|| ConformanceError::invalid_config(mode, "missing `iv`"))?;
    let iv = decode_hex(Field::Iv, text)?;
    if iv.len() != block_size {
        return Err(ConformanceError::invalid_config(
            mode,
            format!("iv must be {} bytes, got {}", block_size, iv.len()),
        ));
    }
    Ok(iv)
}

fn required_nonce(mode: ModeId, params: &RawParams) -> Result<Vec<u8>> {
    let text = params
        .nonce
        .as_deref()
        .ok_or_else(|| ConformanceError::invalid_config(mode, "missing `nonce`"))?;
    let nonce = decode_hex(Field::Nonce, text)?;
    if nonce.is_empty() {
        return Err(ConformanceError::invalid_config(mode, "empty nonce"));
    }
    Ok(nonce)
}
