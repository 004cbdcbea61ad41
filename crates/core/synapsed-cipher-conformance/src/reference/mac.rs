//! CMAC and GHASH, the MACs underneath EAX, SIV and GCM
//!
//! Thin wrappers over the RustCrypto `cmac` and `ghash` crates, shaped for
//! the block-sized values the AEAD constructions pass around.

use aes::{Aes128, Aes192, Aes256};
use cmac::Mac;
use ghash::universal_hash::{KeyInit, UniversalHash};
use ghash::GHash;
use std::fmt;

use super::block::{Block, BLOCK_LEN};
use crate::error::{CipherError, CipherResult};

/// AES-CMAC (OMAC1) keyed for one of the three key sizes
#[derive(Clone)]
pub enum Cmac {
    /// 128-bit key
    Aes128(cmac::Cmac<Aes128>),
    /// 192-bit key
    Aes192(cmac::Cmac<Aes192>),
    /// 256-bit key
    Aes256(cmac::Cmac<Aes256>),
}

impl Cmac {
    /// Key a CMAC; only 16, 24 and 32 byte keys are accepted
    pub fn new(key: &[u8]) -> CipherResult<Self> {
        let invalid = |_| CipherError::InvalidKeyLength(key.len());
        match key.len() {
            16 => <cmac::Cmac<Aes128> as Mac>::new_from_slice(key)
                .map(Self::Aes128)
                .map_err(invalid),
            24 => <cmac::Cmac<Aes192> as Mac>::new_from_slice(key)
                .map(Self::Aes192)
                .map_err(invalid),
            32 => <cmac::Cmac<Aes256> as Mac>::new_from_slice(key)
                .map(Self::Aes256)
                .map_err(invalid),
            n => Err(CipherError::InvalidKeyLength(n)),
        }
    }

    /// MAC of the concatenation of `parts`
    pub fn compute(&self, parts: &[&[u8]]) -> Block {
        match self {
            Self::Aes128(mac) => mac_parts(mac, parts),
            Self::Aes192(mac) => mac_parts(mac, parts),
            Self::Aes256(mac) => mac_parts(mac, parts),
        }
    }
}

fn mac_parts<M: Mac + Clone>(keyed: &M, parts: &[&[u8]]) -> Block {
    let mut mac = keyed.clone();
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

impl fmt::Debug for Cmac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmac").finish_non_exhaustive()
    }
}

/// Incremental GHASH over zero-padded blocks
#[derive(Clone)]
pub struct Ghash {
    inner: GHash,
}

impl Ghash {
    /// Start a GHASH with hash key `H`
    pub fn new(h: &Block) -> Self {
        Self {
            inner: GHash::new(ghash::Key::from_slice(h)),
        }
    }

    /// Absorb one full block
    pub fn update_block(&mut self, block: &Block) {
        self.inner.update_padded(block);
    }

    /// Absorb `data`, zero-padding the final partial block
    pub fn update_padded(&mut self, data: &[u8]) {
        self.inner.update_padded(data);
    }

    /// Current hash value
    pub fn finalize(&self) -> Block {
        let mut out = [0u8; BLOCK_LEN];
        out.copy_from_slice(&self.inner.clone().finalize());
        out
    }
}

impl fmt::Debug for Ghash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ghash").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const RFC4493_KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");

    #[test]
    fn test_cmac_rfc4493_empty() {
        let cmac = Cmac::new(&RFC4493_KEY).unwrap();
        assert_eq!(cmac.compute(&[]), hex!("bb1d6929e95937287fa37d129b756746"));
    }

    #[test]
    fn test_cmac_rfc4493_one_block() {
        let cmac = Cmac::new(&RFC4493_KEY).unwrap();
        let msg = hex!("6bc1bee22e409f96e93d7e117393172a");
        assert_eq!(cmac.compute(&[&msg]), hex!("070a16b46b4d4144f79bdd9dd04a287c"));
    }

    #[test]
    fn test_cmac_split_parts_match_whole() {
        let cmac = Cmac::new(&RFC4493_KEY).unwrap();
        let msg = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e5130c81c46a35ce411");
        assert_eq!(
            cmac.compute(&[&msg[..7], &msg[7..33], &msg[33..]]),
            cmac.compute(&[&msg])
        );
        assert_eq!(cmac.compute(&[&msg]), hex!("dfa66747de9ae63030ca32611497c827"));
    }

    #[test]
    fn test_cmac_rejects_bad_key() {
        assert!(matches!(
            Cmac::new(&[0u8; 20]),
            Err(CipherError::InvalidKeyLength(20))
        ));
    }

    #[test]
    fn test_ghash_gcm_case_2() {
        let mut ghash = Ghash::new(&hex!("66e94bd4ef8a2c3b884cfa59ca342b2e"));
        ghash.update_padded(&hex!("0388dace60b6a392f328c2b971b2fe78"));
        ghash.update_block(&hex!("00000000000000000000000000000080"));
        assert_eq!(ghash.finalize(), hex!("f38cbb1ad69223dcc3457ae5b6b0f885"));
    }

    #[test]
    fn test_ghash_pads_partial_block() {
        let mut ghash = Ghash::new(&hex!("66e94bd4ef8a2c3b884cfa59ca342b2e"));
        ghash.update_padded(&hex!("0102030405"));
        assert_eq!(ghash.finalize(), hex!("4f38d7d04adc967f89e4051319dbb8d2"));
        // finalize does not consume the running state
        assert_eq!(ghash.finalize(), hex!("4f38d7d04adc967f89e4051319dbb8d2"));
    }
}
