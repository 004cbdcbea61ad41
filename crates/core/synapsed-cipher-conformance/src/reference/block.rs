//! AES block primitive and shared block arithmetic

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CipherError, CipherResult};

/// AES block length in bytes
pub const BLOCK_LEN: usize = 16;

/// One AES block
pub type Block = [u8; BLOCK_LEN];

/// AES keyed for one of the three standard key sizes
pub enum AesBlock {
    /// 128-bit key
    Aes128(Aes128),
    /// 192-bit key
    Aes192(Aes192),
    /// 256-bit key
    Aes256(Aes256),
}

impl AesBlock {
    /// Key the block cipher; only 16, 24 and 32 byte keys are accepted
    pub fn new(key: &[u8]) -> CipherResult<Self> {
        let invalid = |_| CipherError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(key).map(Self::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            n => Err(CipherError::InvalidKeyLength(n)),
        }
    }

    /// Encrypt a block in place
    pub fn encrypt(&self, block: &mut Block) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.encrypt_block(block),
            Self::Aes192(c) => c.encrypt_block(block),
            Self::Aes256(c) => c.encrypt_block(block),
        }
    }

    /// Decrypt a block in place
    pub fn decrypt(&self, block: &mut Block) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.decrypt_block(block),
            Self::Aes192(c) => c.decrypt_block(block),
            Self::Aes256(c) => c.decrypt_block(block),
        }
    }

    /// Encrypt a copy of `block`
    pub fn encrypt_copy(&self, block: &Block) -> Block {
        let mut out = *block;
        self.encrypt(&mut out);
        out
    }
}

impl fmt::Debug for AesBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        };
        write!(f, "AesBlock({bits})")
    }
}

/// Copy a slice of exactly one block into a [`Block`]
pub fn to_block(bytes: &[u8]) -> CipherResult<Block> {
    Block::try_from(bytes).map_err(|_| {
        CipherError::InvalidParameter(format!(
            "expected a {BLOCK_LEN}-byte block, got {} bytes",
            bytes.len()
        ))
    })
}

/// XOR `src` into the front of `dst`
pub fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Doubling in GF(2^128) as used by CMAC and S2V
pub fn dbl(block: &Block) -> Block {
    let v = u128::from_be_bytes(*block);
    let carry = v >> 127;
    ((v << 1) ^ (carry * 0x87)).to_be_bytes()
}

/// Increment a block as one 128-bit big-endian integer
pub fn increment_be128(block: &mut Block) {
    *block = u128::from_be_bytes(*block).wrapping_add(1).to_be_bytes();
}

/// Increment the low 32 bits of a block, leaving the rest untouched
pub fn inc32(block: &mut Block) {
    let mut low = [0u8; 4];
    low.copy_from_slice(&block[12..]);
    let next = u32::from_be_bytes(low).wrapping_add(1);
    block[12..].copy_from_slice(&next.to_be_bytes());
}

/// Buffered keystream shared by the stream-like modes
///
/// Holds the last keystream block and how much of it is spent; `refill`
/// produces the next block when the current one runs out.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Keystream {
    block: Block,
    offset: usize,
}

impl Default for Keystream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Keystream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keystream")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl Keystream {
    /// Empty keystream; the first `apply` refills immediately
    pub fn new() -> Self {
        Self {
            block: [0u8; BLOCK_LEN],
            offset: BLOCK_LEN,
        }
    }

    /// Keystream whose first refill sees `seed` (OFB feeds back its register)
    pub fn seeded(seed: Block) -> Self {
        Self {
            block: seed,
            offset: BLOCK_LEN,
        }
    }

    /// XOR keystream into `data`
    pub fn apply<F>(&mut self, data: &mut [u8], mut refill: F)
    where
        F: FnMut(&mut Block),
    {
        for byte in data {
            if self.offset == BLOCK_LEN {
                refill(&mut self.block);
                self.offset = 0;
            }
            *byte ^= self.block[self.offset];
            self.offset += 1;
        }
    }

    /// True once a partial block has been consumed
    pub fn is_mid_block(&self) -> bool {
        self.offset != BLOCK_LEN && self.offset != 0
    }
}
