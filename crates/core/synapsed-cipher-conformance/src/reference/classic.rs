//! Confidentiality-only modes: ECB, CBC, CFB, OFB, CTR and OpenPGP CFB

use zeroize::Zeroize;

use super::block::{to_block, xor_in_place, AesBlock, Block, Keystream, BLOCK_LEN};
use crate::cipher::{CipherInstance, Direction};
use crate::error::{CipherError, CipherResult};
use crate::mode::CounterSpec;

fn require_whole_blocks(mode: &str, len: usize) -> CipherResult<()> {
    if len % BLOCK_LEN != 0 {
        return Err(CipherError::InvalidParameter(format!(
            "{mode} input of {len} bytes is not a multiple of the block size"
        )));
    }
    Ok(())
}

/// Electronic codebook
#[derive(Debug)]
pub struct Ecb {
    cipher: AesBlock,
}

impl Ecb {
    /// New ECB instance
    pub fn new(cipher: AesBlock) -> Self {
        Self { cipher }
    }
}

impl CipherInstance for Ecb {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        require_whole_blocks("ECB", plaintext.len())?;
        let mut out = plaintext.to_vec();
        for chunk in out.chunks_exact_mut(BLOCK_LEN) {
            let mut block = to_block(chunk)?;
            self.cipher.encrypt(&mut block);
            chunk.copy_from_slice(&block);
        }
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        require_whole_blocks("ECB", ciphertext.len())?;
        let mut out = ciphertext.to_vec();
        for chunk in out.chunks_exact_mut(BLOCK_LEN) {
            let mut block = to_block(chunk)?;
            self.cipher.decrypt(&mut block);
            chunk.copy_from_slice(&block);
        }
        Ok(out)
    }
}

/// Cipher block chaining
#[derive(Debug)]
pub struct Cbc {
    cipher: AesBlock,
    chain: Block,
}

impl Cbc {
    /// New CBC instance
    pub fn new(cipher: AesBlock, iv: &[u8]) -> CipherResult<Self> {
        Ok(Self {
            cipher,
            chain: to_block(iv)?,
        })
    }
}

impl CipherInstance for Cbc {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        require_whole_blocks("CBC", plaintext.len())?;
        let mut out = Vec::with_capacity(plaintext.len());
        for chunk in plaintext.chunks_exact(BLOCK_LEN) {
            xor_in_place(&mut self.chain, chunk);
            self.cipher.encrypt(&mut self.chain);
            out.extend_from_slice(&self.chain);
        }
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        require_whole_blocks("CBC", ciphertext.len())?;
        let mut out = Vec::with_capacity(ciphertext.len());
        for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
            let next = to_block(chunk)?;
            let mut block = next;
            self.cipher.decrypt(&mut block);
            xor_in_place(&mut block, &self.chain);
            out.extend_from_slice(&block);
            self.chain = next;
        }
        Ok(out)
    }
}

/// Cipher feedback with a whole-byte segment size
#[derive(Debug)]
pub struct Cfb {
    cipher: AesBlock,
    register: Block,
    segment: usize,
    finished: bool,
}

impl Cfb {
    /// New CFB instance; `segment_size_bits` must be a multiple of 8
    pub fn new(cipher: AesBlock, iv: &[u8], segment_size_bits: u16) -> CipherResult<Self> {
        let bits = usize::from(segment_size_bits);
        if bits == 0 || bits % 8 != 0 || bits > BLOCK_LEN * 8 {
            return Err(CipherError::Unsupported(format!(
                "CFB segment size of {segment_size_bits} bits"
            )));
        }
        Ok(Self {
            cipher,
            register: to_block(iv)?,
            segment: bits / 8,
            finished: false,
        })
    }

    fn process(&mut self, input: &[u8], direction: Direction) -> CipherResult<Vec<u8>> {
        if self.finished && !input.is_empty() {
            return Err(CipherError::InvalidState(
                "CFB input continued after a partial segment".into(),
            ));
        }
        let mut out = input.to_vec();
        for chunk in out.chunks_mut(self.segment) {
            let keystream = self.cipher.encrypt_copy(&self.register);
            let mut feedback = [0u8; BLOCK_LEN];
            let len = chunk.len();
            if direction == Direction::Decrypt {
                feedback[..len].copy_from_slice(chunk);
            }
            xor_in_place(chunk, &keystream[..len]);
            if direction == Direction::Encrypt {
                feedback[..len].copy_from_slice(chunk);
            }
            if len == self.segment {
                self.register.copy_within(self.segment.., 0);
                self.register[BLOCK_LEN - self.segment..].copy_from_slice(&feedback[..len]);
            } else {
                self.finished = true;
            }
        }
        Ok(out)
    }
}

impl CipherInstance for Cfb {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.process(plaintext, Direction::Encrypt)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.process(ciphertext, Direction::Decrypt)
    }
}

/// Output feedback
#[derive(Debug)]
pub struct Ofb {
    cipher: AesBlock,
    keystream: Keystream,
}

impl Ofb {
    /// New OFB instance
    pub fn new(cipher: AesBlock, iv: &[u8]) -> CipherResult<Self> {
        Ok(Self {
            cipher,
            keystream: Keystream::seeded(to_block(iv)?),
        })
    }
}

impl CipherInstance for Ofb {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let Self { cipher, keystream } = self;
        let mut out = plaintext.to_vec();
        keystream.apply(&mut out, |register| cipher.encrypt(register));
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.encrypt(ciphertext)
    }
}

/// Counter mode over an arbitrary counter layout
#[derive(Debug)]
pub struct Ctr {
    cipher: AesBlock,
    counter: CounterSpec,
    next: u128,
    keystream: Keystream,
}

impl Ctr {
    /// New CTR instance; the counter block must be exactly one block long
    pub fn new(cipher: AesBlock, counter: CounterSpec) -> CipherResult<Self> {
        if counter.block_len() != BLOCK_LEN {
            return Err(CipherError::InvalidParameter(format!(
                "counter block of {} bytes",
                counter.block_len()
            )));
        }
        Ok(Self {
            cipher,
            counter,
            next: 0,
            keystream: Keystream::new(),
        })
    }
}

impl CipherInstance for Ctr {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let Self {
            cipher,
            counter,
            next,
            keystream,
        } = self;
        let mut out = plaintext.to_vec();
        keystream.apply(&mut out, |block| {
            block.copy_from_slice(&counter.counter_block(*next));
            *next = next.wrapping_add(1);
            cipher.encrypt(block);
        });
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.encrypt(ciphertext)
    }
}

/// Length of the OpenPGP prefix: one block plus the two repeated check bytes
pub const OPENPGP_PREFIX_LEN: usize = BLOCK_LEN + 2;

/// OpenPGP CFB
///
/// Encryption emits the encrypted IV prefix ahead of the first ciphertext
/// bytes. Decryption is keyed by that prefix (or derives it from the
/// cleartext IV) and expects ciphertext without it.
#[derive(Debug)]
pub struct OpenPgp {
    body: Cfb,
    prefix: Option<Vec<u8>>,
    direction: Direction,
}

impl OpenPgp {
    /// New OpenPGP instance
    pub fn new(
        key: &[u8],
        iv: &[u8],
        encrypted_iv: Option<&[u8]>,
        direction: Direction,
    ) -> CipherResult<Self> {
        let iv = to_block(iv)?;
        let prefix = match (direction, encrypted_iv) {
            (Direction::Decrypt, Some(eiv)) => {
                if eiv.len() != OPENPGP_PREFIX_LEN {
                    return Err(CipherError::InvalidParameter(format!(
                        "encrypted IV of {} bytes",
                        eiv.len()
                    )));
                }
                let mut check = Cfb::new(AesBlock::new(key)?, &[0u8; BLOCK_LEN], 128)?
                    .decrypt(eiv)?;
                let intact = check[BLOCK_LEN - 2..BLOCK_LEN] == check[BLOCK_LEN..];
                check.zeroize();
                if !intact {
                    return Err(CipherError::InvalidParameter(
                        "encrypted IV failed its quick check".into(),
                    ));
                }
                eiv.to_vec()
            }
            _ => {
                let mut repeated = [0u8; OPENPGP_PREFIX_LEN];
                repeated[..BLOCK_LEN].copy_from_slice(&iv);
                repeated[BLOCK_LEN..].copy_from_slice(&iv[BLOCK_LEN - 2..]);
                Cfb::new(AesBlock::new(key)?, &[0u8; BLOCK_LEN], 128)?.encrypt(&repeated)?
            }
        };
        let body = Cfb::new(AesBlock::new(key)?, &prefix[2..], 128)?;
        let prefix = (direction == Direction::Encrypt).then_some(prefix);
        Ok(Self {
            body,
            prefix,
            direction,
        })
    }
}

impl CipherInstance for OpenPgp {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        if self.direction != Direction::Encrypt {
            return Err(CipherError::InvalidState(
                "OpenPGP instance was created for decryption".into(),
            ));
        }
        let mut out = self.prefix.take().unwrap_or_default();
        out.extend(self.body.encrypt(plaintext)?);
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        if self.direction != Direction::Decrypt {
            return Err(CipherError::InvalidState(
                "OpenPGP instance was created for encryption".into(),
            ));
        }
        self.body.decrypt(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const IV: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");
    const PT: [u8; 32] = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");

    fn aes() -> AesBlock {
        AesBlock::new(&KEY).unwrap()
    }

    #[test]
    fn test_cbc_f21_two_blocks() {
        let mut cbc = Cbc::new(aes(), &IV).unwrap();
        assert_eq!(
            cbc.encrypt(&PT).unwrap(),
            hex!("7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2")
        );
    }

    #[test]
    fn test_ecb_rejects_partial_block() {
        let mut ecb = Ecb::new(aes());
        assert!(matches!(
            ecb.encrypt(&PT[..15]),
            Err(CipherError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_cfb8_streams_across_calls() {
        let whole = Cfb::new(aes(), &IV, 8).unwrap().encrypt(&PT).unwrap();
        let mut split = Cfb::new(aes(), &IV, 8).unwrap();
        let mut out = split.encrypt(&PT[..5]).unwrap();
        out.extend(split.encrypt(&PT[5..]).unwrap());
        assert_eq!(out, whole);
        assert_eq!(&whole[..2], &hex!("3b79"));
    }

    #[test]
    fn test_cfb_partial_segment_ends_stream() {
        let mut cfb = Cfb::new(aes(), &IV, 128).unwrap();
        cfb.encrypt(&PT[..20]).unwrap();
        assert!(matches!(cfb.encrypt(&PT[20..]), Err(CipherError::InvalidState(_))));
    }

    #[test]
    fn test_cfb1_unsupported() {
        assert!(matches!(
            Cfb::new(aes(), &IV, 1),
            Err(CipherError::Unsupported(_))
        ));
    }

    #[test]
    fn test_ofb_partial_block() {
        let mut ofb = Ofb::new(aes(), &IV).unwrap();
        assert_eq!(ofb.encrypt(&PT[..20]).unwrap(), hex!("3b3fd92eb72dad20333449f8e83cfb4a7789508d"));
    }

    #[test]
    fn test_ctr_wraps_counter() {
        let spec = CounterSpec::new(vec![0xab; 15], vec![], 8, 0xff, 16).unwrap();
        let mut ctr = Ctr::new(aes(), spec).unwrap();
        let out = ctr.encrypt(&[0u8; 32]).unwrap();

        let mut first = [0xabu8; 16];
        first[15] = 0xff;
        let mut second = [0xabu8; 16];
        second[15] = 0x00;
        let cipher = aes();
        assert_eq!(&out[..16], &cipher.encrypt_copy(&first));
        assert_eq!(&out[16..], &cipher.encrypt_copy(&second));
    }

    #[test]
    fn test_openpgp_round_trip_through_prefix() {
        let key = hex!("5baa61e4c9b93f3f0682250b6cf8331b");
        let iv = hex!("3d7d3e62282add7eb203eeba5c800733");
        let pt = hex!("ac18620270744fb4f647426c61636b4361745768697465436174");
        let mut enc = OpenPgp::new(&key, &iv, None, Direction::Encrypt).unwrap();
        let out = enc.encrypt(&pt).unwrap();
        assert_eq!(&out[..OPENPGP_PREFIX_LEN], &hex!("fd934601ef49cb58b6d9aebca6056bdb96ef"));
        assert_eq!(&out[OPENPGP_PREFIX_LEN..], &hex!("dc6b9e1f095de609765c59983db5956ae4f63aea7405389d2ebb"));

        let mut dec =
            OpenPgp::new(&key, &iv, Some(&out[..OPENPGP_PREFIX_LEN]), Direction::Decrypt).unwrap();
        assert_eq!(dec.decrypt(&out[OPENPGP_PREFIX_LEN..]).unwrap(), pt);
    }

    #[test]
    fn test_openpgp_quick_check() {
        let key = hex!("5baa61e4c9b93f3f0682250b6cf8331b");
        let iv = hex!("3d7d3e62282add7eb203eeba5c800733");
        let mut bad = hex!("fd934601ef49cb58b6d9aebca6056bdb96ef");
        bad[17] ^= 1;
        assert!(matches!(
            OpenPgp::new(&key, &iv, Some(&bad), Direction::Decrypt),
            Err(CipherError::InvalidParameter(_))
        ));
    }
}
