//! Authenticated modes: GCM, CCM, EAX and SIV
//!
//! Every instance follows the same call order: associated data first, then
//! payload in the direction the instance was created for, then exactly one
//! `digest` or `verify`. Anything else is [`CipherError::InvalidState`].
//!
//! GCM with a 96-bit nonce and a 12 to 16 byte tag runs on the `aes-gcm`
//! crate. Other nonce lengths and tags of 4 to 11 bytes run on
//! [`GcmGeneric`], which `aes-gcm` cannot express.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::{U12, U13, U14, U15, U16};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{self, AeadInPlace, KeyInit};
use aes_gcm::AesGcm;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::block::{
    dbl, inc32, increment_be128, to_block, xor_in_place, AesBlock, Block, Keystream, BLOCK_LEN,
};
use super::mac::{Cmac, Ghash};
use crate::cipher::{CipherInstance, Direction};
use crate::error::{CipherError, CipherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AssociatedData,
    Payload,
    Finished,
}

/// Tracks where an AEAD instance is in its call sequence
#[derive(Debug)]
struct Sequence {
    direction: Direction,
    phase: Phase,
}

impl Sequence {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            phase: Phase::AssociatedData,
        }
    }

    fn associated_data(&self) -> CipherResult<()> {
        match self.phase {
            Phase::AssociatedData => Ok(()),
            _ => Err(CipherError::InvalidState(
                "associated data after payload".into(),
            )),
        }
    }

    fn payload(&mut self, direction: Direction) -> CipherResult<()> {
        if direction != self.direction {
            return Err(CipherError::InvalidState(format!(
                "instance was created for {:?}",
                self.direction
            )));
        }
        if self.phase == Phase::Finished {
            return Err(CipherError::InvalidState("payload after tag".into()));
        }
        self.phase = Phase::Payload;
        Ok(())
    }

    fn finish(&mut self, direction: Direction) -> CipherResult<()> {
        if direction != self.direction {
            return Err(CipherError::InvalidState(format!(
                "instance was created for {:?}",
                self.direction
            )));
        }
        if self.phase == Phase::Finished {
            return Err(CipherError::InvalidState("tag already produced".into()));
        }
        self.phase = Phase::Finished;
        Ok(())
    }
}

fn check_tag(expected: &[u8], received: &[u8]) -> CipherResult<()> {
    if bool::from(expected.ct_eq(received)) {
        Ok(())
    } else {
        Err(CipherError::AuthenticationFailure)
    }
}

fn tag_len_in(mode: &str, requested: Option<usize>, allowed: impl Fn(usize) -> bool) -> CipherResult<usize> {
    let len = requested.unwrap_or(BLOCK_LEN);
    if allowed(len) {
        Ok(len)
    } else {
        Err(CipherError::InvalidParameter(format!(
            "{mode} tag length of {len} bytes"
        )))
    }
}

/// GCM instance for `key`, on `aes-gcm` whenever it supports the shape
pub fn gcm(
    key: &[u8],
    nonce: &[u8],
    tag_len: Option<usize>,
    direction: Direction,
) -> CipherResult<Box<dyn CipherInstance>> {
    let len = tag_len_in("GCM", tag_len, |n| (4..=BLOCK_LEN).contains(&n))?;
    if nonce.len() == 12 {
        if let Some(backend) = GcmBackend::select(key.len(), len) {
            return Ok(Box::new(Gcm::new(key, nonce, backend, direction)));
        }
    }
    Ok(Box::new(GcmGeneric::new(
        AesBlock::new(key)?,
        nonce,
        Some(len),
        direction,
    )?))
}

type SealFn = fn(&[u8], &[u8], &[u8], &mut [u8]) -> CipherResult<Vec<u8>>;
type OpenFn = fn(&[u8], &[u8], &[u8], &mut [u8], &[u8]) -> CipherResult<()>;

/// One monomorphised `AesGcm<Aes*, U12, Tag*>`
#[derive(Clone, Copy)]
struct GcmBackend {
    seal: SealFn,
    open: OpenFn,
}

macro_rules! gcm_backend {
    ($aes:ty, $tag_len:expr) => {
        match $tag_len {
            12 => Some(GcmBackend::of::<AesGcm<$aes, U12, U12>>()),
            13 => Some(GcmBackend::of::<AesGcm<$aes, U12, U13>>()),
            14 => Some(GcmBackend::of::<AesGcm<$aes, U12, U14>>()),
            15 => Some(GcmBackend::of::<AesGcm<$aes, U12, U15>>()),
            16 => Some(GcmBackend::of::<AesGcm<$aes, U12, U16>>()),
            _ => None,
        }
    };
}

impl GcmBackend {
    fn of<C: KeyInit + AeadInPlace>() -> Self {
        Self {
            seal: seal::<C>,
            open: open::<C>,
        }
    }

    fn select(key_len: usize, tag_len: usize) -> Option<Self> {
        match key_len {
            16 => gcm_backend!(Aes128, tag_len),
            24 => gcm_backend!(Aes192, tag_len),
            32 => gcm_backend!(Aes256, tag_len),
            _ => None,
        }
    }
}

fn keyed<C: KeyInit>(key: &[u8]) -> CipherResult<C> {
    C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

fn nonce_for<C: AeadInPlace>(nonce: &[u8]) -> CipherResult<aead::Nonce<C>> {
    GenericArray::from_exact_iter(nonce.iter().copied()).ok_or_else(|| {
        CipherError::InvalidParameter(format!("GCM nonce of {} bytes", nonce.len()))
    })
}

fn seal<C: KeyInit + AeadInPlace>(
    key: &[u8],
    nonce: &[u8],
    associated_data: &[u8],
    buffer: &mut [u8],
) -> CipherResult<Vec<u8>> {
    let tag = keyed::<C>(key)?
        .encrypt_in_place_detached(&nonce_for::<C>(nonce)?, associated_data, buffer)
        .map_err(|_| CipherError::InvalidParameter("GCM input too long".into()))?;
    Ok(tag.to_vec())
}

fn open<C: KeyInit + AeadInPlace>(
    key: &[u8],
    nonce: &[u8],
    associated_data: &[u8],
    buffer: &mut [u8],
    tag: &[u8],
) -> CipherResult<()> {
    let tag: aead::Tag<C> = GenericArray::from_exact_iter(tag.iter().copied())
        .ok_or(CipherError::AuthenticationFailure)?;
    keyed::<C>(key)?
        .decrypt_in_place_detached(&nonce_for::<C>(nonce)?, associated_data, buffer, &tag)
        .map_err(|_| CipherError::AuthenticationFailure)
}

/// Galois/counter mode on `aes-gcm`
///
/// `aes-gcm` is one-shot, so the instance buffers associated data and
/// payload and reseals the whole payload on every call. The GCM keystream
/// does not depend on direction: `decrypt` reuses the seal to recover
/// plaintext and `verify` checks the tag through the crate's own open.
pub struct Gcm {
    key: Zeroizing<Vec<u8>>,
    nonce: Vec<u8>,
    backend: GcmBackend,
    associated_data: Vec<u8>,
    payload: Zeroizing<Vec<u8>>,
    sequence: Sequence,
}

impl Gcm {
    fn new(key: &[u8], nonce: &[u8], backend: GcmBackend, direction: Direction) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
            nonce: nonce.to_vec(),
            backend,
            associated_data: Vec::new(),
            payload: Zeroizing::new(Vec::new()),
            sequence: Sequence::new(direction),
        }
    }

    /// Seal everything buffered so far; returns the transformed payload and tag
    fn seal_all(&self) -> CipherResult<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        let mut buffer = Zeroizing::new(self.payload.to_vec());
        let tag = (self.backend.seal)(&self.key, &self.nonce, &self.associated_data, &mut buffer)?;
        Ok((buffer, tag))
    }

    fn push(&mut self, chunk: &[u8]) -> CipherResult<Vec<u8>> {
        let start = self.payload.len();
        self.payload.extend_from_slice(chunk);
        let (buffer, _) = self.seal_all()?;
        Ok(buffer[start..].to_vec())
    }
}

impl fmt::Debug for Gcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gcm")
            .field("key_bits", &(self.key.len() * 8))
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl CipherInstance for Gcm {
    fn update_associated_data(&mut self, data: &[u8]) -> CipherResult<()> {
        self.sequence.associated_data()?;
        self.associated_data.extend_from_slice(data);
        Ok(())
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Encrypt)?;
        self.push(plaintext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Decrypt)?;
        self.push(ciphertext)
    }

    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        self.sequence.finish(Direction::Encrypt)?;
        let (_, tag) = self.seal_all()?;
        Ok(tag)
    }

    fn verify(&mut self, tag: &[u8]) -> CipherResult<()> {
        self.sequence.finish(Direction::Decrypt)?;
        let mut buffer = Zeroizing::new(self.payload.to_vec());
        (self.backend.open)(&self.key, &self.nonce, &self.associated_data, &mut buffer, tag)
    }
}

/// Galois/counter mode for any nonce length and tags of 4 to 16 bytes
#[derive(Debug)]
pub struct GcmGeneric {
    cipher: AesBlock,
    hash_key: Block,
    j0: Block,
    counter: Block,
    keystream: Keystream,
    associated_data: Vec<u8>,
    ciphertext: Vec<u8>,
    tag_len: usize,
    sequence: Sequence,
}

impl GcmGeneric {
    /// New GCM instance; tags of 4 to 16 bytes
    pub fn new(
        cipher: AesBlock,
        nonce: &[u8],
        tag_len: Option<usize>,
        direction: Direction,
    ) -> CipherResult<Self> {
        if nonce.is_empty() {
            return Err(CipherError::InvalidParameter("empty GCM nonce".into()));
        }
        let tag_len = tag_len_in("GCM", tag_len, |n| (4..=BLOCK_LEN).contains(&n))?;
        let hash_key = cipher.encrypt_copy(&[0u8; BLOCK_LEN]);
        let j0 = if nonce.len() == 12 {
            let mut j0 = [0u8; BLOCK_LEN];
            j0[..12].copy_from_slice(nonce);
            j0[15] = 1;
            j0
        } else {
            let mut ghash = Ghash::new(&hash_key);
            ghash.update_padded(nonce);
            let mut lengths = [0u8; BLOCK_LEN];
            lengths[8..].copy_from_slice(&((nonce.len() as u64) * 8).to_be_bytes());
            ghash.update_block(&lengths);
            ghash.finalize()
        };
        Ok(Self {
            cipher,
            hash_key,
            j0,
            counter: j0,
            keystream: Keystream::new(),
            associated_data: Vec::new(),
            ciphertext: Vec::new(),
            tag_len,
            sequence: Sequence::new(direction),
        })
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        let Self {
            cipher,
            counter,
            keystream,
            ..
        } = self;
        keystream.apply(data, |block| {
            inc32(counter);
            *block = *counter;
            cipher.encrypt(block);
        });
    }

    fn tag(&self) -> Vec<u8> {
        let mut ghash = Ghash::new(&self.hash_key);
        ghash.update_padded(&self.associated_data);
        ghash.update_padded(&self.ciphertext);
        let mut lengths = [0u8; BLOCK_LEN];
        lengths[..8].copy_from_slice(&((self.associated_data.len() as u64) * 8).to_be_bytes());
        lengths[8..].copy_from_slice(&((self.ciphertext.len() as u64) * 8).to_be_bytes());
        ghash.update_block(&lengths);
        let mut tag = self.cipher.encrypt_copy(&self.j0);
        xor_in_place(&mut tag, &ghash.finalize());
        tag[..self.tag_len].to_vec()
    }
}

impl CipherInstance for GcmGeneric {
    fn update_associated_data(&mut self, data: &[u8]) -> CipherResult<()> {
        self.sequence.associated_data()?;
        self.associated_data.extend_from_slice(data);
        Ok(())
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Encrypt)?;
        let mut out = plaintext.to_vec();
        self.apply_keystream(&mut out);
        self.ciphertext.extend_from_slice(&out);
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Decrypt)?;
        self.ciphertext.extend_from_slice(ciphertext);
        let mut out = ciphertext.to_vec();
        self.apply_keystream(&mut out);
        Ok(out)
    }

    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        self.sequence.finish(Direction::Encrypt)?;
        Ok(self.tag())
    }

    fn verify(&mut self, tag: &[u8]) -> CipherResult<()> {
        self.sequence.finish(Direction::Decrypt)?;
        check_tag(&self.tag(), tag)
    }
}

/// Counter with CBC-MAC
#[derive(Debug)]
pub struct Ccm {
    cipher: AesBlock,
    nonce: Vec<u8>,
    tag_len: usize,
    associated_data: Vec<u8>,
    plaintext: Zeroizing<Vec<u8>>,
    next_counter: u64,
    keystream: Keystream,
    sequence: Sequence,
}

impl Ccm {
    /// New CCM instance; nonces of 7 to 13 bytes and even tags of 4 to 16 bytes
    pub fn new(
        cipher: AesBlock,
        nonce: &[u8],
        tag_len: Option<usize>,
        direction: Direction,
    ) -> CipherResult<Self> {
        if !(7..=13).contains(&nonce.len()) {
            return Err(CipherError::InvalidParameter(format!(
                "CCM nonce of {} bytes",
                nonce.len()
            )));
        }
        let tag_len = tag_len_in("CCM", tag_len, |n| (4..=16).contains(&n) && n % 2 == 0)?;
        Ok(Self {
            cipher,
            nonce: nonce.to_vec(),
            tag_len,
            associated_data: Vec::new(),
            plaintext: Zeroizing::new(Vec::new()),
            next_counter: 1,
            keystream: Keystream::new(),
            sequence: Sequence::new(direction),
        })
    }

    /// Width of the length field
    fn q(&self) -> usize {
        15 - self.nonce.len()
    }

    fn counter_block(nonce: &[u8], q: usize, i: u64) -> Block {
        let mut block = [0u8; BLOCK_LEN];
        block[0] = (q - 1) as u8;
        block[1..1 + nonce.len()].copy_from_slice(nonce);
        let index = u128::from(i).to_be_bytes();
        block[BLOCK_LEN - q..].copy_from_slice(&index[16 - q..]);
        block
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        let q = self.q();
        let Self {
            cipher,
            nonce,
            next_counter,
            keystream,
            ..
        } = self;
        let nonce: &[u8] = nonce;
        keystream.apply(data, |block| {
            *block = Self::counter_block(nonce, q, *next_counter);
            *next_counter += 1;
            cipher.encrypt(block);
        });
    }

    fn encode_associated_len(len: usize) -> Vec<u8> {
        let len = len as u64;
        if len == 0 {
            Vec::new()
        } else if len < 0xff00 {
            (len as u16).to_be_bytes().to_vec()
        } else if len <= u64::from(u32::MAX) {
            let mut out = vec![0xff, 0xfe];
            out.extend_from_slice(&(len as u32).to_be_bytes());
            out
        } else {
            let mut out = vec![0xff, 0xff];
            out.extend_from_slice(&len.to_be_bytes());
            out
        }
    }

    fn tag(&self) -> CipherResult<Vec<u8>> {
        let q = self.q();
        let payload_len = self.plaintext.len() as u128;
        if payload_len >> (8 * q) != 0 {
            return Err(CipherError::InvalidParameter(format!(
                "CCM payload of {payload_len} bytes does not fit a {q}-byte length field"
            )));
        }

        let mut b0 = [0u8; BLOCK_LEN];
        let adata = u8::from(!self.associated_data.is_empty());
        b0[0] = (adata << 6) | ((((self.tag_len - 2) / 2) as u8) << 3) | (q - 1) as u8;
        b0[1..1 + self.nonce.len()].copy_from_slice(&self.nonce);
        b0[BLOCK_LEN - q..].copy_from_slice(&payload_len.to_be_bytes()[16 - q..]);

        let mut mac = b0;
        self.cipher.encrypt(&mut mac);
        let mut absorb = |data: &[u8]| {
            for chunk in data.chunks(BLOCK_LEN) {
                xor_in_place(&mut mac, chunk);
                self.cipher.encrypt(&mut mac);
            }
        };
        if !self.associated_data.is_empty() {
            let mut header = Self::encode_associated_len(self.associated_data.len());
            header.extend_from_slice(&self.associated_data);
            absorb(&header);
        }
        absorb(self.plaintext.as_slice());

        let s0 = self
            .cipher
            .encrypt_copy(&Self::counter_block(&self.nonce, q, 0));
        xor_in_place(&mut mac, &s0);
        Ok(mac[..self.tag_len].to_vec())
    }
}

impl CipherInstance for Ccm {
    fn update_associated_data(&mut self, data: &[u8]) -> CipherResult<()> {
        self.sequence.associated_data()?;
        self.associated_data.extend_from_slice(data);
        Ok(())
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Encrypt)?;
        self.plaintext.extend_from_slice(plaintext);
        let mut out = plaintext.to_vec();
        self.apply_keystream(&mut out);
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Decrypt)?;
        let mut out = ciphertext.to_vec();
        self.apply_keystream(&mut out);
        self.plaintext.extend_from_slice(&out);
        Ok(out)
    }

    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        self.sequence.finish(Direction::Encrypt)?;
        self.tag()
    }

    fn verify(&mut self, tag: &[u8]) -> CipherResult<()> {
        self.sequence.finish(Direction::Decrypt)?;
        check_tag(&self.tag()?, tag)
    }
}

/// EAX mode
#[derive(Debug)]
pub struct Eax {
    cipher: AesBlock,
    cmac: Cmac,
    nonce_mac: Block,
    counter: Block,
    keystream: Keystream,
    associated_data: Vec<u8>,
    ciphertext: Vec<u8>,
    tag_len: usize,
    sequence: Sequence,
}

impl Eax {
    /// New EAX instance; tags of 2 to 16 bytes
    pub fn new(
        key: &[u8],
        nonce: &[u8],
        tag_len: Option<usize>,
        direction: Direction,
    ) -> CipherResult<Self> {
        let tag_len = tag_len_in("EAX", tag_len, |n| (2..=BLOCK_LEN).contains(&n))?;
        let cipher = AesBlock::new(key)?;
        let cmac = Cmac::new(key)?;
        let nonce_mac = Self::omac(&cmac, 0, nonce);
        Ok(Self {
            cipher,
            cmac,
            nonce_mac,
            counter: nonce_mac,
            keystream: Keystream::new(),
            associated_data: Vec::new(),
            ciphertext: Vec::new(),
            tag_len,
            sequence: Sequence::new(direction),
        })
    }

    /// CMAC with a one-block domain-separation prefix
    fn omac(cmac: &Cmac, domain: u8, data: &[u8]) -> Block {
        let mut prefix = [0u8; BLOCK_LEN];
        prefix[BLOCK_LEN - 1] = domain;
        cmac.compute(&[&prefix, data])
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        let Self {
            cipher,
            counter,
            keystream,
            ..
        } = self;
        keystream.apply(data, |block| {
            *block = *counter;
            increment_be128(counter);
            cipher.encrypt(block);
        });
    }

    fn tag(&self) -> Vec<u8> {
        let mut tag = self.nonce_mac;
        xor_in_place(&mut tag, &Self::omac(&self.cmac, 1, &self.associated_data));
        xor_in_place(&mut tag, &Self::omac(&self.cmac, 2, &self.ciphertext));
        tag[..self.tag_len].to_vec()
    }
}

impl CipherInstance for Eax {
    fn update_associated_data(&mut self, data: &[u8]) -> CipherResult<()> {
        self.sequence.associated_data()?;
        self.associated_data.extend_from_slice(data);
        Ok(())
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Encrypt)?;
        let mut out = plaintext.to_vec();
        self.apply_keystream(&mut out);
        self.ciphertext.extend_from_slice(&out);
        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Decrypt)?;
        self.ciphertext.extend_from_slice(ciphertext);
        let mut out = ciphertext.to_vec();
        self.apply_keystream(&mut out);
        Ok(out)
    }

    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        self.sequence.finish(Direction::Encrypt)?;
        Ok(self.tag())
    }

    fn verify(&mut self, tag: &[u8]) -> CipherResult<()> {
        self.sequence.finish(Direction::Decrypt)?;
        check_tag(&self.tag(), tag)
    }
}

/// Synthetic IV mode (RFC 5297)
///
/// The key is split in half: the first half keys S2V, the second half keys
/// the counter. Each `update_associated_data` call is one S2V component and
/// the nonce, when present, is authenticated last.
#[derive(Debug)]
pub struct Siv {
    ctr_cipher: AesBlock,
    cmac: Cmac,
    components: Vec<Vec<u8>>,
    nonce: Option<Vec<u8>>,
    synthetic_iv: Option<Block>,
    sequence: Sequence,
}

impl Siv {
    /// New SIV instance over a 32, 48 or 64 byte key
    pub fn new(
        key: &[u8],
        nonce: Option<&[u8]>,
        tag_len: Option<usize>,
        direction: Direction,
    ) -> CipherResult<Self> {
        if !matches!(key.len(), 32 | 48 | 64) {
            return Err(CipherError::InvalidKeyLength(key.len()));
        }
        tag_len_in("SIV", tag_len, |n| n == BLOCK_LEN)?;
        let (mac_key, ctr_key) = key.split_at(key.len() / 2);
        let cmac = Cmac::new(mac_key)?;
        let ctr_cipher = AesBlock::new(ctr_key)?;
        Ok(Self {
            ctr_cipher,
            cmac,
            components: Vec::new(),
            nonce: nonce.map(<[u8]>::to_vec),
            synthetic_iv: None,
            sequence: Sequence::new(direction),
        })
    }

    fn s2v(&self, plaintext: &[u8]) -> Block {
        let mac = |parts: &[&[u8]]| self.cmac.compute(parts);
        let mut d = mac(&[&[0u8; BLOCK_LEN]]);
        for component in self.components.iter().chain(self.nonce.iter()) {
            d = dbl(&d);
            xor_in_place(&mut d, &mac(&[component.as_slice()]));
        }
        if plaintext.len() >= BLOCK_LEN {
            let (head, tail) = plaintext.split_at(plaintext.len() - BLOCK_LEN);
            let mut last = [0u8; BLOCK_LEN];
            last.copy_from_slice(tail);
            xor_in_place(&mut last, &d);
            let v = mac(&[head, &last]);
            last.zeroize();
            v
        } else {
            let mut padded = [0u8; BLOCK_LEN];
            padded[..plaintext.len()].copy_from_slice(plaintext);
            padded[plaintext.len()] = 0x80;
            let mut t = dbl(&d);
            xor_in_place(&mut t, &padded);
            padded.zeroize();
            mac(&[&t])
        }
    }

    fn ctr(&self, synthetic_iv: &Block, data: &[u8]) -> Vec<u8> {
        let mut counter = *synthetic_iv;
        counter[8] &= 0x7f;
        counter[12] &= 0x7f;
        let mut out = data.to_vec();
        Keystream::new().apply(&mut out, |block| {
            *block = counter;
            increment_be128(&mut counter);
            self.ctr_cipher.encrypt(block);
        });
        out
    }
}

impl CipherInstance for Siv {
    fn update_associated_data(&mut self, data: &[u8]) -> CipherResult<()> {
        self.sequence.associated_data()?;
        self.components.push(data.to_vec());
        Ok(())
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        if self.synthetic_iv.is_some() {
            return Err(CipherError::InvalidState(
                "SIV encrypts a single message".into(),
            ));
        }
        self.sequence.payload(Direction::Encrypt)?;
        let v = self.s2v(plaintext);
        self.synthetic_iv = Some(v);
        Ok(self.ctr(&v, plaintext))
    }

    fn decrypt(&mut self, _ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        Err(CipherError::InvalidState(
            "SIV decryption needs the tag; use decrypt_and_verify".into(),
        ))
    }

    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        self.sequence.finish(Direction::Encrypt)?;
        let v = self
            .synthetic_iv
            .ok_or_else(|| CipherError::InvalidState("SIV digest before encrypt".into()))?;
        Ok(v.to_vec())
    }

    fn decrypt_and_verify(&mut self, ciphertext: &[u8], tag: &[u8]) -> CipherResult<Vec<u8>> {
        self.sequence.payload(Direction::Decrypt)?;
        self.sequence.finish(Direction::Decrypt)?;
        let v = to_block(tag).map_err(|_| CipherError::AuthenticationFailure)?;
        let mut plaintext = Zeroizing::new(self.ctr(&v, ciphertext));
        check_tag(&self.s2v(&plaintext), &v)?;
        Ok(std::mem::take(&mut *plaintext))
    }
}
