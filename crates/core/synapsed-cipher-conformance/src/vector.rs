//! Conformance vector data model
//!
//! [`RawVector`] is the fixture shape stored in corpus files: hex strings plus
//! an optional parameter map, written either positionally
//! (`[plaintext, ciphertext, key, description?, params?]`) or as an object.
//! [`VectorRecord`] is the decoded, validated form produced once at load time.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::mode::{ModeConfiguration, ModeId};

/// One undecoded corpus record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawVector {
    /// Plaintext field (`"<ad>|<payload>"` for AEAD modes)
    pub plaintext: String,
    /// Ciphertext field (`"<ad>|<payload>|<tag>"` for AEAD modes)
    pub ciphertext: String,
    /// Hex-encoded key
    pub key: String,
    /// Provenance, used in failure reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Mode parameters; absent means ECB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RawParams>,
}

impl RawVector {
    /// Create a vector for the default (ECB) mode
    pub fn new(plaintext: impl Into<String>, ciphertext: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            plaintext: plaintext.into(),
            ciphertext: ciphertext.into(),
            key: key.into(),
            description: None,
            params: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach mode parameters
    pub fn with_params(mut self, params: RawParams) -> Self {
        self.params = Some(params);
        self
    }
}

/// Keyed form accepted alongside the positional one
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyedVector {
    plaintext: String,
    ciphertext: String,
    key: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    params: Option<RawParams>,
}

impl<'de> Deserialize<'de> for RawVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawVectorVisitor;

        impl<'de> Visitor<'de> for RawVectorVisitor {
            type Value = RawVector;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("[plaintext, ciphertext, key, description?, params?] or a vector object")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawVector, A::Error> {
                let plaintext = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let ciphertext = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let key = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let description = seq.next_element::<Option<String>>()?.flatten();
                let params = seq.next_element::<Option<RawParams>>()?.flatten();
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(6, &self));
                }
                Ok(RawVector {
                    plaintext,
                    ciphertext,
                    key,
                    description,
                    params,
                })
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RawVector, A::Error> {
                let keyed = KeyedVector::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(RawVector {
                    plaintext: keyed.plaintext,
                    ciphertext: keyed.ciphertext,
                    key: keyed.key,
                    description: keyed.description,
                    params: keyed.params,
                })
            }
        }

        deserializer.deserialize_any(RawVectorVisitor)
    }
}

/// Raw per-vector parameter map
///
/// Only the keys the engine knows are typed; anything else lands in `extra`
/// and is rejected when the [`ModeConfiguration`] is built, so a stray key
/// fails its own vector rather than the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawParams {
    /// Mode identifier, e.g. `"CBC"`
    pub mode: String,
    /// Hex IV (CBC, CFB, OFB, OPENPGP)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Hex nonce (CCM, EAX, GCM, SIV); `null` means absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// CFB feedback size in bits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_size: Option<u16>,
    /// CTR counter construction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctr_params: Option<RawCounterParams>,
    /// Hex OpenPGP encrypted IV
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_iv: Option<String>,
    /// Keys not recognised by the engine
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RawParams {
    /// Parameter map for the given mode with no fields set
    pub fn for_mode(mode: ModeId) -> Self {
        Self {
            mode: mode.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Set the IV
    pub fn iv(mut self, iv: impl Into<String>) -> Self {
        self.iv = Some(iv.into());
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Set the CFB segment size
    pub fn segment_size(mut self, bits: u16) -> Self {
        self.segment_size = Some(bits);
        self
    }

    /// Set the CTR counter parameters
    pub fn ctr_params(mut self, params: RawCounterParams) -> Self {
        self.ctr_params = Some(params);
        self
    }

    /// Set the OpenPGP encrypted IV
    pub fn encrypted_iv(mut self, encrypted_iv: impl Into<String>) -> Self {
        self.encrypted_iv = Some(encrypted_iv.into());
        self
    }
}

/// Raw CTR counter parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCounterParams {
    /// Counter width in bits; defaults to whatever prefix and suffix leave free
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbits: Option<u32>,
    /// Hex bytes preceding the counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Hex bytes following the counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// First counter value; defaults to 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<u64>,
}

/// Decoded payload of a vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Confidentiality-only modes
    Cipher {
        /// Expected plaintext
        plaintext: Vec<u8>,
        /// Expected ciphertext
        ciphertext: Vec<u8>,
    },
    /// Authenticated modes
    Aead {
        /// Associated-data components, authenticated in order
        associated_data: Vec<Vec<u8>>,
        /// Expected plaintext
        plaintext: Vec<u8>,
        /// Expected ciphertext
        ciphertext: Vec<u8>,
        /// Expected tag
        tag: Vec<u8>,
    },
}

impl Payload {
    /// Expected plaintext
    pub fn plaintext(&self) -> &[u8] {
        match self {
            Payload::Cipher { plaintext, .. } | Payload::Aead { plaintext, .. } => plaintext,
        }
    }

    /// Expected ciphertext
    pub fn ciphertext(&self) -> &[u8] {
        match self {
            Payload::Cipher { ciphertext, .. } | Payload::Aead { ciphertext, .. } => ciphertext,
        }
    }

    /// Expected tag, for AEAD payloads
    pub fn tag(&self) -> Option<&[u8]> {
        match self {
            Payload::Cipher { .. } => None,
            Payload::Aead { tag, .. } => Some(tag),
        }
    }

    /// Associated-data components, for AEAD payloads
    pub fn associated_data(&self) -> Option<&[Vec<u8>]> {
        match self {
            Payload::Cipher { .. } => None,
            Payload::Aead { associated_data, .. } => Some(associated_data),
        }
    }
}

/// One decoded conformance case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorRecord {
    /// Position in the corpus
    pub index: usize,
    /// Provenance text
    pub description: String,
    /// Cipher key; its length selects the key-size variant
    pub key: Vec<u8>,
    /// Validated mode configuration
    pub mode: ModeConfiguration,
    /// Expected inputs and outputs
    pub payload: Payload,
}

impl VectorRecord {
    /// Mode identifier of this record
    pub fn mode_id(&self) -> ModeId {
        self.mode.mode_id()
    }
}
