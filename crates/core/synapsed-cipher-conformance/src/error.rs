//! Error types for the conformance engine
//!
//! Two layers are kept apart: [`CipherError`] is what a cipher under test
//! reports, [`ConformanceError`] is what the engine reports about a vector,
//! its configuration, or the collaborator it drives.

use std::fmt;
use thiserror::Error;

use crate::mode::ModeId;

/// Result type alias using the engine's error type
pub type Result<T> = std::result::Result<T, ConformanceError>;

/// Result type alias for cipher collaborator calls
pub type CipherResult<T> = std::result::Result<T, CipherError>;

/// Names a field of a conformance vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Cipher key
    Key,
    /// Plaintext payload
    Plaintext,
    /// Ciphertext payload
    Ciphertext,
    /// Associated data component(s)
    AssociatedData,
    /// Authentication tag
    Tag,
    /// Initialization vector
    Iv,
    /// Nonce
    Nonce,
    /// OpenPGP encrypted IV prefix
    EncryptedIv,
    /// CTR counter prefix
    CounterPrefix,
    /// CTR counter suffix
    CounterSuffix,
    /// CTR keystream
    Keystream,
}

impl Field {
    /// Lower-case name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Key => "key",
            Field::Plaintext => "plaintext",
            Field::Ciphertext => "ciphertext",
            Field::AssociatedData => "associated_data",
            Field::Tag => "tag",
            Field::Iv => "iv",
            Field::Nonce => "nonce",
            Field::EncryptedIv => "encrypted_iv",
            Field::CounterPrefix => "ctr_params.prefix",
            Field::CounterSuffix => "ctr_params.suffix",
            Field::Keystream => "keystream",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a cipher collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Tag verification failed; no plaintext may be released
    #[error("authentication failed: tag does not match")]
    AuthenticationFailure,

    /// Key length not accepted by the cipher
    #[error("invalid key length: {0} bytes")]
    InvalidKeyLength(usize),

    /// Mode parameter rejected by the cipher
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The cipher does not implement the requested feature
    #[error("unsupported by cipher: {0}")]
    Unsupported(String),

    /// Operation called out of order (e.g. associated data after payload)
    #[error("invalid call sequence: {0}")]
    InvalidState(String),
}

/// Errors raised by the conformance engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConformanceError {
    /// Corpus data cannot be decoded; aborts that case only
    #[error("malformed vector field `{field}`: {reason}")]
    MalformedVector {
        /// Field that failed to decode
        field: Field,
        /// What was wrong with it
        reason: String,
    },

    /// Mode identifier unknown to this engine
    #[error("unsupported mode `{0}`")]
    UnsupportedMode(String),

    /// Required field missing, irrelevant field present, or bad parameter value
    #[error("invalid {mode} configuration: {reason}")]
    InvalidConfiguration {
        /// Mode being configured
        mode: ModeId,
        /// What was wrong with it
        reason: String,
    },

    /// Feature the engine knowingly does not exercise
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Error reported by the cipher under test
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Corpus could not be loaded
    #[error("corpus error: {0}")]
    Corpus(String),

    /// Suite configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConformanceError {
    /// Create a malformed-vector error
    pub fn malformed<T: fmt::Display>(field: Field, reason: T) -> Self {
        Self::MalformedVector {
            field,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid-configuration error
    pub fn invalid_config<T: fmt::Display>(mode: ModeId, reason: T) -> Self {
        Self::InvalidConfiguration {
            mode,
            reason: reason.to_string(),
        }
    }

    /// Create a configuration loading error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a corpus loading error
    pub fn corpus<T: fmt::Display>(msg: T) -> Self {
        Self::Corpus(msg.to_string())
    }

    /// True if the cipher rejected a tag
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Cipher(CipherError::AuthenticationFailure))
    }

    /// True for the "not supported, expected" outcome, as opposed to a failure
    ///
    /// Only the engine decides this. A cipher that refuses a request it was
    /// handed is an error, never an expected skip.
    #[must_use]
    pub fn is_expected_unsupported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }
}
