//! Byte-exact comparison of observed against expected results
//!
//! Mismatches are collected, not thrown: a case keeps running its remaining
//! checks and reports every divergence at the end.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::error::{Field, Result};

/// Which check produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Forward direction against the corpus
    Encrypt,
    /// Reverse direction against the corpus
    Decrypt,
    /// decrypt(encrypt(P)) == P
    RoundTrip,
    /// A repeated run with a fresh instance gives the same output
    Determinism,
    /// CTR output equals plaintext XOR an independently built keystream
    Keystream,
    /// Decrypt with one tag bit flipped must fail authentication
    TamperedTag,
    /// Decrypt with one ciphertext bit flipped must fail authentication
    TamperedCiphertext,
    /// OpenPGP decrypt keyed by the observed encrypted IV
    IvResync,
}

impl Check {
    /// Snake-case name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Check::Encrypt => "encrypt",
            Check::Decrypt => "decrypt",
            Check::RoundTrip => "round_trip",
            Check::Determinism => "determinism",
            Check::Keystream => "keystream",
            Check::TamperedTag => "tampered_tag",
            Check::TamperedCiphertext => "tampered_ciphertext",
            Check::IvResync => "iv_resync",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed output differs from the expected output
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{description}: {check} check diverged on {field}: expected {expected}, observed {observed}")]
pub struct VerificationMismatch {
    /// Provenance of the vector
    pub description: String,
    /// Check that diverged
    pub check: Check,
    /// Field that diverged
    #[serde(serialize_with = "serialize_field")]
    pub field: Field,
    /// Expected value, hex encoded
    pub expected: String,
    /// Observed value, hex encoded (or the observed outcome)
    pub observed: String,
}

fn serialize_field<S: serde::Serializer>(field: &Field, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(field.as_str())
}

/// Collects mismatches for one case
#[derive(Debug)]
pub struct Verifier {
    description: String,
    mismatches: Vec<VerificationMismatch>,
    checks: usize,
}

impl Verifier {
    /// Verifier for the vector with this description
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            mismatches: Vec::new(),
            checks: 0,
        }
    }

    fn record(&mut self, check: Check, field: Field, expected: String, observed: String) {
        self.mismatches.push(VerificationMismatch {
            description: self.description.clone(),
            check,
            field,
            expected,
            observed,
        });
    }

    /// Require `observed` to equal `expected` exactly
    pub fn expect_bytes(&mut self, check: Check, field: Field, expected: &[u8], observed: &[u8]) -> bool {
        self.checks += 1;
        if expected == observed {
            return true;
        }
        self.record(check, field, hex::encode(expected), hex::encode(observed));
        false
    }

    /// Require a decryption to succeed with `expected`
    ///
    /// An authentication failure here is a mismatch, not an error: the
    /// inputs were the genuine ones.
    pub fn expect_plaintext(&mut self, check: Check, expected: &[u8], observed: Result<Vec<u8>>) -> Result<bool> {
        match observed {
            Ok(plaintext) => Ok(self.expect_bytes(check, Field::Plaintext, expected, &plaintext)),
            Err(e) if e.is_authentication_failure() => {
                self.checks += 1;
                self.record(
                    check,
                    Field::Tag,
                    "authentic".to_string(),
                    "authentication failure".to_string(),
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Require a decryption of tampered input to fail authentication
    ///
    /// Any released plaintext is a mismatch.
    pub fn expect_authentication_failure(
        &mut self,
        check: Check,
        field: Field,
        observed: Result<Vec<u8>>,
    ) -> Result<bool> {
        match observed {
            Err(e) if e.is_authentication_failure() => {
                self.checks += 1;
                Ok(true)
            }
            Ok(plaintext) => {
                self.checks += 1;
                self.record(
                    check,
                    field,
                    "authentication failure".to_string(),
                    format!("released plaintext {}", hex::encode(plaintext)),
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Number of comparisons made so far
    pub fn checks(&self) -> usize {
        self.checks
    }

    /// True if nothing diverged yet
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Consume the verifier, returning every mismatch
    pub fn finish(self) -> Vec<VerificationMismatch> {
        self.mismatches
    }
}
