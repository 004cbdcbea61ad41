//! Per-case execution
//!
//! [`execute`] runs every check that applies to one vector and returns the
//! mismatches it found. Errors that stop a case (a bad configuration, a
//! cipher that refuses the request) come back as `Err`.

use serde::Serialize;

use crate::config::SuiteConfig;
use crate::error::{ConformanceError, Field, Result};
use crate::harness::CipherHarness;
use crate::mode::ModeConfiguration;
use crate::vector::{Payload, VectorRecord};
use crate::verifier::{Check, VerificationMismatch, Verifier};

/// What running one case produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Every divergence found
    pub mismatches: Vec<VerificationMismatch>,
    /// Number of comparisons made
    pub checks: usize,
}

/// Final state of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// Every check matched
    Passed,
    /// At least one check diverged
    Failed(Vec<VerificationMismatch>),
    /// The case could not run to completion
    Errored(#[serde(serialize_with = "serialize_error")] ConformanceError),
    /// The engine knowingly does not exercise this case
    Unsupported(String),
}

fn serialize_error<S: serde::Serializer>(
    error: &ConformanceError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl CaseOutcome {
    /// Classify the result of [`execute`]
    pub fn from_result(result: Result<Verdict>) -> Self {
        match result {
            Ok(verdict) if verdict.mismatches.is_empty() => CaseOutcome::Passed,
            Ok(verdict) => CaseOutcome::Failed(verdict.mismatches),
            Err(e) if e.is_expected_unsupported() => CaseOutcome::Unsupported(e.to_string()),
            Err(e) => CaseOutcome::Errored(e),
        }
    }

    /// Passed or unsupported
    pub fn is_success(&self) -> bool {
        matches!(self, CaseOutcome::Passed | CaseOutcome::Unsupported(_))
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "passed",
            CaseOutcome::Failed(_) => "failed",
            CaseOutcome::Errored(_) => "errored",
            CaseOutcome::Unsupported(_) => "unsupported",
        }
    }
}

/// Run every applicable check for `record`
pub fn execute(record: &VectorRecord, harness: &CipherHarness<'_>, config: &SuiteConfig) -> Result<Verdict> {
    let mut verifier = Verifier::new(record.description.clone());
    match (&record.mode, &record.payload) {
        (ModeConfiguration::OpenPgp { iv, encrypted_iv }, Payload::Cipher { plaintext, ciphertext }) => {
            run_openpgp(
                &mut verifier,
                record,
                harness,
                config,
                (iv.as_slice(), encrypted_iv.as_deref()),
                plaintext,
                ciphertext,
            )?;
        }
        (mode, Payload::Cipher { plaintext, ciphertext }) if !mode.is_aead() => {
            run_cipher(&mut verifier, record, harness, config, plaintext, ciphertext)?;
        }
        (
            mode,
            Payload::Aead {
                associated_data,
                plaintext,
                ciphertext,
                tag,
            },
        ) if mode.is_aead() => {
            run_aead(
                &mut verifier,
                record,
                harness,
                config,
                associated_data,
                plaintext,
                (ciphertext.as_slice(), tag.as_slice()),
            )?;
        }
        (mode, _) => {
            return Err(ConformanceError::invalid_config(
                mode.mode_id(),
                "payload shape does not match the mode",
            ));
        }
    }
    let checks = verifier.checks();
    Ok(Verdict {
        mismatches: verifier.finish(),
        checks,
    })
}

fn run_cipher(
    verifier: &mut Verifier,
    record: &VectorRecord,
    harness: &CipherHarness<'_>,
    config: &SuiteConfig,
    plaintext: &[u8],
    ciphertext: &[u8],
) -> Result<()> {
    let key = &record.key;
    let mode = &record.mode;

    let observed = harness.encrypt(key, mode, None, plaintext, None)?;
    verifier.expect_bytes(Check::Encrypt, Field::Ciphertext, ciphertext, &observed.ciphertext);

    for _ in 1..config.repetitions {
        let again = harness.encrypt(key, mode, None, plaintext, None)?;
        verifier.expect_bytes(
            Check::Determinism,
            Field::Ciphertext,
            &observed.ciphertext,
            &again.ciphertext,
        );
    }

    let decrypted = harness.decrypt(key, mode, None, ciphertext, None)?;
    verifier.expect_bytes(Check::Decrypt, Field::Plaintext, plaintext, &decrypted);

    let round_trip = harness.decrypt(key, mode, None, &observed.ciphertext, None)?;
    verifier.expect_bytes(Check::RoundTrip, Field::Plaintext, plaintext, &round_trip);

    if let ModeConfiguration::Ctr { counter } = mode {
        if config.keystream_checks {
            let mut expected = harness.keystream(key, counter, plaintext.len())?;
            for (k, p) in expected.iter_mut().zip(plaintext) {
                *k ^= p;
            }
            verifier.expect_bytes(Check::Keystream, Field::Keystream, &expected, ciphertext);
        }
    }
    Ok(())
}

fn run_aead(
    verifier: &mut Verifier,
    record: &VectorRecord,
    harness: &CipherHarness<'_>,
    config: &SuiteConfig,
    associated_data: &[Vec<u8>],
    plaintext: &[u8],
    (ciphertext, tag): (&[u8], &[u8]),
) -> Result<()> {
    let key = &record.key;
    let mode = &record.mode;
    let ad = Some(associated_data);

    let observed = harness.encrypt(key, mode, ad, plaintext, Some(tag.len()))?;
    let observed_tag = observed.tag.clone().unwrap_or_default();
    verifier.expect_bytes(Check::Encrypt, Field::Ciphertext, ciphertext, &observed.ciphertext);
    verifier.expect_bytes(Check::Encrypt, Field::Tag, tag, &observed_tag);

    for _ in 1..config.repetitions {
        let again = harness.encrypt(key, mode, ad, plaintext, Some(tag.len()))?;
        verifier.expect_bytes(
            Check::Determinism,
            Field::Ciphertext,
            &observed.ciphertext,
            &again.ciphertext,
        );
        verifier.expect_bytes(
            Check::Determinism,
            Field::Tag,
            &observed_tag,
            again.tag.as_deref().unwrap_or_default(),
        );
    }

    verifier.expect_plaintext(
        Check::Decrypt,
        plaintext,
        harness.decrypt(key, mode, ad, ciphertext, Some(tag)),
    )?;
    verifier.expect_plaintext(
        Check::RoundTrip,
        plaintext,
        harness.decrypt(key, mode, ad, &observed.ciphertext, Some(observed_tag.as_slice())),
    )?;

    if config.tamper_checks {
        let mut bad_tag = tag.to_vec();
        if let Some(last) = bad_tag.last_mut() {
            *last ^= 0x01;
        }
        verifier.expect_authentication_failure(
            Check::TamperedTag,
            Field::Tag,
            harness.decrypt(key, mode, ad, ciphertext, Some(bad_tag.as_slice())),
        )?;

        if !ciphertext.is_empty() {
            let mut bad_ciphertext = ciphertext.to_vec();
            bad_ciphertext[0] ^= 0x01;
            verifier.expect_authentication_failure(
                Check::TamperedCiphertext,
                Field::Ciphertext,
                harness.decrypt(key, mode, ad, &bad_ciphertext, Some(tag)),
            )?;
        }
    }
    Ok(())
}

fn run_openpgp(
    verifier: &mut Verifier,
    record: &VectorRecord,
    harness: &CipherHarness<'_>,
    config: &SuiteConfig,
    (iv, encrypted_iv): (&[u8], Option<&[u8]>),
    plaintext: &[u8],
    ciphertext: &[u8],
) -> Result<()> {
    let key = &record.key;
    let mode = &record.mode;

    let observed = harness.encrypt(key, mode, None, plaintext, None)?;
    let prefix = observed.prefix.clone().unwrap_or_default();
    if let Some(expected_prefix) = encrypted_iv {
        verifier.expect_bytes(Check::Encrypt, Field::EncryptedIv, expected_prefix, &prefix);
    }
    verifier.expect_bytes(Check::Encrypt, Field::Ciphertext, ciphertext, &observed.ciphertext);

    for _ in 1..config.repetitions {
        let again = harness.encrypt(key, mode, None, plaintext, None)?;
        verifier.expect_bytes(
            Check::Determinism,
            Field::EncryptedIv,
            &prefix,
            again.prefix.as_deref().unwrap_or_default(),
        );
        verifier.expect_bytes(
            Check::Determinism,
            Field::Ciphertext,
            &observed.ciphertext,
            &again.ciphertext,
        );
    }

    let decrypted = harness.decrypt(key, mode, None, ciphertext, None)?;
    verifier.expect_bytes(Check::Decrypt, Field::Plaintext, plaintext, &decrypted);

    let resync = ModeConfiguration::OpenPgp {
        iv: iv.to_vec(),
        encrypted_iv: Some(prefix),
    };
    let resynced = harness.decrypt(key, &resync, None, &observed.ciphertext, None)?;
    verifier.expect_bytes(Check::IvResync, Field::Plaintext, plaintext, &resynced);
    Ok(())
}
