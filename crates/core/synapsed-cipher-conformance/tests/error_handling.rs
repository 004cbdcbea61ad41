//! Error taxonomy: what aborts a case, what is a mismatch, what is unsupported

mod common;

use hex_literal::hex;
use synapsed_cipher_conformance::prelude::*;
use synapsed_cipher_conformance::CipherResult;

const KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
const IV: &str = "000102030405060708090a0b0c0d0e0f";

fn parse_json(text: &str) -> Result<VectorRecord> {
    let corpus = Corpus::from_json_str("inline", text)?;
    VectorParser::default().parse(0, &corpus.vectors()[0])
}

#[test]
fn test_unknown_mode() {
    let err = parse_json(r#"[["00", "00", "00", "xts", {"mode": "XTS"}]]"#).unwrap_err();
    assert_eq!(err, ConformanceError::UnsupportedMode("XTS".into()));
}

#[test]
fn test_stray_parameter_rejected() {
    let text = format!(r#"[["00", "00", "{KEY}", "cbc", {{"mode": "CBC", "iv": "{IV}", "use_aesni": true}}]]"#);
    let err = parse_json(&text).unwrap_err();
    match err {
        ConformanceError::InvalidConfiguration { mode, reason } => {
            assert_eq!(mode, ModeId::Cbc);
            assert!(reason.contains("use_aesni"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_missing_and_irrelevant_fields() {
    let missing = parse_json(&format!(r#"[["00", "00", "{KEY}", "cbc", {{"mode": "CBC"}}]]"#)).unwrap_err();
    assert!(matches!(
        missing,
        ConformanceError::InvalidConfiguration { mode: ModeId::Cbc, .. }
    ));

    let irrelevant = parse_json(&format!(
        r#"[["00", "00", "{KEY}", "ctr", {{"mode": "OFB", "iv": "{IV}", "nonce": "00"}}]]"#
    ))
    .unwrap_err();
    assert!(matches!(
        irrelevant,
        ConformanceError::InvalidConfiguration { mode: ModeId::Ofb, .. }
    ));
}

#[test]
fn test_null_nonce_is_absent() {
    let record = parse_json(&format!(
        r#"[["|00", "|00|{tag}", "{key}{key}", "siv", {{"mode": "SIV", "nonce": null}}]]"#,
        tag = "00".repeat(16),
        key = KEY,
    ))
    .unwrap();
    assert_eq!(record.mode, ModeConfiguration::Siv { nonce: None });
}

#[test]
fn test_malformed_aead_fields() {
    let ccm = |pt: &str, ct: &str| {
        let raw = RawVector::new(pt, ct, KEY)
            .with_params(RawParams::for_mode(ModeId::Ccm).nonce("10111213141516"));
        VectorParser::default().parse(0, &raw).unwrap_err()
    };

    assert!(matches!(
        ccm("00|11", "00|22"),
        ConformanceError::MalformedVector {
            field: Field::Ciphertext,
            ..
        }
    ));
    assert!(matches!(
        ccm("00|11", "01|22|33"),
        ConformanceError::MalformedVector {
            field: Field::AssociatedData,
            ..
        }
    ));
    assert!(matches!(
        ccm("00|11", "00|22|"),
        ConformanceError::MalformedVector { field: Field::Tag, .. }
    ));
    assert!(matches!(
        ccm("00|1", "00|22|33"),
        ConformanceError::MalformedVector {
            field: Field::Plaintext,
            ..
        }
    ));
}

#[test]
fn test_harness_rejects_mismatched_inputs() {
    let provider = AesProvider::new();
    let harness = CipherHarness::new(&provider, Acceleration::Portable);
    let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    let cbc = ModeConfiguration::Cbc {
        iv: hex!("000102030405060708090a0b0c0d0e0f").to_vec(),
    };
    let ad = vec![vec![1u8]];

    let err = harness
        .encrypt(&key, &cbc, Some(ad.as_slice()), &[0u8; 16], None)
        .unwrap_err();
    assert!(matches!(
        err,
        ConformanceError::InvalidConfiguration { mode: ModeId::Cbc, .. }
    ));

    let err = harness
        .decrypt(&key, &ModeConfiguration::Ecb, None, &[0u8; 16], Some(&[0u8; 4][..]))
        .unwrap_err();
    assert!(matches!(
        err,
        ConformanceError::InvalidConfiguration { mode: ModeId::Ecb, .. }
    ));

    let gcm = ModeConfiguration::Gcm { nonce: vec![0u8; 12] };
    let err = harness.decrypt(&key, &gcm, None, &[], None).unwrap_err();
    assert!(matches!(
        err,
        ConformanceError::InvalidConfiguration { mode: ModeId::Gcm, .. }
    ));
}

#[test]
fn test_bad_key_length_is_cipher_error() {
    let provider = AesProvider::new();
    let harness = CipherHarness::new(&provider, Acceleration::Portable);
    let err = harness
        .encrypt(&[0u8; 10], &ModeConfiguration::Ecb, None, &[0u8; 16], None)
        .unwrap_err();
    assert_eq!(err, ConformanceError::Cipher(CipherError::InvalidKeyLength(10)));
    assert!(!err.is_expected_unsupported());
}

#[test]
fn test_cfb1_is_unsupported_not_failed() {
    let raw = RawVector::new("6bc1", "68b3", KEY)
        .with_description("NIST 800-38A, F.3.1, CFB-1 and AES-128")
        .with_params(RawParams::for_mode(ModeId::Cfb).iv(IV).segment_size(1));
    let report = common::run_single(raw);
    assert!(matches!(report.outcome, CaseOutcome::Unsupported(_)));
    assert!(report.outcome.is_success());
    assert_eq!(report.mode, Some(ModeId::Cfb));
}

/// Wraps the reference provider but skips tag verification
struct LeakyProvider(AesProvider);

struct LeakyInstance(Box<dyn CipherInstance>);

impl CipherProvider for LeakyProvider {
    fn name(&self) -> &str {
        "leaky"
    }

    fn block_size(&self) -> usize {
        self.0.block_size()
    }

    fn instantiate(&self, request: &CipherRequest<'_>) -> CipherResult<Box<dyn CipherInstance>> {
        Ok(Box::new(LeakyInstance(self.0.instantiate(request)?)))
    }
}

impl CipherInstance for LeakyInstance {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.0.encrypt(plaintext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.0.decrypt(ciphertext)
    }

    fn update_associated_data(&mut self, data: &[u8]) -> CipherResult<()> {
        self.0.update_associated_data(data)
    }

    fn digest(&mut self) -> CipherResult<Vec<u8>> {
        self.0.digest()
    }

    fn verify(&mut self, _tag: &[u8]) -> CipherResult<()> {
        Ok(())
    }
}

#[test]
fn test_released_plaintext_on_tamper_fails_case() {
    common::init_test_logging();
    let suite = SuiteBuilder::new("leaky", vec![common::ccm_example_1()])
        .probe(FixedProbe(false))
        .build();
    let report = suite.run(&LeakyProvider(AesProvider::new()));

    let CaseOutcome::Failed(mismatches) = &report.cases[0].outcome else {
        panic!("expected failure, got {:?}", report.cases[0].outcome);
    };
    let checks: Vec<Check> = mismatches.iter().map(|m| m.check).collect();
    assert_eq!(checks, [Check::TamperedTag, Check::TamperedCiphertext]);
    assert!(mismatches[0].observed.starts_with("released plaintext"));
    assert!(report.ensure_passed().is_err());
}

/// Refuses every AEAD mode at construction time
struct NoAeadProvider(AesProvider);

impl CipherProvider for NoAeadProvider {
    fn name(&self) -> &str {
        "no-aead"
    }

    fn block_size(&self) -> usize {
        self.0.block_size()
    }

    fn instantiate(&self, request: &CipherRequest<'_>) -> CipherResult<Box<dyn CipherInstance>> {
        if request.mode.is_aead() {
            return Err(CipherError::Unsupported(format!("{} mode", request.mode.mode_id())));
        }
        self.0.instantiate(request)
    }
}

/// Builds AEAD instances that only know the payload calls
struct PayloadOnlyProvider(AesProvider);

struct PayloadOnlyInstance(Box<dyn CipherInstance>);

impl CipherProvider for PayloadOnlyProvider {
    fn name(&self) -> &str {
        "payload-only"
    }

    fn block_size(&self) -> usize {
        self.0.block_size()
    }

    fn instantiate(&self, request: &CipherRequest<'_>) -> CipherResult<Box<dyn CipherInstance>> {
        Ok(Box::new(PayloadOnlyInstance(self.0.instantiate(request)?)))
    }
}

impl CipherInstance for PayloadOnlyInstance {
    fn encrypt(&mut self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        self.0.encrypt(plaintext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        self.0.decrypt(ciphertext)
    }
}

fn gcm_suite() -> Suite {
    let config = SuiteConfig {
        filter: Some("GCM".into()),
        ..SuiteConfig::default()
    };
    SuiteBuilder::from_corpus(&Corpus::aes().unwrap())
        .probe(FixedProbe(true))
        .config(config)
        .build()
}

#[test]
fn test_cipher_refusing_aead_is_errored_not_unsupported() {
    common::init_test_logging();
    let suite = gcm_suite();
    assert_eq!(suite.len(), 36);

    let report = suite.run(&NoAeadProvider(AesProvider::new()));
    assert_eq!(report.metrics.errored, 36);
    assert_eq!(report.metrics.unsupported, 0);
    assert_eq!(report.metrics.passed, 0);
    assert!(report.cases.iter().all(|c| matches!(
        c.outcome,
        CaseOutcome::Errored(ConformanceError::Cipher(CipherError::Unsupported(_)))
    )));
    assert!(!report.is_success());
    let failure = report.ensure_passed().unwrap_err();
    assert_eq!(failure.failures.len(), 36);
}

#[test]
fn test_default_aead_calls_error_the_case() {
    let report = gcm_suite().run(&PayloadOnlyProvider(AesProvider::new()));
    assert_eq!(report.metrics.unsupported, 0);
    assert_eq!(report.metrics.errored, report.metrics.total_cases);
    assert!(report.ensure_passed().is_err());
}
