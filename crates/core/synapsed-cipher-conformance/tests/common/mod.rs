//! Common test utilities and helpers.

#![allow(dead_code)]

use synapsed_cipher_conformance::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("synapsed_cipher_conformance=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

/// Run a single vector through a portable-only suite
pub fn run_single(vector: RawVector) -> CaseReport {
    let suite = SuiteBuilder::new("single", vec![vector])
        .probe(FixedProbe(false))
        .build();
    let mut report = suite.run(&AesProvider::new());
    assert_eq!(report.cases.len(), 1);
    report.cases.remove(0)
}

/// SP 800-38C example 1
pub fn ccm_example_1() -> RawVector {
    RawVector::new(
        "0001020304050607|20212223",
        "0001020304050607|7162015b|4dac255d",
        "404142434445464748494a4b4c4d4e4f",
    )
    .with_description("SP 800-38C C.1")
    .with_params(RawParams::for_mode(ModeId::Ccm).nonce("10111213141516"))
}
