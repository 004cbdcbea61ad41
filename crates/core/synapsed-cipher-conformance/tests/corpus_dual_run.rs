//! Full-corpus run against the reference provider
//!
//! The bundled corpus is replayed once forcing the portable path and once
//! allowing the accelerated one. Only the three CFB-1 vectors may come back
//! unsupported, once per run.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use synapsed_cipher_conformance::prelude::*;

#[test]
fn test_full_corpus_dual_run() {
    common::init_test_logging();

    let corpus = Corpus::aes().unwrap();
    assert_eq!(corpus.len(), 479);

    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let suite = SuiteBuilder::from_corpus(&corpus)
        .probe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .build();
    assert_eq!(probes.load(Ordering::SeqCst), 1);
    assert_eq!(suite.len(), 958);

    let report = suite.run(&AesProvider::new());
    if let Err(failure) = report.ensure_passed() {
        panic!("{failure}\n{:#?}", failure.failures);
    }

    let metrics = &report.metrics;
    assert_eq!(metrics.total_cases, 958);
    assert_eq!(metrics.passed, 952);
    assert_eq!(metrics.failed, 0);
    assert_eq!(metrics.errored, 0);
    assert_eq!(metrics.unsupported, 6);
    assert_eq!(metrics.per_mode[&ModeId::Cfb].unsupported, 6);
    assert_eq!(metrics.per_mode[&ModeId::Ecb].passed, 780);
    assert_eq!(metrics.per_mode[&ModeId::Gcm].passed, 36);

    for case in report.unsupported() {
        assert!(case.description.contains("CFB-1 "), "{}", case.description);
    }
}

#[test]
fn test_runs_share_vectors_but_not_results() {
    let corpus = Corpus::aes().unwrap();
    let suite = SuiteBuilder::from_corpus(&corpus)
        .probe(FixedProbe(true))
        .build();

    let (portable, accelerated): (Vec<_>, Vec<_>) = suite
        .cases()
        .iter()
        .partition(|c| c.acceleration() == Acceleration::Portable);
    assert_eq!(portable.len(), accelerated.len());
    for (p, a) in portable.iter().zip(&accelerated) {
        assert_eq!(p.vector().index, a.vector().index);
        assert_eq!(p.id(), format!("{}/portable", p.vector().index));
        assert_eq!(a.id(), format!("{}/accelerated", a.vector().index));
    }
}

#[test]
fn test_report_serializes_to_json() {
    let corpus = Corpus::aes().unwrap();
    let config = SuiteConfig {
        filter: Some("CFB-1 and AES-128".into()),
        ..SuiteConfig::default()
    };
    let report = SuiteBuilder::from_corpus(&corpus)
        .probe(FixedProbe(false))
        .config(config)
        .build()
        .run(&AesProvider::new());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["cases"][0]["id"], "393/portable");
    assert_eq!(json["cases"][0]["acceleration"], "portable");
    assert_eq!(json["cases"][0]["mode"], "CFB");
    assert_eq!(json["cases"][0]["outcome"]["outcome"], "unsupported");
    assert_eq!(json["metrics"]["unsupported"], 1);
}
