//! # Synapsed Cipher Conformance
//!
//! A vector-driven conformance harness for symmetric block-cipher modes.
//! Published test vectors (FIPS-197, NIST SP 800-38A/C, the RFC 3610, 3686 and
//! 5297 examples, the EAX paper, GCM and OpenPGP-CFB) are decoded into typed
//! records and replayed against a cipher under test, which must reproduce
//! every expected output byte for byte.
//!
//! ## Pipeline
//!
//! ```text
//! SuiteBuilder -> VectorParser -> ModeConfiguration -> CipherHarness -> Verifier -> CaseOutcome
//! ```
//!
//! - [`parser`]: hex decoding and AEAD field splitting
//! - [`mode`]: the closed set of modes and their validated parameters
//! - [`harness`]: drives fresh cipher instances through one operation
//! - [`verifier`]: byte-exact comparison, collecting every mismatch
//! - [`suite`]: one case per vector per acceleration setting
//! - [`reference`]: an AES provider implementing every mode
//!
//! ## Quick Start
//!
//! ```no_run
//! use synapsed_cipher_conformance::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let corpus = Corpus::aes()?;
//! let suite = SuiteBuilder::from_corpus(&corpus)
//!     .config(SuiteConfig::from_env()?)
//!     .build();
//! let report = suite.run(&AesProvider::new());
//! println!("{report}");
//! report.ensure_passed()?;
//! # Ok(())
//! # }
//! ```
//!
//! When the CPU offers AES instructions the corpus runs twice, once forcing
//! the portable path and once allowing the accelerated one. Cases the engine
//! knowingly skips (CFB with a segment that is not a whole number of bytes)
//! are reported as unsupported and never fail a suite.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

pub use crate::error::{CipherError, CipherResult, ConformanceError, Field, Result};

// Data model
pub mod error;
pub mod mode;
pub mod parser;
pub mod vector;

// Cipher contracts
pub mod cipher;
pub mod probe;

// Execution
pub mod harness;
pub mod runner;
pub mod suite;
pub mod verifier;

// Loading and reporting
pub mod config;
pub mod corpus;
pub mod report;

// Reference cipher under test
pub mod reference;

pub mod prelude {
    //! Common imports for building and running suites

    pub use crate::{
        cipher::{Acceleration, CipherInstance, CipherProvider, CipherRequest, Direction},
        config::{AccelerationPolicy, SuiteConfig},
        corpus::Corpus,
        error::{CipherError, ConformanceError, Field, Result},
        harness::{CipherHarness, Observed},
        mode::{CounterSpec, ModeConfiguration, ModeId},
        parser::VectorParser,
        probe::{CapabilityProbe, CpuFeatureProbe, FixedProbe},
        reference::AesProvider,
        report::{CaseReport, MetricsRecorder, SuiteFailure, SuiteMetrics, SuiteReport},
        runner::CaseOutcome,
        suite::{Suite, SuiteBuilder, TestCase},
        vector::{Payload, RawCounterParams, RawParams, RawVector, VectorRecord},
        verifier::{Check, VerificationMismatch, Verifier},
    };
}
