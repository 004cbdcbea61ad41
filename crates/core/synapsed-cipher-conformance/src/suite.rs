//! Suite construction and execution
//!
//! A [`SuiteBuilder`] turns a vector corpus into a flat list of independent
//! [`TestCase`]s, one per vector per acceleration setting. When the capability
//! probe reports an accelerated path, the whole corpus appears twice: first
//! forcing the portable path, then allowing the accelerated one. Both runs
//! share the parsed vector data but nothing mutable.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cipher::{Acceleration, CipherProvider};
use crate::config::{AccelerationPolicy, SuiteConfig};
use crate::corpus::Corpus;
use crate::error::Result;
use crate::harness::CipherHarness;
use crate::parser::{VectorParser, AES_BLOCK_SIZE};
use crate::probe::{CapabilityProbe, CpuFeatureProbe};
use crate::report::{CaseReport, MetricsRecorder, SuiteMetrics, SuiteReport};
use crate::runner::{self, CaseOutcome};
use crate::vector::{RawVector, VectorRecord};

/// A vector parsed once at build time, shared by every case that uses it
#[derive(Debug)]
pub struct PreparedVector {
    /// Position in the corpus
    pub index: usize,
    /// Provenance text, available even when parsing failed
    pub description: String,
    /// Decoded record, or the reason it could not be decoded
    pub record: Result<VectorRecord>,
}

/// One vector bound to one acceleration setting
#[derive(Debug, Clone)]
pub struct TestCase {
    id: String,
    acceleration: Acceleration,
    vector: Arc<PreparedVector>,
}

impl TestCase {
    /// `<index>/<acceleration>`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Code path this case requests
    pub fn acceleration(&self) -> Acceleration {
        self.acceleration
    }

    /// Vector this case runs
    pub fn vector(&self) -> &PreparedVector {
        &self.vector
    }

    /// Run the case against `provider` with fresh cipher instances
    pub fn run(&self, provider: &dyn CipherProvider, config: &SuiteConfig) -> CaseReport {
        let started = Instant::now();
        let harness = CipherHarness::new(provider, self.acceleration);
        let (mode, checks, outcome) = match &self.vector.record {
            Ok(record) => {
                let result = runner::execute(record, &harness, config);
                let checks = result.as_ref().map(|v| v.checks).unwrap_or(0);
                (Some(record.mode_id()), checks, CaseOutcome::from_result(result))
            }
            Err(e) => (None, 0, CaseOutcome::from_result(Err(e.clone()))),
        };
        CaseReport {
            id: self.id.clone(),
            description: self.vector.description.clone(),
            acceleration: self.acceleration,
            mode,
            outcome,
            checks,
            duration: started.elapsed(),
        }
    }
}

/// Builds a [`Suite`] from raw vectors
pub struct SuiteBuilder {
    name: String,
    vectors: Vec<RawVector>,
    block_size: usize,
    probe: Box<dyn CapabilityProbe>,
    config: SuiteConfig,
    recorder: MetricsRecorder,
}

impl SuiteBuilder {
    /// Builder over `vectors`, probing the CPU for the accelerated path
    pub fn new(name: impl Into<String>, vectors: Vec<RawVector>) -> Self {
        Self {
            name: name.into(),
            vectors,
            block_size: AES_BLOCK_SIZE,
            probe: Box::new(CpuFeatureProbe),
            config: SuiteConfig::default(),
            recorder: MetricsRecorder::new(),
        }
    }

    /// Builder over a loaded corpus
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self::new(corpus.name(), corpus.vectors().to_vec())
    }

    /// Block size of the cipher the vectors target
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Replace the capability probe
    pub fn probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Replace the suite configuration
    pub fn config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Share metrics with an external observer
    pub fn recorder(mut self, recorder: MetricsRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Parse every selected vector and lay out the cases
    pub fn build(self) -> Suite {
        let parser = VectorParser::new(self.block_size);
        let filter = self.config.filter.as_deref();

        let prepared: Vec<Arc<PreparedVector>> = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let description = raw
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("vector #{index}"));
                if filter.is_some_and(|f| !description.contains(f)) {
                    return None;
                }
                let record = parser.parse(index, raw);
                if let Err(e) = &record {
                    debug!(index, %description, error = %e, "vector failed to parse");
                }
                Some(Arc::new(PreparedVector {
                    index,
                    description,
                    record,
                }))
            })
            .collect();

        let accelerated = match self.config.acceleration {
            AccelerationPolicy::Auto => self.probe.accelerated_path_available(),
            AccelerationPolicy::Portable => false,
        };
        let settings: &[Acceleration] = if accelerated {
            &[Acceleration::Portable, Acceleration::Accelerated]
        } else {
            &[Acceleration::Portable]
        };

        let cases = settings
            .iter()
            .flat_map(|&acceleration| {
                prepared.iter().map(move |vector| TestCase {
                    id: format!("{}/{}", vector.index, acceleration.label()),
                    acceleration,
                    vector: Arc::clone(vector),
                })
            })
            .collect();

        Suite {
            name: self.name,
            cases,
            config: self.config,
            recorder: self.recorder,
        }
    }
}

impl std::fmt::Debug for SuiteBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteBuilder")
            .field("name", &self.name)
            .field("vectors", &self.vectors.len())
            .field("block_size", &self.block_size)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A built, runnable list of cases
#[derive(Debug)]
pub struct Suite {
    name: String,
    cases: Vec<TestCase>,
    config: SuiteConfig,
    recorder: MetricsRecorder,
}

impl Suite {
    /// Suite name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cases in execution order
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// True if no vector survived the filter
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Live metrics accumulated across every run of this suite
    pub fn recorder(&self) -> &MetricsRecorder {
        &self.recorder
    }

    /// Run every case against `provider`
    ///
    /// Cases are isolated: a failure is recorded and the run continues,
    /// unless `stop_on_failure` is set.
    pub fn run(&self, provider: &dyn CipherProvider) -> SuiteReport {
        info!(
            suite = %self.name,
            provider = provider.name(),
            cases = self.cases.len(),
            "starting conformance suite"
        );

        let mut reports = Vec::with_capacity(self.cases.len());
        let mut metrics = SuiteMetrics::default();
        for case in &self.cases {
            let report = case.run(provider, &self.config);
            debug!(
                case = %report.id,
                outcome = report.outcome.label(),
                checks = report.checks,
                "case finished"
            );
            let failed = !report.outcome.is_success();
            if failed {
                warn!(
                    case = %report.id,
                    description = %report.description,
                    outcome = report.outcome.label(),
                    "case did not pass"
                );
            }
            metrics.record(&report);
            self.recorder.record(&report);
            reports.push(report);
            if failed && self.config.stop_on_failure {
                warn!(suite = %self.name, "stopping at first failure");
                break;
            }
        }

        info!(
            suite = %self.name,
            passed = metrics.passed,
            failed = metrics.failed,
            errored = metrics.errored,
            unsupported = metrics.unsupported,
            avg_case_ms = metrics.avg_case_ms,
            "conformance suite finished"
        );
        SuiteReport {
            name: self.name.clone(),
            cases: reports,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::FixedProbe;
    use crate::reference::AesProvider;
    use crate::vector::RawParams;
    use crate::mode::ModeId;

    fn fips197() -> RawVector {
        RawVector::new(
            "00112233445566778899aabbccddeeff",
            "69c4e0d86a7b0430d8cdb78070b4c55a",
            "000102030405060708090a0b0c0d0e0f",
        )
        .with_description("FIPS-197 C.1")
    }

    #[test]
    fn test_dual_run_doubles_cases() {
        let suite = SuiteBuilder::new("t", vec![fips197()])
            .probe(FixedProbe(true))
            .build();
        let ids: Vec<_> = suite.cases().iter().map(TestCase::id).collect();
        assert_eq!(ids, ["0/portable", "0/accelerated"]);
        assert!(Arc::ptr_eq(&suite.cases()[0].vector, &suite.cases()[1].vector));
    }

    #[test]
    fn test_parse_error_isolated_to_case() {
        let bad = RawVector::new("zz", "00", "00").with_description("broken");
        let suite = SuiteBuilder::new("t", vec![bad, fips197()])
            .probe(FixedProbe(false))
            .build();
        let report = suite.run(&AesProvider::new());
        assert_eq!(report.cases.len(), 2);
        assert!(matches!(report.cases[0].outcome, CaseOutcome::Errored(_)));
        assert_eq!(report.cases[1].outcome, CaseOutcome::Passed);
        assert_eq!(report.metrics.errored, 1);
    }

    #[test]
    fn test_stop_on_failure() {
        let bad = RawVector::new("00", "00", "0001").with_params(RawParams::for_mode(ModeId::Ecb));
        let config = SuiteConfig {
            stop_on_failure: true,
            ..SuiteConfig::default()
        };
        let suite = SuiteBuilder::new("t", vec![bad, fips197()])
            .probe(FixedProbe(false))
            .config(config)
            .build();
        let report = suite.run(&AesProvider::new());
        assert_eq!(report.cases.len(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_repeated_runs_report_their_own_metrics() {
        let suite = SuiteBuilder::new("t", vec![fips197()])
            .probe(FixedProbe(false))
            .build();
        let provider = AesProvider::new();

        let first = suite.run(&provider);
        let second = suite.run(&provider);
        for report in [&first, &second] {
            assert_eq!(report.cases.len(), 1);
            assert_eq!(report.metrics.total_cases, 1);
            assert_eq!(report.metrics.passed, 1);
            assert_eq!(report.metrics.per_mode[&ModeId::Ecb].passed, 1);
        }

        let lifetime = suite.recorder().snapshot();
        assert_eq!(lifetime.total_cases, 2);
        assert_eq!(lifetime.passed, 2);
    }
}
