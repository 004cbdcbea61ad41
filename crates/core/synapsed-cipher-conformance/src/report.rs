//! Suite results and metrics

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cipher::Acceleration;
use crate::mode::ModeId;
use crate::runner::CaseOutcome;

/// Result of one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    /// Case identifier, `<index>/<acceleration>`
    pub id: String,
    /// Vector description
    pub description: String,
    /// Code path the case requested
    #[serde(serialize_with = "serialize_acceleration")]
    pub acceleration: Acceleration,
    /// Mode, when the vector parsed far enough to know it
    pub mode: Option<ModeId>,
    /// What happened
    pub outcome: CaseOutcome,
    /// Comparisons made
    pub checks: usize,
    /// Wall time spent
    pub duration: Duration,
}

fn serialize_acceleration<S: serde::Serializer>(
    acceleration: &Acceleration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(acceleration.label())
}

/// Pass/fail counts for one mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeTally {
    /// Cases that passed
    pub passed: u64,
    /// Cases that failed or errored
    pub failed: u64,
    /// Cases reported as unsupported
    pub unsupported: u64,
}

/// Aggregate suite metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuiteMetrics {
    /// Cases run
    pub total_cases: u64,
    /// Cases that passed every check
    pub passed: u64,
    /// Cases with at least one mismatch
    pub failed: u64,
    /// Cases that could not complete
    pub errored: u64,
    /// Cases the engine knowingly skips
    pub unsupported: u64,
    /// Comparisons made across all cases
    pub checks: u64,
    /// Total wall time
    pub elapsed: Duration,
    /// Average case duration in milliseconds
    pub avg_case_ms: f64,
    /// Tallies per mode
    pub per_mode: BTreeMap<ModeId, ModeTally>,
}

impl SuiteMetrics {
    /// Fold one case into the totals
    pub fn record(&mut self, case: &CaseReport) {
        self.total_cases += 1;
        self.checks += case.checks as u64;
        self.elapsed += case.duration;
        self.avg_case_ms = self.elapsed.as_secs_f64() * 1000.0 / self.total_cases as f64;

        let tally = match case.mode {
            Some(mode) => Some(self.per_mode.entry(mode).or_default()),
            None => None,
        };
        match &case.outcome {
            CaseOutcome::Passed => {
                self.passed += 1;
                if let Some(t) = tally {
                    t.passed += 1;
                }
            }
            CaseOutcome::Failed(_) | CaseOutcome::Errored(_) => {
                if matches!(case.outcome, CaseOutcome::Failed(_)) {
                    self.failed += 1;
                } else {
                    self.errored += 1;
                }
                if let Some(t) = tally {
                    t.failed += 1;
                }
            }
            CaseOutcome::Unsupported(_) => {
                self.unsupported += 1;
                if let Some(t) = tally {
                    t.unsupported += 1;
                }
            }
        }
    }
}

/// Shared, live view of a running suite's metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    metrics: Arc<RwLock<SuiteMetrics>>,
}

impl MetricsRecorder {
    /// Fresh recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one case into the shared metrics
    pub fn record(&self, case: &CaseReport) {
        self.metrics.write().record(case);
    }

    /// Copy of the current metrics
    pub fn snapshot(&self) -> SuiteMetrics {
        self.metrics.read().clone()
    }
}

/// Failing cases of a suite
#[derive(Error, Debug, Clone)]
#[error("suite `{suite}`: {} of {total} case(s) failed", .failures.len())]
pub struct SuiteFailure {
    /// Suite name
    pub suite: String,
    /// Cases run
    pub total: usize,
    /// `(case id, description, reason)` for every failing case
    pub failures: Vec<(String, String, String)>,
}

/// Everything a suite run produced
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Suite name
    pub name: String,
    /// Per-case results in execution order
    pub cases: Vec<CaseReport>,
    /// Aggregate metrics
    pub metrics: SuiteMetrics,
}

impl SuiteReport {
    /// True if every case passed or was unsupported
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(|c| c.outcome.is_success())
    }

    /// Cases that failed or errored
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.outcome.is_success())
    }

    /// Cases reported as unsupported
    pub fn unsupported(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Unsupported(_)))
    }

    /// `Err` listing every failing case
    pub fn ensure_passed(&self) -> Result<(), SuiteFailure> {
        let failures: Vec<_> = self
            .failures()
            .map(|case| {
                let reason = match &case.outcome {
                    CaseOutcome::Failed(mismatches) => mismatches
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                    CaseOutcome::Errored(e) => e.to_string(),
                    other => other.label().to_string(),
                };
                (case.id.clone(), case.description.clone(), reason)
            })
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SuiteFailure {
                suite: self.name.clone(),
                total: self.cases.len(),
                failures,
            })
        }
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(
            f,
            "{}: {} case(s), {} passed, {} failed, {} errored, {} unsupported, {} checks in {:?}",
            self.name, m.total_cases, m.passed, m.failed, m.errored, m.unsupported, m.checks, m.elapsed
        )?;
        for (mode, tally) in &m.per_mode {
            writeln!(
                f,
                "  {:<8} passed {:>4}  failed {:>3}  unsupported {:>3}",
                mode.as_str(),
                tally.passed,
                tally.failed,
                tally.unsupported
            )?;
        }
        for case in self.failures() {
            writeln!(f, "  FAIL {} ({}): {}", case.id, case.description, case.outcome.label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConformanceError;

    fn case(outcome: CaseOutcome, mode: Option<ModeId>) -> CaseReport {
        CaseReport {
            id: "0/portable".into(),
            description: "vector #0".into(),
            acceleration: Acceleration::Portable,
            mode,
            outcome,
            checks: 3,
            duration: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_metrics_tally_by_mode() {
        let recorder = MetricsRecorder::new();
        recorder.record(&case(CaseOutcome::Passed, Some(ModeId::Gcm)));
        recorder.record(&case(CaseOutcome::Unsupported("cfb-1".into()), Some(ModeId::Cfb)));
        recorder.record(&case(
            CaseOutcome::Errored(ConformanceError::UnsupportedMode("XTS".into())),
            None,
        ));
        let metrics = recorder.snapshot();
        assert_eq!(metrics.total_cases, 3);
        assert_eq!(metrics.passed, 1);
        assert_eq!(metrics.errored, 1);
        assert_eq!(metrics.unsupported, 1);
        assert_eq!(metrics.checks, 9);
        assert_eq!(metrics.per_mode[&ModeId::Cfb].unsupported, 1);
        assert!(!metrics.per_mode.contains_key(&ModeId::Ecb));
    }

    #[test]
    fn test_unsupported_does_not_fail_suite() {
        let report = SuiteReport {
            name: "s".into(),
            cases: vec![
                case(CaseOutcome::Passed, Some(ModeId::Ecb)),
                case(CaseOutcome::Unsupported("x".into()), Some(ModeId::Cfb)),
            ],
            metrics: SuiteMetrics::default(),
        };
        assert!(report.is_success());
        assert!(report.ensure_passed().is_ok());
        assert_eq!(report.unsupported().count(), 1);
    }

    #[test]
    fn test_ensure_passed_lists_failures() {
        let report = SuiteReport {
            name: "aes".into(),
            cases: vec![case(
                CaseOutcome::Errored(ConformanceError::NotSupported("x".into())),
                None,
            )],
            metrics: SuiteMetrics::default(),
        };
        let failure = report.ensure_passed().unwrap_err();
        assert_eq!(failure.failures.len(), 1);
        assert_eq!(failure.to_string(), "suite `aes`: 1 of 1 case(s) failed");
    }
}
