//! Accelerated-path capability probe
//!
//! The suite builder asks a [`CapabilityProbe`] once per build whether the
//! accelerated code path can be exercised on this machine.

use once_cell::sync::Lazy;

/// Answers whether an accelerated code path is usable
pub trait CapabilityProbe {
    /// True if the accelerated path can run here
    fn accelerated_path_available(&self) -> bool;
}

impl<F> CapabilityProbe for F
where
    F: Fn() -> bool,
{
    fn accelerated_path_available(&self) -> bool {
        self()
    }
}

static AES_INSTRUCTIONS: Lazy<bool> = Lazy::new(detect_aes_instructions);

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect_aes_instructions() -> bool {
    std::arch::is_x86_feature_detected!("aes") && std::arch::is_x86_feature_detected!("sse2")
}

#[cfg(target_arch = "aarch64")]
fn detect_aes_instructions() -> bool {
    std::arch::is_aarch64_feature_detected!("aes")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_aes_instructions() -> bool {
    false
}

/// Detects AES instructions on the running CPU, once per process
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuFeatureProbe;

impl CapabilityProbe for CpuFeatureProbe {
    fn accelerated_path_available(&self) -> bool {
        *AES_INSTRUCTIONS
    }
}

/// Probe with a fixed answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe(pub bool);

impl CapabilityProbe for FixedProbe {
    fn accelerated_path_available(&self) -> bool {
        self.0
    }
}
