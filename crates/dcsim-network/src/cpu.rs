//! CPU progress model for execution tasks.

/// Reports the amount of work an execution task performs per scheduling tick.
///
/// This is the seam toward the CPU scheduler collaborator: the engine only
/// consumes reported progress and does not divide CPU among cloudlets itself.
pub trait CpuModel {
    /// Instructions executed by a task with `pes` processing elements over the
    /// given interval.
    fn instructions(&self, pes: u32, duration: f64) -> f64;
}

/// CPU model with a constant per-PE MIPS rating.
pub struct ConstantMips {
    mips_per_pe: f64,
}

impl ConstantMips {
    /// Creates a model with the given per-PE MIPS rating.
    pub fn new(mips_per_pe: f64) -> Self {
        Self { mips_per_pe }
    }
}

impl CpuModel for ConstantMips {
    fn instructions(&self, pes: u32, duration: f64) -> f64 {
        self.mips_per_pe * pes as f64 * duration
    }
}
