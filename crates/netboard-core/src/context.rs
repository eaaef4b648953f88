// ── Run context ──
//
// Policy flags and pool sizes for one invocation. Built once at startup and
// handed to each pipeline; nothing here is global.

use serde::Serialize;

/// Which onboarding branches run and whether anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunMode {
    /// Devices come from topology files rather than live discovery.
    pub offline: bool,
    /// Only APs are onboarded from files; switches come from live discovery.
    pub aps_only: bool,
    /// Collect and render, but send nothing to the platform or broker.
    pub dry_run: bool,
}

impl Default for RunMode {
    fn default() -> Self {
        Self {
            offline: false,
            aps_only: true,
            dry_run: false,
        }
    }
}

impl RunMode {
    /// AP devices are onboarded from the APs file.
    pub fn onboards_aps(&self) -> bool {
        self.offline || self.aps_only
    }

    /// Switch devices are onboarded from the switches file.
    pub fn onboards_switches(&self) -> bool {
        self.onboards_aps() && !self.aps_only
    }
}

/// Explicit per-run state shared by the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub mode: RunMode,
    /// Bound on concurrent per-device work.
    pub workers: usize,
}

impl RunContext {
    pub fn new(mode: RunMode, workers: usize) -> Self {
        Self {
            mode,
            workers: workers.max(1),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(RunMode::default(), 4)
    }
}
