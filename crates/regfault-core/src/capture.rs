//! Opt-in diagnostic capture for faults raised on hot registration paths.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;

/// When a fault should record a backtrace at its construction site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Record nothing.
    #[default]
    Never,
    /// Always record, regardless of environment.
    Always,
    /// Record only when `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE` enable it.
    FromEnv,
}

impl CapturePolicy {
    /// Capture a backtrace according to this policy.
    ///
    /// Returns `None` for [`CapturePolicy::Never`] and when the environment
    /// leaves capture disabled under [`CapturePolicy::FromEnv`].
    pub fn capture(self) -> Option<Backtrace> {
        match self {
            Self::Never => None,
            Self::Always => Some(Backtrace::force_capture()),
            Self::FromEnv => {
                let bt = Backtrace::capture();
                match bt.status() {
                    std::backtrace::BacktraceStatus::Captured => Some(bt),
                    _ => None,
                }
            }
        }
    }
}
