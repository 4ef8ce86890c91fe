//! Tracing integration for pipeline runs.

use serde::{Deserialize, Serialize};

/// How a run was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// `run`: no session, no callbacks.
    Batch,
    /// `run_streaming`: callbacks and progress events fire.
    Streaming,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

/// Initializes a global tracing subscriber from `RUST_LOG`.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_mode_display() {
        assert_eq!(ExecutionMode::Batch.to_string(), "batch");
        assert_eq!(ExecutionMode::Streaming.to_string(), "streaming");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
