//! Run-wide configuration for a reasoning pipeline.

use crate::errors::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How much detail the thinking trace carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingDetailLevel {
    /// Narrative sentences only.
    Minimal,
    /// Narrative plus per-stage analysis.
    #[default]
    Moderate,
    /// Everything, with extra per-stage sentences appended.
    Detailed,
}

/// Configuration for one reasoning run.
///
/// Immutable after construction; shared read-only by the run. The retry
/// ceiling is consumed by individual stage executors, never by the
/// orchestrator itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Model identifier for the parse collaborator (consumed by its
    /// implementation, not the orchestrator).
    #[serde(default = "default_parse_model")]
    pub parse_model: String,
    /// Number of knowledge documents to retrieve.
    #[serde(default = "default_retrieve_top_k")]
    pub retrieve_top_k: usize,
    /// Number of inference samples to draw.
    #[serde(default = "default_inference_samples")]
    pub inference_samples: usize,
    /// Hard deadline for each stage, in seconds.
    #[serde(default = "default_timeout_per_stage")]
    pub timeout_per_stage_seconds: f64,
    /// Retry ceiling for stage executors.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Whether to generate the thinking trace.
    #[serde(default)]
    pub enable_thinking_mode: bool,
    /// Detail level for the thinking trace.
    #[serde(default)]
    pub thinking_detail_level: ThinkingDetailLevel,
    /// Delay between narrated sentences in streaming mode, in milliseconds.
    #[serde(default = "default_narration_pacing")]
    pub narration_pacing_ms: u64,
}

fn default_parse_model() -> String {
    "reasonflow-parse-v1".to_string()
}

fn default_retrieve_top_k() -> usize {
    5
}

fn default_inference_samples() -> usize {
    1000
}

fn default_timeout_per_stage() -> f64 {
    30.0
}

fn default_max_retries() -> usize {
    2
}

fn default_narration_pacing() -> u64 {
    150
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            parse_model: default_parse_model(),
            retrieve_top_k: default_retrieve_top_k(),
            inference_samples: default_inference_samples(),
            timeout_per_stage_seconds: default_timeout_per_stage(),
            max_retries: default_max_retries(),
            enable_thinking_mode: false,
            thinking_detail_level: ThinkingDetailLevel::default(),
            narration_pacing_ms: default_narration_pacing(),
        }
    }
}

impl ReasoningConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parse model.
    #[must_use]
    pub fn with_parse_model(mut self, model: impl Into<String>) -> Self {
        self.parse_model = model.into();
        self
    }

    /// Sets the retrieval fan-out.
    #[must_use]
    pub fn with_retrieve_top_k(mut self, top_k: usize) -> Self {
        self.retrieve_top_k = top_k;
        self
    }

    /// Sets the inference sample count.
    #[must_use]
    pub fn with_inference_samples(mut self, samples: usize) -> Self {
        self.inference_samples = samples;
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_timeout_per_stage(mut self, seconds: f64) -> Self {
        self.timeout_per_stage_seconds = seconds;
        self
    }

    /// Sets the stage-executor retry ceiling.
    #[must_use]
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Enables or disables thinking mode.
    #[must_use]
    pub fn with_thinking_mode(mut self, enabled: bool) -> Self {
        self.enable_thinking_mode = enabled;
        self
    }

    /// Sets the thinking detail level.
    #[must_use]
    pub fn with_thinking_detail_level(mut self, level: ThinkingDetailLevel) -> Self {
        self.thinking_detail_level = level;
        self
    }

    /// Sets the narration pacing delay.
    #[must_use]
    pub fn with_narration_pacing_ms(mut self, millis: u64) -> Self {
        self.narration_pacing_ms = millis;
        self
    }

    /// Returns the per-stage timeout as a [`Duration`].
    #[must_use]
    pub fn timeout_per_stage(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_per_stage_seconds.max(0.0))
    }

    /// Returns the narration pacing delay as a [`Duration`].
    #[must_use]
    pub fn narration_pacing(&self) -> Duration {
        Duration::from_millis(self.narration_pacing_ms)
    }

    /// Validates the configuration.
    ///
    /// A failed validation is a programming-contract violation and is the
    /// only error class the public entry points propagate.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.parse_model.trim().is_empty() {
            return Err(ConfigValidationError::new(
                "parse_model",
                "parse_model must not be empty",
            ));
        }
        if self.retrieve_top_k == 0 {
            return Err(ConfigValidationError::new(
                "retrieve_top_k",
                "retrieve_top_k must be at least 1",
            ));
        }
        if self.inference_samples == 0 {
            return Err(ConfigValidationError::new(
                "inference_samples",
                "inference_samples must be at least 1",
            ));
        }
        if !self.timeout_per_stage_seconds.is_finite() || self.timeout_per_stage_seconds <= 0.0 {
            return Err(ConfigValidationError::new(
                "timeout_per_stage_seconds",
                "timeout_per_stage_seconds must be a positive finite number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReasoningConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieve_top_k, 5);
        assert_eq!(config.inference_samples, 1000);
        assert!(!config.enable_thinking_mode);
    }

    #[test]
    fn test_builder_setters() {
        let config = ReasoningConfig::new()
            .with_parse_model("parse-lg")
            .with_retrieve_top_k(10)
            .with_inference_samples(500)
            .with_timeout_per_stage(5.0)
            .with_thinking_mode(true)
            .with_thinking_detail_level(ThinkingDetailLevel::Detailed)
            .with_narration_pacing_ms(0);

        assert_eq!(config.parse_model, "parse-lg");
        assert_eq!(config.retrieve_top_k, 10);
        assert_eq!(config.timeout_per_stage(), Duration::from_secs(5));
        assert_eq!(config.narration_pacing(), Duration::ZERO);
        assert_eq!(config.thinking_detail_level, ThinkingDetailLevel::Detailed);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = ReasoningConfig::new()
            .with_retrieve_top_k(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "retrieve_top_k");
    }

    #[test]
    fn test_zero_samples_rejected() {
        let err = ReasoningConfig::new()
            .with_inference_samples(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "inference_samples");
    }

    #[test]
    fn test_nonpositive_timeout_rejected() {
        for seconds in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = ReasoningConfig::new()
                .with_timeout_per_stage(seconds)
                .validate()
                .unwrap_err();
            assert_eq!(err.field, "timeout_per_stage_seconds");
        }
    }

    #[test]
    fn test_deserialization_fills_defaults() {
        let config: ReasoningConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.parse_model, "reasonflow-parse-v1");
        assert_eq!(config.narration_pacing_ms, 150);
        assert_eq!(config.thinking_detail_level, ThinkingDetailLevel::Moderate);
    }
}
