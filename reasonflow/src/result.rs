//! The per-run result accumulator.

use crate::outputs::{
    CausalGraph, InferenceOutcome, ParsedVignette, RetrievedKnowledge, StageOutput,
    SynthesizedProgram,
};
use crate::utils::generate_run_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    /// Parse the vignette into structured constraints.
    Parse,
    /// Retrieve background knowledge.
    Retrieve,
    /// Build the causal graph.
    Graph,
    /// Synthesize a probabilistic program.
    Synthesize,
    /// Run sandboxed inference.
    Infer,
}

impl StageName {
    /// The fixed pipeline order.
    pub const ORDER: [Self; 5] = [
        Self::Parse,
        Self::Retrieve,
        Self::Graph,
        Self::Synthesize,
        Self::Infer,
    ];

    /// Returns the stage name as a string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Retrieve => "retrieve",
            Self::Graph => "graph",
            Self::Synthesize => "synthesize",
            Self::Infer => "infer",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed stage's output, tagged with its stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageData {
    /// Output of the parse stage.
    Parsed(ParsedVignette),
    /// Output of the retrieve stage.
    Retrieved(RetrievedKnowledge),
    /// Output of the graph stage.
    Graph(CausalGraph),
    /// Output of the synthesize stage.
    Program(SynthesizedProgram),
    /// Output of the infer stage.
    Inference(InferenceOutcome),
}

impl StageData {
    /// The stage this output belongs to.
    #[must_use]
    pub fn stage(&self) -> StageName {
        match self {
            Self::Parsed(_) => StageName::Parse,
            Self::Retrieved(_) => StageName::Retrieve,
            Self::Graph(_) => StageName::Graph,
            Self::Program(_) => StageName::Synthesize,
            Self::Inference(_) => StageName::Infer,
        }
    }

    /// The output's self-reported confidence.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Parsed(o) => o.confidence(),
            Self::Retrieved(o) => o.confidence(),
            Self::Graph(o) => o.confidence(),
            Self::Program(o) => o.confidence(),
            Self::Inference(o) => o.confidence(),
        }
    }

    /// The output's reporting counters.
    #[must_use]
    pub fn counters(&self) -> BTreeMap<&'static str, usize> {
        match self {
            Self::Parsed(o) => o.counters(),
            Self::Retrieved(o) => o.counters(),
            Self::Graph(o) => o.counters(),
            Self::Program(o) => o.counters(),
            Self::Inference(o) => o.counters(),
        }
    }
}

/// The mutable accumulator for one reasoning run.
///
/// Created at the start of a run, owned exclusively by it, and immutable
/// once the run returns. A stage's output slot is populated iff that
/// stage ran to completion; `stage_timings` and `stage_confidences` gain
/// an entry together, exactly when a stage completes. A failed or
/// timed-out stage writes neither — its elapsed time is folded into
/// `error_message` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Parse stage output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedVignette>,
    /// Retrieve stage output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved: Option<RetrievedKnowledge>,
    /// Graph stage output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<CausalGraph>,
    /// Synthesize stage output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<SynthesizedProgram>,
    /// Infer stage output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference: Option<InferenceOutcome>,
    /// Wall-clock duration of each completed stage.
    #[serde(default)]
    pub stage_timings: HashMap<StageName, Duration>,
    /// Confidence of each completed stage, in `[0, 1]`.
    #[serde(default)]
    pub stage_confidences: HashMap<StageName, f64>,
    /// Weighted mean confidence over completed stages.
    pub overall_confidence: f64,
    /// Whether the run met the success criteria.
    pub success: bool,
    /// Failure description for aborted runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Total wall-clock duration of the run.
    pub total_execution_time: Duration,
    /// High-level summary sentences (thinking mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thinking_process: Vec<String>,
    /// Per-stage narrative sentences plus a closing sentence (thinking mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning_sentences: Vec<String>,
    /// Detailed per-stage analysis (thinking mode only).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub step_by_step_analysis: HashMap<StageName, Vec<String>>,
}

impl Default for ReasoningResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasoningResult {
    /// Creates an empty result for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: generate_run_id(),
            started_at: Utc::now(),
            ended_at: None,
            parsed: None,
            retrieved: None,
            graph: None,
            program: None,
            inference: None,
            stage_timings: HashMap::new(),
            stage_confidences: HashMap::new(),
            overall_confidence: 0.0,
            success: false,
            error_message: None,
            total_execution_time: Duration::ZERO,
            thinking_process: Vec::new(),
            reasoning_sentences: Vec::new(),
            step_by_step_analysis: HashMap::new(),
        }
    }

    /// Stores a completed stage's output in its slot and records its
    /// timing and confidence together.
    pub fn record_completion(&mut self, data: StageData, elapsed: Duration) {
        let stage = data.stage();
        let confidence = data.confidence().clamp(0.0, 1.0);
        match data {
            StageData::Parsed(o) => self.parsed = Some(o),
            StageData::Retrieved(o) => self.retrieved = Some(o),
            StageData::Graph(o) => self.graph = Some(o),
            StageData::Program(o) => self.program = Some(o),
            StageData::Inference(o) => self.inference = Some(o),
        }
        self.stage_timings.insert(stage, elapsed);
        self.stage_confidences.insert(stage, confidence);
    }

    /// Returns true if the stage ran to completion.
    #[must_use]
    pub fn stage_completed(&self, stage: StageName) -> bool {
        self.stage_confidences.contains_key(&stage)
    }

    /// Returns true if the stage's output slot is populated.
    #[must_use]
    pub fn slot_populated(&self, stage: StageName) -> bool {
        match stage {
            StageName::Parse => self.parsed.is_some(),
            StageName::Retrieve => self.retrieved.is_some(),
            StageName::Graph => self.graph.is_some(),
            StageName::Synthesize => self.program.is_some(),
            StageName::Infer => self.inference.is_some(),
        }
    }

    /// Completed stages, in pipeline order.
    #[must_use]
    pub fn completed_stages(&self) -> Vec<StageName> {
        StageName::ORDER
            .into_iter()
            .filter(|s| self.stage_completed(*s))
            .collect()
    }

    /// Confidences of completed stages, in pipeline order.
    #[must_use]
    pub fn completed_confidences(&self) -> Vec<f64> {
        StageName::ORDER
            .into_iter()
            .filter_map(|s| self.stage_confidences.get(&s).copied())
            .collect()
    }

    /// Reporting counters for a completed stage's output.
    #[must_use]
    pub fn stage_counters(&self, stage: StageName) -> Option<BTreeMap<&'static str, usize>> {
        match stage {
            StageName::Parse => self.parsed.as_ref().map(StageOutput::counters),
            StageName::Retrieve => self.retrieved.as_ref().map(StageOutput::counters),
            StageName::Graph => self.graph.as_ref().map(StageOutput::counters),
            StageName::Synthesize => self.program.as_ref().map(StageOutput::counters),
            StageName::Infer => self.inference.as_ref().map(StageOutput::counters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parsed_output() -> ParsedVignette {
        ParsedVignette {
            entities: vec!["rain".into()],
            constraints: vec![],
            confidence: 0.9,
        }
    }

    #[test]
    fn test_new_result_is_empty() {
        let result = ReasoningResult::new();
        assert!(result.completed_stages().is_empty());
        assert!(!result.success);
        assert_eq!(result.overall_confidence, 0.0);
        for stage in StageName::ORDER {
            assert!(!result.slot_populated(stage));
        }
    }

    #[test]
    fn test_record_completion_pairs_timing_and_confidence() {
        let mut result = ReasoningResult::new();
        result.record_completion(
            StageData::Parsed(parsed_output()),
            Duration::from_millis(12),
        );

        assert!(result.slot_populated(StageName::Parse));
        assert_eq!(
            result.stage_timings.get(&StageName::Parse),
            Some(&Duration::from_millis(12))
        );
        assert_eq!(result.stage_confidences.get(&StageName::Parse), Some(&0.9));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut result = ReasoningResult::new();
        let mut out = parsed_output();
        out.confidence = 1.7;
        result.record_completion(StageData::Parsed(out), Duration::ZERO);
        assert_eq!(result.stage_confidences.get(&StageName::Parse), Some(&1.0));
    }

    #[test]
    fn test_completed_stages_are_ordered() {
        let mut result = ReasoningResult::new();
        result.record_completion(
            StageData::Retrieved(RetrievedKnowledge {
                documents: vec![],
                confidence: 0.8,
            }),
            Duration::ZERO,
        );
        result.record_completion(StageData::Parsed(parsed_output()), Duration::ZERO);

        assert_eq!(
            result.completed_stages(),
            vec![StageName::Parse, StageName::Retrieve]
        );
        assert_eq!(result.completed_confidences(), vec![0.9, 0.8]);
    }

    #[test]
    fn test_stage_name_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StageName::Synthesize).unwrap(),
            "\"synthesize\""
        );
        assert_eq!(StageName::Graph.to_string(), "graph");
    }

    #[test]
    fn test_result_serialization_round_trip() {
        let mut result = ReasoningResult::new();
        result.record_completion(
            StageData::Parsed(parsed_output()),
            Duration::from_millis(5),
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: ReasoningResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert!(back.slot_populated(StageName::Parse));
    }
}
