//! Typed stage outputs and the reporting capability they share.
//!
//! Every collaborator response type implements [`StageOutput`], a
//! compile-time-checked capability exposing a confidence value and a set
//! of integer counters. Counters exist for human-readable reporting only;
//! the sole fields consulted for control flow are
//! [`SynthesizedProgram::validated`] and [`InferenceOutcome::status`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Confidence assumed for an output that does not report its own.
pub const DEFAULT_STAGE_CONFIDENCE: f64 = 0.8;

/// Reporting capability shared by all stage outputs.
pub trait StageOutput {
    /// Self-reported confidence in `[0, 1]`.
    fn confidence(&self) -> f64 {
        DEFAULT_STAGE_CONFIDENCE
    }

    /// Named integer counters summarizing the output.
    ///
    /// Returned as a [`BTreeMap`] so reporting derived from counters is
    /// deterministically ordered.
    fn counters(&self) -> BTreeMap<&'static str, usize>;
}

/// Structured constraints extracted from the raw vignette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedVignette {
    /// Entities mentioned in the vignette.
    pub entities: Vec<String>,
    /// Constraints over those entities.
    pub constraints: Vec<String>,
    /// Parser confidence.
    pub confidence: f64,
}

impl StageOutput for ParsedVignette {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn counters(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("entities", self.entities.len()),
            ("constraints", self.constraints.len()),
        ])
    }
}

/// A single retrieved knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Document identifier.
    pub id: String,
    /// Document text.
    pub text: String,
    /// Retrieval score.
    pub score: f64,
}

/// Knowledge retrieved for the parsed vignette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedKnowledge {
    /// Retrieved documents, best first.
    pub documents: Vec<KnowledgeDocument>,
    /// Retriever confidence.
    pub confidence: f64,
}

impl StageOutput for RetrievedKnowledge {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn counters(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([("documents", self.documents.len())])
    }
}

/// A directed edge in the causal graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node.
    pub source: String,
    /// Target node.
    pub target: String,
}

/// Causal graph constructed from parsed constraints and retrieved knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalGraph {
    /// Graph nodes.
    pub nodes: Vec<String>,
    /// Directed edges.
    pub edges: Vec<GraphEdge>,
    /// Builder confidence.
    pub confidence: f64,
}

impl StageOutput for CausalGraph {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn counters(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([("nodes", self.nodes.len()), ("edges", self.edges.len())])
    }
}

/// Probabilistic program synthesized from the causal graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedProgram {
    /// Program source text.
    pub source: String,
    /// Free variables of the program.
    pub variables: Vec<String>,
    /// Whether the program passed validation. Gates the infer stage.
    pub validated: bool,
    /// Synthesizer confidence.
    pub confidence: f64,
}

impl StageOutput for SynthesizedProgram {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn counters(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([("variables", self.variables.len())])
    }
}

/// Terminal status of an inference run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceStatus {
    /// Inference ran to completion.
    Completed,
    /// Inference ran but did not converge or produce usable estimates.
    Failed,
}

impl std::fmt::Display for InferenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of sandboxed numerical inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    /// Terminal status. Consulted by success determination.
    pub status: InferenceStatus,
    /// Number of samples drawn.
    pub samples: usize,
    /// Posterior estimates per queried variable.
    pub estimates: HashMap<String, f64>,
    /// Inference confidence.
    pub confidence: f64,
}

impl StageOutput for InferenceOutcome {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn counters(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("samples", self.samples),
            ("estimates", self.estimates.len()),
        ])
    }
}
