//! Collaborator-facing stage contracts.
//!
//! Each external stage executor exposes exactly one asynchronous
//! operation. An operation receives only the upstream data it needs,
//! never the whole accumulated result, and fails by returning `Err` —
//! there is no in-band error value. Retry and backoff, if any, are the
//! executor's internal concern and invisible at this layer.
//!
//! Collaborators shared across concurrent runs must be internally safe
//! for concurrent use; the orchestrator holds them behind `Arc`.

use crate::outputs::{
    CausalGraph, InferenceOutcome, ParsedVignette, RetrievedKnowledge, SynthesizedProgram,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Auxiliary data passed alongside the raw vignette.
pub type AuxData = HashMap<String, serde_json::Value>;

/// Parses a natural-language vignette into structured constraints.
#[async_trait]
pub trait VignetteParser: Send + Sync {
    /// Parses the vignette, optionally consulting auxiliary data.
    async fn parse(&self, vignette: &str, data: Option<&AuxData>)
        -> anyhow::Result<ParsedVignette>;
}

/// Retrieves background knowledge for a parsed vignette.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Retrieves up to `top_k` documents relevant to the parsed vignette.
    async fn retrieve(
        &self,
        parsed: &ParsedVignette,
        top_k: usize,
    ) -> anyhow::Result<RetrievedKnowledge>;
}

/// Constructs a causal graph from parsed constraints and retrieved knowledge.
#[async_trait]
pub trait GraphBuilder: Send + Sync {
    /// Builds the causal graph.
    async fn build_graph(
        &self,
        parsed: &ParsedVignette,
        retrieved: &RetrievedKnowledge,
    ) -> anyhow::Result<CausalGraph>;
}

/// Synthesizes a probabilistic program from a causal graph.
#[async_trait]
pub trait ProgramSynthesizer: Send + Sync {
    /// Synthesizes and validates the program.
    async fn synthesize(&self, graph: &CausalGraph) -> anyhow::Result<SynthesizedProgram>;
}

/// Runs sandboxed numerical inference over a validated program.
#[async_trait]
pub trait InferenceRunner: Send + Sync {
    /// Draws `samples` samples and reports posterior estimates.
    async fn infer(
        &self,
        program: &SynthesizedProgram,
        samples: usize,
    ) -> anyhow::Result<InferenceOutcome>;
}
