//! # Reasonflow
//!
//! A staged reasoning pipeline orchestrator.
//!
//! Reasonflow drives a five-stage reasoning process over a natural-language
//! vignette: parse, retrieve, build a causal graph, synthesize a program,
//! and run inference. Each stage is an external collaborator behind an
//! async trait; the orchestrator owns gating, per-stage timeouts,
//! confidence bookkeeping, failure propagation, and optional real-time
//! progress streaming.
//!
//! - **Gated sequential execution**: each stage runs only if its gating
//!   predicate over the accumulated result holds
//! - **Two execution modes**: batch and streaming share one code path;
//!   streaming additionally fires callbacks and progress events
//! - **Confidence aggregation**: a weighted mean over completed stages
//!   feeds a multi-branch success determination
//! - **Thinking traces**: deterministic, human-readable narration derived
//!   from the final result
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reasonflow::prelude::*;
//!
//! let executor = PipelineExecutor::new(
//!     parser, retriever, graph_builder, synthesizer, inference,
//!     ReasoningConfig::new(),
//! );
//!
//! let result = executor.run("A vignette...", None).await?;
//! assert!(result.success);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod callbacks;
pub mod config;
pub mod confidence;
pub mod contract;
pub mod descriptor;
pub mod errors;
pub mod executor;
pub mod observability;
pub mod outputs;
pub mod result;
pub mod testing;
pub mod thinking;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::callbacks::{
        CallbackBundle, CollectingProgressSink, LoggingProgressSink, NoOpProgressSink,
        ProgressSink, SandboxEvent, SandboxPhase, StagePayload,
    };
    pub use crate::config::{ReasoningConfig, ThinkingDetailLevel};
    pub use crate::contract::{
        GraphBuilder, InferenceRunner, KnowledgeRetriever, ProgramSynthesizer, VignetteParser,
    };
    pub use crate::descriptor::{default_descriptors, LifecycleMessages, StageDescriptor};
    pub use crate::errors::{ConfigValidationError, ReasonflowError};
    pub use crate::executor::{AuxData, PipelineExecutor};
    pub use crate::outputs::{
        CausalGraph, GraphEdge, InferenceOutcome, InferenceStatus, KnowledgeDocument,
        ParsedVignette, RetrievedKnowledge, StageOutput, SynthesizedProgram,
    };
    pub use crate::result::{ReasoningResult, StageData, StageName};
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
