//! Declarative stage descriptors and gating.
//!
//! Gating is an explicit predicate evaluated over the accumulated result
//! *before* a stage is invoked — a closed gate skips the stage entirely,
//! with no timing, no confidence, no callbacks, and no error. A stage is
//! never skipped by catching a "not ready" failure.

use crate::callbacks::StagePayload;
use crate::result::{ReasoningResult, StageName};

/// Sandbox lifecycle messages a stage declares.
///
/// Only the sandbox-backed stages declare any: `synthesize` declares a
/// start message, `infer` declares all three.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleMessages {
    /// Emitted before the stage executes.
    pub start: Option<&'static str>,
    /// Emitted when sandboxed execution is underway.
    pub exec: Option<&'static str>,
    /// Emitted when sandboxed execution finishes.
    pub complete: Option<&'static str>,
}

/// Declarative record binding a stage to its gate and reporting.
///
/// Descriptors are stateless and can be built once and reused across
/// runs; all per-run state lives on the [`ReasoningResult`].
#[derive(Debug, Clone, Copy)]
pub struct StageDescriptor {
    /// The stage this descriptor drives.
    pub name: StageName,
    /// Gating predicate over the accumulated result.
    pub gate: fn(&ReasoningResult) -> bool,
    /// Builds the completion payload from the stage's stored output.
    pub build_payload: fn(&ReasoningResult) -> StagePayload,
    /// Sandbox lifecycle messages, if the stage declares any.
    pub lifecycle: Option<LifecycleMessages>,
}

fn gate_always(_result: &ReasoningResult) -> bool {
    true
}

fn gate_retrieve(result: &ReasoningResult) -> bool {
    result.parsed.is_some()
}

fn gate_graph(result: &ReasoningResult) -> bool {
    result.retrieved.is_some()
}

fn gate_synthesize(result: &ReasoningResult) -> bool {
    result.graph.is_some()
}

fn gate_infer(result: &ReasoningResult) -> bool {
    result.program.as_ref().is_some_and(|p| p.validated)
}

fn counters_payload(result: &ReasoningResult, stage: StageName) -> StagePayload {
    let mut payload = StagePayload::new();
    if let Some(counters) = result.stage_counters(stage) {
        for (key, value) in counters {
            payload.insert(key.to_string(), serde_json::json!(value));
        }
    }
    payload
}

fn payload_parse(result: &ReasoningResult) -> StagePayload {
    counters_payload(result, StageName::Parse)
}

fn payload_retrieve(result: &ReasoningResult) -> StagePayload {
    counters_payload(result, StageName::Retrieve)
}

fn payload_graph(result: &ReasoningResult) -> StagePayload {
    counters_payload(result, StageName::Graph)
}

fn payload_synthesize(result: &ReasoningResult) -> StagePayload {
    let mut payload = counters_payload(result, StageName::Synthesize);
    if let Some(program) = &result.program {
        payload.insert("validated".to_string(), serde_json::json!(program.validated));
    }
    payload
}

fn payload_infer(result: &ReasoningResult) -> StagePayload {
    let mut payload = counters_payload(result, StageName::Infer);
    if let Some(inference) = &result.inference {
        payload.insert(
            "status".to_string(),
            serde_json::json!(inference.status.to_string()),
        );
    }
    payload
}

/// Builds the fixed five-stage pipeline in execution order.
#[must_use]
pub fn default_descriptors() -> [StageDescriptor; 5] {
    [
        StageDescriptor {
            name: StageName::Parse,
            gate: gate_always,
            build_payload: payload_parse,
            lifecycle: None,
        },
        StageDescriptor {
            name: StageName::Retrieve,
            gate: gate_retrieve,
            build_payload: payload_retrieve,
            lifecycle: None,
        },
        StageDescriptor {
            name: StageName::Graph,
            gate: gate_graph,
            build_payload: payload_graph,
            lifecycle: None,
        },
        StageDescriptor {
            name: StageName::Synthesize,
            gate: gate_synthesize,
            build_payload: payload_synthesize,
            lifecycle: Some(LifecycleMessages {
                start: Some("Preparing sandbox for program synthesis"),
                exec: None,
                complete: None,
            }),
        },
        StageDescriptor {
            name: StageName::Infer,
            gate: gate_infer,
            build_payload: payload_infer,
            lifecycle: Some(LifecycleMessages {
                start: Some("Preparing sandbox for inference"),
                exec: Some("Executing inference program in sandbox"),
                complete: Some("Sandboxed inference finished"),
            }),
        },
    ]
}
