//! The pipeline executor: gating, timeouts, callbacks, finalization.
//!
//! One internal algorithm backs both public entry points. Stages run
//! strictly sequentially (`NOT_STARTED -> PARSE -> RETRIEVE -> GRAPH ->
//! SYNTHESIZE -> INFER -> DONE`, with `FAILED` absorbing from any
//! non-terminal state); there is no backward transition and the executor
//! never retries a stage. A stage failure or timeout aborts the run, but
//! finalization still runs over the partial state, so callers always
//! receive a fully-formed [`ReasoningResult`] and must check `success`
//! and `error_message`. Only contract violations (malformed config)
//! surface as `Err`.

use crate::callbacks::{
    CallbackBundle, NoOpProgressSink, ProgressSink, SandboxEvent, SandboxPhase,
};
use crate::config::ReasoningConfig;
use crate::confidence;
use crate::contract::{
    GraphBuilder, InferenceRunner, KnowledgeRetriever, ProgramSynthesizer, VignetteParser,
};
use crate::descriptor::{default_descriptors, StageDescriptor};
use crate::errors::ReasonflowError;
use crate::observability::ExecutionMode;
use crate::result::{ReasoningResult, StageData, StageName};
use crate::thinking;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use crate::contract::AuxData;

/// Streaming-run context: the opaque session route plus the caller's hooks.
struct StreamMode<'a> {
    session_id: &'a str,
    callbacks: &'a CallbackBundle,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Orchestrates one five-stage reasoning run at a time.
///
/// The executor itself is stateless across runs; each run owns its
/// [`ReasoningResult`], so one executor may serve many concurrent runs as
/// long as the collaborators behind it are safe for concurrent use.
pub struct PipelineExecutor {
    parser: Arc<dyn VignetteParser>,
    retriever: Arc<dyn KnowledgeRetriever>,
    graph_builder: Arc<dyn GraphBuilder>,
    synthesizer: Arc<dyn ProgramSynthesizer>,
    inference: Arc<dyn InferenceRunner>,
    config: ReasoningConfig,
    progress: Arc<dyn ProgressSink>,
    descriptors: [StageDescriptor; 5],
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Creates an executor over the five collaborators.
    ///
    /// Progress events are discarded until a sink is attached with
    /// [`with_progress_sink`](Self::with_progress_sink).
    #[must_use]
    pub fn new(
        parser: Arc<dyn VignetteParser>,
        retriever: Arc<dyn KnowledgeRetriever>,
        graph_builder: Arc<dyn GraphBuilder>,
        synthesizer: Arc<dyn ProgramSynthesizer>,
        inference: Arc<dyn InferenceRunner>,
        config: ReasoningConfig,
    ) -> Self {
        Self {
            parser,
            retriever,
            graph_builder,
            synthesizer,
            inference,
            config,
            progress: Arc::new(NoOpProgressSink),
            descriptors: default_descriptors(),
        }
    }

    /// Attaches the broadcast transport for streaming runs.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Runs the pipeline in batch mode: no callbacks, no progress events,
    /// no narration pacing.
    pub async fn run(
        &self,
        vignette: &str,
        data: Option<AuxData>,
    ) -> Result<ReasoningResult, ReasonflowError> {
        self.config.validate()?;
        Ok(self.execute(vignette, data.as_ref(), None).await)
    }

    /// Runs the pipeline in streaming mode.
    ///
    /// `session_id` is opaque and only routes progress events to the
    /// attached [`ProgressSink`]. Gating, timeouts, and success
    /// determination are identical to batch mode.
    pub async fn run_streaming(
        &self,
        vignette: &str,
        session_id: &str,
        callbacks: CallbackBundle,
        data: Option<AuxData>,
    ) -> Result<ReasoningResult, ReasonflowError> {
        self.config.validate()?;
        let stream = StreamMode {
            session_id,
            callbacks: &callbacks,
        };
        Ok(self.execute(vignette, data.as_ref(), Some(&stream)).await)
    }

    async fn execute(
        &self,
        vignette: &str,
        data: Option<&AuxData>,
        stream: Option<&StreamMode<'_>>,
    ) -> ReasoningResult {
        let mode = if stream.is_some() {
            ExecutionMode::Streaming
        } else {
            ExecutionMode::Batch
        };
        let mut result = ReasoningResult::new();
        let clock = Instant::now();
        info!(run_id = %result.run_id, mode = %mode, "starting reasoning run");

        for descriptor in &self.descriptors {
            let stage = descriptor.name;

            // Gating: a closed gate skips the stage entirely, with no
            // timing, no confidence, and no callbacks.
            if !(descriptor.gate)(&result) {
                debug!(stage = %stage, "gate closed; skipping stage");
                continue;
            }

            if let Some(stream) = stream {
                self.fire_stage_start(stream, stage).await;
                if let Some(message) = descriptor.lifecycle.and_then(|l| l.start) {
                    self.fire_sandbox_event(stream, stage, SandboxPhase::Start, message)
                        .await;
                }
                self.deliver(
                    stream,
                    serde_json::json!({
                        "event": "stage.started",
                        "run_id": result.run_id,
                        "stage": stage,
                    }),
                )
                .await;
            }

            let stage_clock = Instant::now();
            let outcome = tokio::time::timeout(
                self.config.timeout_per_stage(),
                self.run_stage(stage, &result, vignette, data),
            )
            .await;
            let elapsed = stage_clock.elapsed();

            match outcome {
                Ok(Ok(output)) => {
                    result.record_completion(output, elapsed);
                    let confidence = result
                        .stage_confidences
                        .get(&stage)
                        .copied()
                        .unwrap_or_default();
                    debug!(
                        stage = %stage,
                        elapsed_ms = millis(elapsed),
                        confidence,
                        "stage completed"
                    );
                    if let Some(stream) = stream {
                        self.fire_stage_completion(stream, descriptor, &result, elapsed, confidence)
                            .await;
                    }
                }
                Ok(Err(error)) => {
                    let message = format!(
                        "stage '{stage}' failed after {} ms: {error:#}",
                        millis(elapsed)
                    );
                    warn!(stage = %stage, error = %message, "stage failed; aborting run");
                    if let Some(stream) = stream {
                        self.deliver_failure(stream, &result, stage, &message).await;
                    }
                    result.error_message = Some(message);
                    break;
                }
                Err(_) => {
                    let message = format!(
                        "stage '{stage}' timed out after {} ms",
                        millis(self.config.timeout_per_stage())
                    );
                    warn!(stage = %stage, error = %message, "stage timed out; aborting run");
                    if let Some(stream) = stream {
                        self.deliver_failure(stream, &result, stage, &message).await;
                    }
                    result.error_message = Some(message);
                    break;
                }
            }
        }

        // Finalization runs on aborted runs too, over the partial state.
        result.total_execution_time = clock.elapsed();
        result.overall_confidence =
            confidence::overall_confidence(&result.completed_confidences());
        result.success = confidence::determine_success(&result, result.overall_confidence);

        if self.config.enable_thinking_mode {
            thinking::generate_trace(&mut result, self.config.thinking_detail_level);
            if let Some(stream) = stream {
                self.narrate_trace(stream, &result).await;
            }
        }

        result.ended_at = Some(Utc::now());

        if let Some(stream) = stream {
            self.deliver(
                stream,
                serde_json::json!({
                    "event": "pipeline.completed",
                    "run_id": result.run_id,
                    "mode": mode,
                    "success": result.success,
                    "overall_confidence": result.overall_confidence,
                    "stages_completed": result.completed_stages().len(),
                    "error": result.error_message,
                }),
            )
            .await;
        }

        info!(
            run_id = %result.run_id,
            success = result.success,
            overall_confidence = result.overall_confidence,
            total_ms = millis(result.total_execution_time),
            "reasoning run finished"
        );
        result
    }

    /// Dispatches one stage to its collaborator, handing over only the
    /// upstream fields it needs.
    async fn run_stage(
        &self,
        stage: StageName,
        result: &ReasoningResult,
        vignette: &str,
        data: Option<&AuxData>,
    ) -> anyhow::Result<StageData> {
        match stage {
            StageName::Parse => {
                let parsed = self.parser.parse(vignette, data).await?;
                Ok(StageData::Parsed(parsed))
            }
            StageName::Retrieve => {
                let parsed = upstream(result.parsed.as_ref(), StageName::Parse)?;
                let retrieved = self
                    .retriever
                    .retrieve(parsed, self.config.retrieve_top_k)
                    .await?;
                Ok(StageData::Retrieved(retrieved))
            }
            StageName::Graph => {
                let parsed = upstream(result.parsed.as_ref(), StageName::Parse)?;
                let retrieved = upstream(result.retrieved.as_ref(), StageName::Retrieve)?;
                let graph = self.graph_builder.build_graph(parsed, retrieved).await?;
                Ok(StageData::Graph(graph))
            }
            StageName::Synthesize => {
                let graph = upstream(result.graph.as_ref(), StageName::Graph)?;
                let program = self.synthesizer.synthesize(graph).await?;
                Ok(StageData::Program(program))
            }
            StageName::Infer => {
                let program = upstream(result.program.as_ref(), StageName::Synthesize)?;
                let outcome = self
                    .inference
                    .infer(program, self.config.inference_samples)
                    .await?;
                Ok(StageData::Inference(outcome))
            }
        }
    }

    async fn fire_stage_start(&self, stream: &StreamMode<'_>, stage: StageName) {
        if let Some(hook) = &stream.callbacks.on_stage_start {
            if let Err(error) = hook(stage).await {
                warn!(stage = %stage, error = %error, "stage-start hook failed; continuing");
            }
        }
    }

    async fn fire_stage_completion(
        &self,
        stream: &StreamMode<'_>,
        descriptor: &StageDescriptor,
        result: &ReasoningResult,
        elapsed: Duration,
        confidence: f64,
    ) {
        let stage = descriptor.name;
        if let Some(lifecycle) = descriptor.lifecycle {
            if let Some(message) = lifecycle.exec {
                self.fire_sandbox_event(stream, stage, SandboxPhase::Exec, message)
                    .await;
            }
            if let Some(message) = lifecycle.complete {
                self.fire_sandbox_event(stream, stage, SandboxPhase::Complete, message)
                    .await;
            }
        }
        if let Some(hook) = &stream.callbacks.on_stage_complete {
            let mut payload = (descriptor.build_payload)(result);
            payload.insert(
                "execution_time_ms".to_string(),
                serde_json::json!(millis(elapsed)),
            );
            payload.insert("confidence".to_string(), serde_json::json!(confidence));
            if let Err(error) = hook(stage, payload).await {
                warn!(stage = %stage, error = %error, "stage-complete hook failed; continuing");
            }
        }
        self.deliver(
            stream,
            serde_json::json!({
                "event": "stage.completed",
                "run_id": result.run_id,
                "stage": stage,
                "execution_time_ms": millis(elapsed),
                "confidence": confidence,
            }),
        )
        .await;
        if let Some(hook) = &stream.callbacks.on_thinking_sentence {
            let sentence = thinking::completion_sentence(stage, result);
            if let Err(error) = hook(sentence).await {
                warn!(stage = %stage, error = %error, "thinking-sentence hook failed; continuing");
            }
        }
    }

    async fn fire_sandbox_event(
        &self,
        stream: &StreamMode<'_>,
        stage: StageName,
        phase: SandboxPhase,
        message: &str,
    ) {
        if let Some(hook) = &stream.callbacks.on_sandbox_event {
            let event = SandboxEvent {
                stage,
                phase,
                message: message.to_string(),
            };
            if let Err(error) = hook(event).await {
                warn!(stage = %stage, error = %error, "sandbox-event hook failed; continuing");
            }
        }
    }

    /// Emits the aggregate trace sentence by sentence, with the
    /// configured pacing delay between sentences.
    async fn narrate_trace(&self, stream: &StreamMode<'_>, result: &ReasoningResult) {
        let Some(hook) = &stream.callbacks.on_thinking_sentence else {
            return;
        };
        let pacing = self.config.narration_pacing();
        let last = result.reasoning_sentences.len().saturating_sub(1);
        for (index, sentence) in result.reasoning_sentences.iter().enumerate() {
            if let Err(error) = hook(sentence.clone()).await {
                warn!(error = %error, "thinking-sentence hook failed; continuing");
            }
            if index < last && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }
    }

    async fn deliver_failure(
        &self,
        stream: &StreamMode<'_>,
        result: &ReasoningResult,
        stage: StageName,
        message: &str,
    ) {
        self.deliver(
            stream,
            serde_json::json!({
                "event": "stage.failed",
                "run_id": result.run_id,
                "stage": stage,
                "error": message,
            }),
        )
        .await;
    }

    async fn deliver(&self, stream: &StreamMode<'_>, message: serde_json::Value) {
        self.progress.deliver(stream.session_id, message).await;
    }
}

fn upstream<T>(slot: Option<&T>, stage: StageName) -> anyhow::Result<&T> {
    slot.ok_or_else(|| anyhow::anyhow!("missing upstream output from stage '{stage}'"))
}
