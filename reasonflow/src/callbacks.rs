//! Streaming-mode notification hooks and the progress transport.
//!
//! [`CallbackBundle`] carries four independent optional async hooks fired
//! at well-defined points of a streaming run. Absence of any hook never
//! alters control flow or timing semantics. Hooks are awaited, not
//! fire-and-forget, so a slow hook delays the pipeline; this keeps UI and
//! telemetry consistent with pipeline state at the cost of added latency.
//! A hook error is caught at the call site, logged, and ignored.
//!
//! [`ProgressSink`] is the injected broadcast transport: given an opaque
//! session id and a JSON message it attempts delivery and tolerates
//! failure silently.

use crate::result::StageName;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info};

/// Payload handed to the stage-complete hook: the stage's counters plus
/// `execution_time_ms` and `confidence`.
pub type StagePayload = serde_json::Map<String, serde_json::Value>;

/// Result of a hook invocation.
pub type HookResult = anyhow::Result<()>;

/// Hook fired when a stage starts.
pub type StageStartHook = Arc<dyn Fn(StageName) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Hook fired when a stage completes.
pub type StageCompleteHook =
    Arc<dyn Fn(StageName, StagePayload) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Hook fired for each narrated thinking sentence.
pub type ThinkingSentenceHook =
    Arc<dyn Fn(String) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Hook fired for sandbox lifecycle events.
pub type SandboxEventHook =
    Arc<dyn Fn(SandboxEvent) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Phase of a sandbox lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxPhase {
    /// Sandbox is being prepared.
    Start,
    /// Sandboxed execution is underway.
    Exec,
    /// Sandboxed execution finished.
    Complete,
}

/// A sandbox lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SandboxEvent {
    /// The stage emitting the event.
    pub stage: StageName,
    /// Lifecycle phase.
    pub phase: SandboxPhase,
    /// Human-readable message.
    pub message: String,
}

/// Optional notification hooks for a streaming run.
#[derive(Clone, Default)]
pub struct CallbackBundle {
    /// Fired before a stage executes.
    pub on_stage_start: Option<StageStartHook>,
    /// Fired after a stage completes.
    pub on_stage_complete: Option<StageCompleteHook>,
    /// Fired for each narrated sentence.
    pub on_thinking_sentence: Option<ThinkingSentenceHook>,
    /// Fired for sandbox lifecycle events.
    pub on_sandbox_event: Option<SandboxEventHook>,
}

impl std::fmt::Debug for CallbackBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBundle")
            .field("has_on_stage_start", &self.on_stage_start.is_some())
            .field("has_on_stage_complete", &self.on_stage_complete.is_some())
            .field("has_on_thinking_sentence", &self.on_thinking_sentence.is_some())
            .field("has_on_sandbox_event", &self.on_sandbox_event.is_some())
            .finish()
    }
}

impl CallbackBundle {
    /// Creates an empty bundle; every hook is a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stage-start hook.
    #[must_use]
    pub fn with_on_stage_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(StageName) -> BoxFuture<'static, HookResult> + Send + Sync + 'static,
    {
        self.on_stage_start = Some(Arc::new(hook));
        self
    }

    /// Sets the stage-complete hook.
    #[must_use]
    pub fn with_on_stage_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(StageName, StagePayload) -> BoxFuture<'static, HookResult> + Send + Sync + 'static,
    {
        self.on_stage_complete = Some(Arc::new(hook));
        self
    }

    /// Sets the thinking-sentence hook.
    #[must_use]
    pub fn with_on_thinking_sentence<F>(mut self, hook: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, HookResult> + Send + Sync + 'static,
    {
        self.on_thinking_sentence = Some(Arc::new(hook));
        self
    }

    /// Sets the sandbox-event hook.
    #[must_use]
    pub fn with_on_sandbox_event<F>(mut self, hook: F) -> Self
    where
        F: Fn(SandboxEvent) -> BoxFuture<'static, HookResult> + Send + Sync + 'static,
    {
        self.on_sandbox_event = Some(Arc::new(hook));
        self
    }
}

/// Transport for pushing progress events to an external broadcast layer.
///
/// Implementations must attempt delivery and tolerate failure silently;
/// `deliver` never raises.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Delivers a JSON message for the given session, or silently drops it.
    async fn deliver(&self, session_id: &str, message: serde_json::Value);
}

/// A progress sink that discards all messages.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn deliver(&self, _session_id: &str, _message: serde_json::Value) {
        // Intentionally empty - discards all messages
    }
}

/// A progress sink that logs messages using the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProgressSink;

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn deliver(&self, session_id: &str, message: serde_json::Value) {
        info!(session_id = %session_id, message = %message, "progress event");
    }
}

/// A recording progress sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    messages: parking_lot::RwLock<Vec<(String, serde_json::Value)>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all delivered messages.
    #[must_use]
    pub fn messages(&self) -> Vec<(String, serde_json::Value)> {
        self.messages.read().clone()
    }

    /// Returns the number of delivered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns true if nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Returns messages whose `event` field matches the given type.
    #[must_use]
    pub fn messages_of_type(&self, event_type: &str) -> Vec<(String, serde_json::Value)> {
        self.messages
            .read()
            .iter()
            .filter(|(_, m)| m.get("event").and_then(|v| v.as_str()) == Some(event_type))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn deliver(&self, session_id: &str, message: serde_json::Value) {
        debug!(session_id = %session_id, "collected progress event");
        self.messages
            .write()
            .push((session_id.to_string(), message));
    }
}
