//! Mock collaborators for testing.
//!
//! Each mock records how often it was called, returns a configurable
//! response, and can be told to fail or to stall (for timeout tests).

use crate::contract::{
    AuxData, GraphBuilder, InferenceRunner, KnowledgeRetriever, ProgramSynthesizer, VignetteParser,
};
use crate::outputs::{
    CausalGraph, GraphEdge, InferenceOutcome, InferenceStatus, KnowledgeDocument, ParsedVignette,
    RetrievedKnowledge, SynthesizedProgram,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    calls: usize,
    failure: Option<String>,
    delay: Duration,
}

impl MockState {
    async fn before_respond(state: &Mutex<Self>) -> anyhow::Result<()> {
        let (delay, failure) = {
            let mut guard = state.lock();
            guard.calls += 1;
            (guard.delay, guard.failure.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = failure {
            anyhow::bail!(message);
        }
        Ok(())
    }
}

macro_rules! mock_accessors {
    () => {
        /// Returns how many times the mock was invoked.
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.state.lock().calls
        }

        /// Makes every subsequent call fail with the given message.
        pub fn set_failure(&self, message: impl Into<String>) {
            self.state.lock().failure = Some(message.into());
        }

        /// Makes every subsequent call stall for the given duration first.
        pub fn set_delay(&self, delay: Duration) {
            self.state.lock().delay = delay;
        }

        /// Sets the confidence of the canned response.
        pub fn set_confidence(&self, confidence: f64) {
            self.response.lock().confidence = confidence;
        }
    };
}

/// A recording [`VignetteParser`] mock.
#[derive(Debug)]
pub struct MockParser {
    response: Mutex<ParsedVignette>,
    state: Mutex<MockState>,
}

impl Default for MockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockParser {
    /// Creates a mock returning a small parsed vignette at confidence 0.9.
    #[must_use]
    pub fn new() -> Self {
        Self {
            response: Mutex::new(ParsedVignette {
                entities: vec!["rain".into(), "sprinkler".into(), "wet".into()],
                constraints: vec!["rain -> wet".into()],
                confidence: 0.9,
            }),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Replaces the canned response.
    pub fn set_response(&self, response: ParsedVignette) {
        *self.response.lock() = response;
    }

    mock_accessors!();
}

#[async_trait]
impl VignetteParser for MockParser {
    async fn parse(
        &self,
        _vignette: &str,
        _data: Option<&AuxData>,
    ) -> anyhow::Result<ParsedVignette> {
        MockState::before_respond(&self.state).await?;
        Ok(self.response.lock().clone())
    }
}

/// A recording [`KnowledgeRetriever`] mock.
#[derive(Debug)]
pub struct MockRetriever {
    response: Mutex<RetrievedKnowledge>,
    last_top_k: Mutex<Option<usize>>,
    state: Mutex<MockState>,
}

impl Default for MockRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRetriever {
    /// Creates a mock returning two documents at confidence 0.9.
    #[must_use]
    pub fn new() -> Self {
        let documents = (0..2)
            .map(|i| KnowledgeDocument {
                id: format!("doc-{i}"),
                text: format!("document {i}"),
                score: 0.8,
            })
            .collect();
        Self {
            response: Mutex::new(RetrievedKnowledge {
                documents,
                confidence: 0.9,
            }),
            last_top_k: Mutex::new(None),
            state: Mutex::new(MockState::default()),
        }
    }

    /// The `top_k` value passed on the most recent call.
    #[must_use]
    pub fn last_top_k(&self) -> Option<usize> {
        *self.last_top_k.lock()
    }

    mock_accessors!();
}

#[async_trait]
impl KnowledgeRetriever for MockRetriever {
    async fn retrieve(
        &self,
        _parsed: &ParsedVignette,
        top_k: usize,
    ) -> anyhow::Result<RetrievedKnowledge> {
        *self.last_top_k.lock() = Some(top_k);
        MockState::before_respond(&self.state).await?;
        Ok(self.response.lock().clone())
    }
}

/// A recording [`GraphBuilder`] mock.
#[derive(Debug)]
pub struct MockGraphBuilder {
    response: Mutex<CausalGraph>,
    state: Mutex<MockState>,
}

impl Default for MockGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphBuilder {
    /// Creates a mock returning a three-node graph at confidence 0.9.
    #[must_use]
    pub fn new() -> Self {
        Self {
            response: Mutex::new(CausalGraph {
                nodes: vec!["rain".into(), "sprinkler".into(), "wet".into()],
                edges: vec![
                    GraphEdge {
                        source: "rain".into(),
                        target: "wet".into(),
                    },
                    GraphEdge {
                        source: "sprinkler".into(),
                        target: "wet".into(),
                    },
                ],
                confidence: 0.9,
            }),
            state: Mutex::new(MockState::default()),
        }
    }

    mock_accessors!();
}

#[async_trait]
impl GraphBuilder for MockGraphBuilder {
    async fn build_graph(
        &self,
        _parsed: &ParsedVignette,
        _retrieved: &RetrievedKnowledge,
    ) -> anyhow::Result<CausalGraph> {
        MockState::before_respond(&self.state).await?;
        Ok(self.response.lock().clone())
    }
}

/// A recording [`ProgramSynthesizer`] mock.
#[derive(Debug)]
pub struct MockSynthesizer {
    response: Mutex<SynthesizedProgram>,
    state: Mutex<MockState>,
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesizer {
    /// Creates a mock returning a validated program at confidence 0.9.
    #[must_use]
    pub fn new() -> Self {
        Self {
            response: Mutex::new(SynthesizedProgram {
                source: "model { wet ~ rain | sprinkler }".into(),
                variables: vec!["rain".into(), "sprinkler".into(), "wet".into()],
                validated: true,
                confidence: 0.9,
            }),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Marks the canned program as validated or not.
    pub fn set_validated(&self, validated: bool) {
        self.response.lock().validated = validated;
    }

    mock_accessors!();
}

#[async_trait]
impl ProgramSynthesizer for MockSynthesizer {
    async fn synthesize(&self, _graph: &CausalGraph) -> anyhow::Result<SynthesizedProgram> {
        MockState::before_respond(&self.state).await?;
        Ok(self.response.lock().clone())
    }
}

/// A recording [`InferenceRunner`] mock.
#[derive(Debug)]
pub struct MockInferenceRunner {
    response: Mutex<InferenceOutcome>,
    last_samples: Mutex<Option<usize>>,
    state: Mutex<MockState>,
}

impl Default for MockInferenceRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInferenceRunner {
    /// Creates a mock returning a completed inference at confidence 0.9.
    #[must_use]
    pub fn new() -> Self {
        Self {
            response: Mutex::new(InferenceOutcome {
                status: InferenceStatus::Completed,
                samples: 0,
                estimates: HashMap::from([("wet".to_string(), 0.72)]),
                confidence: 0.9,
            }),
            last_samples: Mutex::new(None),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Sets the terminal status of the canned outcome.
    pub fn set_status(&self, status: InferenceStatus) {
        self.response.lock().status = status;
    }

    /// The sample count passed on the most recent call.
    #[must_use]
    pub fn last_samples(&self) -> Option<usize> {
        *self.last_samples.lock()
    }

    mock_accessors!();
}

#[async_trait]
impl InferenceRunner for MockInferenceRunner {
    async fn infer(
        &self,
        _program: &SynthesizedProgram,
        samples: usize,
    ) -> anyhow::Result<InferenceOutcome> {
        *self.last_samples.lock() = Some(samples);
        MockState::before_respond(&self.state).await?;
        let mut outcome = self.response.lock().clone();
        outcome.samples = samples;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_and_failures() {
        let parser = MockParser::new();
        assert_eq!(parser.call_count(), 0);

        let parsed = parser.parse("vignette", None).await.unwrap();
        assert_eq!(parsed.entities.len(), 3);
        assert_eq!(parser.call_count(), 1);

        parser.set_failure("parser exploded");
        let err = parser.parse("vignette", None).await.unwrap_err();
        assert!(err.to_string().contains("parser exploded"));
        assert_eq!(parser.call_count(), 2);
    }

    #[tokio::test]
    async fn test_inference_mock_echoes_samples() {
        let runner = MockInferenceRunner::new();
        let program = SynthesizedProgram {
            source: String::new(),
            variables: vec![],
            validated: true,
            confidence: 0.9,
        };
        let outcome = runner.infer(&program, 250).await.unwrap();
        assert_eq!(outcome.samples, 250);
        assert_eq!(runner.last_samples(), Some(250));
    }
}
