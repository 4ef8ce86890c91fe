//! Deterministic thinking-trace generation.
//!
//! Every function here is a pure function of a finalized
//! [`ReasoningResult`]: no external calls, no randomness, no clock reads.
//! Generating the trace twice over the same result yields identical
//! output. Timing values come exclusively from the durations already
//! recorded on the result.

use crate::config::ThinkingDetailLevel;
use crate::result::{ReasoningResult, StageName};
use std::collections::HashMap;

/// Overall confidence below this threshold is called out in the summary.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

fn counters_phrase(result: &ReasoningResult, stage: StageName) -> String {
    result
        .stage_counters(stage)
        .map(|counters| {
            counters
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// One human-readable sentence announcing a stage's completion.
///
/// Emitted per stage in streaming mode, independent of the aggregate
/// trace.
#[must_use]
pub fn completion_sentence(stage: StageName, result: &ReasoningResult) -> String {
    let confidence = result
        .stage_confidences
        .get(&stage)
        .copied()
        .unwrap_or_default();
    let counters = counters_phrase(result, stage);
    if counters.is_empty() {
        format!("Completed the {stage} stage (confidence {confidence:.2}).")
    } else {
        format!("Completed the {stage} stage: {counters} (confidence {confidence:.2}).")
    }
}

fn stage_narrative(result: &ReasoningResult, stage: StageName) -> Option<String> {
    match stage {
        StageName::Parse => result.parsed.as_ref().map(|p| {
            format!(
                "Parsed the vignette into {} entities and {} constraints.",
                p.entities.len(),
                p.constraints.len()
            )
        }),
        StageName::Retrieve => result.retrieved.as_ref().map(|r| {
            format!("Retrieved {} knowledge documents.", r.documents.len())
        }),
        StageName::Graph => result.graph.as_ref().map(|g| {
            format!(
                "Constructed a causal graph with {} nodes and {} edges.",
                g.nodes.len(),
                g.edges.len()
            )
        }),
        StageName::Synthesize => result.program.as_ref().map(|p| {
            format!(
                "Synthesized a program over {} variables; validation {}.",
                p.variables.len(),
                if p.validated { "passed" } else { "failed" }
            )
        }),
        StageName::Infer => result.inference.as_ref().map(|i| {
            format!(
                "Ran inference with {} samples and produced {} estimates ({}).",
                i.samples,
                i.estimates.len(),
                i.status
            )
        }),
    }
}

/// Ordered narrative sentences: one per populated stage plus a closing
/// sentence reporting the overall confidence. Detailed mode appends one
/// extra sentence per completed stage.
#[must_use]
pub fn narrative_sentences(
    result: &ReasoningResult,
    detail: ThinkingDetailLevel,
) -> Vec<String> {
    let mut sentences: Vec<String> = StageName::ORDER
        .into_iter()
        .filter_map(|stage| stage_narrative(result, stage))
        .collect();

    let completed = result.completed_stages();
    sentences.push(format!(
        "Overall confidence across {} completed stages is {:.2}.",
        completed.len(),
        result.overall_confidence
    ));

    if detail == ThinkingDetailLevel::Detailed {
        for stage in &completed {
            let millis = result
                .stage_timings
                .get(stage)
                .map_or(0, |d| d.as_millis());
            let confidence = result
                .stage_confidences
                .get(stage)
                .copied()
                .unwrap_or_default();
            sentences.push(format!(
                "In detail, the {stage} stage finished in {millis} ms at confidence {confidence:.2}."
            ));
        }
    }

    sentences
}

/// Per-stage analysis: 3-4 sentences referencing the stage's recorded
/// timing and confidence, only for stages that actually ran.
#[must_use]
pub fn step_by_step_analysis(result: &ReasoningResult) -> HashMap<StageName, Vec<String>> {
    let mut analysis = HashMap::new();
    for stage in result.completed_stages() {
        let millis = result
            .stage_timings
            .get(&stage)
            .map_or(0, |d| d.as_millis());
        let confidence = result
            .stage_confidences
            .get(&stage)
            .copied()
            .unwrap_or_default();

        let mut sentences = vec![
            format!("The {stage} stage completed in {millis} ms."),
            format!("It reported a confidence of {confidence:.2}."),
        ];
        let counters = counters_phrase(result, stage);
        if !counters.is_empty() {
            sentences.push(format!("Reported counters: {counters}."));
        }
        sentences.push(if confidence >= LOW_CONFIDENCE_THRESHOLD {
            "This is a strong signal for downstream stages.".to_string()
        } else {
            "This signal is comparatively weak.".to_string()
        });

        analysis.insert(stage, sentences);
    }
    analysis
}

/// High-level summary: 2-5 sentences reflecting how far the run
/// progressed and whether confidence cleared the 0.7 threshold.
#[must_use]
pub fn summary_sentences(result: &ReasoningResult) -> Vec<String> {
    let completed = result.completed_stages().len();
    let mut sentences = vec![format!(
        "Completed {completed} of {} pipeline stages in {} ms.",
        StageName::ORDER.len(),
        result.total_execution_time.as_millis()
    )];

    if let Some(error) = &result.error_message {
        sentences.push(format!("The run aborted: {error}."));
    }

    if result.overall_confidence < LOW_CONFIDENCE_THRESHOLD {
        sentences.push(format!(
            "Overall confidence {:.2} is below the {LOW_CONFIDENCE_THRESHOLD:.1} threshold; treat the conclusion with caution.",
            result.overall_confidence
        ));
    } else {
        sentences.push(format!(
            "Overall confidence {:.2} clears the {LOW_CONFIDENCE_THRESHOLD:.1} threshold.",
            result.overall_confidence
        ));
    }

    sentences.push(if result.success {
        "The run met the success criteria.".to_string()
    } else {
        "The run did not meet the success criteria.".to_string()
    });

    sentences
}

/// Fills the thinking fields of a finalized result in place.
///
/// Must run after `overall_confidence` and `success` are computed, since
/// the narration reports both.
pub fn generate_trace(result: &mut ReasoningResult, detail: ThinkingDetailLevel) {
    let reasoning = narrative_sentences(result, detail);
    let analysis = step_by_step_analysis(result);
    let summary = summary_sentences(result);

    result.reasoning_sentences = reasoning;
    result.step_by_step_analysis = analysis;
    result.thinking_process = summary;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{
        InferenceOutcome, InferenceStatus, ParsedVignette, RetrievedKnowledge,
    };
    use crate::result::StageData;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn two_stage_result() -> ReasoningResult {
        let mut result = ReasoningResult::new();
        result.record_completion(
            StageData::Parsed(ParsedVignette {
                entities: vec!["rain".into(), "wet".into()],
                constraints: vec!["rain -> wet".into()],
                confidence: 0.9,
            }),
            Duration::from_millis(10),
        );
        result.record_completion(
            StageData::Retrieved(RetrievedKnowledge {
                documents: vec![],
                confidence: 0.6,
            }),
            Duration::from_millis(25),
        );
        result.overall_confidence = 0.74;
        result.total_execution_time = Duration::from_millis(40);
        result
    }

    #[test]
    fn test_narrative_covers_populated_stages_plus_closing() {
        let result = two_stage_result();
        let sentences = narrative_sentences(&result, ThinkingDetailLevel::Moderate);

        assert_eq!(sentences.len(), 3);
        assert_eq!(
            sentences[0],
            "Parsed the vignette into 2 entities and 1 constraints."
        );
        assert_eq!(sentences[1], "Retrieved 0 knowledge documents.");
        assert_eq!(
            sentences[2],
            "Overall confidence across 2 completed stages is 0.74."
        );
    }

    #[test]
    fn test_detailed_mode_appends_extra_sentences() {
        let result = two_stage_result();
        let moderate = narrative_sentences(&result, ThinkingDetailLevel::Moderate);
        let detailed = narrative_sentences(&result, ThinkingDetailLevel::Detailed);
        assert_eq!(detailed.len(), moderate.len() + 2);
        assert!(detailed[3].contains("10 ms"));
    }

    #[test]
    fn test_step_by_step_only_for_completed_stages() {
        let result = two_stage_result();
        let analysis = step_by_step_analysis(&result);

        assert_eq!(analysis.len(), 2);
        let parse = &analysis[&StageName::Parse];
        assert!((3..=4).contains(&parse.len()));
        assert_eq!(parse[0], "The parse stage completed in 10 ms.");
        assert_eq!(parse[1], "It reported a confidence of 0.90.");
        assert!(!analysis.contains_key(&StageName::Graph));
    }

    #[test]
    fn test_summary_flags_low_confidence() {
        let mut result = two_stage_result();
        result.overall_confidence = 0.5;
        let summary = summary_sentences(&result);
        assert!((2..=5).contains(&summary.len()));
        assert!(summary.iter().any(|s| s.contains("below the 0.7 threshold")));
    }

    #[test]
    fn test_summary_reports_abort() {
        let mut result = two_stage_result();
        result.error_message = Some("stage 'graph' failed".to_string());
        let summary = summary_sentences(&result);
        assert!(summary.iter().any(|s| s.contains("The run aborted")));
    }

    #[test]
    fn test_trace_generation_is_idempotent() {
        let mut first = two_stage_result();
        first.success = true;
        let mut second = first.clone();

        generate_trace(&mut first, ThinkingDetailLevel::Detailed);
        generate_trace(&mut second, ThinkingDetailLevel::Detailed);
        // And again over an already-traced result.
        let mut third = first.clone();
        generate_trace(&mut third, ThinkingDetailLevel::Detailed);

        assert_eq!(first.reasoning_sentences, second.reasoning_sentences);
        assert_eq!(first.step_by_step_analysis, second.step_by_step_analysis);
        assert_eq!(first.thinking_process, second.thinking_process);
        assert_eq!(first.reasoning_sentences, third.reasoning_sentences);
    }

    #[test]
    fn test_completion_sentence_includes_counters() {
        let result = two_stage_result();
        let sentence = completion_sentence(StageName::Parse, &result);
        assert_eq!(
            sentence,
            "Completed the parse stage: constraints=1, entities=2 (confidence 0.90)."
        );
    }

    #[test]
    fn test_inference_narrative_reports_status() {
        let mut result = two_stage_result();
        result.record_completion(
            StageData::Inference(InferenceOutcome {
                status: InferenceStatus::Completed,
                samples: 500,
                estimates: std::collections::HashMap::new(),
                confidence: 0.8,
            }),
            Duration::from_millis(3),
        );
        let sentences = narrative_sentences(&result, ThinkingDetailLevel::Minimal);
        assert!(sentences
            .iter()
            .any(|s| s == "Ran inference with 500 samples and produced 0 estimates (completed)."));
    }
}
