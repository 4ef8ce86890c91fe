//! Confidence aggregation and success determination.

use crate::outputs::InferenceStatus;
use crate::result::ReasoningResult;

/// Ascending weights paired positionally with completed stages.
///
/// Weight `i` goes to the `i`-th *completed* stage in pipeline order, not
/// to a fixed stage identity, so later progress always counts more.
pub const STAGE_WEIGHTS: [f64; 5] = [1.0, 1.2, 1.4, 1.6, 1.8];

/// Minimum overall confidence for the degraded invalid-program result.
pub const PARTIAL_INVALID_THRESHOLD: f64 = 0.5;

/// Minimum overall confidence for the generic partial-success fallback.
pub const PARTIAL_FALLBACK_THRESHOLD: f64 = 0.6;

/// Minimum completed stages for the generic partial-success fallback.
pub const PARTIAL_FALLBACK_STAGES: usize = 3;

/// Weighted mean over the confidences of completed stages.
///
/// `confidences` must be in pipeline order; returns `0.0` when no stage
/// completed.
#[must_use]
pub fn overall_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (confidence, weight) in confidences.iter().zip(STAGE_WEIGHTS) {
        weighted += confidence * weight;
        total += weight;
    }
    weighted / total
}

/// Evaluates the multi-branch success rule over a finalized run.
///
/// Success requires `parsed` and `retrieved` to be present, and one of:
/// full inference completion; a synthesized-but-invalid program with
/// overall confidence at least 0.5; or at least three completed stages
/// with overall confidence at least 0.6. A run that raised no failure can
/// still be unsuccessful.
#[must_use]
pub fn determine_success(result: &ReasoningResult, overall: f64) -> bool {
    if result.parsed.is_none() || result.retrieved.is_none() {
        return false;
    }

    if result
        .inference
        .as_ref()
        .is_some_and(|i| i.status == InferenceStatus::Completed)
    {
        return true;
    }

    if result
        .program
        .as_ref()
        .is_some_and(|p| !p.validated)
        && overall >= PARTIAL_INVALID_THRESHOLD
    {
        return true;
    }

    result.completed_stages().len() >= PARTIAL_FALLBACK_STAGES
        && overall >= PARTIAL_FALLBACK_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{
        CausalGraph, InferenceOutcome, ParsedVignette, RetrievedKnowledge, SynthesizedProgram,
    };
    use crate::result::StageData;
    use std::collections::HashMap;
    use std::time::Duration;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn result_with_stages(confidences: &[f64], validated: bool) -> ReasoningResult {
        let mut result = ReasoningResult::new();
        for (i, &confidence) in confidences.iter().enumerate() {
            let data = match i {
                0 => StageData::Parsed(ParsedVignette {
                    entities: vec!["a".into()],
                    constraints: vec![],
                    confidence,
                }),
                1 => StageData::Retrieved(RetrievedKnowledge {
                    documents: vec![],
                    confidence,
                }),
                2 => StageData::Graph(CausalGraph {
                    nodes: vec![],
                    edges: vec![],
                    confidence,
                }),
                3 => StageData::Program(SynthesizedProgram {
                    source: String::new(),
                    variables: vec![],
                    validated,
                    confidence,
                }),
                _ => StageData::Inference(InferenceOutcome {
                    status: InferenceStatus::Completed,
                    samples: 100,
                    estimates: HashMap::new(),
                    confidence,
                }),
            };
            result.record_completion(data, Duration::from_millis(1));
        }
        result
    }

    #[test]
    fn test_zero_completed_stages_yields_zero() {
        assert_eq!(overall_confidence(&[]), 0.0);
    }

    #[test]
    fn test_all_ones_yields_exactly_one() {
        assert_eq!(overall_confidence(&[1.0, 1.0, 1.0, 1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_uniform_confidence_is_preserved() {
        assert!(approx(overall_confidence(&[0.9, 0.9, 0.9, 0.9, 0.9]), 0.9));
    }

    #[test]
    fn test_later_stages_weigh_more() {
        // Same values, swapped order: high confidence late should score
        // higher than high confidence early.
        let early = overall_confidence(&[0.9, 0.1]);
        let late = overall_confidence(&[0.1, 0.9]);
        assert!(late > early);
    }

    #[test]
    fn test_weights_pair_positionally_with_completed_stages() {
        // Two completed stages always use weights [1.0, 1.2], regardless
        // of which stages they were.
        let expected = (0.6 + 0.8 * 1.2) / 2.2;
        assert!(approx(overall_confidence(&[0.6, 0.8]), expected));
    }

    #[test]
    fn test_full_success_scenario() {
        let result = result_with_stages(&[0.9, 0.9, 0.9, 0.9, 0.9], true);
        let overall = overall_confidence(&result.completed_confidences());
        assert!(approx(overall, 0.9));
        assert!(determine_success(&result, overall));
    }

    #[test]
    fn test_invalid_program_succeeds_above_half() {
        let result = result_with_stages(&[0.9, 0.9, 0.9, 0.4], false);
        let overall = overall_confidence(&result.completed_confidences());
        assert!(overall >= 0.5);
        assert!(determine_success(&result, overall));
    }

    #[test]
    fn test_invalid_program_fails_below_half() {
        let result = result_with_stages(&[0.3, 0.3, 0.3, 0.3], false);
        let overall = overall_confidence(&result.completed_confidences());
        assert!(overall < 0.5);
        assert!(!determine_success(&result, overall));
    }

    #[test]
    fn test_missing_retrieved_is_never_success() {
        let result = result_with_stages(&[0.95], true);
        assert!(!determine_success(&result, 0.95));
    }

    #[test]
    fn test_low_confidence_full_run_is_unsuccessful() {
        // All five stages completed without raising, but the run still
        // fails the success rule on confidence alone.
        let mut result = result_with_stages(&[0.4, 0.4, 0.4, 0.4, 0.4], true);
        if let Some(inference) = result.inference.as_mut() {
            inference.status = InferenceStatus::Failed;
        }
        let overall = overall_confidence(&result.completed_confidences());
        assert!(approx(overall, 0.4));
        assert!(!determine_success(&result, overall));
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_partial_fallback_needs_three_stages() {
        let two = result_with_stages(&[0.9, 0.9], true);
        assert!(!determine_success(&two, 0.9));

        let three = result_with_stages(&[0.9, 0.9, 0.9], true);
        assert!(determine_success(&three, 0.9));
    }
}
