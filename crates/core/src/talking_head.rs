//! Whole-video talking-head heuristic.
//!
//! A video counts as speaker-led when confident A-roll frames with a large
//! on-camera subject either form one long run or show up often enough overall.

use crate::roles::{round3, FrameRole, Role};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_CONSECUTIVE: usize = 3;
pub const MIN_CONFIDENCE: f64 = 0.55;
pub const MIN_PRIMARY_RATIO: f64 = 0.35;
pub const MIN_COVERAGE: f64 = 0.2;
pub const MAX_EVIDENCE: usize = 3;
pub const DEFAULT_EVIDENCE_TEXT: &str = "Face-forward frame.";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub frame: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TalkingHeadResult {
    pub is_talking_head: bool,
    pub confidence: f64,
    pub evidence: Vec<Evidence>,
}

pub fn qualifies(frame: &FrameRole) -> bool {
    frame.role == Role::Primary
        && frame.confidence >= MIN_CONFIDENCE
        && frame.primary_ratio >= MIN_PRIMARY_RATIO
}

/// Length of the longest run of consecutive integers in an ascending index list.
fn longest_run(indices: &[usize]) -> usize {
    if indices.is_empty() {
        return 0;
    }
    let mut longest = 1;
    let mut streak = 1;
    for pair in indices.windows(2) {
        if pair[1] == pair[0] + 1 {
            streak += 1;
            longest = longest.max(streak);
        } else {
            streak = 1;
        }
    }
    longest
}

/// `explanations` is index-aligned with `frames`; missing or empty entries fall
/// back to a generic description in the evidence list.
pub fn detect_talking_head(
    frames: &[FrameRole],
    explanations: &[String],
    min_consecutive: usize,
) -> TalkingHeadResult {
    if frames.is_empty() {
        return TalkingHeadResult::default();
    }

    let qualified: Vec<usize> = frames
        .iter()
        .enumerate()
        .filter(|(_, f)| qualifies(f))
        .map(|(i, _)| i)
        .collect();

    let coverage = qualified.len() as f64 / frames.len().max(1) as f64;
    let run = longest_run(&qualified);
    let is_talking_head =
        run >= min_consecutive || (qualified.len() >= min_consecutive && coverage >= MIN_COVERAGE);

    let confidence = if is_talking_head {
        let run_score = (run as f64 / (min_consecutive + 1) as f64).min(1.0);
        round3(0.6 * coverage + 0.4 * run_score).min(0.99)
    } else {
        round3(coverage * 0.5)
    };

    let evidence = qualified
        .iter()
        .take(MAX_EVIDENCE)
        .map(|&idx| Evidence {
            frame: frames[idx].frame.clone(),
            description: explanations
                .get(idx)
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_EVIDENCE_TEXT.to_owned()),
        })
        .collect();

    tracing::debug!(
        frames = frames.len(),
        qualified = qualified.len(),
        longest_run = run,
        coverage,
        is_talking_head,
        "talking-head heuristic evaluated"
    );

    TalkingHeadResult {
        is_talking_head,
        confidence,
        evidence,
    }
}
