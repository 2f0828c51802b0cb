//! Frame-set analysis: classify every frame, then group, aggregate and detect.

use crate::classify::{classify_or_fallback, Classification, FrameClassifier};
use crate::frames::{FrameEntry, FrameInput, FrameSet, FramesError, ImageFetcher};
use crate::grouping::{average_confidence_by_role, group_with_explanations, ExplanationPolicy, Segment};
use crate::roles::{FrameRole, Role};
use crate::talking_head::{detect_talking_head, Evidence, DEFAULT_MIN_CONSECUTIVE};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error(transparent)]
    Frames(#[from] FramesError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Frame rate used for segment timecodes. Missing or zero means [`DEFAULT_FPS`].
    pub fps: Option<u32>,
    pub include_frame_details: bool,
    pub explanations: ExplanationPolicy,
    pub min_consecutive: usize,
    /// Classification requests in flight at once.
    pub concurrency: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            fps: None,
            include_frame_details: true,
            explanations: ExplanationPolicy::default(),
            min_consecutive: DEFAULT_MIN_CONSECUTIVE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl AnalyzeOptions {
    pub fn resolved_fps(&self) -> u32 {
        self.fps.filter(|f| *f > 0).unwrap_or(DEFAULT_FPS)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeReport {
    pub video_id: String,
    pub is_talkinghead: bool,
    pub talkinghead_confidence: f64,
    pub talkinghead_evidence: Option<Vec<Evidence>>,
    pub roles: Vec<Segment>,
    pub frames: Option<Vec<FrameRole>>,
    pub confidence: BTreeMap<Role, f64>,
}

/// Per-frame results, index-aligned with the input entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassifiedFrames {
    pub roles: Vec<FrameRole>,
    pub explanations: Vec<String>,
}

impl FromIterator<(FrameRole, String)> for ClassifiedFrames {
    fn from_iter<I: IntoIterator<Item = (FrameRole, String)>>(iter: I) -> Self {
        let (roles, explanations) = iter.into_iter().unzip();
        Self {
            roles,
            explanations,
        }
    }
}

/// Builds the report from already classified frames. Pure.
pub fn build_report(
    video_id: impl Into<String>,
    classified: ClassifiedFrames,
    options: &AnalyzeOptions,
) -> AnalyzeReport {
    let ClassifiedFrames {
        roles,
        explanations,
    } = classified;

    let segments = group_with_explanations(
        &roles,
        &explanations,
        Some(options.resolved_fps()),
        options.explanations,
    );
    let confidence = average_confidence_by_role(&roles);
    let talking = detect_talking_head(&roles, &explanations, options.min_consecutive);

    AnalyzeReport {
        video_id: video_id.into(),
        is_talkinghead: talking.is_talking_head,
        talkinghead_confidence: talking.confidence,
        talkinghead_evidence: Some(talking.evidence).filter(|e| !e.is_empty()),
        roles: segments,
        frames: options.include_frame_details.then_some(roles),
        confidence,
    }
}

pub struct Analyzer<C> {
    classifier: C,
    options: AnalyzeOptions,
}

impl<C: FrameClassifier> Analyzer<C> {
    pub fn new(classifier: C, options: AnalyzeOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    async fn classify_entry(&self, entry: &FrameEntry) -> (FrameRole, String) {
        let classification = match &entry.image {
            Some(image) => classify_or_fallback(&self.classifier, image).await,
            None => Classification::fallback(),
        };
        classification.into_frame_role(entry.name.clone())
    }

    /// Classifies entries concurrently; the output keeps input order.
    pub async fn classify_frames(&self, entries: &[FrameEntry]) -> ClassifiedFrames {
        futures::stream::iter(entries)
            .map(|entry| self.classify_entry(entry))
            .buffered(self.options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    pub async fn analyze(&self, frames: FrameSet) -> AnalyzeReport {
        tracing::info!(
            video_id = %frames.video_id,
            frames = frames.entries.len(),
            concurrency = self.options.concurrency,
            "classifying frames"
        );
        let classified = self.classify_frames(&frames.entries).await;
        let report = build_report(frames.video_id, classified, &self.options);
        tracing::info!(
            video_id = %report.video_id,
            segments = report.roles.len(),
            is_talkinghead = report.is_talkinghead,
            talkinghead_confidence = report.talkinghead_confidence,
            "analysis finished"
        );
        report
    }

    /// Loads `input` and analyzes it.
    pub async fn analyze_input(
        &self,
        input: FrameInput,
        fetcher: &ImageFetcher,
    ) -> Result<AnalyzeReport, AnalyzeError> {
        let frames = input.load(fetcher).await?;
        Ok(self.analyze(frames).await)
    }
}
