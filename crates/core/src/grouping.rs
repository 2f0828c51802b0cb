use crate::roles::{round3, FrameRole, Role};
use crate::timecode::{effective_fps, frames_to_seconds, seconds_to_timecode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A contiguous run of frames sharing one role.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub start: String,
    pub end: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(rename = "a_role_ratio", default)]
    pub primary_ratio: f64,
    #[serde(rename = "b_role_ratio", default)]
    pub supporting_ratio: f64,
}

/// A segment together with the frame range it was built from (`end_index` is exclusive).
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedSegment {
    pub segment: Segment,
    pub start_index: usize,
    pub end_index: usize,
}

impl IndexedSegment {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// Whether segments should carry the explanation of their first frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExplanationPolicy {
    pub include: bool,
    /// Only the first `max` segments get text; later ones carry an empty string.
    pub max: Option<usize>,
}

impl ExplanationPolicy {
    pub fn all() -> Self {
        Self {
            include: true,
            max: None,
        }
    }

    fn allows(&self, segment_index: usize) -> bool {
        self.include && self.max.map_or(true, |max| segment_index < max)
    }
}

pub fn group_with_indices(frames: &[FrameRole], fps: Option<u32>) -> Vec<IndexedSegment> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let fps = effective_fps(fps);

    let mut out = Vec::new();
    let mut start_idx = 0;
    let mut current = first.role;

    for (idx, frame) in frames.iter().enumerate().skip(1) {
        if frame.role != current {
            out.push(build(frames, start_idx, idx, current, fps));
            start_idx = idx;
            current = frame.role;
        }
    }
    out.push(build(frames, start_idx, frames.len(), current, fps));
    out
}

pub fn group_frames_to_segments(frames: &[FrameRole], fps: Option<u32>) -> Vec<Segment> {
    group_with_indices(frames, fps)
        .into_iter()
        .map(|s| s.segment)
        .collect()
}

/// Groups frames and attaches explanations copied from each segment's first frame.
///
/// `explanations` is index-aligned with `frames`; missing entries read as empty.
/// Every segment carries a string, empty when the policy leaves it out.
pub fn group_with_explanations(
    frames: &[FrameRole],
    explanations: &[String],
    fps: Option<u32>,
    policy: ExplanationPolicy,
) -> Vec<Segment> {
    group_with_indices(frames, fps)
        .into_iter()
        .enumerate()
        .map(|(seg_idx, indexed)| {
            let mut segment = indexed.segment;
            let text = if policy.allows(seg_idx) {
                explanations
                    .get(indexed.start_index)
                    .cloned()
                    .unwrap_or_default()
            } else {
                String::new()
            };
            segment.explanation = Some(text);
            segment
        })
        .collect()
}

fn build(frames: &[FrameRole], start: usize, end: usize, role: Role, fps: u32) -> IndexedSegment {
    let slice = &frames[start..end];
    let (primary_ratio, supporting_ratio) = if slice.is_empty() {
        (0.0, 0.0)
    } else {
        let n = slice.len() as f64;
        (
            slice.iter().map(|f| f.primary_ratio).sum::<f64>() / n,
            slice.iter().map(|f| f.supporting_ratio).sum::<f64>() / n,
        )
    };

    IndexedSegment {
        segment: Segment {
            start: seconds_to_timecode(frames_to_seconds(start, fps)),
            end: seconds_to_timecode(frames_to_seconds(end, fps)),
            role,
            explanation: None,
            primary_ratio: round3(primary_ratio),
            supporting_ratio: round3(supporting_ratio),
        },
        start_index: start,
        end_index: end,
    }
}

/// Mean confidence per role, rounded to three decimals. Roles with no frames are omitted.
pub fn average_confidence_by_role(frames: &[FrameRole]) -> BTreeMap<Role, f64> {
    let mut acc: BTreeMap<Role, (f64, usize)> = BTreeMap::new();
    for frame in frames {
        let entry = acc.entry(frame.role).or_insert((0.0, 0));
        entry.0 += frame.confidence;
        entry.1 += 1;
    }
    acc.into_iter()
        .map(|(role, (sum, count))| (role, round3(sum / count as f64)))
        .collect()
}
