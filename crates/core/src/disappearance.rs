//! Locating the second at which the on-camera speaker leaves the video.
//!
//! The video is sampled once per second. The first absent sample after a
//! present one is the disappearance time; later re-appearances are ignored.
//! The reported window starts one second after that, capped at the duration.

use crate::classify::{presence_or_absent, PresenceCheck};
use crate::media::VideoSource;
use crate::timecode::{floor_seconds, seconds_to_timestamp};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub const SAFETY_BUFFER_SECS: u64 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisappearanceWindow {
    pub time_start: String,
    pub time_end: String,
}

impl DisappearanceWindow {
    pub fn new(disappear_time: u64, duration: f64) -> Self {
        let end = floor_seconds(duration);
        let start = disappear_time.saturating_add(SAFETY_BUFFER_SECS).min(end);
        Self {
            time_start: seconds_to_timestamp(start),
            time_end: seconds_to_timestamp(end),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disappearance {
    /// First absent second, or the floored duration when the speaker never left.
    pub disappear_time: u64,
    pub window: DisappearanceWindow,
}

/// Left-to-right scan over per-second presence observations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisappearanceScan {
    last_present: Option<u64>,
    disappear_time: Option<u64>,
}

impl DisappearanceScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the sample at second `t`. `None` means the frame could not be
    /// extracted and is skipped. Returns `true` once the scan can stop.
    pub fn observe(&mut self, t: u64, present: Option<bool>) -> bool {
        if self.disappear_time.is_some() {
            return true;
        }
        match present {
            None => false,
            Some(true) => {
                self.last_present = Some(t);
                false
            }
            Some(false) if self.last_present.is_some() => {
                self.disappear_time = Some(t);
                true
            }
            Some(false) => false,
        }
    }

    pub fn finish(self, duration: f64) -> Disappearance {
        let disappear_time = self
            .disappear_time
            .unwrap_or_else(|| floor_seconds(duration));
        Disappearance {
            disappear_time,
            window: DisappearanceWindow::new(disappear_time, duration),
        }
    }
}

/// Runs the scan over observations already in time order.
pub fn scan_observations<I>(duration: f64, observations: I) -> Disappearance
where
    I: IntoIterator<Item = (u64, Option<bool>)>,
{
    let mut scan = DisappearanceScan::new();
    for (t, present) in observations {
        if scan.observe(t, present) {
            break;
        }
    }
    scan.finish(duration)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    /// Presence checks allowed in flight at once. Results are still consumed in time order.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

async fn sample<V, P>(video: &V, presence: &P, t: u64) -> Option<bool>
where
    V: VideoSource + ?Sized,
    P: PresenceCheck + ?Sized,
{
    match video.frame_at(t as f64).await {
        Ok(Some(frame)) => Some(presence_or_absent(presence, &frame).await),
        Ok(None) => {
            tracing::debug!(t, "no frame at sample time, skipping");
            None
        }
        Err(e) => {
            tracing::warn!(t, error = %e, "frame extraction failed, skipping");
            None
        }
    }
}

/// Samples `video` at every whole second and returns the disappearance window.
pub async fn find_disappearance<V, P>(video: &V, presence: &P, options: ScanOptions) -> Disappearance
where
    V: VideoSource + ?Sized,
    P: PresenceCheck + ?Sized,
{
    let duration = match video.duration().await {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "could not read video duration, assuming 0");
            0.0
        }
    };
    let last = floor_seconds(duration);

    let mut scan = DisappearanceScan::new();
    let mut checks = futures::stream::iter(0..=last)
        .map(move |t| async move { (t, sample(video, presence, t).await) })
        .buffered(options.concurrency.max(1));

    while let Some((t, present)) = checks.next().await {
        if scan.observe(t, present) {
            break;
        }
    }

    let result = scan.finish(duration);
    tracing::info!(
        duration,
        disappear_time = result.disappear_time,
        time_start = %result.window.time_start,
        time_end = %result.window.time_end,
        "disappearance scan finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ScriptedPresence;
    use crate::frames::FrameImage;
    use crate::media::{MediaError, Result as MediaResult};
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::collections::HashSet;
    use std::time::Duration;

    struct FakeVideo {
        duration: f64,
        missing: HashSet<u64>,
        /// Later samples answer sooner, to shuffle completion order.
        staggered: bool,
    }

    impl FakeVideo {
        fn new(duration: f64) -> Self {
            Self {
                duration,
                missing: HashSet::new(),
                staggered: false,
            }
        }
    }

    fn name(t: u64) -> String {
        format!("t{t}")
    }

    impl VideoSource for FakeVideo {
        fn duration(&self) -> BoxFuture<'_, MediaResult<f64>> {
            async move { Ok(self.duration) }.boxed()
        }

        fn frame_at(&self, seconds: f64) -> BoxFuture<'_, MediaResult<Option<FrameImage>>> {
            async move {
                let t = seconds as u64;
                if self.staggered {
                    tokio::time::sleep(Duration::from_millis(20u64.saturating_sub(t * 2))).await;
                }
                if self.missing.contains(&t) {
                    return Err(MediaError::FfmpegFailed("decode error".to_owned()));
                }
                Ok(Some(FrameImage {
                    name: name(t),
                    data_uri: String::new(),
                }))
            }
            .boxed()
        }
    }

    fn present(range: std::ops::RangeInclusive<u64>) -> ScriptedPresence {
        ScriptedPresence::new().present_in(range.map(name))
    }

    #[tokio::test]
    async fn speaker_leaves_at_five() {
        let video = FakeVideo::new(10.0);
        let presence = present(0..=4);
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 5);
        assert_eq!(r.window.time_start, "00:00:06");
        assert_eq!(r.window.time_end, "00:00:10");
        // stops right after the transition
        assert_eq!(presence.calls(), 6);
    }

    #[tokio::test]
    async fn speaker_present_throughout_collapses_window() {
        let video = FakeVideo::new(10.4);
        let presence = present(0..=10);
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 10);
        assert_eq!(r.window.time_start, r.window.time_end);
        assert_eq!(r.window.time_end, "00:00:10");
    }

    #[tokio::test]
    async fn speaker_never_seen_uses_duration() {
        let video = FakeVideo::new(7.9);
        let presence = ScriptedPresence::new();
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 7);
        assert_eq!(r.window.time_start, "00:00:07");
        assert_eq!(presence.calls(), 8);
    }

    #[tokio::test]
    async fn only_first_transition_counts() {
        let video = FakeVideo::new(12.0);
        let presence = ScriptedPresence::new().present_in((0..=2).chain(6..=9).map(name));
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 3);
        assert_eq!(r.window.time_start, "00:00:04");
    }

    #[tokio::test]
    async fn late_arrival_starts_tracking_after_first_presence() {
        // absent 0..=2, present 3..=5, gone at 6
        let video = FakeVideo::new(9.0);
        let presence = present(3..=5);
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 6);
    }

    #[tokio::test]
    async fn failed_extraction_is_skipped_not_absent() {
        let mut video = FakeVideo::new(10.0);
        video.missing.insert(3);
        let presence = present(0..=4);
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 5);
    }

    #[tokio::test]
    async fn failed_presence_check_counts_as_absent() {
        let video = FakeVideo::new(10.0);
        let presence = present(0..=6).failing_in([name(2)]);
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 2);
    }

    #[tokio::test]
    async fn zero_duration_checks_one_sample() {
        let video = FakeVideo::new(0.0);
        let presence = present(0..=0);
        let r = find_disappearance(&video, &presence, ScanOptions::default()).await;
        assert_eq!(r.disappear_time, 0);
        assert_eq!(r.window.time_start, "00:00:00");
        assert_eq!(r.window.time_end, "00:00:00");
    }

    #[tokio::test]
    async fn concurrent_checks_resolve_in_time_order() {
        let mut video = FakeVideo::new(10.0);
        video.staggered = true;
        let presence = ScriptedPresence::new().present_in((0..=2).chain(5..=6).map(name));
        let r = find_disappearance(&video, &presence, ScanOptions { concurrency: 8 }).await;
        assert_eq!(r.disappear_time, 3);
    }

    #[test]
    fn buffer_is_capped_at_duration() {
        let w = DisappearanceWindow::new(10, 10.0);
        assert_eq!(w.time_start, "00:00:10");
        let w = DisappearanceWindow::new(59, 3600.5);
        assert_eq!(w.time_start, "00:01:00");
        assert_eq!(w.time_end, "01:00:00");
    }

    #[test]
    fn scan_over_plain_observations() {
        let obs = vec![(0, Some(true)), (1, None), (2, Some(true)), (3, Some(false))];
        let r = scan_observations(5.0, obs);
        assert_eq!(r.disappear_time, 3);

        let mut scan = DisappearanceScan::new();
        assert!(!scan.observe(0, Some(false)));
        assert!(!scan.observe(1, Some(true)));
        assert!(scan.observe(2, Some(false)));
        assert!(scan.observe(3, Some(true)));
        assert_eq!(scan.finish(9.0).disappear_time, 2);
    }
}
