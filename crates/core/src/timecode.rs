//! Timecode formatting.
//!
//! Segments use `MM:SS` (seconds rounded half to even, minutes are not wrapped into hours).
//! Disappearance windows use `HH:MM:SS` (floored seconds).

/// Seconds covered by `frame_index` frames at `fps`. A zero rate counts one frame per second.
pub fn frames_to_seconds(frame_index: usize, fps: u32) -> f64 {
    if fps > 0 {
        frame_index as f64 / f64::from(fps)
    } else {
        frame_index as f64
    }
}

/// Normalizes an optional grouping rate: absent or zero means one frame per second.
pub fn effective_fps(fps: Option<u32>) -> u32 {
    match fps {
        Some(v) if v > 0 => v,
        _ => 1,
    }
}

pub fn seconds_to_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let total = seconds.round_ties_even() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn seconds_to_timestamp(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Whole seconds of a media duration; negative or non-finite durations are 0.
pub fn floor_seconds(duration: f64) -> u64 {
    if duration.is_finite() && duration > 0.0 {
        duration.floor() as u64
    } else {
        0
    }
}
