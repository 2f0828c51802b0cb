mod ffmpeg;

use crate::frames::FrameImage;
use futures::future::BoxFuture;
use std::path::PathBuf;

pub use ffmpeg::{ffmpeg_frame_args, parse_ffprobe_duration, FfmpegVideo};

#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    #[error("video file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),

    #[error("ffprobe failed: {0}")]
    FfprobeFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MediaError>;

/// A seekable video the disappearance scan can sample.
pub trait VideoSource: Send + Sync {
    /// Total duration in seconds.
    fn duration(&self) -> BoxFuture<'_, Result<f64>>;

    /// The frame shown at `seconds`, or `None` when nothing could be decoded there.
    fn frame_at(&self, seconds: f64) -> BoxFuture<'_, Result<Option<FrameImage>>>;
}
