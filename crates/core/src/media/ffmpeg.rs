use crate::frames::{FrameImage, ImageMime};
use crate::media::{MediaError, Result, VideoSource};
use ffmpeg_sidecar::{download, ffprobe::ffprobe_path, paths::ffmpeg_path};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// A local video file read through the ffmpeg/ffprobe binaries.
#[derive(Clone, Debug)]
pub struct FfmpegVideo {
    path: PathBuf,
}

impl FfmpegVideo {
    /// Makes sure ffmpeg is installed (downloading it if needed) and that `path` exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path));
        }
        download::auto_download().map_err(|e| MediaError::FfmpegUnavailable(e.to_string()))?;
        Ok(Self { path })
    }

    fn frame_name(&self, seconds: f64) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_owned());
        format!("{stem}@{seconds:.0}s")
    }

    async fn probe_duration(&self) -> Result<f64> {
        let output = tokio::process::Command::new(ffprobe_path())
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_entries",
                "format=duration",
            ])
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr_s = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(MediaError::FfprobeFailed(format!(
                "exit_code={:?} stderr={stderr_s}",
                output.status.code()
            )));
        }

        Ok(parse_ffprobe_duration(&output.stdout))
    }

    async fn extract_jpeg(&self, seconds: f64) -> Result<Vec<u8>> {
        let output = tokio::process::Command::new(ffmpeg_path())
            .args(ffmpeg_frame_args(&self.path, seconds))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr_s = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(MediaError::FfmpegFailed(format!(
                "exit_code={:?} stderr={stderr_s}",
                output.status.code()
            )));
        }
        Ok(output.stdout)
    }
}

/// Arguments that seek to `seconds` and write a single JPEG frame to stdout.
pub fn ffmpeg_frame_args(path: &Path, seconds: f64) -> Vec<String> {
    vec![
        "-hide_banner".to_owned(),
        "-nostdin".to_owned(),
        "-loglevel".to_owned(),
        "error".to_owned(),
        "-ss".to_owned(),
        format!("{:.3}", seconds.max(0.0)),
        "-i".to_owned(),
        path.to_string_lossy().into_owned(),
        "-frames:v".to_owned(),
        "1".to_owned(),
        "-f".to_owned(),
        "image2pipe".to_owned(),
        "-c:v".to_owned(),
        "mjpeg".to_owned(),
        "pipe:1".to_owned(),
    ]
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Duration from ffprobe's JSON output; anything unreadable is 0.
pub fn parse_ffprobe_duration(stdout: &[u8]) -> f64 {
    serde_json::from_slice::<FfprobeOutput>(stdout)
        .ok()
        .and_then(|o| o.format)
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

impl VideoSource for FfmpegVideo {
    fn duration(&self) -> BoxFuture<'_, Result<f64>> {
        async move { self.probe_duration().await }.boxed()
    }

    fn frame_at(&self, seconds: f64) -> BoxFuture<'_, Result<Option<FrameImage>>> {
        async move {
            let jpeg = self.extract_jpeg(seconds).await?;
            if jpeg.is_empty() {
                return Ok(None);
            }
            Ok(Some(FrameImage::from_bytes(
                self.frame_name(seconds),
                ImageMime::Jpeg,
                &jpeg,
            )))
        }
        .boxed()
    }
}
