//! B-roll tail of a reel: where the speaker leaves, and the clip cut from there.

use crate::classify::PresenceCheck;
use crate::disappearance::{find_disappearance, DisappearanceWindow, ScanOptions};
use crate::media::{FfmpegVideo, MediaError};
use crate::remote::{sanitize_shortcode, RecreateClient, RemoteError};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum BrollError {
    #[error("video service: {0}")]
    Remote(#[from] RemoteError),

    #[error("media: {0}")]
    Media(#[from] MediaError),

    #[error("temporary file: {0}")]
    TempFile(#[from] std::io::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrollVideo {
    pub file_url: String,
}

pub struct BrollService<P> {
    remote: RecreateClient,
    presence: P,
    scan: ScanOptions,
}

impl<P: PresenceCheck> BrollService<P> {
    pub fn new(remote: RecreateClient, presence: P, scan: ScanOptions) -> Self {
        Self {
            remote,
            presence,
            scan,
        }
    }

    /// Downloads the reel behind `raw_shortcode` and locates the speaker-free tail.
    pub async fn meta(&self, raw_shortcode: &str) -> Result<DisappearanceWindow, BrollError> {
        let shortcode = sanitize_shortcode(raw_shortcode)?;
        self.window_for(&shortcode).await
    }

    async fn window_for(&self, shortcode: &str) -> Result<DisappearanceWindow, BrollError> {
        let video_url = self.remote.get_video_url(shortcode).await?;

        // removed when dropped, on every exit path
        let tmp = tempfile::Builder::new()
            .prefix("video_")
            .suffix(".mp4")
            .tempfile()?;
        self.remote.download_video(&video_url, tmp.path()).await?;

        let video = FfmpegVideo::open(tmp.path())?;
        let found = find_disappearance(&video, &self.presence, self.scan).await;
        tracing::info!(
            shortcode,
            disappear_time = found.disappear_time,
            "b-roll window located"
        );
        Ok(found.window)
    }

    /// Locates the window, then has the video service cut it out.
    pub async fn video(&self, raw_shortcode: &str) -> Result<BrollVideo, BrollError> {
        let shortcode = sanitize_shortcode(raw_shortcode)?;
        let window = self.window_for(&shortcode).await?;
        let file_url = self.remote.cut_video(&shortcode, &window).await?;
        Ok(BrollVideo { file_url })
    }

    /// Cuts a window that is already known.
    pub async fn cut(
        &self,
        raw_shortcode: &str,
        window: &DisappearanceWindow,
    ) -> Result<BrollVideo, BrollError> {
        let shortcode = sanitize_shortcode(raw_shortcode)?;
        let file_url = self.remote.cut_video(&shortcode, window).await?;
        Ok(BrollVideo { file_url })
    }
}
