use crate::frames::spritesheet::{encode_jpeg, slice_tiles, tile_name, GridSpec};
use crate::frames::{FrameEntry, FrameImage, FrameSet, FramesError, ImageMime};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0";

#[derive(Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new() -> Result<Self, FramesError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn get_bytes(&self, url: &str) -> Result<(Bytes, Option<String>), FramesError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FramesError::HttpStatus(status.as_u16(), body));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok((response.bytes().await?, content_type))
    }

    /// Downloads one image. The mime comes from `Content-Type`, then the URL
    /// extension, and defaults to jpeg.
    pub async fn fetch_image(&self, url: &str) -> Result<FrameImage, FramesError> {
        let (bytes, content_type) = self.get_bytes(url).await?;
        let mime = content_type
            .as_deref()
            .and_then(ImageMime::from_content_type)
            .or_else(|| extension_of(url).as_deref().and_then(ImageMime::from_extension))
            .unwrap_or(ImageMime::Jpeg);
        Ok(FrameImage::from_bytes(filename_from_url(url), mime, &bytes))
    }

    /// Downloads every URL in order. A failed download keeps its slot with no image.
    pub async fn fetch_all(&self, urls: &[String]) -> FrameSet {
        let mut entries = Vec::with_capacity(urls.len());
        for url in urls {
            match self.fetch_image(url).await {
                Ok(image) => entries.push(FrameEntry::from(image)),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "image download failed");
                    entries.push(FrameEntry {
                        name: filename_from_url(url),
                        image: None,
                    });
                }
            }
        }
        FrameSet {
            video_id: video_id_from_urls(urls),
            entries,
        }
    }

    pub async fn fetch_spritesheet(
        &self,
        url: &str,
        grid: GridSpec,
    ) -> Result<FrameSet, FramesError> {
        let (bytes, _) = self.get_bytes(url).await?;
        let sheet = image::load_from_memory(&bytes)?;
        let tiles = slice_tiles(&sheet, grid)?;

        let mut entries = Vec::with_capacity(tiles.len());
        for (idx, tile) in tiles.iter().enumerate() {
            let jpeg = encode_jpeg(tile)?;
            entries.push(FrameEntry::from(FrameImage::from_bytes(
                tile_name(idx),
                ImageMime::Jpeg,
                &jpeg,
            )));
        }

        tracing::info!(url = %url, tiles = entries.len(), "sliced spritesheet");
        Ok(FrameSet {
            video_id: video_id_from_urls(&[url.to_owned()]),
            entries,
        })
    }
}

fn extension_of(url: &str) -> Option<String> {
    let name = filename_from_url(url);
    name.rsplit_once('.').map(|(_, ext)| ext.to_owned())
}

/// Last path segment of a URL, or `image.jpg` when there is none.
pub fn filename_from_url(url: &str) -> String {
    let from_path = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segs| segs.next_back().map(str::to_owned)),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|p| p.rsplit('/').next())
            .map(str::to_owned),
    };
    from_path
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image.jpg".to_owned())
}

/// File stem of the first URL, or `url` when there is nothing usable.
pub fn video_id_from_urls(urls: &[String]) -> String {
    urls.first()
        .map(|u| filename_from_url(u))
        .and_then(|name| {
            let stem = match name.rsplit_once('.') {
                Some((stem, _)) => stem.to_owned(),
                None => name,
            };
            (!stem.is_empty()).then_some(stem)
        })
        .unwrap_or_else(|| "url".to_owned())
}
