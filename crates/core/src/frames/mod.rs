mod dir;
mod fetch;
mod spritesheet;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use dir::{list_image_files, load_directory, video_id_from_dir};
pub use fetch::{filename_from_url, video_id_from_urls, ImageFetcher};
pub use spritesheet::{encode_jpeg, slice_tiles, tile_name, GridSpec};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    pub fn subtype(self) -> &'static str {
        match self {
            ImageMime::Jpeg => "jpeg",
            ImageMime::Png => "png",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageMime::Jpeg),
            "png" => Some(ImageMime::Png),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("jpeg") || ct.contains("jpg") {
            Some(ImageMime::Jpeg)
        } else if ct.contains("png") {
            Some(ImageMime::Png)
        } else {
            None
        }
    }
}

/// One image ready to be sent to the vision model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameImage {
    pub name: String,
    pub data_uri: String,
}

impl FrameImage {
    pub fn from_bytes(name: impl Into<String>, mime: ImageMime, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            data_uri: data_uri(mime, bytes),
        }
    }
}

pub fn data_uri(mime: ImageMime, bytes: &[u8]) -> String {
    format!("data:image/{};base64,{}", mime.subtype(), STANDARD.encode(bytes))
}

/// A named frame slot. `image` is `None` when the frame could not be fetched;
/// such slots still occupy their position and get the fallback classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameEntry {
    pub name: String,
    pub image: Option<FrameImage>,
}

impl From<FrameImage> for FrameEntry {
    fn from(image: FrameImage) -> Self {
        Self {
            name: image.name.clone(),
            image: Some(image),
        }
    }
}

/// Ordered frames of one video plus the id reported back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSet {
    pub video_id: String,
    pub entries: Vec<FrameEntry>,
}

/// Where the frames of an analysis request come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameInput {
    Directory(PathBuf),
    Urls(Vec<String>),
    Spritesheet { url: String, grid: GridSpec },
}

impl FrameInput {
    /// Picks the source the way the analysis request does: a directory wins,
    /// a single URL with a column hint is a spritesheet, anything else is a URL list.
    pub fn from_request(
        frames_dir: Option<PathBuf>,
        image_urls: Vec<String>,
        grid: Option<GridSpec>,
    ) -> Result<Self, FramesError> {
        let frames_dir = frames_dir.filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = frames_dir {
            return Ok(FrameInput::Directory(dir));
        }
        match (image_urls.len(), grid) {
            (0, _) => Err(FramesError::NoInput),
            (1, Some(grid)) => Ok(FrameInput::Spritesheet {
                url: image_urls.into_iter().next().unwrap_or_default(),
                grid,
            }),
            _ => Ok(FrameInput::Urls(image_urls)),
        }
    }

    pub async fn load(self, fetcher: &ImageFetcher) -> Result<FrameSet, FramesError> {
        match self {
            FrameInput::Directory(dir) => load_directory(&dir).await,
            FrameInput::Urls(urls) => Ok(fetcher.fetch_all(&urls).await),
            FrameInput::Spritesheet { url, grid } => fetcher.fetch_spritesheet(&url, grid).await,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FramesError {
    #[error("provide either a frames directory or image urls")]
    NoInput,

    #[error("frames path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("no .jpg/.jpeg/.png files found in {0}")]
    Empty(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid spritesheet grid: {0}")]
    InvalidGrid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_has_mime_and_base64_payload() {
        assert_eq!(data_uri(ImageMime::Png, b"abc"), "data:image/png;base64,YWJj");
        assert!(data_uri(ImageMime::Jpeg, &[]).starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn mime_detection() {
        assert_eq!(ImageMime::from_extension("JPG"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_extension("gif"), None);
        assert_eq!(
            ImageMime::from_content_type("image/png; charset=binary"),
            Some(ImageMime::Png)
        );
        assert_eq!(ImageMime::from_content_type("application/octet-stream"), None);
    }

    #[test]
    fn input_selection() {
        let grid = GridSpec {
            cols: 4,
            rows: None,
            tile_limit: None,
        };
        let one = vec!["https://cdn/x/sheet.jpg".to_owned()];

        assert!(matches!(
            FrameInput::from_request(Some(PathBuf::from("/tmp/f")), one.clone(), Some(grid)),
            Ok(FrameInput::Directory(_))
        ));
        assert!(matches!(
            FrameInput::from_request(None, one.clone(), Some(grid)),
            Ok(FrameInput::Spritesheet { .. })
        ));
        assert!(matches!(
            FrameInput::from_request(None, one, None),
            Ok(FrameInput::Urls(_))
        ));
        assert!(matches!(
            FrameInput::from_request(Some(PathBuf::new()), vec![], None),
            Err(FramesError::NoInput)
        ));
    }
}
