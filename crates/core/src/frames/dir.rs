use crate::frames::{FrameEntry, FrameImage, FrameSet, FramesError, ImageMime};
use std::path::{Path, PathBuf};

/// Image files directly inside `dir`, sorted by path.
pub async fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, FramesError> {
    if !tokio::fs::metadata(dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(FramesError::NotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut rd = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageMime::from_extension)
            .is_some();
        if is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn video_id_from_dir(dir: &Path) -> String {
    dir.components()
        .next_back()
        .and_then(|c| c.as_os_str().to_str())
        .filter(|s| !s.is_empty() && *s != "/")
        .unwrap_or("video")
        .to_owned()
}

pub async fn load_directory(dir: &Path) -> Result<FrameSet, FramesError> {
    let files = list_image_files(dir).await?;
    if files.is_empty() {
        return Err(FramesError::Empty(dir.to_path_buf()));
    }

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageMime::from_extension)
            .unwrap_or(ImageMime::Jpeg);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = tokio::fs::read(&path).await?;
        entries.push(FrameEntry::from(FrameImage::from_bytes(name, mime, &bytes)));
    }

    tracing::info!(dir = %dir.display(), frames = entries.len(), "loaded frames from directory");
    Ok(FrameSet {
        video_id: video_id_from_dir(dir),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_images_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_02.png", "frame_01.JPG", "notes.txt", "frame_03.jpeg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = list_image_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_01.JPG", "frame_02.png", "frame_03.jpeg"]);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let err = list_image_files(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, FramesError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_directory(dir.path()).await.unwrap_err();
        assert!(matches!(err, FramesError::Empty(_)));
    }

    #[tokio::test]
    async fn load_directory_names_frames_by_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"png").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"jpg").unwrap();

        let set = load_directory(dir.path()).await.unwrap();
        assert_eq!(set.entries.len(), 2);
        assert_eq!(set.entries[0].name, "a.jpg");
        let img = set.entries[1].image.as_ref().unwrap();
        assert!(img.data_uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn video_id_is_directory_basename() {
        assert_eq!(video_id_from_dir(Path::new("/data/frames/clip42/")), "clip42");
        assert_eq!(video_id_from_dir(Path::new("/")), "video");
    }
}
