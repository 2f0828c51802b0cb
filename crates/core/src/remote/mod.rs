//! Client for the video service that stores the source reels and cuts clips.

use crate::config::RecreateConfig;
use crate::disappearance::DisappearanceWindow;
use crate::util::{is_http_retryable, retry_with_backoff, RetryConfig};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("shortcode must not be empty")]
    EmptyShortcode,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("response is missing {0}")]
    MissingField(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Http(e) => e.is_timeout() || e.is_connect(),
            RemoteError::HttpStatus(status, _) => is_http_retryable(*status),
            _ => false,
        }
    }
}

/// Strips surrounding whitespace and one layer of quotes, as pasted ids often carry them.
pub fn sanitize_shortcode(raw: &str) -> Result<String, RemoteError> {
    let code = raw
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim();
    if code.is_empty() {
        return Err(RemoteError::EmptyShortcode);
    }
    Ok(code.to_owned())
}

#[derive(Deserialize)]
struct GetVideoResponse {
    reel: Option<Reel>,
}

#[derive(Deserialize)]
struct Reel {
    video_url: Option<String>,
}

#[derive(Deserialize)]
struct CutVideoResponse {
    file_url: Option<String>,
}

#[derive(Clone)]
pub struct RecreateClient {
    client: Client,
    config: RecreateConfig,
    retry: RetryConfig,
}

impl RecreateClient {
    pub fn new(config: RecreateConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T>(&self, url: &str, timeout: Duration) -> Result<T, RemoteError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.client.get(url).timeout(timeout).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteError::HttpStatus(status.as_u16(), error_text));
        }
        Ok(response.json().await?)
    }

    /// Looks up the downloadable URL of the reel behind `shortcode`.
    pub async fn get_video_url(&self, shortcode: &str) -> Result<String, RemoteError> {
        let url = format!(
            "{}/getVideo/{}",
            self.config.api_base,
            urlencoding::encode(shortcode)
        );
        let body: GetVideoResponse = retry_with_backoff(
            &self.retry,
            || self.get_json(&url, LOOKUP_TIMEOUT),
            RemoteError::is_retryable,
        )
        .await?;

        let video_url = body
            .reel
            .and_then(|r| r.video_url)
            .filter(|u| !u.is_empty())
            .ok_or(RemoteError::MissingField("reel.video_url"))?;
        tracing::debug!(shortcode, video_url = %video_url, "video url resolved");
        Ok(video_url)
    }

    /// Streams `url` into `dest`, replacing whatever is there. Returns the byte count.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<u64, RemoteError> {
        let mut response = self
            .client
            .get(url)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteError::HttpStatus(status.as_u16(), error_text));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(dest = %dest.display(), bytes = written, "video downloaded");
        Ok(written)
    }

    pub fn cut_video_url(
        &self,
        shortcode: &str,
        window: &DisappearanceWindow,
    ) -> Result<Url, RemoteError> {
        let source = format!(
            "{}/video?shortcode={}",
            self.config.video_host,
            urlencoding::encode(shortcode)
        );
        let mut url = Url::parse(&format!("{}/cutVideo", self.config.api_base))
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("url", &source)
            .append_pair("time_start", &window.time_start)
            .append_pair("time_end", &window.time_end);
        Ok(url)
    }

    /// Asks the service to cut `[time_start, time_end]` out of the reel and returns the clip URL.
    pub async fn cut_video(
        &self,
        shortcode: &str,
        window: &DisappearanceWindow,
    ) -> Result<String, RemoteError> {
        let url = self.cut_video_url(shortcode, window)?;
        let body: CutVideoResponse = retry_with_backoff(
            &self.retry,
            || self.get_json(url.as_str(), TRANSFER_TIMEOUT),
            RemoteError::is_retryable,
        )
        .await?;

        let file_url = body
            .file_url
            .filter(|u| !u.is_empty())
            .ok_or(RemoteError::MissingField("file_url"))?;
        tracing::info!(
            shortcode,
            time_start = %window.time_start,
            time_end = %window.time_end,
            file_url = %file_url,
            "clip cut"
        );
        Ok(file_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> RecreateClient {
        RecreateClient::new(RecreateConfig {
            api_base: uri.to_owned(),
            video_host: "https://videos.example.test".to_owned(),
        })
        .with_retry(RetryConfig::new(3, Duration::from_millis(1)))
    }

    fn window() -> DisappearanceWindow {
        DisappearanceWindow {
            time_start: "00:00:06".to_owned(),
            time_end: "00:00:10".to_owned(),
        }
    }

    #[test]
    fn shortcode_is_trimmed_and_unquoted() {
        assert_eq!(sanitize_shortcode("  \"DAbc12\" ").unwrap(), "DAbc12");
        assert_eq!(sanitize_shortcode("'xyz'").unwrap(), "xyz");
        assert_eq!(sanitize_shortcode("plain").unwrap(), "plain");
        assert!(matches!(
            sanitize_shortcode(" \"\" "),
            Err(RemoteError::EmptyShortcode)
        ));
    }

    #[test]
    fn cut_url_carries_source_and_window() {
        let c = client("https://api.example.test");
        let url = c.cut_video_url("abc", &window()).unwrap();
        assert_eq!(url.path(), "/cutVideo");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "url".to_owned(),
                    "https://videos.example.test/video?shortcode=abc".to_owned()
                ),
                ("time_start".to_owned(), "00:00:06".to_owned()),
                ("time_end".to_owned(), "00:00:10".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn resolves_reel_video_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getVideo/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "reel": { "video_url": "https://cdn.example.test/abc.mp4", "views": 10 }
            })))
            .mount(&server)
            .await;

        let url = client(&server.uri()).get_video_url("abc").await.unwrap();
        assert_eq!(url, "https://cdn.example.test/abc.mp4");
    }

    #[tokio::test]
    async fn missing_video_url_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reel": {} })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).get_video_url("abc").await.unwrap_err();
        assert!(matches!(err, RemoteError::MissingField("reel.video_url")));
    }

    #[tokio::test]
    async fn lookup_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getVideo/abc"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getVideo/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "reel": { "video_url": "https://cdn.example.test/abc.mp4" }
            })))
            .mount(&server)
            .await;

        let url = client(&server.uri()).get_video_url("abc").await.unwrap();
        assert_eq!(url, "https://cdn.example.test/abc.mp4");
    }

    #[tokio::test]
    async fn lookup_does_not_retry_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such reel"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri()).get_video_url("abc").await.unwrap_err();
        assert!(matches!(err, RemoteError::HttpStatus(404, _)));
    }

    #[tokio::test]
    async fn download_writes_body_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/abc.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let n = client(&server.uri())
            .download_video(&format!("{}/abc.mp4", server.uri()), &dest)
            .await
            .unwrap();
        assert_eq!(n, 4096);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn cut_returns_file_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cutVideo"))
            .and(query_param("url", "https://videos.example.test/video?shortcode=abc"))
            .and(query_param("time_start", "00:00:06"))
            .and(query_param("time_end", "00:00:10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file_url": "https://cdn.example.test/cut/abc.mp4"
            })))
            .mount(&server)
            .await;

        let file_url = client(&server.uri())
            .cut_video("abc", &window())
            .await
            .unwrap();
        assert_eq!(file_url, "https://cdn.example.test/cut/abc.mp4");
    }

    #[tokio::test]
    async fn cut_without_file_url_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .cut_video("abc", &window())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::MissingField("file_url")));
    }
}
