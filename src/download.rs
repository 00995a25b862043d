//! Download proxy: streams CDN media through the server so the browser never
//! trips over Pinterest's referrer checks.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
const GENERIC_REFERER: &str = "https://www.pinterest.com/";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

const PRIME_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Matches urllib's default quoting: alphanumerics plus `_ . - ~ /` pass through.
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

// ── Request parameters ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub url: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default)]
    pub referer: Option<String>,
}

fn default_filename() -> String {
    "download".to_string()
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Download failed: {0}")]
    Failed(String),
}

impl DownloadError {
    fn from_err(e: impl std::fmt::Display) -> Self {
        DownloadError::Failed(e.to_string())
    }
}

// ── Proxy download ───────────────────────────────────────────────────────────

/// Fetch the target with browser-mimicking headers and stream the body back.
/// A referer, when given, is visited first to pick up session cookies. A 403
/// gets exactly one retry with the generic Pinterest referer.
pub async fn proxy_download(params: DownloadParams) -> Result<Response, DownloadError> {
    let DownloadParams {
        url,
        filename,
        referer,
    } = params;

    let headers = build_media_headers(&url, referer.as_deref());

    let client = reqwest::ClientBuilder::new()
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(DownloadError::from_err)?;

    // Prime cookies by visiting the referer first; errors are ignored.
    if let Some(referer) = referer.as_deref() {
        let _ = client.get(referer).timeout(PRIME_TIMEOUT).send().await;
    }

    let mut response = client
        .get(&url)
        .headers(headers.clone())
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(DownloadError::from_err)?;

    if response.status() == reqwest::StatusCode::FORBIDDEN {
        tracing::debug!("403 from {}, retrying with generic referer", url);
        let mut retry_headers = headers;
        retry_headers.insert(
            reqwest::header::REFERER,
            HeaderValue::from_static(GENERIC_REFERER),
        );
        response = client
            .get(&url)
            .headers(retry_headers)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(DownloadError::from_err)?;
    }

    let response = response
        .error_for_status()
        .map_err(DownloadError::from_err)?;

    let ext = infer_download_ext(&url);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("image/{}", ext));
    let disposition = content_disposition(&filename, &ext);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("Access-Control-Expose-Headers", "Content-Disposition")
        .body(Body::from_stream(response.bytes_stream()))
        .map_err(DownloadError::from_err)
}

// ── Request headers ──────────────────────────────────────────────────────────

fn build_media_headers(url: &str, referer: Option<&str>) -> HeaderMap {
    let is_video = url.to_lowercase().contains(".mp4");

    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static(if is_video { "*/*" } else { IMAGE_ACCEPT }),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,tr;q=0.8"),
    );
    headers.insert(
        reqwest::header::REFERER,
        referer
            .and_then(|r| HeaderValue::from_str(r).ok())
            .unwrap_or_else(|| HeaderValue::from_static(GENERIC_REFERER)),
    );
    headers.insert(
        "Sec-Fetch-Dest",
        HeaderValue::from_static(if is_video { "video" } else { "image" }),
    );
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("no-cors"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));
    headers.insert(
        reqwest::header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    headers.insert(reqwest::header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

// ── Filename helpers ─────────────────────────────────────────────────────────

/// Extension from the query-stripped URL; a candidate that is overlong or
/// still contains a slash means the URL has no real extension, so guess from
/// whether it looks like a video.
fn infer_download_ext(url: &str) -> String {
    let clean = url.split('?').next().unwrap_or(url);
    let candidate = clean.rsplit('.').next().unwrap_or("");
    if candidate.is_empty() || candidate.len() > 4 || candidate.contains('/') {
        if url.to_lowercase().contains("video") {
            "mp4".to_string()
        } else {
            "jpg".to_string()
        }
    } else {
        candidate.to_string()
    }
}

fn content_disposition(filename: &str, ext: &str) -> String {
    let mut safe = filename.replace(' ', "_").replace(['"', '\''], "");
    let suffix = format!(".{}", ext);
    if !safe.ends_with(&suffix) {
        safe.push_str(&suffix);
    }
    let encoded = utf8_percent_encode(&safe, FILENAME_ESCAPE).to_string();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        encoded, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- infer_download_ext ---

    #[test]
    fn ext_read_from_mp4_url() {
        assert_eq!(
            infer_download_ext("https://v1.pinimg.com/videos/ab/cd/clip.mp4"),
            "mp4"
        );
    }

    #[test]
    fn ext_read_from_image_url_with_query() {
        assert_eq!(
            infer_download_ext("https://i.pinimg.com/originals/ab/cd/photo.webp?x=1"),
            "webp"
        );
    }

    #[test]
    fn extensionless_video_path_guesses_mp4() {
        assert_eq!(
            infer_download_ext("https://v1.pinimg.com/videos/ab/cd/abcdef"),
            "mp4"
        );
    }

    #[test]
    fn extensionless_image_path_guesses_jpg() {
        assert_eq!(
            infer_download_ext("https://i.pinimg.com/originals/ab/cd/abcdef"),
            "jpg"
        );
    }

    // --- content_disposition ---

    #[test]
    fn disposition_appends_inferred_extension() {
        let value = content_disposition("test", "mp4");
        assert!(value.contains("filename=\"test.mp4\""));
        assert!(value.contains("filename*=UTF-8''test.mp4"));
    }

    #[test]
    fn disposition_keeps_existing_extension() {
        let value = content_disposition("test.mp4", "mp4");
        assert!(value.contains("filename=\"test.mp4\""));
    }

    #[test]
    fn disposition_sanitizes_spaces_and_quotes() {
        let value = content_disposition("my \"cool\" pin", "jpg");
        assert!(value.contains("my_cool_pin.jpg"));
    }

    #[test]
    fn disposition_percent_encodes_non_ascii() {
        let value = content_disposition("café", "jpg");
        assert!(value.contains("caf%C3%A9.jpg"));
        assert!(value.is_ascii());
    }

    // --- build_media_headers ---

    #[test]
    fn video_urls_get_video_fetch_headers() {
        let headers = build_media_headers("https://v1.pinimg.com/videos/clip.MP4", None);
        assert_eq!(headers.get(reqwest::header::ACCEPT).unwrap(), "*/*");
        assert_eq!(headers.get("Sec-Fetch-Dest").unwrap(), "video");
    }

    #[test]
    fn image_urls_get_image_fetch_headers() {
        let headers = build_media_headers("https://i.pinimg.com/originals/a.jpg", None);
        assert_eq!(headers.get("Sec-Fetch-Dest").unwrap(), "image");
        assert_eq!(headers.get(reqwest::header::REFERER).unwrap(), GENERIC_REFERER);
    }

    #[test]
    fn caller_referer_is_forwarded() {
        let headers = build_media_headers(
            "https://i.pinimg.com/originals/a.jpg",
            Some("https://www.pinterest.com/pin/123/"),
        );
        assert_eq!(
            headers.get(reqwest::header::REFERER).unwrap(),
            "https://www.pinterest.com/pin/123/"
        );
    }
}
