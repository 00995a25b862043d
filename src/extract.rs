use url::Url;

use crate::models::{MediaLink, MediaType};
use crate::scrape;
use crate::ytdlp;

// ── Constants ────────────────────────────────────────────────────────────────

/// Diagnostic text surfaced to the client is cut off at this many characters.
const FAIL_DETAIL_MAX: usize = 50;

// ── Error types ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid Pinterest URL")]
    InvalidUrl,
    #[error("Fail: {0}")]
    Failed(String),
}

/// Why the primary extractor handed a URL over to the fallback scraper.
/// These are routing signals, not user-facing errors.
#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error("yt-dlp failed: {0}")]
    ToolFailed(String),
    #[error("yt-dlp: No direct URL found")]
    NoMedia,
    #[error("yt-dlp misidentified as image")]
    Misclassified,
}

// ── Public result type ───────────────────────────────────────────────────────

pub struct ExtractionResult {
    pub title: String,
    pub thumbnail: String,
    pub media_type: MediaType,
    pub links: Vec<MediaLink>,
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve a pin URL to downloadable media links: yt-dlp first, the page
/// scraper when yt-dlp fails or misclassifies.
pub async fn extract_pin(raw_url: &str) -> Result<ExtractionResult, ExtractionError> {
    let url = strip_query(raw_url);
    validate_pin_url(url)?;

    match ytdlp::extract(url).await {
        Ok(result) => Ok(result),
        Err(reason) => {
            tracing::debug!("primary extractor handed off for {}: {}", url, reason);
            match scrape::scrape_pin(url).await {
                Some(result) => Ok(result),
                None => Err(ExtractionError::Failed(truncate(
                    &reason.to_string(),
                    FAIL_DETAIL_MAX,
                ))),
            }
        }
    }
}

// ── URL handling ─────────────────────────────────────────────────────────────

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn validate_pin_url(url: &str) -> Result<(), ExtractionError> {
    let parsed = Url::parse(url).map_err(|_| ExtractionError::InvalidUrl)?;
    let host = parsed.host_str().unwrap_or("").to_lowercase();
    if host == "pin.it" || host == "pinterest.com" || host.ends_with(".pinterest.com") {
        return Ok(());
    }
    Err(ExtractionError::InvalidUrl)
}

fn truncate(msg: &str, max: usize) -> String {
    match msg.char_indices().nth(max) {
        Some((idx, _)) => msg[..idx].to_string(),
        None => msg.to_string(),
    }
}
