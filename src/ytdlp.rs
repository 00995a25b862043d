//! Primary extractor: wraps the yt-dlp binary.
//!
//! Invokes `yt-dlp --dump-json` against the pin URL and turns the reported
//! format list into quality-labeled links. Every failure mode is a
//! `FallbackReason` so the caller can degrade to the page scraper.

use std::collections::HashSet;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::process::Command;

use crate::extract::{ExtractionResult, FallbackReason};
use crate::media;
use crate::models::{MediaLink, MediaType};

const DEFAULT_TITLE: &str = "Pinterest Media";

/// Resolved once at first use: env override, then PATH.
static YTDLP_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| {
    if let Ok(path) = std::env::var("PINDL_YTDLP") {
        return Some(PathBuf::from(path));
    }
    which::which("yt-dlp").ok()
});

// ── Typed --dump-json payload ────────────────────────────────────────────────

/// Subset of yt-dlp's JSON output this extractor cares about. All fields are
/// optional so a sparse payload never aborts parsing.
#[derive(Debug, Deserialize)]
struct PinInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    formats: Vec<PinFormat>,
}

#[derive(Debug, Deserialize)]
struct PinFormat {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    height: Option<u32>,
}

// ── Extraction ───────────────────────────────────────────────────────────────

pub async fn extract(url: &str) -> Result<ExtractionResult, FallbackReason> {
    let ytdlp = YTDLP_PATH
        .as_ref()
        .ok_or_else(|| FallbackReason::ToolFailed("yt-dlp not found".to_string()))?;

    let output = Command::new(ytdlp)
        .arg("--dump-json")
        .arg("--no-download")
        .arg("--no-warnings")
        .arg("-f")
        .arg("best")
        .arg(url)
        .output()
        .await
        .map_err(|e| FallbackReason::ToolFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FallbackReason::ToolFailed(stderr.trim().to_string()));
    }

    let info: PinInfo = serde_json::from_slice(&output.stdout)
        .map_err(|e| FallbackReason::ToolFailed(e.to_string()))?;

    build_result(info)
}

/// Classify the payload as video or image and build the link list.
fn build_result(info: PinInfo) -> Result<ExtractionResult, FallbackReason> {
    let title = info
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let thumbnail = info.thumbnail.unwrap_or_default();

    let is_video = !info.formats.is_empty() || info.duration.is_some();

    if is_video && !info.formats.is_empty() {
        // yt-dlp lists formats worst-first; walking in reverse puts the best
        // rendition at the top of the link list.
        let mut links = Vec::new();
        let mut seen_heights: HashSet<u32> = HashSet::new();
        for f in info.formats.iter().rev() {
            if let (Some(height), Some(url)) = (f.height.filter(|&h| h > 0), &f.url) {
                if seen_heights.insert(height) {
                    links.push(MediaLink {
                        label: format!("{}p", height),
                        url: url.clone(),
                        ext: "mp4".to_string(),
                    });
                }
            }
        }

        if links.is_empty() {
            if let Some(url) = info.formats.last().and_then(|f| f.url.clone()) {
                links.push(MediaLink {
                    label: "Best Quality".to_string(),
                    url,
                    ext: "mp4".to_string(),
                });
            }
        }

        if links.is_empty() {
            return Err(FallbackReason::NoMedia);
        }

        return Ok(ExtractionResult {
            title,
            thumbnail,
            media_type: MediaType::Video,
            links,
        });
    }

    let media_url = info
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(FallbackReason::NoMedia)?;

    // Heuristic: image result with a video-ish title means yt-dlp picked the
    // poster frame instead of the clip. Hand over to the scraper.
    let title_lower = title.to_lowercase();
    if title_lower.contains("video") || title_lower.contains("reel") {
        return Err(FallbackReason::Misclassified);
    }

    Ok(ExtractionResult {
        title,
        thumbnail,
        media_type: MediaType::Image,
        links: media::image_quality_links(media_url),
    })
}
