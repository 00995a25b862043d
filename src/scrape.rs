//! Fallback scraper: pattern matching over the raw pin page.
//!
//! Fired only when yt-dlp fails or misclassifies. Fetches the page with a
//! browser-like User-Agent and runs an ordered chain of heuristics, each
//! best-effort: a direct mp4 regex, the ld+json islands, the first inline
//! image, the `__PWS_DATA__` bootstrap blob, and a raw originals-URL regex.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::extract::ExtractionResult;
use crate::media;
use crate::models::{MediaLink, MediaType};

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TITLE: &str = "Pinterest Media";
const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

// ── Lazy static regexes ──────────────────────────────────────────────────────

static MP4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://v1\.pinimg\.com/[a-zA-Z0-9/_.-]+\.mp4").unwrap());

static LARGE_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://i\.pinimg\.com/[a-zA-Z0-9/_.-]+736x[a-zA-Z0-9/_.-]+\.jpg").unwrap()
});

static ORIGINALS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://i\.pinimg\.com/originals/[a-zA-Z0-9/_.-]+").unwrap());

// ── Public API ───────────────────────────────────────────────────────────────

/// Fetch the pin page and scrape it. `None` means the page was unreachable
/// or no heuristic matched; the caller surfaces the user-facing error.
pub async fn scrape_pin(url: &str) -> Option<ExtractionResult> {
    let html = fetch_html(url).await?;
    extract_from_html(&html)
}

// ── HTTP fetch ───────────────────────────────────────────────────────────────

async fn fetch_html(url: &str) -> Option<String> {
    let client = reqwest::ClientBuilder::new()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .ok()?;

    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("fallback fetch failed for {}: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!("fallback fetch for {} returned {}", url, response.status());
        return None;
    }

    response.text().await.ok()
}

// ── Heuristic chain ──────────────────────────────────────────────────────────

pub fn extract_from_html(html: &str) -> Option<ExtractionResult> {
    let document = Html::parse_document(html);

    let mut links: Vec<MediaLink> = Vec::new();
    let mut media_type = MediaType::Image;
    let mut thumbnail = String::new();

    let title = page_title(&document);

    // 1. Direct mp4 link anywhere in the raw HTML.
    if let Some(m) = MP4_RE.find(html) {
        media_type = MediaType::Video;
        links.push(MediaLink {
            label: "Video (MP4)".to_string(),
            url: m.as_str().to_string(),
            ext: "mp4".to_string(),
        });
    }

    // 2. Structured ld+json islands.
    let ld_sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    for script in document.select(&ld_sel) {
        let text: String = script.text().collect();
        let data = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => match items.into_iter().next() {
                Some(first) => first,
                None => continue,
            },
            Ok(value) => value,
            Err(_) => continue,
        };
        apply_linked_data(&data, &mut links, &mut media_type, &mut thumbnail);
    }

    // 3. First inline image as a thumbnail of last resort.
    if thumbnail.is_empty() {
        let img_sel = Selector::parse("img").unwrap();
        if let Some(src) = document
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
        {
            thumbnail = src.to_string();
        }
    }

    // 4. The __PWS_DATA__ bootstrap blob often carries a larger image.
    let pws_sel = Selector::parse(r#"script[id="__PWS_DATA__"]"#).unwrap();
    if let Some(tag) = document.select(&pws_sel).next() {
        let text: String = tag.text().collect();
        if let Some(m) = LARGE_IMAGE_RE.find(&text) {
            thumbnail = m.as_str().to_string();
        }
    }

    // 5. Raw originals URL when nothing else produced an image link.
    if media_type == MediaType::Image && links.is_empty() {
        if let Some(m) = ORIGINALS_RE.find(html) {
            thumbnail = m.as_str().to_string();
            links.extend(media::image_quality_links(m.as_str()));
        }
    }

    if links.is_empty() {
        return None;
    }

    Some(ExtractionResult {
        title,
        thumbnail,
        media_type,
        links,
    })
}

fn page_title(document: &Html) -> String {
    let title_sel = Selector::parse("title").unwrap();
    document
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Pull video/image URLs out of one ld+json object. Missing keys are fine;
/// only string fields in the expected shapes are read.
fn apply_linked_data(
    data: &Value,
    links: &mut Vec<MediaLink>,
    media_type: &mut MediaType,
    thumbnail: &mut String,
) {
    if let Some(video) = data.get("video") {
        let video_url = video
            .get("contentUrl")
            .and_then(Value::as_str)
            .or_else(|| video.get("embedUrl").and_then(Value::as_str));
        if let Some(video_url) = video_url {
            *media_type = MediaType::Video;
            if let Some(t) = video.get("thumbnailUrl").and_then(Value::as_str) {
                *thumbnail = t.to_string();
            }
            if !links.iter().any(|l| l.url == video_url) {
                links.push(MediaLink {
                    label: "Video HD".to_string(),
                    url: video_url.to_string(),
                    ext: "mp4".to_string(),
                });
            }
        }
    }

    if let Some(image) = data.get("image") {
        let image_url = image
            .as_str()
            .or_else(|| image.get("url").and_then(Value::as_str));
        if let Some(image_url) = image_url {
            *thumbnail = image_url.to_string();
            if *media_type != MediaType::Video {
                links.extend(media::image_quality_links(image_url));
            }
        }
    }
}
