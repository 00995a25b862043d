use crate::models::MediaLink;

// ── Constants ────────────────────────────────────────────────────────────────

/// Resolution path segments Pinterest serves scaled-down copies under.
const LOW_RES_SEGMENTS: &[&str] = &["/236x/", "/474x/", "/564x/", "/736x/"];

/// Anything longer than this is not a real file extension.
const MAX_EXT_LEN: usize = 4;

// ── Extension derivation ─────────────────────────────────────────────────────

/// Derive the file extension from the trailing path segment of an image URL,
/// query string stripped. Falls back to "jpg" when the segment has no dot or
/// the candidate is implausibly long.
pub fn derive_image_ext(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= MAX_EXT_LEN => ext.to_string(),
        _ => "jpg".to_string(),
    }
}

// ── Quality-variant expansion ────────────────────────────────────────────────

/// Expand a single image URL into the three standard Pinterest resolution
/// variants, best quality first. All three links share the derived extension.
pub fn image_quality_links(img_url: &str) -> Vec<MediaLink> {
    let ext = derive_image_ext(img_url);

    let mut original = img_url.to_string();
    for segment in LOW_RES_SEGMENTS {
        original = original.replace(segment, "/originals/");
    }

    vec![
        MediaLink {
            label: "Original Quality".to_string(),
            url: original.clone(),
            ext: ext.clone(),
        },
        MediaLink {
            label: "HD (736x)".to_string(),
            url: original.replace("/originals/", "/736x/"),
            ext: ext.clone(),
        },
        MediaLink {
            label: "Standard (474x)".to_string(),
            url: original.replace("/originals/", "/474x/"),
            ext,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- derive_image_ext ---

    #[test]
    fn ext_from_trailing_segment() {
        assert_eq!(
            derive_image_ext("https://i.pinimg.com/736x/ab/cd/ef123.png"),
            "png"
        );
    }

    #[test]
    fn ext_strips_query_string() {
        assert_eq!(
            derive_image_ext("https://i.pinimg.com/736x/ab/cd/ef123.webp?q=75&fit=max"),
            "webp"
        );
    }

    #[test]
    fn ext_defaults_to_jpg_when_too_long() {
        assert_eq!(
            derive_image_ext("https://i.pinimg.com/originals/ab/cd/somelongtoken"),
            "jpg"
        );
    }

    #[test]
    fn ext_defaults_to_jpg_without_dot() {
        assert_eq!(derive_image_ext("https://i.pinimg.com/originals/abcdef"), "jpg");
    }

    // --- image_quality_links ---

    #[test]
    fn expansion_yields_three_links_sharing_ext() {
        let links = image_quality_links("https://i.pinimg.com/236x/ab/cd/ef123.png");
        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|l| l.ext == "png"));
    }

    #[test]
    fn expansion_urls_differ_only_in_resolution_segment() {
        let links = image_quality_links("https://i.pinimg.com/564x/ab/cd/ef123.jpg");
        assert_eq!(links[0].label, "Original Quality");
        assert_eq!(links[0].url, "https://i.pinimg.com/originals/ab/cd/ef123.jpg");
        assert_eq!(links[1].label, "HD (736x)");
        assert_eq!(links[1].url, "https://i.pinimg.com/736x/ab/cd/ef123.jpg");
        assert_eq!(links[2].label, "Standard (474x)");
        assert_eq!(links[2].url, "https://i.pinimg.com/474x/ab/cd/ef123.jpg");
    }

    #[test]
    fn expansion_keeps_originals_url_as_is() {
        let links = image_quality_links("https://i.pinimg.com/originals/ab/cd/ef123.jpg");
        assert_eq!(links[0].url, "https://i.pinimg.com/originals/ab/cd/ef123.jpg");
        assert_eq!(links[1].url, "https://i.pinimg.com/736x/ab/cd/ef123.jpg");
    }
}
