//! Image references embedded in a page, collected for OCR.

use std::collections::HashSet;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static IMAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img, [style]").expect("static selector"));

static BACKGROUND_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background-image:\s*url\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("static regex")
});

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Must be downloaded.
    Remote(Url),
    /// Already decoded from a `data:` URI.
    Inline(Vec<u8>),
}

/// An image found in the DOM, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Resolved URL or `data:` prefix, used as the asset's `src`.
    pub src: String,
    pub source: ImageSource,
}

/// Collect up to `max` distinct image references from `html`.
///
/// Looks at `img` (`src`, lazy-load attributes, first `srcset` candidate) and
/// inline `background-image` styles. SVGs are skipped; their text is read
/// straight from the DOM instead.
pub fn collect_image_refs(html: &str, base: &Url, max: usize) -> Vec<ImageRef> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for el in doc.select(&IMAGE_SEL) {
        if refs.len() >= max {
            break;
        }

        let mut raw_srcs: Vec<String> = Vec::new();
        if el.value().name() == "img" {
            let attr = |name: &str| el.value().attr(name).map(str::trim).filter(|s| !s.is_empty());
            let src = attr("src")
                .filter(|s| !is_placeholder(s))
                .or_else(|| attr("data-src"))
                .or_else(|| attr("data-lazy-src"))
                .map(String::from)
                .or_else(|| attr("srcset").and_then(first_srcset_url));
            raw_srcs.extend(src);
        }
        if let Some(style) = el.value().attr("style") {
            raw_srcs.extend(
                BACKGROUND_URL
                    .captures_iter(style)
                    .map(|c| c[1].trim().to_string()),
            );
        }

        for raw in raw_srcs {
            if refs.len() >= max {
                break;
            }
            if let Some(image) = resolve_image(&raw, base) {
                let key = if image.src.starts_with("data:") { raw.clone() } else { image.src.clone() };
                if seen.insert(key) {
                    refs.push(image);
                }
            }
        }
    }

    refs
}

fn resolve_image(raw: &str, base: &Url) -> Option<ImageRef> {
    if raw.starts_with("data:") {
        if raw.starts_with("data:image/svg") {
            return None;
        }
        return decode_data_uri(raw).map(|bytes| ImageRef {
            src: "data:".to_string(),
            source: ImageSource::Inline(bytes),
        });
    }

    let url = base.join(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.path().to_lowercase().ends_with(".svg") {
        return None;
    }
    Some(ImageRef {
        src: url.to_string(),
        source: ImageSource::Remote(url),
    })
}

/// Decode a `data:image/...;base64,` URI.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (header, payload) = uri.split_once(',')?;
    if !header.starts_with("data:image") || !header.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}

fn first_srcset_url(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .map(String::from)
}

/// Tiny inline GIFs used as lazy-load placeholders.
fn is_placeholder(src: &str) -> bool {
    src.starts_with("data:image/gif") || src.starts_with("data:image/svg")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://fund.example/portfolio/").unwrap()
    }

    #[test]
    fn collects_img_and_background_images_in_order() {
        let html = r#"<html><body>
            <img src="/logos/acme.png" alt="Acme">
            <div style="background-image: url('beta.jpg')"></div>
            <img data-src="https://cdn.example/gamma.webp" src="data:image/gif;base64,R0lGODlhAQABAAAAACw=">
            <img srcset="delta-1x.png 1x, delta-2x.png 2x">
        </body></html>"#;

        let refs = collect_image_refs(html, &base(), 10);
        let srcs: Vec<_> = refs.iter().map(|r| r.src.as_str()).collect();
        assert_eq!(
            srcs,
            vec![
                "https://fund.example/logos/acme.png",
                "https://fund.example/portfolio/beta.jpg",
                "https://cdn.example/gamma.webp",
                "https://fund.example/portfolio/delta-1x.png",
            ]
        );
    }

    #[test]
    fn skips_svg_and_duplicates_and_respects_max() {
        let html = r#"<img src="a.png"><img src="a.png"><img src="icon.svg"><img src="b.png"><img src="c.png">"#;
        let refs = collect_image_refs(html, &base(), 2);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| !r.src.ends_with(".svg")));
        assert_eq!(refs[1].src, "https://fund.example/portfolio/b.png");
    }

    #[test]
    fn decodes_inline_base64_images() {
        // "PNG!" base64-encoded
        let html = r#"<img src="data:image/png;base64,UE5HIQ==">"#;
        let refs = collect_image_refs(html, &base(), 5);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source, ImageSource::Inline(b"PNG!".to_vec()));
    }

    #[test]
    fn rejects_malformed_data_uris() {
        assert!(decode_data_uri("data:image/png,notbase64").is_none());
        assert!(decode_data_uri("data:text/plain;base64,UE5HIQ==").is_none());
        assert!(decode_data_uri("data:image/png;base64,!!!").is_none());
    }
}
