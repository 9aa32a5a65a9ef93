use log::debug;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Elements whose text never belongs to the readable page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// What the import pipeline keeps from a fetched page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebContent {
    pub title: String,
    pub main_content: String,
    /// Absolute image URLs in document order, without duplicates.
    pub image_urls: Vec<String>,
}

impl WebContent {
    /// Extracts the title, the readable body text and every image URL from
    /// `html`. Image references are resolved against `page_url`.
    pub fn extract(html: &str, page_url: &str) -> Result<Self, String> {
        let base = Url::parse(page_url).map_err(|e| format!("invalid page URL '{page_url}': {e}"))?;
        let document = Html::parse_document(html);

        let title = document
            .select(&selector("title")?)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
            .trim()
            .to_string();

        let main_content = document
            .select(&selector("body")?)
            .next()
            .map(readable_text)
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut image_urls = Vec::new();
        for img in document.select(&selector("img")?) {
            let element = img.value();
            let mut candidates: Vec<&str> = Vec::new();
            candidates.extend(element.attr("src"));
            candidates.extend(element.attr("data-src"));
            if let Some(srcset) = element.attr("srcset") {
                candidates.extend(srcset_urls(srcset));
            }

            for candidate in candidates {
                if let Some(url) = resolve(&base, candidate) {
                    if seen.insert(url.clone()) {
                        image_urls.push(url);
                    }
                }
            }
        }

        debug!(
            "Extracted '{}' ({} chars, {} images) from {}",
            title,
            main_content.len(),
            image_urls.len(),
            page_url
        );
        Ok(Self {
            title,
            main_content,
            image_urls,
        })
    }
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{css}': {e}"))
}

/// Text nodes of `root` outside scripts and styles, one trimmed fragment per
/// line.
fn readable_text(root: ElementRef) -> String {
    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                    .unwrap_or(false)
            });
            if hidden {
                return None;
            }
            let fragment = text.trim();
            (!fragment.is_empty()).then_some(fragment)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// URLs of a `srcset` attribute, dropping the `300w` / `2x` descriptors.
fn srcset_urls(srcset: &str) -> impl Iterator<Item = &str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") {
        return None;
    }
    let url = base.join(reference).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <head><title>  Tarte Tatin | Cuisine  </title></head>
        <body>
            <script>var tracking = "nope";</script>
            <h1>Tarte Tatin</h1>
            <p>6 apples</p>
            <img src="/img/tatin.jpg" data-src="//cdn.example.com/tatin-hd.jpg">
            <img srcset="small.jpg 300w, large.jpg 1200w" src="/img/tatin.jpg">
            <img src="data:image/gif;base64,R0lGOD">
            <p>Bake for 45 minutes.</p>
        </body>
        </html>
    "#;

    #[test]
    fn test_extracts_title_and_text() {
        let content = WebContent::extract(PAGE, "https://example.com/recipes/tatin").unwrap();
        assert_eq!(content.title, "Tarte Tatin | Cuisine");
        assert!(content.main_content.starts_with("Tarte Tatin"));
        assert!(content.main_content.contains("6 apples"));
        assert!(content.main_content.contains("Bake for 45 minutes."));
        assert!(!content.main_content.contains("tracking"));
    }

    #[test]
    fn test_resolves_and_deduplicates_images() {
        let content = WebContent::extract(PAGE, "https://example.com/recipes/tatin").unwrap();
        assert_eq!(
            content.image_urls,
            vec![
                "https://example.com/img/tatin.jpg",
                "https://cdn.example.com/tatin-hd.jpg",
                "https://example.com/recipes/small.jpg",
                "https://example.com/recipes/large.jpg",
            ]
        );
    }

    #[test]
    fn test_page_without_body_content() {
        let content = WebContent::extract("<html><head></head></html>", "https://example.com/").unwrap();
        assert!(content.title.is_empty());
        assert!(content.main_content.is_empty());
        assert!(content.image_urls.is_empty());
    }

    #[test]
    fn test_rejects_invalid_page_url() {
        assert!(WebContent::extract("<html></html>", "not a url").is_err());
    }
}
