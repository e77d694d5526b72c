use serde_json::Value;

use crate::utils::html::{json_script_blocks, meta_content};
use crate::utils::json::{find_object_field, find_string_field, probe, probe_str, Step};

/// A video located on a page, plus whatever metadata came with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedVideo {
    pub video_url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
}

impl ScrapedVideo {
    fn with_url(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            ..Self::default()
        }
    }
}

/// One self-contained way of finding a video URL in a fetched page.
///
/// Scrapers never do I/O and never fail loudly: they either find something
/// or return `None` so the next one can try.
pub trait PageScraper {
    fn name(&self) -> &'static str;
    fn scrape(&self, html: &str) -> Option<ScrapedVideo>;
}

/// `og:video` (and its `:secure_url`/`:url` variants) from the page head.
pub struct MetaTagScraper;

/// Embedded JSON: `<script type="application/json">` blocks and inline
/// `shortcode_media` objects, probed at the paths Instagram has used.
pub struct StructuredDataScraper;

/// Any `"video_url":"..."` anywhere in the page text.
pub struct RawPatternScraper;

/// The default order: cheapest and most reliable first.
pub fn default_chain() -> [&'static dyn PageScraper; 3] {
    [&MetaTagScraper, &StructuredDataScraper, &RawPatternScraper]
}

/// Runs scrapers in order, stopping at the first that yields a video.
pub fn run_chain(html: &str, chain: &[&dyn PageScraper]) -> Option<(&'static str, ScrapedVideo)> {
    for scraper in chain {
        match scraper.scrape(html) {
            Some(video) => {
                log!("[instagram] attempt '{}' found a video", scraper.name());
                return Some((scraper.name(), video));
            }
            None => log!("[instagram] attempt '{}' found nothing", scraper.name()),
        }
    }
    None
}

/// Fills metadata the winning scraper didn't provide from page-level tags.
pub fn fill_page_metadata(video: &mut ScrapedVideo, html: &str) {
    if video.title.is_none() {
        video.title = meta_content(html, "og:title");
    }
    if video.thumbnail.is_none() {
        video.thumbnail = meta_content(html, "og:image");
    }
    if video.author.is_none() {
        video.author = find_string_field(html, "username");
    }
}

impl PageScraper for MetaTagScraper {
    fn name(&self) -> &'static str {
        "meta-tag"
    }

    fn scrape(&self, html: &str) -> Option<ScrapedVideo> {
        ["og:video", "og:video:secure_url", "og:video:url"]
            .iter()
            .find_map(|property| meta_content(html, property))
            .map(ScrapedVideo::with_url)
    }
}

const MEDIA_NODE_PATHS: [&[Step]; 4] = [
    &[Step::Key("props"), Step::Key("pageProps"), Step::Key("media")],
    &[Step::Key("props"), Step::Key("pageProps"), Step::Key("post")],
    &[Step::Key("graphql"), Step::Key("shortcode_media")],
    &[Step::Key("items"), Step::Index(0)],
];

impl PageScraper for StructuredDataScraper {
    fn name(&self) -> &'static str {
        "structured-data"
    }

    fn scrape(&self, html: &str) -> Option<ScrapedVideo> {
        let from_scripts = json_script_blocks(html).into_iter().find_map(|block| {
            let doc: Value = serde_json::from_str(block.trim()).ok()?;
            MEDIA_NODE_PATHS
                .iter()
                .filter_map(|path| probe(&doc, path))
                .find_map(video_from_node)
        });
        if from_scripts.is_some() {
            return from_scripts;
        }

        ["shortcode_media", "xdt_shortcode_media"].iter().find_map(|field| {
            let raw = find_object_field(html, field)?;
            let node: Value = serde_json::from_str(raw).ok()?;
            video_from_node(&node)
        })
    }
}

impl PageScraper for RawPatternScraper {
    fn name(&self) -> &'static str {
        "raw-pattern"
    }

    fn scrape(&self, html: &str) -> Option<ScrapedVideo> {
        find_string_field(html, "video_url").map(ScrapedVideo::with_url)
    }
}

/// Reads a video and its metadata from one media node.
///
/// Understands both the web shape (`video_url`, `owner`, `display_url`) and
/// the mobile shape (`video_versions`, `user`, `image_versions2`). Carousels
/// yield their first video child.
pub fn video_from_node(node: &Value) -> Option<ScrapedVideo> {
    let video_url = node_video_url(node)?;

    Some(ScrapedVideo {
        video_url,
        title: node_caption(node),
        author: probe_str(node, &[Step::Key("owner"), Step::Key("username")])
            .or_else(|| probe_str(node, &[Step::Key("user"), Step::Key("username")]))
            .map(String::from),
        thumbnail: probe_str(node, &[Step::Key("display_url")])
            .or_else(|| probe_str(node, &[Step::Key("thumbnail_src")]))
            .or_else(|| {
                probe_str(
                    node,
                    &[Step::Key("image_versions2"), Step::Key("candidates"), Step::Index(0), Step::Key("url")],
                )
            })
            .map(String::from),
    })
}

fn node_video_url(node: &Value) -> Option<String> {
    let direct = probe_str(node, &[Step::Key("video_url")])
        .or_else(|| probe_str(node, &[Step::Key("video_versions"), Step::Index(0), Step::Key("url")]));
    if let Some(url) = direct {
        return Some(url.to_string());
    }

    let children = probe(node, &[Step::Key("edge_sidecar_to_children"), Step::Key("edges")])
        .and_then(|e| e.as_array())
        .map(|edges| edges.iter().filter_map(|edge| edge.get("node")).collect::<Vec<_>>())
        .or_else(|| {
            probe(node, &[Step::Key("carousel_media")])
                .and_then(|c| c.as_array())
                .map(|items| items.iter().collect())
        })?;

    children.into_iter().find_map(|child| {
        probe_str(child, &[Step::Key("video_url")])
            .or_else(|| probe_str(child, &[Step::Key("video_versions"), Step::Index(0), Step::Key("url")]))
            .map(String::from)
    })
}

fn node_caption(node: &Value) -> Option<String> {
    probe_str(
        node,
        &[
            Step::Key("edge_media_to_caption"),
            Step::Key("edges"),
            Step::Index(0),
            Step::Key("node"),
            Step::Key("text"),
        ],
    )
    .or_else(|| probe_str(node, &[Step::Key("caption"), Step::Key("text")]))
    .or_else(|| probe_str(node, &[Step::Key("caption")]))
    .or_else(|| probe_str(node, &[Step::Key("title")]))
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        name: &'static str,
        result: Option<&'static str>,
        calls: Cell<usize>,
    }

    impl Counting {
        fn new(name: &'static str, result: Option<&'static str>) -> Self {
            Self {
                name,
                result,
                calls: Cell::new(0),
            }
        }
    }

    impl PageScraper for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn scrape(&self, _html: &str) -> Option<ScrapedVideo> {
            self.calls.set(self.calls.get() + 1);
            self.result.map(ScrapedVideo::with_url)
        }
    }

    #[test]
    fn chain_stops_at_first_success() {
        let first = Counting::new("first", Some("https://v/1.mp4"));
        let second = Counting::new("second", Some("https://v/2.mp4"));
        let third = Counting::new("third", None);

        let (name, video) = run_chain("", &[&first, &second, &third]).unwrap();
        assert_eq!(name, "first");
        assert_eq!(video.video_url, "https://v/1.mp4");
        assert_eq!(first.calls.get(), 1);
        assert_eq!(second.calls.get(), 0);
        assert_eq!(third.calls.get(), 0);
    }

    #[test]
    fn chain_falls_through_in_order() {
        let first = Counting::new("first", None);
        let second = Counting::new("second", None);
        let third = Counting::new("third", Some("https://v/3.mp4"));

        let (name, _) = run_chain("", &[&first, &second, &third]).unwrap();
        assert_eq!(name, "third");
        assert_eq!((first.calls.get(), second.calls.get(), third.calls.get()), (1, 1, 1));
    }

    #[test]
    fn chain_exhausted() {
        let only = Counting::new("only", None);
        assert!(run_chain("", &[&only]).is_none());
    }

    #[test]
    fn meta_tag_decodes_entities() {
        let html = r#"<meta property="og:video" content="https://cdn.ig/v.mp4?_nc_ht=x&amp;oh=abc">"#;
        assert_eq!(
            MetaTagScraper.scrape(html).unwrap().video_url,
            "https://cdn.ig/v.mp4?_nc_ht=x&oh=abc"
        );
    }

    #[test]
    fn meta_tag_secure_url_variant() {
        let html = r#"<meta property="og:video:secure_url" content="https://cdn.ig/s.mp4">"#;
        assert_eq!(MetaTagScraper.scrape(html).unwrap().video_url, "https://cdn.ig/s.mp4");
    }

    #[test]
    fn structured_data_page_props() {
        let html = r#"<script type="application/json">{"props":{"pageProps":{"post":{"video_url":"https://cdn.ig/p.mp4","owner":{"username":"cat"},"display_url":"https://cdn.ig/p.jpg"}}}}</script>"#;
        let video = StructuredDataScraper.scrape(html).unwrap();
        assert_eq!(video.video_url, "https://cdn.ig/p.mp4");
        assert_eq!(video.author.as_deref(), Some("cat"));
        assert_eq!(video.thumbnail.as_deref(), Some("https://cdn.ig/p.jpg"));
    }

    #[test]
    fn structured_data_graphql_shape_with_caption() {
        let html = r#"<script type="application/json">{"graphql":{"shortcode_media":{"is_video":true,"video_url":"https://cdn.ig/g.mp4","edge_media_to_caption":{"edges":[{"node":{"text":" Morning walk "}}]}}}}</script>"#;
        let video = StructuredDataScraper.scrape(html).unwrap();
        assert_eq!(video.video_url, "https://cdn.ig/g.mp4");
        assert_eq!(video.title.as_deref(), Some("Morning walk"));
    }

    #[test]
    fn structured_data_items_shape() {
        let html = r#"<script type="application/json">{"items":[{"video_versions":[{"url":"https://cdn.ig/i.mp4"}],"caption":{"text":"hi"},"user":{"username":"dog"},"image_versions2":{"candidates":[{"url":"https://cdn.ig/i.jpg"}]}}]}</script>"#;
        let video = StructuredDataScraper.scrape(html).unwrap();
        assert_eq!(
            video,
            ScrapedVideo {
                video_url: "https://cdn.ig/i.mp4".into(),
                title: Some("hi".into()),
                author: Some("dog".into()),
                thumbnail: Some("https://cdn.ig/i.jpg".into()),
            }
        );
    }

    #[test]
    fn structured_data_skips_unrelated_blocks() {
        let html = r#"<script type="application/json">not json</script><script type="application/json">{"require":[]}</script><script type="application/json">{"props":{"pageProps":{"media":{"video_url":"https://cdn.ig/m.mp4"}}}}</script>"#;
        assert_eq!(StructuredDataScraper.scrape(html).unwrap().video_url, "https://cdn.ig/m.mp4");
    }

    #[test]
    fn structured_data_inline_shortcode_media_carousel() {
        let html = r#"<script>window.__additionalDataLoaded('x', {"shortcode_media": {"owner":{"username":"owner1"},"edge_sidecar_to_children":{"edges":[{"node":{"is_video":false,"display_url":"https://cdn.ig/1.jpg"}},{"node":{"is_video":true,"video_url":"https://cdn.ig/2.mp4"}}]}}});</script>"#;
        let video = StructuredDataScraper.scrape(html).unwrap();
        assert_eq!(video.video_url, "https://cdn.ig/2.mp4");
        assert_eq!(video.author.as_deref(), Some("owner1"));
    }

    #[test]
    fn structured_data_image_post_yields_nothing() {
        let html = r#"<script type="application/json">{"graphql":{"shortcode_media":{"is_video":false,"display_url":"https://cdn.ig/p.jpg"}}}</script>"#;
        assert!(StructuredDataScraper.scrape(html).is_none());
    }

    #[test]
    fn raw_pattern_unescapes() {
        let html = r#"<script>var d = "{\"x\":1}"; var e = {"video_url":"https:\/\/cdn.ig\/r.mp4?a=1&b=2"};</script>"#;
        assert_eq!(RawPatternScraper.scrape(html).unwrap().video_url, "https://cdn.ig/r.mp4?a=1&b=2");
    }

    #[test]
    fn page_metadata_only_fills_gaps() {
        let html = r#"<meta property="og:title" content="Reel by cat"><meta property="og:image" content="https://cdn.ig/t.jpg?a=1&amp;b=2"><script>{"username":"catperson"}</script>"#;
        let mut video = ScrapedVideo {
            video_url: "https://v".into(),
            title: Some("Own title".into()),
            ..ScrapedVideo::default()
        };
        fill_page_metadata(&mut video, html);
        assert_eq!(video.title.as_deref(), Some("Own title"));
        assert_eq!(video.thumbnail.as_deref(), Some("https://cdn.ig/t.jpg?a=1&b=2"));
        assert_eq!(video.author.as_deref(), Some("catperson"));
    }
}
