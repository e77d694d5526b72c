/// Unescapes the HTML entities Instagram emits inside attribute values.
pub fn unescape_html_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&#064;", "@")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Reads a quoted attribute value out of a single tag's source text.
fn attr_value<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    for quote in ['"', '\''] {
        let needle = format!("{attr}={quote}");
        let mut search_from = 0;
        while let Some(pos) = lower[search_from..].find(&needle) {
            let pos = search_from + pos;
            // Attribute names start after whitespace, so `data-property=` is not `property=`.
            let preceded_by_space = lower[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_whitespace());
            if preceded_by_space {
                let value_start = pos + needle.len();
                let value_end = tag[value_start..].find(quote)?;
                return Some(&tag[value_start..value_start + value_end]);
            }
            search_from = pos + needle.len();
        }
    }
    None
}

/// Finds `<meta property="..." content="...">` (or `name=`) and returns the
/// decoded content. Attribute order doesn't matter.
pub fn meta_content(html: &str, property: &str) -> Option<String> {
    let mut rest = html;
    while let Some(start) = find_ignore_case(rest, "<meta") {
        let tag_region = &rest[start..];
        let tag_end = tag_region.find('>')?;
        let tag = &tag_region[..=tag_end];

        let matches = attr_value(tag, "property")
            .or_else(|| attr_value(tag, "name"))
            .is_some_and(|p| p.eq_ignore_ascii_case(property));
        if matches {
            if let Some(content) = attr_value(tag, "content") {
                let decoded = unescape_html_entities(content);
                if !decoded.trim().is_empty() {
                    return Some(decoded);
                }
            }
        }

        rest = &tag_region[tag_end + 1..];
    }
    None
}

/// Bodies of every `<script type="application/json" ...>` block, in page order.
pub fn json_script_blocks(html: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = html;

    while let Some(start) = find_ignore_case(rest, "<script") {
        let tag_region = &rest[start..];
        let Some(tag_end) = tag_region.find('>') else {
            break;
        };
        let tag = &tag_region[..=tag_end];
        let body_region = &tag_region[tag_end + 1..];
        let Some(body_end) = find_ignore_case(body_region, "</script") else {
            break;
        };

        if attr_value(tag, "type").is_some_and(|t| t.eq_ignore_ascii_case("application/json")) {
            blocks.push(&body_region[..body_end]);
        }
        rest = &body_region[body_end..];
        // step past "</script" so the next search starts after it
        rest = &rest[8..];
    }

    blocks
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_entities() {
        assert_eq!(
            unescape_html_entities("https://cdn.example/v.mp4?a=1&amp;b=2"),
            "https://cdn.example/v.mp4?a=1&b=2"
        );
        assert_eq!(unescape_html_entities("Tom &amp; Jerry &quot;live&quot; it&#039;s"), "Tom & Jerry \"live\" it&#039;s");
        assert_eq!(unescape_html_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn reads_meta_property() {
        let html = r#"<head><meta property="og:title" content="Cats &amp; dogs"><meta property="og:video" content="https://v.cdn/x.mp4?a=1&amp;b=2" /></head>"#;
        assert_eq!(meta_content(html, "og:title"), Some("Cats & dogs".into()));
        assert_eq!(meta_content(html, "og:video"), Some("https://v.cdn/x.mp4?a=1&b=2".into()));
        assert_eq!(meta_content(html, "og:image"), None);
    }

    #[test]
    fn meta_attribute_order_and_case() {
        let html = r#"<META content='https://img.cdn/t.jpg' PROPERTY='og:image'>"#;
        assert_eq!(meta_content(html, "og:image"), Some("https://img.cdn/t.jpg".into()));
    }

    #[test]
    fn meta_attributes_split_across_lines() {
        let html = "<meta\nproperty=\"og:video\"\n\tcontent=\"https://v.cdn/x.mp4\">";
        assert_eq!(meta_content(html, "og:video"), Some("https://v.cdn/x.mp4".into()));
    }

    #[test]
    fn meta_ignores_prefixed_attribute_names() {
        let html = r#"<meta data-property="og:video" data-content="https://wrong" property="og:video" content="https://right">"#;
        assert_eq!(meta_content(html, "og:video"), Some("https://right".into()));
    }

    #[test]
    fn meta_skips_empty_content() {
        let html = r#"<meta property="og:video" content=""><meta property="og:video" content="https://v">"#;
        assert_eq!(meta_content(html, "og:video"), Some("https://v".into()));
    }

    #[test]
    fn collects_json_scripts_only() {
        let html = r#"<script>var x = 1;</script><script type="application/json" data-sjs>{"a":1}</script><SCRIPT type="application/ld+json">{"b":2}</SCRIPT><script type="application/json">{"c":3}</script>"#;
        assert_eq!(json_script_blocks(html), vec![r#"{"a":1}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn unterminated_script_is_ignored() {
        assert!(json_script_blocks(r#"<script type="application/json">{"a":1}"#).is_empty());
    }
}
