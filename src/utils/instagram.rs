use url::Url;

/// Extracts the post ID (shortcode) from an Instagram URL path.
///
/// Handles paths like `/p/ABC123/`, `/reel/ABC123/`, `/tv/ABC123/`,
/// with or without trailing slashes, a leading username segment, or extra
/// segments after the shortcode.
pub fn extract_post_id(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    for (i, segment) in segments.iter().enumerate() {
        if matches!(*segment, "p" | "reel" | "tv" | "reels") {
            return segments.get(i + 1).map(|s| s.to_string());
        }
    }

    None
}

fn is_instagram_host(host: &str) -> bool {
    host == "instagram.com" || host.ends_with(".instagram.com")
}

/// Validates a user-supplied Instagram link and strips tracking from it.
///
/// Returns the URL without query string or fragment, or `None` if it isn't
/// an Instagram post/reel link.
pub fn clean_post_url(input: &str) -> Option<String> {
    let input = input.trim();
    let mut url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{input}")))
        .ok()?;

    let host = url.host_str()?.to_ascii_lowercase();
    if !is_instagram_host(&host) {
        return None;
    }
    extract_post_id(url.path())?;

    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}
