use url::Url;

const ID_PATH_PREFIXES: [&str; 4] = ["shorts", "embed", "live", "v"];

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn valid_id(candidate: &str) -> Option<String> {
    if !candidate.is_empty() && candidate.chars().all(is_id_char) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// A bare video ID as YouTube issues them: exactly 11 URL-safe characters.
pub fn is_raw_video_id(input: &str) -> bool {
    input.len() == 11 && input.chars().all(is_id_char)
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").trim_start_matches("m.").trim_start_matches("music.");
    host == "youtube.com" || host == "youtube-nocookie.com"
}

/// Resolves a video ID from a raw ID or any common YouTube URL shape.
///
/// Handles `youtu.be/<id>`, `watch?v=<id>`, and `/shorts/`, `/embed/`,
/// `/live/`, `/v/` paths. A missing scheme is tolerated.
pub fn resolve_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_raw_video_id(input) {
        return Some(input.to_string());
    }

    let url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{input}")))
        .ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if host == "youtu.be" || host == "www.youtu.be" {
        return segments.first().and_then(|id| valid_id(id));
    }

    if !is_youtube_host(&host) {
        return None;
    }

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return valid_id(&v);
    }

    match segments.as_slice() {
        [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => valid_id(id),
        _ => None,
    }
}
