use serde_json::{json, Value};
use url::Url;

use super::fetch::{HttpClient, UpstreamRequest};
use super::normalize::no_media_message;
use super::renditions::{download_links, largest_thumbnail, renditions_from_json, thumbnails_from_json, Rendition, Thumbnail};
use super::types::{Extraction, Service};
use crate::config::{ApiCredentials, YoutubeUpstream};
use crate::error::{classify_status, parse_json_body, ApiError};
use crate::utils::youtube::resolve_video_id;

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";
const ANDROID_CLIENT_VERSION: &str = "19.09.37";
const ANDROID_UA: &str = "com.google.android.youtube/19.09.37 (Linux; U; Android 11) gzip";

/// Everything we need from an upstream's description of a video.
#[derive(Debug)]
struct VideoManifest {
    title: Option<String>,
    author: Option<String>,
    thumbnails: Vec<Thumbnail>,
    renditions: Vec<Rendition>,
}

pub async fn extract<C: HttpClient>(
    url: &str,
    upstream: &YoutubeUpstream,
    client: &C,
) -> Result<Extraction, ApiError> {
    let video_id = resolve_video_id(url)
        .ok_or_else(|| ApiError::InvalidInput("Invalid YouTube URL.".to_string()))?;
    log!("[youtube] video_id={}", video_id);

    let manifest = match upstream {
        YoutubeUpstream::Innertube => fetch_player(&video_id, client).await?,
        YoutubeUpstream::Api(creds) => fetch_api(&video_id, creds, client).await?,
    };

    let links = download_links(&manifest.renditions);
    log!(
        "[youtube] {} renditions, {} links for {}",
        manifest.renditions.len(),
        links.len(),
        video_id
    );
    if links.is_empty() {
        return Err(ApiError::NoMediaFound(no_media_message(Service::Youtube).to_string()));
    }

    Ok(Extraction {
        service: Service::Youtube,
        title: manifest.title,
        author: manifest.author,
        thumbnail: largest_thumbnail(&manifest.thumbnails).map(|t| t.url.clone()),
        links,
    })
}

/// Asks YouTube's own player endpoint, posing as the Android app.
async fn fetch_player<C: HttpClient>(video_id: &str, client: &C) -> Result<VideoManifest, ApiError> {
    let body = json!({
        "context": {
            "client": {
                "clientName": "ANDROID",
                "clientVersion": ANDROID_CLIENT_VERSION,
                "androidSdkVersion": 30,
                "hl": "en",
                "gl": "US",
                "utcOffsetMinutes": 0
            }
        },
        "videoId": video_id,
        "contentCheckOk": true,
        "racyCheckOk": true
    });

    let request = UpstreamRequest::post(PLAYER_ENDPOINT, body.to_string())
        .header("Content-Type", "application/json")
        .header("User-Agent", ANDROID_UA)
        .header("X-YouTube-Client-Name", "3")
        .header("X-YouTube-Client-Version", ANDROID_CLIENT_VERSION);

    let resp = client.send(request).await?;
    if !resp.is_success() {
        log!("[youtube] player status={}", resp.status);
        return Err(classify_status("YouTube", resp.status, &resp.body));
    }

    let json = parse_json_body("YouTube", &resp.body)?;
    parse_player_response(&json)
}

fn parse_player_response(json: &Value) -> Result<VideoManifest, ApiError> {
    let playability = json.get("playabilityStatus");
    let status = playability
        .and_then(|p| p.get("status"))
        .and_then(|s| s.as_str())
        .unwrap_or("OK");
    let reason = playability
        .and_then(|p| p.get("reason"))
        .and_then(|r| r.as_str())
        .map(str::trim)
        .filter(|r| !r.is_empty());

    match (status, reason) {
        ("OK", _) => {}
        ("LOGIN_REQUIRED", reason) => {
            log!("[youtube] playability LOGIN_REQUIRED");
            return Err(ApiError::UpstreamBlocked(format!(
                "YouTube is blocking this server request ({}). This may be due to video restrictions \
                 or anti-scraping measures. Please try a different video or try again later.",
                reason.unwrap_or("sign-in required")
            )));
        }
        (other, Some(reason)) => {
            log!("[youtube] playability {}", other);
            return Err(ApiError::Upstream(reason.to_string()));
        }
        (other, None) => {
            return Err(ApiError::Upstream(format!("YouTube reports this video as unplayable ({other}).")));
        }
    }

    let details = json.get("videoDetails");
    let text = |key: &str| {
        details
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    Ok(VideoManifest {
        title: text("title"),
        author: text("author"),
        thumbnails: thumbnails_from_json(
            details
                .and_then(|d| d.get("thumbnail"))
                .and_then(|t| t.get("thumbnails")),
        ),
        renditions: json
            .get("streamingData")
            .map(renditions_from_json)
            .unwrap_or_default(),
    })
}

/// Asks a keyed third-party REST API.
async fn fetch_api<C: HttpClient>(
    video_id: &str,
    creds: &ApiCredentials,
    client: &C,
) -> Result<VideoManifest, ApiError> {
    let url = Url::parse_with_params(&creds.endpoint, &[("id", video_id)])
        .map_err(|_| ApiError::Misconfigured("YOUTUBE_API_ENDPOINT is not a valid URL".to_string()))?;

    let request = UpstreamRequest::get(url.as_str())
        .header("X-RapidAPI-Key", &creds.key)
        .header("X-RapidAPI-Host", &creds.host);

    let resp = client.send(request).await?;
    if !resp.is_success() {
        log!("[youtube] api status={}", resp.status);
        return Err(classify_status("YouTube", resp.status, &resp.body));
    }

    let json = parse_json_body("YouTube", &resp.body)?;
    parse_api_response(&json)
}

fn parse_api_response(json: &Value) -> Result<VideoManifest, ApiError> {
    let status = json.get("status").and_then(|s| s.as_str());
    if let Some(status) = status.filter(|s| !s.eq_ignore_ascii_case("ok")) {
        let message = ["error", "msg", "message"]
            .iter()
            .find_map(|key| json.get(key).and_then(|m| m.as_str()))
            .unwrap_or(status);
        return Err(ApiError::Upstream(format!("YouTube API error: {message}")));
    }

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| json.get(key).and_then(|v| v.as_str()))
            .map(String::from)
    };

    Ok(VideoManifest {
        title: text(&["title"]),
        author: text(&["channelTitle", "author"]),
        thumbnails: thumbnails_from_json(json.get("thumbnail").or_else(|| json.get("thumbnails"))),
        renditions: renditions_from_json(json),
    })
}
