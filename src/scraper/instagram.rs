use serde_json::Value;
use url::Url;

use super::fetch::{HttpClient, UpstreamRequest};
use super::normalize::no_media_message;
use super::page::{default_chain, fill_page_metadata, run_chain, PageScraper};
use super::types::{DownloadLink, Extraction, Service};
use crate::config::{ApiCredentials, InstagramUpstream};
use crate::error::{classify_status, parse_json_body, ApiError};
use crate::utils::instagram::clean_post_url;

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_QUALITY: &str = "HD Video";

pub async fn extract<C: HttpClient>(
    url: &str,
    upstream: &InstagramUpstream,
    client: &C,
) -> Result<Extraction, ApiError> {
    let post_url = clean_post_url(url).ok_or_else(|| {
        ApiError::InvalidInput("Invalid Instagram URL. Expected a link to a post or reel.".to_string())
    })?;
    log!("[instagram] post_url={}", post_url);

    match upstream {
        InstagramUpstream::Scrape => scrape_page(&post_url, &default_chain(), client).await,
        InstagramUpstream::Api(creds) => fetch_api(&post_url, creds, client).await,
    }
}

/// Fetches the public page once and runs the scraper chain over it.
pub async fn scrape_page<C: HttpClient>(
    post_url: &str,
    chain: &[&dyn PageScraper],
    client: &C,
) -> Result<Extraction, ApiError> {
    let request = UpstreamRequest::get(post_url)
        .header("User-Agent", CHROME_UA)
        .header("Accept", "text/html,application/xhtml+xml")
        .header("Accept-Language", "en-US,en;q=0.9")
        .proxied();

    let resp = client.send(request).await?;
    if !resp.is_success() {
        log!("[instagram] page status={}", resp.status);
        return Err(classify_status("Instagram", resp.status, &resp.body));
    }
    let html = resp.body;

    let Some((attempt, mut video)) = run_chain(&html, chain) else {
        log!(
            "[instagram] all attempts failed. html_len={} has_login={}",
            html.len(),
            html.contains("/accounts/login") || html.contains("loginForm")
        );
        return Err(ApiError::NoMediaFound(no_media_message(Service::Instagram).to_string()));
    };
    log!("[instagram] located video via '{}'", attempt);

    fill_page_metadata(&mut video, &html);

    Ok(Extraction {
        service: Service::Instagram,
        title: video.title,
        author: video.author,
        thumbnail: video.thumbnail,
        links: vec![DownloadLink {
            quality: DEFAULT_QUALITY.to_string(),
            url: video.video_url,
        }],
    })
}

/// One authenticated call to a third-party downloader API.
async fn fetch_api<C: HttpClient>(
    post_url: &str,
    creds: &ApiCredentials,
    client: &C,
) -> Result<Extraction, ApiError> {
    let url = Url::parse_with_params(&creds.endpoint, &[("url", post_url)])
        .map_err(|_| ApiError::Misconfigured("INSTAGRAM_API_ENDPOINT is not a valid URL".to_string()))?;

    let request = UpstreamRequest::get(url.as_str())
        .header("X-RapidAPI-Key", &creds.key)
        .header("X-RapidAPI-Host", &creds.host);

    let resp = client.send(request).await?;
    if !resp.is_success() {
        log!("[instagram] api status={}", resp.status);
        return Err(classify_status("Instagram", resp.status, &resp.body));
    }

    let json = parse_json_body("Instagram", &resp.body)?;
    parse_api_response(&json)
}

/// Reads the API's answer, which comes either flat or wrapped in `data`.
fn parse_api_response(json: &Value) -> Result<Extraction, ApiError> {
    if json.get("error").and_then(|e| e.as_bool()) == Some(true) {
        let message = json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("the API could not process this link");
        return Err(ApiError::Upstream(format!("Instagram API error: {message}")));
    }

    let body = json.get("data").filter(|d| d.is_object()).unwrap_or(json);

    let medias = ["medias", "media", "links"]
        .iter()
        .find_map(|key| body.get(key).and_then(|m| m.as_array()));

    let video = medias.and_then(|items| {
        items.iter().find(|m| {
            m.get("type")
                .and_then(|t| t.as_str())
                .is_some_and(|t| t.eq_ignore_ascii_case("video"))
                && m.get("url").and_then(|u| u.as_str()).is_some_and(|u| !u.is_empty())
        })
    });

    let Some(video) = video else {
        log!("[instagram] api response had no video entry");
        return Err(ApiError::NoMediaFound(no_media_message(Service::Instagram).to_string()));
    };

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| body.get(key).and_then(|v| v.as_str()))
            .map(String::from)
    };

    let url = video.get("url").and_then(|u| u.as_str()).unwrap_or_default().to_string();
    let quality = video
        .get("quality")
        .and_then(|q| q.as_str())
        .filter(|q| !q.trim().is_empty())
        .unwrap_or(DEFAULT_QUALITY)
        .to_string();

    Ok(Extraction {
        service: Service::Instagram,
        title: text(&["title", "caption"]),
        author: text(&["author", "username", "owner"]),
        thumbnail: text(&["thumbnail", "thumbnail_url", "cover"])
            .or_else(|| video.get("thumbnail").and_then(|t| t.as_str()).map(String::from)),
        links: vec![DownloadLink { quality, url }],
    })
}
