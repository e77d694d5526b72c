use super::types::{DownloadLink, Extraction, MediaResult, Service};
use crate::error::ApiError;

/// Shown when an upstream gives us no usable thumbnail, whatever the platform.
pub const PLACEHOLDER_THUMBNAIL: &str = "https://placehold.co/160x160/ef4444/white?text=Reel";

fn default_title(service: Service) -> &'static str {
    match service {
        Service::Youtube => "YouTube Video",
        Service::Instagram => "Instagram Reel",
    }
}

fn default_author(service: Service) -> &'static str {
    match service {
        Service::Youtube => "YouTube Channel",
        Service::Instagram => "Instagram User",
    }
}

pub fn no_media_message(service: Service) -> &'static str {
    match service {
        Service::Youtube => "No downloadable formats found. This may be a live stream or a premiere.",
        Service::Instagram => {
            "Could not locate the video on this Instagram post. It may be private or deleted, \
             Instagram may be blocking requests from this server, or its page layout has changed."
        }
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Maps extractor output into the response contract.
///
/// Pure: no I/O, same input gives the same output. Fails instead of
/// returning a result without links.
pub fn normalize(extraction: &Extraction) -> Result<MediaResult, ApiError> {
    let service = extraction.service;

    let links: Vec<DownloadLink> = extraction
        .links
        .iter()
        .filter(|l| !l.url.trim().is_empty())
        .map(|l| DownloadLink {
            quality: present(Some(&l.quality)).unwrap_or_else(|| "Download".to_string()),
            url: l.url.trim().to_string(),
        })
        .collect();

    if links.is_empty() {
        return Err(ApiError::NoMediaFound(no_media_message(service).to_string()));
    }

    Ok(MediaResult {
        thumbnail: present(extraction.thumbnail.as_deref())
            .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
        title: present(extraction.title.as_deref()).unwrap_or_else(|| default_title(service).to_string()),
        author: present(extraction.author.as_deref())
            .unwrap_or_else(|| default_author(service).to_string()),
        links,
    })
}
