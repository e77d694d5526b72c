pub mod fetch;
pub mod instagram;
pub mod normalize;
pub mod page;
pub mod renditions;
pub mod types;
pub mod youtube;

#[cfg(test)]
pub mod testing;

use crate::config::Config;
use crate::error::ApiError;

use self::fetch::HttpClient;
use self::normalize::normalize;
use self::types::{MediaRequest, MediaResult, Service};

/// Orchestrator: platform extractor -> normalizer.
///
/// Nothing is cached or retried; every upstream call happens at most once
/// per request and the first failure is the answer.
pub async fn fetch_media<C: HttpClient>(
    request: &MediaRequest,
    config: &Config,
    client: &C,
) -> Result<MediaResult, ApiError> {
    log!("[scraper] service={} url={}", request.service, request.url);

    let extraction = match request.service {
        Service::Youtube => {
            let upstream = config.youtube.as_ref().map_err(Clone::clone)?;
            youtube::extract(&request.url, upstream, client).await?
        }
        Service::Instagram => {
            let upstream = config.instagram.as_ref().map_err(Clone::clone)?;
            instagram::extract(&request.url, upstream, client).await?
        }
    };

    let result = normalize(&extraction)?;
    log!("[scraper] {} links for {}", result.links.len(), request.service);
    Ok(result)
}
