use std::fmt;
use std::time::Duration;

use url::Url;
use worker::Env;

use crate::error::ApiError;

const DEFAULT_TIMEOUT_SECS: u64 = 8;
const MAX_TIMEOUT_SECS: u64 = 60;

const DEFAULT_YOUTUBE_API_ENDPOINT: &str = "https://ytstream-download-youtube-videos.p.rapidapi.com/dl";
const DEFAULT_INSTAGRAM_API_ENDPOINT: &str =
    "https://social-media-video-downloader.p.rapidapi.com/smvd/get/all";

/// Key/host pair for a RapidAPI-style REST upstream.
#[derive(Clone, PartialEq)]
pub struct ApiCredentials {
    pub endpoint: String,
    pub host: String,
    pub key: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("endpoint", &self.endpoint)
            .field("host", &self.host)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum YoutubeUpstream {
    /// YouTube's own player endpoint, no key needed.
    Innertube,
    Api(ApiCredentials),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstagramUpstream {
    /// Fetch the public page and run the scraper chain over it.
    Scrape,
    Api(ApiCredentials),
}

#[derive(Clone, PartialEq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable per-invocation settings, resolved once and passed down.
///
/// Upstream settings are kept per platform. A broken Instagram setup is
/// reported only to Instagram requests and never blocks YouTube.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub timeout: Duration,
    pub youtube: Result<YoutubeUpstream, ApiError>,
    pub instagram: Result<InstagramUpstream, ApiError>,
    pub proxy: Option<ProxyCredentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            youtube: Ok(YoutubeUpstream::Innertube),
            instagram: Ok(InstagramUpstream::Scrape),
            proxy: None,
        }
    }
}

impl Config {
    /// Reads vars and secrets from the Worker environment.
    pub fn from_env(env: &Env) -> Result<Self, ApiError> {
        Self::from_lookup(|name| {
            env.var(name)
                .map(|v| v.to_string())
                .or_else(|_| env.secret(name).map(|s| s.to_string()))
                .ok()
        })
    }

    /// Resolves configuration from any name -> value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = match get("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ApiError::Misconfigured(format!("UPSTREAM_TIMEOUT_SECS must be a whole number, got \"{raw}\""))
                })?;
                if secs == 0 || secs > MAX_TIMEOUT_SECS {
                    return Err(ApiError::Misconfigured(format!(
                        "UPSTREAM_TIMEOUT_SECS must be between 1 and {MAX_TIMEOUT_SECS}"
                    )));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let key = get("RAPIDAPI_KEY");

        let youtube = match get("YOUTUBE_UPSTREAM").as_deref().unwrap_or("innertube") {
            "innertube" => Ok(YoutubeUpstream::Innertube),
            "api" => api_credentials(
                "YOUTUBE_API_ENDPOINT",
                get("YOUTUBE_API_ENDPOINT").as_deref().unwrap_or(DEFAULT_YOUTUBE_API_ENDPOINT),
                key.as_deref(),
            )
            .map(YoutubeUpstream::Api),
            other => Err(ApiError::Misconfigured(format!(
                "YOUTUBE_UPSTREAM must be \"innertube\" or \"api\", got \"{other}\""
            ))),
        };

        let instagram = match get("INSTAGRAM_UPSTREAM").as_deref().unwrap_or("scrape") {
            "scrape" => Ok(InstagramUpstream::Scrape),
            "api" => api_credentials(
                "INSTAGRAM_API_ENDPOINT",
                get("INSTAGRAM_API_ENDPOINT").as_deref().unwrap_or(DEFAULT_INSTAGRAM_API_ENDPOINT),
                key.as_deref(),
            )
            .map(InstagramUpstream::Api),
            other => Err(ApiError::Misconfigured(format!(
                "INSTAGRAM_UPSTREAM must be \"scrape\" or \"api\", got \"{other}\""
            ))),
        };

        let proxy = match (get("PROXY_USERNAME"), get("PROXY_PASSWORD")) {
            (Some(username), Some(password)) => Some(ProxyCredentials { username, password }),
            _ => None,
        };

        Ok(Self {
            timeout,
            youtube,
            instagram,
            proxy,
        })
    }
}

fn api_credentials(name: &str, endpoint: &str, key: Option<&str>) -> Result<ApiCredentials, ApiError> {
    let key = key.ok_or_else(|| {
        ApiError::Misconfigured(format!("RAPIDAPI_KEY must be set when {name} is used"))
    })?;
    let host = Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .ok_or_else(|| ApiError::Misconfigured(format!("{name} is not a valid URL")))?;

    Ok(ApiCredentials {
        endpoint: endpoint.to_string(),
        host,
        key: key.to_string(),
    })
}
