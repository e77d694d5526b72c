use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Youtube,
    Instagram,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Youtube => write!(f, "youtube"),
            Service::Instagram => write!(f, "instagram"),
        }
    }
}

impl FromStr for Service {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Service::Youtube),
            "instagram" => Ok(Service::Instagram),
            _ => Err(ApiError::UnsupportedService(s.to_string())),
        }
    }
}

/// A validated inbound request body.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub url: String,
    pub service: Service,
}

impl MediaRequest {
    /// Parses and validates a raw JSON request body.
    pub fn from_body(body: &str) -> Result<Self, ApiError> {
        let json: serde_json::Value = serde_json::from_str(body)
            .map_err(|_| ApiError::InvalidInput("Request body must be a JSON object".to_string()))?;

        if !json.is_object() {
            return Err(ApiError::InvalidInput("Request body must be a JSON object".to_string()));
        }

        let field = |name: &str| {
            json.get(name)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        match (field("url"), field("service")) {
            (Some(url), Some(service)) => Ok(Self {
                url: url.to_string(),
                service: service.parse()?,
            }),
            _ => Err(ApiError::InvalidInput(
                "Missing \"url\" or \"service\" in request body".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadLink {
    pub quality: String,
    pub url: String,
}

/// The response contract. `links` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaResult {
    pub thumbnail: String,
    pub title: String,
    pub author: String,
    pub links: Vec<DownloadLink>,
}

/// What an extractor hands to the normalizer. Every field is best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub service: Service,
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    pub links: Vec<DownloadLink>,
}
