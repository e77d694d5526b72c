use thiserror::Error;

/// Every way a request can fail. Variants only differ in message text once
/// they are past validation: the status code comes from [`ApiError::status_code`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Missing or malformed request fields, or a URL the extractor can't use.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid service specified: \"{0}\". Expected \"youtube\" or \"instagram\".")]
    UnsupportedService(String),

    #[error("Server is misconfigured: {0}")]
    Misconfigured(String),

    /// Network failure or timeout talking to an upstream.
    #[error("{0}")]
    UpstreamUnreachable(String),

    /// The upstream explicitly refused us (bot checks, rate limits, 410s).
    #[error("{0}")]
    UpstreamBlocked(String),

    /// Any other upstream failure, carrying the upstream's own message when it gave one.
    #[error("{0}")]
    Upstream(String),

    /// Expected JSON but got something else, almost always a login or consent page.
    #[error("{0}")]
    Interstitial(String),

    #[error("{0}")]
    NoMediaFound(String),

    #[error("{0}")]
    ParseFailure(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) | ApiError::UnsupportedService(_) => 400,
            ApiError::MethodNotAllowed => 405,
            _ => 500,
        }
    }

    /// Short machine-readable name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MethodNotAllowed => "method_not_allowed",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::UnsupportedService(_) => "unsupported_service",
            ApiError::Misconfigured(_) => "misconfigured",
            ApiError::UpstreamUnreachable(_) => "upstream_unreachable",
            ApiError::UpstreamBlocked(_) => "upstream_blocked",
            ApiError::Upstream(_) => "upstream",
            ApiError::Interstitial(_) => "interstitial",
            ApiError::NoMediaFound(_) => "no_media_found",
            ApiError::ParseFailure(_) => "parse_failure",
        }
    }
}

impl From<worker::Error> for ApiError {
    fn from(e: worker::Error) -> Self {
        ApiError::UpstreamUnreachable(format!("Upstream request failed: {e}"))
    }
}

/// Turns a non-2xx upstream status into the most specific error available.
///
/// `platform` is the human name used in messages ("YouTube", "Instagram").
/// `body` is inspected for an upstream-provided message.
pub fn classify_status(platform: &str, status: u16, body: &str) -> ApiError {
    let upstream_message = upstream_message(body);

    match status {
        410 => ApiError::UpstreamBlocked(format!(
            "{platform} is actively blocking this server request (Error 410). This may be due to \
             content restrictions or anti-scraping measures. Please try a different link or try again later."
        )),
        401 | 403 | 429 => ApiError::UpstreamBlocked(match upstream_message {
            Some(msg) => format!("{platform} refused the request (HTTP {status}): {msg}"),
            None => format!(
                "{platform} refused the request (HTTP {status}). The server is probably being \
                 rate limited or blocked; try again later."
            ),
        }),
        404 => ApiError::NoMediaFound(format!(
            "{platform} returned 404. The content may be private, deleted, or the link is wrong."
        )),
        _ => ApiError::Upstream(match upstream_message {
            Some(msg) => format!("{platform} upstream returned HTTP {status}: {msg}"),
            None => format!("{platform} upstream returned HTTP {status}."),
        }),
    }
}

/// Pulls a human-readable message out of a JSON error body, if there is one.
fn upstream_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "msg", "reason"]
        .iter()
        .filter_map(|key| json.get(key))
        .find_map(|v| match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Object(o) => o
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.trim().to_string()),
            _ => None,
        })
}

/// Parses an upstream body that must be JSON.
///
/// A body that doesn't parse is treated as an interstitial (login wall,
/// consent page, captcha) rather than a generic parse error, since that is
/// what these upstreams serve when they don't want to answer.
pub fn parse_json_body(platform: &str, body: &str) -> Result<serde_json::Value, ApiError> {
    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(e) => {
            let trimmed = body.trim_start();
            if trimmed.starts_with('<') || trimmed.is_empty() {
                Err(ApiError::Interstitial(format!(
                    "{platform} answered with a web page instead of data. The server was most likely \
                     redirected to a login or consent page."
                )))
            } else {
                Err(ApiError::ParseFailure(format!(
                    "Could not parse the {platform} upstream response: {e}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(ApiError::UnsupportedService("vimeo".into()).status_code(), 400);
        assert_eq!(ApiError::MethodNotAllowed.status_code(), 405);
        assert_eq!(ApiError::UpstreamUnreachable("x".into()).status_code(), 500);
        assert_eq!(ApiError::UpstreamBlocked("x".into()).status_code(), 500);
        assert_eq!(ApiError::NoMediaFound("x".into()).status_code(), 500);
        assert_eq!(ApiError::ParseFailure("x".into()).status_code(), 500);
        assert_eq!(ApiError::Interstitial("x".into()).status_code(), 500);
        assert_eq!(ApiError::Misconfigured("x".into()).status_code(), 500);
    }

    #[test]
    fn gone_is_classified_as_blocked() {
        let err = classify_status("YouTube", 410, "");
        assert!(matches!(err, ApiError::UpstreamBlocked(_)));
        assert!(err.to_string().contains("Error 410"));
    }

    #[test]
    fn rate_limit_prefers_upstream_message() {
        let err = classify_status("Instagram", 429, r#"{"message":"Too many requests"}"#);
        assert_eq!(
            err,
            ApiError::UpstreamBlocked("Instagram refused the request (HTTP 429): Too many requests".into())
        );
    }

    #[test]
    fn not_found_means_no_media() {
        assert!(matches!(classify_status("Instagram", 404, "<html>"), ApiError::NoMediaFound(_)));
    }

    #[test]
    fn server_error_carries_nested_message() {
        let err = classify_status("YouTube", 500, r#"{"error":{"code":500,"message":"Backend error"}}"#);
        assert_eq!(err, ApiError::Upstream("YouTube upstream returned HTTP 500: Backend error".into()));
    }

    #[test]
    fn server_error_without_body() {
        let err = classify_status("YouTube", 502, "Bad Gateway");
        assert_eq!(err, ApiError::Upstream("YouTube upstream returned HTTP 502.".into()));
    }

    #[test]
    fn html_instead_of_json_is_interstitial() {
        let err = parse_json_body("Instagram", "<!DOCTYPE html><html>login</html>").unwrap_err();
        assert!(matches!(err, ApiError::Interstitial(_)));
    }

    #[test]
    fn truncated_json_is_parse_failure() {
        let err = parse_json_body("Instagram", r#"{"data": [1, 2"#).unwrap_err();
        assert!(matches!(err, ApiError::ParseFailure(_)));
    }
}
