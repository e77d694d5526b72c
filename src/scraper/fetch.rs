use std::future::Future;
use std::time::Duration;

use futures::future::{select, Either};
use futures::pin_mut;
use worker::{AbortController, Delay, Fetch, Headers, Method, Request, RequestInit};

use crate::config::ProxyCredentials;
use crate::error::ApiError;

/// An outbound call to an upstream, independent of the runtime that sends it.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Route through the residential proxy when one is configured.
    pub proxied: bool,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            proxied: false,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            body: Some(body.into()),
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn proxied(mut self) -> Self {
        self.proxied = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends upstream requests. Each call is attempted exactly once.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ApiError>;
}

/// `HttpClient` backed by the Workers `fetch` API, with a hard timeout.
pub struct WorkerClient {
    timeout: Duration,
    proxy: Option<ProxyCredentials>,
}

impl WorkerClient {
    pub fn new(timeout: Duration, proxy: Option<ProxyCredentials>) -> Self {
        Self { timeout, proxy }
    }
}

impl HttpClient for WorkerClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ApiError> {
        let host = host_of(&request.url);
        let controller = AbortController::default();
        let signal = controller.signal();

        let outgoing = match (&self.proxy, request.proxied) {
            (Some(proxy), true) => {
                log!("[proxy] routing through residential proxy: {}", host);
                proxy_request(&request, proxy)?
            }
            _ => direct_request(&request)?,
        };

        let work = async {
            let mut resp = Fetch::Request(outgoing).send_with_signal(&signal).await?;
            let status = resp.status_code();
            let body = resp.text().await?;
            Ok::<_, worker::Error>(UpstreamResponse { status, body })
        };
        let deadline = Delay::from(self.timeout);

        with_deadline(work, deadline, move || controller.abort(), &host, self.timeout.as_secs()).await
    }
}

/// Races `work` against `deadline`. If the deadline fires first, `on_timeout`
/// runs and the call fails as unreachable.
async fn with_deadline<W, D, F>(
    work: W,
    deadline: D,
    on_timeout: F,
    host: &str,
    secs: u64,
) -> Result<UpstreamResponse, ApiError>
where
    W: Future<Output = worker::Result<UpstreamResponse>>,
    D: Future<Output = ()>,
    F: FnOnce(),
{
    pin_mut!(work, deadline);

    match select(work, deadline).await {
        Either::Left((result, _)) => {
            let resp = result?;
            log!("[fetch] {} status={} body_len={}", host, resp.status, resp.body.len());
            Ok(resp)
        }
        Either::Right(_) => {
            on_timeout();
            log!("[fetch] {} timed out after {}s", host, secs);
            Err(ApiError::UpstreamUnreachable(format!(
                "{host} did not respond within {secs} seconds."
            )))
        }
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "upstream".to_string())
}

fn direct_request(request: &UpstreamRequest) -> worker::Result<Request> {
    let headers = Headers::new();
    for (name, value) in &request.headers {
        headers.set(name, value)?;
    }

    let mut init = RequestInit::new();
    init.with_method(request.method.clone()).with_headers(headers);
    if let Some(body) = &request.body {
        init.with_body(Some(body.clone().into()));
    }

    Request::new_with_init(&request.url, &init)
}

/// Wraps a request for Bright Data's REST API at api.brightdata.com/request.
///
/// Workers can't speak HTTP CONNECT to a proxy, so the target request is sent
/// as a JSON payload instead. The zone comes from the proxy username
/// (`brd-customer-XXX-zone-ZONE_NAME`), the password is the bearer token.
fn proxy_request(request: &UpstreamRequest, proxy: &ProxyCredentials) -> worker::Result<Request> {
    let zone = extract_zone(&proxy.username).unwrap_or_else(|| "residential".to_string());
    let payload = proxy_payload(request, &zone);
    let payload_str = serde_json::to_string(&payload)
        .map_err(|e| worker::Error::RustError(format!("JSON serialize error: {e}")))?;

    let headers = Headers::new();
    headers.set("Authorization", &format!("Bearer {}", proxy.password))?;
    headers.set("Content-Type", "application/json")?;

    let mut init = RequestInit::new();
    init.with_method(Method::Post)
        .with_headers(headers)
        .with_body(Some(payload_str.into()));

    Request::new_with_init("https://api.brightdata.com/request", &init)
}

fn proxy_payload(request: &UpstreamRequest, zone: &str) -> serde_json::Value {
    let method = match request.method {
        Method::Post => "POST",
        _ => "GET",
    };

    let mut payload = serde_json::json!({
        "zone": zone,
        "url": request.url,
        "format": "raw",
        "method": method,
        "country": "us",
    });

    if !request.headers.is_empty() {
        let headers: serde_json::Map<String, serde_json::Value> = request
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        payload["headers"] = serde_json::Value::Object(headers);
    }

    if let Some(body) = &request.body {
        payload["body"] = serde_json::Value::String(body.clone());
    }

    payload
}

/// Zone name from a Bright Data proxy username. Ends at the next '-' or end of string.
fn extract_zone(username: &str) -> Option<String> {
    let zone_idx = username.find("-zone-")?;
    let after_zone = &username[zone_idx + 6..];
    let zone = match after_zone.find('-') {
        Some(end) => &after_zone[..end],
        None => after_zone,
    };
    if zone.is_empty() {
        None
    } else {
        Some(zone.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::future::{pending, ready};
    use std::cell::Cell;

    #[test]
    fn zone_from_username() {
        assert_eq!(extract_zone("brd-customer-hl_123-zone-residential1"), Some("residential1".into()));
        assert_eq!(extract_zone("brd-customer-hl_123-zone-isp-country-us"), Some("isp".into()));
        assert_eq!(extract_zone("brd-customer-hl_123-zone-"), None);
        assert_eq!(extract_zone("plainuser"), None);
    }

    #[test]
    fn proxy_payload_forwards_request() {
        let request = UpstreamRequest::get("https://www.instagram.com/reel/ABC/")
            .header("User-Agent", "Mozilla/5.0")
            .proxied();
        let payload = proxy_payload(&request, "res");

        assert_eq!(payload["zone"], "res");
        assert_eq!(payload["url"], "https://www.instagram.com/reel/ABC/");
        assert_eq!(payload["method"], "GET");
        assert_eq!(payload["headers"]["User-Agent"], "Mozilla/5.0");
        assert!(payload.get("body").is_none());
    }

    #[test]
    fn post_payload_includes_body() {
        let request = UpstreamRequest::post("https://example.com/api", "{\"a\":1}");
        let payload = proxy_payload(&request, "res");
        assert_eq!(payload["method"], "POST");
        assert_eq!(payload["body"], "{\"a\":1}");
        assert!(payload.get("headers").is_none());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = UpstreamRequest::get("https://example.com").header("X-RapidAPI-Host", "h");
        assert_eq!(request.header_value("x-rapidapi-host"), Some("h"));
        assert_eq!(request.header_value("missing"), None);
    }

    #[test]
    fn deadline_expiry_aborts_and_fails() {
        let aborted = Cell::new(false);
        let err = block_on(with_deadline(
            pending::<worker::Result<UpstreamResponse>>(),
            ready(()),
            || aborted.set(true),
            "www.youtube.com",
            8,
        ))
        .unwrap_err();

        assert_eq!(
            err,
            ApiError::UpstreamUnreachable("www.youtube.com did not respond within 8 seconds.".into())
        );
        assert_eq!(err.status_code(), 500);
        assert!(aborted.get());
    }

    #[test]
    fn response_before_deadline_passes_through() {
        let aborted = Cell::new(false);
        let resp = UpstreamResponse {
            status: 200,
            body: "{}".into(),
        };
        let got = block_on(with_deadline(
            ready(Ok(resp.clone())),
            pending::<()>(),
            || aborted.set(true),
            "www.instagram.com",
            8,
        ))
        .unwrap();

        assert_eq!(got, resp);
        assert!(!aborted.get());
    }

    #[test]
    fn host_of_falls_back() {
        assert_eq!(host_of("https://www.youtube.com/youtubei/v1/player"), "www.youtube.com");
        assert_eq!(host_of("::"), "upstream");
    }
}
