use serde_json::{json, Value};
use worker::*;

use crate::config::Config;
use crate::error::ApiError;
use crate::scraper::fetch::{HttpClient, WorkerClient};
use crate::scraper::fetch_media;
use crate::scraper::types::{MediaRequest, MediaResult};

/// Status and JSON body, before they become a runtime `Response`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn error(err: &ApiError) -> Self {
        log!("[router] {} ({}): {}", err.kind(), err.status_code(), err);
        Self {
            status: err.status_code(),
            body: json!({ "error": err.to_string() }),
        }
    }

    fn into_response(self) -> Result<Response> {
        Ok(Response::from_json(&self.body)?.with_status(self.status))
    }
}

fn admit(method: &Method) -> std::result::Result<(), ApiError> {
    match method {
        Method::Post => Ok(()),
        _ => Err(ApiError::MethodNotAllowed),
    }
}

async fn process<C, L, M>(
    method: &Method,
    body: &str,
    load_config: L,
    connect: M,
) -> std::result::Result<MediaResult, ApiError>
where
    C: HttpClient,
    L: FnOnce() -> std::result::Result<Config, ApiError>,
    M: FnOnce(&Config) -> C,
{
    admit(method)?;
    let request = MediaRequest::from_body(body)?;
    let config = load_config()?;
    let client = connect(&config);
    fetch_media(&request, &config, &client).await
}

/// The whole request pipeline: method check, body validation, then config
/// and extraction. Configuration problems never mask a 400 or 405.
pub async fn respond<C, L, M>(method: &Method, body: &str, load_config: L, connect: M) -> Reply
where
    C: HttpClient,
    L: FnOnce() -> std::result::Result<Config, ApiError>,
    M: FnOnce(&Config) -> C,
{
    match process(method, body, load_config, connect).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(body) => Reply { status: 200, body },
            Err(e) => Reply::error(&ApiError::ParseFailure(format!("Could not encode response: {e}"))),
        },
        Err(e) => Reply::error(&e),
    }
}

pub async fn handle(mut req: Request, ctx: RouteContext<()>) -> Result<Response> {
    let method = req.method();
    log!("[router] {:?} {}", method, req.path());

    if let Err(e) = admit(&method) {
        return Reply::error(&e).into_response();
    }

    let body = match req.text().await {
        Ok(body) => body,
        Err(_) => {
            return Reply::error(&ApiError::InvalidInput("Could not read request body".to_string())).into_response()
        }
    };

    respond(
        &method,
        &body,
        || Config::from_env(&ctx.env),
        |config| WorkerClient::new(config.timeout, config.proxy.clone()),
    )
    .await
    .into_response()
}
