use worker::*;

/// Console logging that also works under native `cargo test`, where the
/// JS console import isn't available.
macro_rules! log {
    ($($t:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        worker::console_log!($($t)*);
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!($($t)*);
    }};
}

mod config;
mod error;
mod handlers;
mod scraper;
mod utils;

/// Every path the download endpoint answers on.
const ROUTES: [&str; 3] = ["/", "/download-video", "/api/download-video"];

fn download_handler(
) -> impl Fn(Request, RouteContext<()>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response>>>> {
    |req, ctx| Box::pin(async move { handlers::download::handle(req, ctx).await })
}

#[event(fetch)]
async fn fetch(mut req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    // Strip trailing slash (except root) and redirect-internally by rewriting
    let url = req.url()?;

    if let Some(trimmed) = strip_trailing_slash(url.path()) {
        let mut new_url = url.clone();
        new_url.set_path(trimmed);
        // The body is carried over as text so a POST survives the rewrite
        let body = match req.method() {
            Method::Get | Method::Head => None,
            _ => Some(req.text().await?.into()),
        };
        let new_req = Request::new_with_init(
            new_url.as_str(),
            &RequestInit {
                method: req.method(),
                headers: req.headers().clone(),
                body,
                ..Default::default()
            },
        )?;
        let router = build_router();
        return router.run(new_req, env).await;
    }

    let router = build_router();
    router.run(req, env).await
}

/// `/download-video/` -> `/download-video`. The root path is left alone.
fn strip_trailing_slash(path: &str) -> Option<&str> {
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        Some(if trimmed.is_empty() { "/" } else { trimmed })
    } else {
        None
    }
}

/// Every route accepts every method; the handler answers non-POST with a JSON 405.
fn build_router() -> Router<'static, ()> {
    ROUTES
        .iter()
        .fold(Router::new(), |router, path| router.on_async(path, download_handler()))
}
