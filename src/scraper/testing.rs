//! Canned upstream for tests: replays responses in order and records requests.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::fetch::{HttpClient, UpstreamRequest, UpstreamResponse};
use crate::error::ApiError;

#[derive(Default)]
pub struct StubClient {
    replies: RefCell<VecDeque<Result<UpstreamResponse, ApiError>>>,
    pub requests: RefCell<Vec<UpstreamRequest>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
        self.replies.borrow_mut().push_back(Ok(UpstreamResponse {
            status,
            body: body.into(),
        }));
        self
    }

    pub fn fail(self, err: ApiError) -> Self {
        self.replies.borrow_mut().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn request(&self, index: usize) -> UpstreamRequest {
        self.requests.borrow()[index].clone()
    }
}

impl UpstreamRequest {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl HttpClient for &StubClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ApiError> {
        (**self).send(request).await
    }
}

impl HttpClient for StubClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ApiError> {
        self.requests.borrow_mut().push(request);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::UpstreamUnreachable("stub has no reply queued".into())))
    }
}
