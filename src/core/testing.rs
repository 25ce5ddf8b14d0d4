use crate::domain::ports::HttpFetcher;
use crate::utils::error::{RateError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Text(String),
    Json(serde_json::Value),
    Timeout,
}

/// 依 URL 回傳預設內容並記錄呼叫順序
#[derive(Default)]
pub(crate) struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(self, url: &str, response: FakeResponse) -> Self {
        self.responses.lock().insert(url.to_string(), response);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn respond(&self, url: &str) -> Result<FakeResponse> {
        self.calls.lock().push(url.to_string());
        match self.responses.lock().get(url).cloned() {
            Some(FakeResponse::Timeout) => Err(RateError::TimeoutError {
                url: url.to_string(),
            }),
            Some(response) => Ok(response),
            None => Err(RateError::HttpStatusError {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[async_trait]
impl HttpFetcher for FakeFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        match self.respond(url)? {
            FakeResponse::Text(body) => Ok(body),
            FakeResponse::Json(value) => Ok(value.to_string()),
            FakeResponse::Timeout => unreachable!("handled in respond"),
        }
    }

    async fn post_json(&self, url: &str, _body: &serde_json::Value) -> Result<serde_json::Value> {
        match self.respond(url)? {
            FakeResponse::Json(value) => Ok(value),
            FakeResponse::Text(body) => {
                serde_json::from_str(&body).map_err(|e| RateError::parse(e.to_string()))
            }
            FakeResponse::Timeout => unreachable!("handled in respond"),
        }
    }
}
