use crate::domain::ports::HttpFetcher;
use crate::utils::error::{RateError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            accept_invalid_certs: true,
            user_agent: concat!("tasa-ve/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest 實作：逾時涵蓋整個請求，逾時後 future 被丟棄、連線隨之釋放
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        // BCV 的憑證鏈經常不完整，預設略過驗證
        let client = Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| RateError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    fn check_status(url: &str, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("📡 {} -> {}", url, status);
        if status.is_success() {
            Ok(response)
        } else {
            Err(RateError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("📡 GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RateError::from_request(url, e))?;

        Self::check_status(url, response)?
            .text()
            .await
            .map_err(|e| RateError::from_request(url, e))
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        tracing::debug!("📡 POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| RateError::from_request(url, e))?;

        let text = Self::check_status(url, response)?
            .text()
            .await
            .map_err(|e| RateError::from_request(url, e))?;

        serde_json::from_str(&text).map_err(|e| RateError::parse(format!("{}: {}", url, e)))
    }
}
