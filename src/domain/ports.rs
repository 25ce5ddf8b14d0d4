use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 時間來源，快取過期判斷一律經由此處，測試可注入手動時鐘
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 上游 HTTP 能力：逾時與 TLS 設定由實作端負責
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value>;
}

/// 單一來源的擷取規則，找不到就回傳 None
pub trait Extractor: Send + Sync {
    fn describe(&self) -> String;
    fn extract(&self, body: &str) -> Option<f64>;
}
