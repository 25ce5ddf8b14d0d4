use crate::core::cache::TtlCache;
use crate::domain::model::{CachedValue, P2PListing, Resolution};
use crate::domain::ports::HttpFetcher;
use crate::utils::error::{RateError, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const P2P_CACHE_KEY: &str = "paralelo";
pub const DEFAULT_P2P_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_P2P_ENDPOINT: &str =
    "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search";

#[derive(Debug, Clone)]
pub struct P2PQuery {
    pub endpoint: String,
    pub asset: String,
    pub fiat: String,
    pub trade_type: String,
    pub rows: u32,
}

impl Default for P2PQuery {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_P2P_ENDPOINT.to_string(),
            asset: "USDT".to_string(),
            fiat: "VES".to_string(),
            trade_type: "SELL".to_string(),
            rows: 20,
        }
    }
}

impl P2PQuery {
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "asset": self.asset,
            "fiat": self.fiat,
            "tradeType": self.trade_type,
            "page": 1,
            "rows": self.rows,
            "publisherType": null,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListingDto {
    adv: AdvDto,
}

#[derive(Debug, Deserialize)]
struct AdvDto {
    price: serde_json::Value,
    #[serde(rename = "surplusAmount", default)]
    surplus_amount: serde_json::Value,
    #[serde(rename = "isPromoted", default)]
    is_promoted: bool,
    #[serde(rename = "privilegeType", default)]
    privilege_type: Option<i64>,
}

/// 上游數字可能是字串或 JSON 數字，兩者皆以 `.` 為小數點
fn decimal_field(value: &serde_json::Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

impl TryFrom<ListingDto> for P2PListing {
    type Error = RateError;

    fn try_from(dto: ListingDto) -> Result<Self> {
        let price = decimal_field(&dto.adv.price)
            .ok_or_else(|| RateError::parse(format!("bad price {}", dto.adv.price)))?;
        let surplus = decimal_field(&dto.adv.surplus_amount).ok_or_else(|| {
            RateError::parse(format!("bad surplusAmount {}", dto.adv.surplus_amount))
        })?;
        Ok(P2PListing {
            price,
            is_promoted: dto.adv.is_promoted || dto.adv.privilege_type.is_some(),
            surplus,
        })
    }
}

/// 解析搜尋回應；單筆格式錯誤只略過該筆
pub fn parse_listings(response: &serde_json::Value) -> Result<Vec<P2PListing>> {
    let items = response
        .get("data")
        .and_then(|data| data.as_array())
        .ok_or_else(|| RateError::parse("response has no 'data' array"))?;

    let listings: Vec<P2PListing> = items
        .iter()
        .filter_map(|item| {
            match serde_json::from_value::<ListingDto>(item.clone())
                .map_err(RateError::from)
                .and_then(P2PListing::try_from)
            {
                Ok(listing) => Some(listing),
                Err(e) => {
                    tracing::debug!("Skipping malformed P2P listing: {}", e);
                    None
                }
            }
        })
        .collect();

    Ok(listings)
}

/// 最低價，只看非推廣且餘額大於零的掛單
///
/// 過濾後為空時回傳 None，不退回未過濾的最低價。
pub fn select_best_price(listings: &[P2PListing]) -> Option<f64> {
    listings
        .iter()
        .filter(|listing| listing.is_eligible())
        .map(|listing| listing.price)
        .fold(None, |best: Option<f64>, price| match best {
            Some(current) if current <= price => Some(current),
            _ => Some(price),
        })
}

pub struct P2PSelector {
    query: P2PQuery,
    fetcher: Arc<dyn HttpFetcher>,
    cache: Arc<TtlCache<CachedValue>>,
    ttl: Duration,
}

impl P2PSelector {
    pub fn new(
        query: P2PQuery,
        fetcher: Arc<dyn HttpFetcher>,
        cache: Arc<TtlCache<CachedValue>>,
        ttl: Duration,
    ) -> Self {
        Self {
            query,
            fetcher,
            cache,
            ttl,
        }
    }

    pub async fn resolve(&self) -> Resolution<f64> {
        if let Some(CachedValue::Rate(price)) = self.cache.get(P2P_CACHE_KEY) {
            tracing::debug!("💾 P2P price served from cache: {}", price);
            return Resolution::Available(price);
        }

        match self.fetch_best_price().await {
            Ok(price) => {
                tracing::info!(
                    "✅ P2P best {} {}/{} price: {}",
                    self.query.trade_type,
                    self.query.asset,
                    self.query.fiat,
                    price
                );
                self.cache
                    .set(P2P_CACHE_KEY, CachedValue::Rate(price), self.ttl);
                Resolution::Available(price)
            }
            Err(e) => {
                tracing::warn!("❌ P2P price unavailable ({:?}): {}", e.category(), e);
                Resolution::Unavailable
            }
        }
    }

    async fn fetch_best_price(&self) -> Result<f64> {
        let response = self
            .fetcher
            .post_json(&self.query.endpoint, &self.query.payload())
            .await?;

        let listings = parse_listings(&response)?;
        if listings.is_empty() {
            return Err(RateError::no_data("listing source returned no listings"));
        }

        select_best_price(&listings).ok_or_else(|| {
            RateError::no_data(format!(
                "all {} listings are promoted or have no surplus",
                listings.len()
            ))
        })
    }
}
