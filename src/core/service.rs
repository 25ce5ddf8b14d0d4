use crate::adapters::http::ReqwestFetcher;
use crate::config::RatesConfig;
use crate::core::banks::BankTableAggregator;
use crate::core::cache::TtlCache;
use crate::core::clock::SystemClock;
use crate::core::dedup::DedupWindow;
use crate::core::official::{OfficialRateResolver, RateSource};
use crate::core::p2p::P2PSelector;
use crate::domain::model::{BankRates, CachedValue, Resolution};
use crate::domain::ports::{Clock, HttpFetcher};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;

/// 對外的入口：三個解析器共用同一份快取，外加去重視窗
pub struct RateService {
    official: OfficialRateResolver,
    p2p: P2PSelector,
    banks: BankTableAggregator,
    dedup: DedupWindow,
    cache: Arc<TtlCache<CachedValue>>,
}

impl RateService {
    pub fn from_config(config: &RatesConfig) -> Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::new(&config.http_settings())?);
        Self::with_parts(config, fetcher, Arc::new(SystemClock))
    }

    /// 可注入 HTTP 與時鐘，供測試或其他傳輸層使用
    pub fn with_parts(
        config: &RatesConfig,
        fetcher: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(TtlCache::with_clock(config.default_ttl(), clock));

        let sources = config
            .official
            .sources
            .iter()
            .map(|source| -> Result<RateSource> {
                Ok(RateSource {
                    name: source.name.clone(),
                    url: source.url.clone(),
                    extractor: source.extractor.build()?,
                    priority: source.priority,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let official = OfficialRateResolver::new(
            sources,
            fetcher.clone(),
            cache.clone(),
            config.default_ttl(),
        );
        let p2p = P2PSelector::new(
            config.p2p_query(),
            fetcher.clone(),
            cache.clone(),
            config.p2p_ttl(),
        );
        let banks = BankTableAggregator::new(
            config.banks.url.clone(),
            config.table_layout(),
            fetcher,
            cache.clone(),
            config.default_ttl(),
        )?;

        tracing::debug!(
            "🔧 Rate service ready: {} official sources, dedup capacity {}",
            official.sources().len(),
            config.dedup.capacity
        );

        Ok(Self {
            official,
            p2p,
            banks,
            dedup: DedupWindow::new(config.dedup.capacity),
            cache,
        })
    }

    pub async fn resolve_official(&self) -> Resolution<f64> {
        self.official.resolve().await
    }

    pub async fn resolve_p2p(&self) -> Resolution<f64> {
        self.p2p.resolve().await
    }

    pub async fn resolve_banks(&self) -> Resolution<BankRates> {
        self.banks.resolve().await
    }

    /// true 表示這個 id 最近已處理過，呼叫端應略過
    pub fn dedup_check(&self, id: &str) -> bool {
        let duplicate = self.dedup.seen(id);
        if duplicate {
            tracing::debug!("🔁 Duplicate message {} skipped", id);
        }
        duplicate
    }

    pub fn cache(&self) -> &TtlCache<CachedValue> {
        &self.cache
    }
}
