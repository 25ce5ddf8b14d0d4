use crate::core::cache::TtlCache;
use crate::core::numeric::ensure_plausible_rate;
use crate::domain::model::{CachedValue, Resolution};
use crate::domain::ports::{Extractor, HttpFetcher};
use crate::utils::error::{RateError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const OFFICIAL_CACHE_KEY: &str = "oficial";

/// 官方匯率來源，priority 越小越先嘗試
pub struct RateSource {
    pub name: String,
    pub url: String,
    pub extractor: Box<dyn Extractor>,
    pub priority: u32,
}

/// 依序嘗試各來源，第一個成功即停止
///
/// 排在後面的來源即使更權威，只要前面已成功就不會被查詢。
/// 同一次查詢中，相同 URL 只下載一次。
pub struct OfficialRateResolver {
    sources: Vec<RateSource>,
    fetcher: Arc<dyn HttpFetcher>,
    cache: Arc<TtlCache<CachedValue>>,
    ttl: Duration,
}

impl OfficialRateResolver {
    pub fn new(
        mut sources: Vec<RateSource>,
        fetcher: Arc<dyn HttpFetcher>,
        cache: Arc<TtlCache<CachedValue>>,
        ttl: Duration,
    ) -> Self {
        // 穩定排序：同優先權保留設定檔中的順序
        sources.sort_by_key(|source| source.priority);
        Self {
            sources,
            fetcher,
            cache,
            ttl,
        }
    }

    pub fn sources(&self) -> &[RateSource] {
        &self.sources
    }

    pub async fn resolve(&self) -> Resolution<f64> {
        if let Some(CachedValue::Rate(rate)) = self.cache.get(OFFICIAL_CACHE_KEY) {
            tracing::debug!("💾 Official rate served from cache: {}", rate);
            return Resolution::Available(rate);
        }

        // None 表示該 URL 這一輪已經失敗過
        let mut pages: HashMap<&str, Option<String>> = HashMap::new();
        for source in &self.sources {
            if !pages.contains_key(source.url.as_str()) {
                match self.fetcher.get_text(&source.url).await {
                    Ok(body) => {
                        pages.insert(source.url.as_str(), Some(body));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Official source '{}' failed ({:?}): {}",
                            source.name,
                            e.category(),
                            e
                        );
                        pages.insert(source.url.as_str(), None);
                        continue;
                    }
                }
            }

            let Some(body) = pages.get(source.url.as_str()).and_then(|page| page.as_deref())
            else {
                tracing::debug!(
                    "⏭️ Skipping '{}': {} already failed in this round",
                    source.name,
                    source.url
                );
                continue;
            };

            match extract_rate(source, body) {
                Ok(rate) => {
                    tracing::info!("✅ Official rate {} from '{}'", rate, source.name);
                    self.cache
                        .set(OFFICIAL_CACHE_KEY, CachedValue::Rate(rate), self.ttl);
                    return Resolution::Available(rate);
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Official source '{}' failed ({:?}): {}",
                        source.name,
                        e.category(),
                        e
                    );
                }
            }
        }

        tracing::warn!(
            "❌ Official rate unavailable: all {} sources failed",
            self.sources.len()
        );
        Resolution::Unavailable
    }
}

fn extract_rate(source: &RateSource, body: &str) -> Result<f64> {
    let rate = source.extractor.extract(body).ok_or_else(|| {
        RateError::parse(format!(
            "no match for {} in {} bytes",
            source.extractor.describe(),
            body.len()
        ))
    })?;
    ensure_plausible_rate(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::extractors::KeywordNumberExtractor;
    use crate::core::cache::DEFAULT_TTL;
    use crate::core::clock::ManualClock;
    use crate::core::testing::{FakeFetcher, FakeResponse};

    fn source(name: &str, priority: u32) -> RateSource {
        RateSource {
            name: name.to_string(),
            url: format!("https://{}.test/", name),
            extractor: Box::new(KeywordNumberExtractor::new("usd", 40).unwrap()),
            priority,
        }
    }

    fn source_at(name: &str, url: &str, keyword: &str, priority: u32) -> RateSource {
        RateSource {
            name: name.to_string(),
            url: url.to_string(),
            extractor: Box::new(KeywordNumberExtractor::new(keyword, 40).unwrap()),
            priority,
        }
    }

    fn resolver(
        sources: Vec<RateSource>,
        fetcher: Arc<FakeFetcher>,
    ) -> (OfficialRateResolver, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(TtlCache::with_clock(DEFAULT_TTL, clock.clone()));
        (
            OfficialRateResolver::new(sources, fetcher, cache, DEFAULT_TTL),
            clock,
        )
    }

    #[tokio::test]
    async fn test_cascade_stops_at_first_success() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://one.test/", FakeResponse::Timeout)
                .with(
                    "https://two.test/",
                    FakeResponse::Text("<p>sitio en mantenimiento</p>".to_string()),
                )
                .with(
                    "https://three.test/",
                    FakeResponse::Text("<td>USD</td><td>106,86</td>".to_string()),
                )
                .with(
                    "https://four.test/",
                    FakeResponse::Text("USD 999,99".to_string()),
                ),
        );
        let sources = vec![
            source("one", 1),
            source("two", 2),
            source("three", 3),
            source("four", 4),
        ];
        let (resolver, _clock) = resolver(sources, fetcher.clone());

        assert_eq!(resolver.resolve().await, Resolution::Available(106.86));
        assert_eq!(
            fetcher.calls(),
            vec![
                "https://one.test/",
                "https://two.test/",
                "https://three.test/"
            ]
        );
    }

    #[tokio::test]
    async fn test_sources_ordered_by_priority() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://late.test/", FakeResponse::Text("USD 1,00".to_string()))
                .with("https://early.test/", FakeResponse::Text("USD 2,00".to_string())),
        );
        let (resolver, _clock) =
            resolver(vec![source("late", 10), source("early", 1)], fetcher.clone());

        assert_eq!(resolver.resolve().await, Resolution::Available(2.0));
        assert_eq!(fetcher.calls(), vec!["https://early.test/"]);
    }

    #[tokio::test]
    async fn test_all_sources_fail_is_unavailable() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://one.test/", FakeResponse::Timeout)
                .with("https://two.test/", FakeResponse::Text("EUR 39,81".to_string())),
        );
        let (resolver, _clock) = resolver(vec![source("one", 1), source("two", 2)], fetcher);

        assert_eq!(resolver.resolve().await, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let fetcher = Arc::new(FakeFetcher::new());
        let (resolver, _clock) = resolver(vec![source("one", 1)], fetcher.clone());

        assert_eq!(resolver.resolve().await, Resolution::Unavailable);
        assert_eq!(resolver.resolve().await, Resolution::Unavailable);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_within_ttl_then_refreshed() {
        let fetcher = Arc::new(
            FakeFetcher::new().with("https://one.test/", FakeResponse::Text("USD 36,50".to_string())),
        );
        let (resolver, clock) = resolver(vec![source("one", 1)], fetcher.clone());

        assert_eq!(resolver.resolve().await, Resolution::Available(36.5));
        assert_eq!(resolver.resolve().await, Resolution::Available(36.5));
        assert_eq!(fetcher.calls().len(), 1);

        clock.advance(DEFAULT_TTL);
        assert_eq!(resolver.resolve().await, Resolution::Available(36.5));
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_rate_rejected() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://one.test/", FakeResponse::Text("USD 0,00".to_string()))
                .with("https://two.test/", FakeResponse::Text("USD 36,50".to_string())),
        );
        let (resolver, _clock) = resolver(vec![source("one", 1), source("two", 2)], fetcher);

        assert_eq!(resolver.resolve().await, Resolution::Available(36.5));
    }

    #[tokio::test]
    async fn test_shared_url_fetched_once() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with(
                    "https://bcv.test/",
                    FakeResponse::Text("<p>Tipo de cambio: Dólar 36,50</p>".to_string()),
                )
                .with("https://mirror.test/", FakeResponse::Text("USD 1,00".to_string())),
        );
        let sources = vec![
            source_at("bcv-usd", "https://bcv.test/", "usd", 1),
            source_at("bcv-dolar", "https://bcv.test/", "dólar", 2),
            source_at("mirror", "https://mirror.test/", "usd", 3),
        ];
        let (resolver, _clock) = resolver(sources, fetcher.clone());

        assert_eq!(resolver.resolve().await, Resolution::Available(36.5));
        assert_eq!(fetcher.calls(), vec!["https://bcv.test/"]);
    }

    #[tokio::test]
    async fn test_failed_url_not_retried_in_same_round() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://bcv.test/", FakeResponse::Timeout)
                .with("https://mirror.test/", FakeResponse::Text("USD 36,40".to_string())),
        );
        let sources = vec![
            source_at("bcv-usd", "https://bcv.test/", "usd", 1),
            source_at("bcv-dolar", "https://bcv.test/", "dólar", 2),
            source_at("mirror", "https://mirror.test/", "usd", 3),
        ];
        let (resolver, _clock) = resolver(sources, fetcher.clone());

        assert_eq!(resolver.resolve().await, Resolution::Available(36.4));
        assert_eq!(
            fetcher.calls(),
            vec!["https://bcv.test/", "https://mirror.test/"]
        );
    }
}
