use crate::core::cache::TtlCache;
use crate::core::numeric::{ensure_plausible_rate, parse_locale_number};
use crate::domain::model::{BankRateRow, BankRates, CachedValue, Resolution};
use crate::domain::ports::HttpFetcher;
use crate::utils::error::{RateError, Result};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

pub const BANKS_CACHE_KEY: &str = "bancos";
pub const DEFAULT_BANKS_URL: &str = "https://www.bcv.org.ve/tasas-informativas-sistema-bancario";

/// 牌價表的欄位位置
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub row_selector: String,
    pub date_column: usize,
    pub bank_column: usize,
    pub buy_column: usize,
    pub sell_column: usize,
    pub date_formats: Vec<String>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            row_selector: "table tbody tr".to_string(),
            date_column: 0,
            bank_column: 1,
            buy_column: 2,
            sell_column: 3,
            date_formats: vec![
                "%d-%m-%Y".to_string(),
                "%d/%m/%Y".to_string(),
                "%Y-%m-%d".to_string(),
            ],
        }
    }
}

impl TableLayout {
    fn min_cells(&self) -> usize {
        [
            self.date_column,
            self.bank_column,
            self.buy_column,
            self.sell_column,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// 預先編譯好的列與儲存格選擇器
#[derive(Debug, Clone)]
pub struct TableSelectors {
    row: Selector,
    cell: Selector,
}

impl TableSelectors {
    pub fn new(layout: &TableLayout) -> Result<Self> {
        Ok(Self {
            row: parse_selector("banks.row_selector", &layout.row_selector)?,
            cell: parse_selector("banks.cell_selector", "td")?,
        })
    }
}

fn parse_selector(field: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| RateError::ConfigValidationError {
        field: field.to_string(),
        message: format!("{:?}", e),
    })
}

pub fn parse_date(raw: &str, formats: &[String]) -> Result<NaiveDate> {
    let raw = raw.trim();
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| RateError::parse(format!("unrecognized date {:?}", raw)))
}

fn parse_row(cells: &[String], layout: &TableLayout) -> Result<BankRateRow> {
    if cells.len() < layout.min_cells() {
        return Err(RateError::parse(format!(
            "expected at least {} cells, got {}",
            layout.min_cells(),
            cells.len()
        )));
    }

    let bank_name = cells[layout.bank_column]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if bank_name.is_empty() {
        return Err(RateError::parse("empty bank name"));
    }

    Ok(BankRateRow {
        date: parse_date(&cells[layout.date_column], &layout.date_formats)?,
        bank_name,
        buy_rate: ensure_plausible_rate(parse_locale_number(&cells[layout.buy_column])?)?,
        sell_rate: ensure_plausible_rate(parse_locale_number(&cells[layout.sell_column])?)?,
    })
}

/// 解析所有資料列，無法解析的列（表頭、格式錯誤）直接略過
pub fn parse_rows(html: &str, selectors: &TableSelectors, layout: &TableLayout) -> Vec<BankRateRow> {
    let document = Html::parse_document(html);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for tr in document.select(&selectors.row) {
        let cells: Vec<String> = tr
            .select(&selectors.cell)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        match parse_row(&cells, layout) {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping bank row {:?}: {}", cells, e);
            }
        }
    }

    if skipped > 0 {
        tracing::debug!("Parsed {} bank rows, skipped {}", rows.len(), skipped);
    }
    rows
}

/// 每家銀行只保留日期最新的一列；同日期保留先出現者
pub fn latest_per_bank(rows: Vec<BankRateRow>) -> Option<BankRates> {
    let mut latest: HashMap<String, BankRateRow> = HashMap::new();
    for row in rows {
        match latest.get(&row.bank_name) {
            Some(kept) if kept.date >= row.date => {}
            _ => {
                latest.insert(row.bank_name.clone(), row);
            }
        }
    }

    let as_of = latest.values().map(|row| row.date).max()?;
    let mut buy_by_bank = BTreeMap::new();
    let mut sell_by_bank = BTreeMap::new();
    for (bank, row) in latest {
        buy_by_bank.insert(bank.clone(), row.buy_rate);
        sell_by_bank.insert(bank, row.sell_rate);
    }

    Some(BankRates {
        buy_by_bank,
        sell_by_bank,
        as_of,
    })
}

pub struct BankTableAggregator {
    url: String,
    layout: TableLayout,
    selectors: TableSelectors,
    fetcher: Arc<dyn HttpFetcher>,
    cache: Arc<TtlCache<CachedValue>>,
    ttl: Duration,
}

impl BankTableAggregator {
    pub fn new(
        url: String,
        layout: TableLayout,
        fetcher: Arc<dyn HttpFetcher>,
        cache: Arc<TtlCache<CachedValue>>,
        ttl: Duration,
    ) -> Result<Self> {
        let selectors = TableSelectors::new(&layout)?;
        Ok(Self {
            url,
            layout,
            selectors,
            fetcher,
            cache,
            ttl,
        })
    }

    pub async fn resolve(&self) -> Resolution<BankRates> {
        if let Some(CachedValue::Banks(rates)) = self.cache.get(BANKS_CACHE_KEY) {
            tracing::debug!("💾 Bank rates served from cache (as of {})", rates.as_of);
            return Resolution::Available(rates);
        }

        match self.fetch_rates().await {
            Ok(rates) => {
                tracing::info!(
                    "✅ Bank rates for {} banks as of {}",
                    rates.buy_by_bank.len(),
                    rates.as_of
                );
                self.cache
                    .set(BANKS_CACHE_KEY, CachedValue::Banks(rates.clone()), self.ttl);
                Resolution::Available(rates)
            }
            Err(e) => {
                tracing::warn!("❌ Bank rates unavailable ({:?}): {}", e.category(), e);
                Resolution::Unavailable
            }
        }
    }

    async fn fetch_rates(&self) -> Result<BankRates> {
        let html = self.fetcher.get_text(&self.url).await?;
        let rows = parse_rows(&html, &self.selectors, &self.layout);
        latest_per_bank(rows).ok_or_else(|| RateError::no_data("no bank row could be parsed"))
    }
}
