use crate::adapters::extractors::ExtractorConfig;
use crate::adapters::http::HttpSettings;
use crate::core::banks::{TableLayout, DEFAULT_BANKS_URL};
use crate::core::p2p::{P2PQuery, DEFAULT_P2P_ENDPOINT};
use crate::utils::error::{RateError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub official: OfficialConfig,
    pub p2p: P2PConfig,
    pub banks: BanksConfig,
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub accept_invalid_certs: bool,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            accept_invalid_certs: true,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_seconds: u64,
    pub p2p_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 15 * 60,
            p2p_ttl_seconds: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficialConfig {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub priority: u32,
    pub extractor: ExtractorConfig,
}

impl Default for OfficialConfig {
    fn default() -> Self {
        Self {
            // 首頁改版過數次，三種規則對同一份頁面依序嘗試
            sources: vec![SourceConfig {
                name: "bcv".to_string(),
                url: "https://www.bcv.org.ve/".to_string(),
                priority: 1,
                extractor: ExtractorConfig::FirstOf {
                    extractors: vec![
                        ExtractorConfig::Selector {
                            selector: "#dolar strong".to_string(),
                        },
                        ExtractorConfig::TableRow {
                            row_selector: "table tbody tr".to_string(),
                            keyword: "usd".to_string(),
                        },
                        ExtractorConfig::Keyword {
                            pattern: r"\busd\b|d[oó]lar".to_string(),
                            window: 80,
                        },
                    ],
                },
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct P2PConfig {
    pub endpoint: String,
    pub asset: String,
    pub fiat: String,
    pub trade_type: String,
    pub rows: u32,
}

impl Default for P2PConfig {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BanksConfig {
    pub url: String,
    pub row_selector: String,
    pub date_column: usize,
    pub bank_column: usize,
    pub buy_column: usize,
    pub sell_column: usize,
    pub date_formats: Vec<String>,
}

impl Default for BanksConfig {
    fn default() -> Self {
        let layout = TableLayout::default();
        Self {
            url: DEFAULT_BANKS_URL.to_string(),
            row_selector: layout.row_selector,
            date_column: layout.date_column,
            bank_column: layout.bank_column,
            buy_column: layout.buy_column,
            sell_column: layout.sell_column,
            date_formats: layout.date_formats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl RatesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RateError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，未寫的區段使用預設值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RateError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BCV_URL})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn http_settings(&self) -> HttpSettings {
        let defaults = HttpSettings::default();
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_seconds),
            accept_invalid_certs: self.http.accept_invalid_certs,
            user_agent: self.http.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_seconds)
    }

    pub fn p2p_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.p2p_ttl_seconds)
    }

    pub fn p2p_query(&self) -> P2PQuery {
        P2PQuery {
            endpoint: self.p2p.endpoint.clone(),
            asset: self.p2p.asset.clone(),
            fiat: self.p2p.fiat.clone(),
            trade_type: self.p2p.trade_type.clone(),
            rows: self.p2p.rows,
        }
    }

    pub fn table_layout(&self) -> TableLayout {
        TableLayout {
            row_selector: self.banks.row_selector.clone(),
            date_column: self.banks.date_column,
            bank_column: self.banks.bank_column,
            buy_column: self.banks.buy_column,
            sell_column: self.banks.sell_column,
            date_formats: self.banks.date_formats.clone(),
        }
    }
}

impl Validate for RatesConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_range("http.timeout_seconds", self.http.timeout_seconds, 1, 120)?;
        validation::validate_positive_number(
            "cache.default_ttl_seconds",
            self.cache.default_ttl_seconds,
            1,
        )?;
        validation::validate_positive_number("cache.p2p_ttl_seconds", self.cache.p2p_ttl_seconds, 1)?;
        if self.cache.p2p_ttl_seconds > self.cache.default_ttl_seconds {
            return Err(RateError::InvalidConfigValueError {
                field: "cache.p2p_ttl_seconds".to_string(),
                value: self.cache.p2p_ttl_seconds.to_string(),
                reason: "P2P data is more volatile; its TTL cannot exceed the default TTL"
                    .to_string(),
            });
        }

        if self.official.sources.is_empty() {
            return Err(RateError::MissingConfigError {
                field: "official.sources".to_string(),
            });
        }
        for (index, source) in self.official.sources.iter().enumerate() {
            let field = format!("official.sources[{}]", index);
            validation::validate_non_empty_string(&format!("{}.name", field), &source.name)?;
            validation::validate_url(&format!("{}.url", field), &source.url)?;
            validate_extractor(&format!("{}.extractor", field), &source.extractor)?;
        }

        validation::validate_url("p2p.endpoint", &self.p2p.endpoint)?;
        validation::validate_non_empty_string("p2p.asset", &self.p2p.asset)?;
        validation::validate_non_empty_string("p2p.fiat", &self.p2p.fiat)?;
        validation::validate_range("p2p.rows", self.p2p.rows, 1, 20)?;

        validation::validate_url("banks.url", &self.banks.url)?;
        validation::validate_css_selector("banks.row_selector", &self.banks.row_selector)?;
        if self.banks.date_formats.is_empty() {
            return Err(RateError::MissingConfigError {
                field: "banks.date_formats".to_string(),
            });
        }

        validation::validate_positive_number("dedup.capacity", self.dedup.capacity as u64, 1)?;
        Ok(())
    }
}

fn validate_extractor(field: &str, extractor: &ExtractorConfig) -> Result<()> {
    match extractor {
        ExtractorConfig::Keyword { pattern, .. } => {
            validation::validate_regex(&format!("{}.pattern", field), pattern)
        }
        ExtractorConfig::TableRow {
            row_selector,
            keyword,
        } => {
            validation::validate_css_selector(&format!("{}.row_selector", field), row_selector)?;
            validation::validate_non_empty_string(&format!("{}.keyword", field), keyword)
        }
        ExtractorConfig::Selector { selector } => {
            validation::validate_css_selector(&format!("{}.selector", field), selector)
        }
        ExtractorConfig::FirstOf { extractors } => {
            if extractors.is_empty() {
                return Err(RateError::MissingConfigError {
                    field: format!("{}.extractors", field),
                });
            }
            for (index, nested) in extractors.iter().enumerate() {
                validate_extractor(&format!("{}.extractors[{}]", field, index), nested)?;
            }
            Ok(())
        }
    }
}
