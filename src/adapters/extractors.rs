//! 官方匯率來源的擷取規則。
//!
//! 每個來源一個規則，彼此獨立，頁面改版時只需調整對應的規則。

use crate::core::numeric::parse_locale_number;
use crate::domain::ports::Extractor;
use crate::utils::error::{RateError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// 至少含一個分隔符號的數字，例如 `36,12`、`106.862,00`
const NUMBER_PATTERN: &str = r"\d+(?:[.,]\d+)+";

pub const DEFAULT_KEYWORD_WINDOW: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractorConfig {
    /// 關鍵字之後固定字元範圍內的第一個數字
    Keyword {
        pattern: String,
        #[serde(default = "default_window")]
        window: usize,
    },
    /// 第一個包含關鍵字的表格列
    TableRow {
        #[serde(default = "default_row_selector")]
        row_selector: String,
        keyword: String,
    },
    /// CSS 選擇器指到的元素文字
    Selector { selector: String },
    /// 依序套用多個規則，取第一個有結果者；頁面只下載一次
    FirstOf { extractors: Vec<ExtractorConfig> },
}

fn default_window() -> usize {
    DEFAULT_KEYWORD_WINDOW
}

fn default_row_selector() -> String {
    "table tbody tr".to_string()
}

impl ExtractorConfig {
    pub fn build(&self) -> Result<Box<dyn Extractor>> {
        Ok(match self {
            ExtractorConfig::Keyword { pattern, window } => {
                Box::new(KeywordNumberExtractor::new(pattern, *window)?)
            }
            ExtractorConfig::TableRow {
                row_selector,
                keyword,
            } => Box::new(TableRowExtractor::new(row_selector, keyword)?),
            ExtractorConfig::Selector { selector } => Box::new(SelectorExtractor::new(selector)?),
            ExtractorConfig::FirstOf { extractors } => Box::new(FirstOfExtractor::new(
                extractors
                    .iter()
                    .map(ExtractorConfig::build)
                    .collect::<Result<Vec<_>>>()?,
            )?),
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| RateError::ConfigValidationError {
        field: "selector".to_string(),
        message: format!("{:?}: {:?}", selector, e),
    })
}

fn number_regex() -> Regex {
    // 常數樣式，編譯不會失敗
    Regex::new(NUMBER_PATTERN).expect("numeric pattern is valid")
}

/// 從文字中找出第一個可解析的數字
fn first_number(re: &Regex, text: &str) -> Option<f64> {
    re.find_iter(text)
        .find_map(|m| parse_locale_number(m.as_str()).ok())
}

pub struct KeywordNumberExtractor {
    keyword: String,
    window: usize,
    pattern: Regex,
    tags: Regex,
}

impl KeywordNumberExtractor {
    pub fn new(keyword: &str, window: usize) -> Result<Self> {
        let source = format!(r"(?is)(?:{}).{{0,{}}}?({})", keyword, window, NUMBER_PATTERN);
        let pattern = Regex::new(&source).map_err(|e| RateError::ConfigValidationError {
            field: "extractor.pattern".to_string(),
            message: e.to_string(),
        })?;
        let tags = Regex::new(r"<[^>]*>").expect("tag pattern is valid");
        Ok(Self {
            keyword: keyword.to_string(),
            window,
            pattern,
            tags,
        })
    }
}

impl Extractor for KeywordNumberExtractor {
    fn describe(&self) -> String {
        format!("keyword /{}/ within {} chars", self.keyword, self.window)
    }

    fn extract(&self, body: &str) -> Option<f64> {
        // 先去掉標籤，否則 markup 會吃掉字元範圍
        let text = self.tags.replace_all(body, " ");
        self.pattern
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| parse_locale_number(m.as_str()).ok())
    }
}

pub struct TableRowExtractor {
    row_selector: Selector,
    row_selector_src: String,
    keyword: String,
    number: Regex,
}

impl TableRowExtractor {
    pub fn new(row_selector: &str, keyword: &str) -> Result<Self> {
        Ok(Self {
            row_selector: parse_selector(row_selector)?,
            row_selector_src: row_selector.to_string(),
            keyword: keyword.to_lowercase(),
            number: number_regex(),
        })
    }
}

impl Extractor for TableRowExtractor {
    fn describe(&self) -> String {
        format!("first '{}' row containing {:?}", self.row_selector_src, self.keyword)
    }

    fn extract(&self, body: &str) -> Option<f64> {
        let document = Html::parse_document(body);
        document
            .select(&self.row_selector)
            .map(|row| row.text().collect::<Vec<_>>().join(" ").to_lowercase())
            .filter(|text| text.contains(&self.keyword))
            .find_map(|text| first_number(&self.number, &text))
    }
}

pub struct SelectorExtractor {
    selector: Selector,
    selector_src: String,
    number: Regex,
}

impl SelectorExtractor {
    pub fn new(selector: &str) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(selector)?,
            selector_src: selector.to_string(),
            number: number_regex(),
        })
    }
}

impl Extractor for SelectorExtractor {
    fn describe(&self) -> String {
        format!("selector '{}'", self.selector_src)
    }

    fn extract(&self, body: &str) -> Option<f64> {
        let document = Html::parse_document(body);
        document
            .select(&self.selector)
            .map(|el| el.text().collect::<String>())
            .find_map(|text| first_number(&self.number, &text))
    }
}

pub struct FirstOfExtractor {
    extractors: Vec<Box<dyn Extractor>>,
}

impl FirstOfExtractor {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Result<Self> {
        if extractors.is_empty() {
            return Err(RateError::MissingConfigError {
                field: "extractor.extractors".to_string(),
            });
        }
        Ok(Self { extractors })
    }
}

impl Extractor for FirstOfExtractor {
    fn describe(&self) -> String {
        self.extractors
            .iter()
            .map(|extractor| extractor.describe())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn extract(&self, body: &str) -> Option<f64> {
        self.extractors
            .iter()
            .find_map(|extractor| extractor.extract(body))
    }
}
