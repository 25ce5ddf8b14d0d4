use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 解析器對外的結果：有值，或該類別暫時無法提供
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution<T> {
    Available(T),
    Unavailable,
}

impl<T> Resolution<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Resolution::Available(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Resolution::Available(value) => Some(value),
            Resolution::Unavailable => None,
        }
    }
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Resolution::Available(v),
            None => Resolution::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct P2PListing {
    pub price: f64,
    pub is_promoted: bool,
    pub surplus: f64,
}

impl P2PListing {
    /// 非推廣且仍有可交易餘額
    pub fn is_eligible(&self) -> bool {
        !self.is_promoted && self.surplus > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BankRateRow {
    pub date: NaiveDate,
    pub bank_name: String,
    pub buy_rate: f64,
    pub sell_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRates {
    pub buy_by_bank: BTreeMap<String, f64>,
    pub sell_by_bank: BTreeMap<String, f64>,
    /// 僅作顯示用的最新日期
    pub as_of: NaiveDate,
}

/// 程序內共用快取裡存放的值
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Rate(f64),
    Banks(BankRates),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Official,
    P2P,
    Banks,
    Help,
}

impl Command {
    /// 依關鍵字判斷指令，順序與優先權：oficial > p2p/paralelo > bancos/mesas
    pub fn from_text(text: &str) -> Self {
        let text = text.trim().to_lowercase();
        if text.contains("oficial") {
            Command::Official
        } else if text.contains("p2p") || text.contains("paralelo") {
            Command::P2P
        } else if text.contains("bancos") || text.contains("mesas") {
            Command::Banks
        } else {
            Command::Help
        }
    }
}
