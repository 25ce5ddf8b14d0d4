pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::RatesConfig;
pub use crate::core::{
    cache::TtlCache,
    clock::{ManualClock, SystemClock},
    dedup::DedupWindow,
    numeric::parse_locale_number,
    service::RateService,
};
pub use domain::model::{BankRates, Command, Resolution};
pub use utils::error::{RateError, Result};
