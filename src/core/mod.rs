pub mod banks;
pub mod cache;
pub mod clock;
pub mod dedup;
pub mod numeric;
pub mod official;
pub mod p2p;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{BankRates, CachedValue, Resolution};
pub use crate::domain::ports::{Clock, Extractor, HttpFetcher};
pub use crate::utils::error::Result;
