// Adapters layer: concrete implementations for external systems (http, page extraction rules).

pub mod extractors;
pub mod http;

pub use extractors::{
    ExtractorConfig, FirstOfExtractor, KeywordNumberExtractor, SelectorExtractor,
    TableRowExtractor,
};
pub use http::{HttpSettings, ReqwestFetcher};
