use anyhow::Result;
use httpmock::prelude::*;
use std::time::{Duration, Instant};
use tasa_ve::{RateService, RatesConfig, Resolution};

const BANK_TABLE: &str = r#"
<table>
  <thead><tr><th>Fecha Valor</th><th>Banco</th><th>Compra</th><th>Venta</th></tr></thead>
  <tbody>
    <tr><td>01-01-2024</td><td>X</td><td>10,00</td><td>11,00</td></tr>
    <tr><td>03-01-2024</td><td>X</td><td>12,00</td><td>13,00</td></tr>
    <tr><td>02-01-2024</td><td>Y</td><td>5,00</td><td>6,00</td></tr>
    <tr><td>??</td><td>Z</td><td>1,00</td><td>1,00</td></tr>
  </tbody>
</table>
"#;

/// 以 mock server 的位址組出完整設定
fn config_for(server: &MockServer, official_sources: &str, timeout_seconds: u64) -> RatesConfig {
    let content = format!(
        r#"
[http]
timeout_seconds = {timeout}
accept_invalid_certs = false

{sources}

[p2p]
endpoint = "{p2p}"

[banks]
url = "{banks}"
"#,
        timeout = timeout_seconds,
        sources = official_sources,
        p2p = server.url("/bapi/c2c/v2/friendly/c2c/adv/search"),
        banks = server.url("/tasas-informativas-sistema-bancario"),
    );
    RatesConfig::from_toml_str(&content).unwrap()
}

fn keyword_source(name: &str, url: &str, priority: u32) -> String {
    format!(
        r#"
[[official.sources]]
name = "{}"
url = "{}"
priority = {}
extractor = {{ type = "keyword", pattern = "usd", window = 40 }}
"#,
        name, url, priority
    )
}

#[tokio::test]
async fn test_official_cascade_over_http() -> Result<()> {
    let server = MockServer::start();

    let maintenance = server.mock(|when, then| {
        when.method(GET).path("/mantenimiento");
        then.status(200).body("<h1>Sitio en mantenimiento</h1>");
    });
    let home = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200)
            .body(r#"<div id="dolar"><span>USD</span><strong> 106.862,00 </strong></div>"#);
    });
    let mirror = server.mock(|when, then| {
        when.method(GET).path("/espejo");
        then.status(200).body("USD 1,00");
    });

    // 第一個來源連線被拒（網路錯誤）
    let sources = [
        keyword_source("caido", "http://127.0.0.1:1/", 1),
        keyword_source("mantenimiento", &server.url("/mantenimiento"), 2),
        keyword_source("bcv", &server.url("/"), 3),
        keyword_source("espejo", &server.url("/espejo"), 4),
    ]
    .join("\n");
    let service = RateService::from_config(&config_for(&server, &sources, 5))?;

    assert_eq!(service.resolve_official().await, Resolution::Available(106862.0));
    maintenance.assert_hits(1);
    home.assert_hits(1);
    mirror.assert_hits(0);

    // TTL 內不再發出請求
    assert_eq!(service.resolve_official().await, Resolution::Available(106862.0));
    home.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_official_all_sources_fail() -> Result<()> {
    let server = MockServer::start();
    let broken = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(502);
    });

    let sources = keyword_source("bcv", &server.url("/"), 1);
    let service = RateService::from_config(&config_for(&server, &sources, 5))?;

    assert_eq!(service.resolve_official().await, Resolution::Unavailable);
    broken.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_p2p_best_price_over_http() -> Result<()> {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method(POST)
            .path("/bapi/c2c/v2/friendly/c2c/adv/search")
            .json_body_partial(r#"{"asset": "USDT", "fiat": "VES", "tradeType": "SELL", "rows": 20}"#);
        then.status(200).json_body(serde_json::json!({
            "code": "000000",
            "data": [
                {"adv": {"price": "10.00", "surplusAmount": "5", "isPromoted": true}},
                {"adv": {"price": "12.00", "surplusAmount": "3"}},
                {"adv": {"price": "11.00", "surplusAmount": "0"}}
            ]
        }));
    });

    let sources = keyword_source("bcv", &server.url("/"), 1);
    let service = RateService::from_config(&config_for(&server, &sources, 5))?;

    assert_eq!(service.resolve_p2p().await, Resolution::Available(12.0));
    assert_eq!(service.resolve_p2p().await, Resolution::Available(12.0));
    search.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_p2p_only_promoted_listings_is_unavailable() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/bapi/c2c/v2/friendly/c2c/adv/search");
        then.status(200).json_body(serde_json::json!({
            "data": [
                {"adv": {"price": "10.00", "surplusAmount": "5", "isPromoted": true}},
                {"adv": {"price": "9.50", "surplusAmount": "5", "privilegeType": 8}}
            ]
        }));
    });

    let sources = keyword_source("bcv", &server.url("/"), 1);
    let service = RateService::from_config(&config_for(&server, &sources, 5))?;

    assert_eq!(service.resolve_p2p().await, Resolution::Unavailable);
    Ok(())
}

#[tokio::test]
async fn test_bank_table_over_http() -> Result<()> {
    let server = MockServer::start();
    let table = server.mock(|when, then| {
        when.method(GET).path("/tasas-informativas-sistema-bancario");
        then.status(200).body(BANK_TABLE);
    });

    let sources = keyword_source("bcv", &server.url("/"), 1);
    let service = RateService::from_config(&config_for(&server, &sources, 5))?;

    let rates = match service.resolve_banks().await {
        Resolution::Available(rates) => rates,
        Resolution::Unavailable => panic!("bank rates should be available"),
    };
    assert_eq!(rates.buy_by_bank.get("X"), Some(&12.0));
    assert_eq!(rates.buy_by_bank.get("Y"), Some(&5.0));
    assert_eq!(rates.sell_by_bank.get("X"), Some(&13.0));
    assert_eq!(rates.sell_by_bank.get("Y"), Some(&6.0));
    assert!(!rates.buy_by_bank.contains_key("Z"));
    assert_eq!(rates.as_of.to_string(), "2024-01-03");

    service.resolve_banks().await;
    table.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_slow_source_times_out() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/bapi/c2c/v2/friendly/c2c/adv/search");
        then.status(200)
            .json_body(serde_json::json!({"data": []}))
            .delay(Duration::from_secs(3));
    });

    let sources = keyword_source("bcv", &server.url("/"), 1);
    let service = RateService::from_config(&config_for(&server, &sources, 1))?;

    let started = Instant::now();
    assert_eq!(service.resolve_p2p().await, Resolution::Unavailable);
    assert!(started.elapsed() < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_config_from_file() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let config_path = temp_dir.path().join("tasa-ve.toml");
    tokio::fs::write(
        &config_path,
        r#"
[cache]
default_ttl_seconds = 600
p2p_ttl_seconds = 60

[dedup]
capacity = 3
"#,
    )
    .await?;

    let config = RatesConfig::from_file(&config_path)?;
    assert_eq!(config.default_ttl(), Duration::from_secs(600));
    assert_eq!(config.p2p_ttl(), Duration::from_secs(60));

    let service = RateService::from_config(&config)?;
    for id in ["a", "b", "c", "d"] {
        assert!(!service.dedup_check(id));
    }
    assert!(service.dedup_check("b"));
    assert!(!service.dedup_check("a"));
    Ok(())
}
