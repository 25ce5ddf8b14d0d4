use anyhow::Context;
use clap::Parser;
use tasa_ve::utils::{error::ErrorSeverity, logger, validation::Validate};
use tasa_ve::{CliConfig, Command, RateService, Resolution};

/// 終端機顯示用：兩位小數、逗號小數點
fn bs(num: f64) -> String {
    format!("{:.2}", num).replace('.', ",")
}

async fn reply(service: &RateService, command: Command) -> String {
    match command {
        Command::Official => match service.resolve_official().await {
            Resolution::Available(rate) => format!("📊 Oficial BCV: {} Bs/USD", bs(rate)),
            Resolution::Unavailable => "BCV fuera de línea".to_string(),
        },
        Command::P2P => match service.resolve_p2p().await {
            Resolution::Available(rate) => format!("🤝 Paralelo Binance: {} Bs/USDT", bs(rate)),
            Resolution::Unavailable => "Binance fuera de línea".to_string(),
        },
        Command::Banks => match service.resolve_banks().await {
            Resolution::Available(rates) => {
                let mut lines = vec![format!("🏦 Mesas bancarias ({})", rates.as_of.format("%d-%m-%Y"))];
                for (bank, buy) in &rates.buy_by_bank {
                    let sell = rates.sell_by_bank.get(bank).copied().unwrap_or(*buy);
                    lines.push(format!("{}: {} / {}", bank, bs(*buy), bs(sell)));
                }
                lines.join("\n")
            }
            Resolution::Unavailable => "BCV aún no publica las tasas bancarias de hoy.".to_string(),
        },
        Command::Help => "Comandos:\n\
             • oficial – tasa BCV\n\
             • p2p     – mejor vendedor Binance\n\
             • bancos  – mesas bancarias"
            .to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let config = match cli.load_rates_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {} (Category: {:?})", e, e.category());
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            let exit_code = match e.severity() {
                ErrorSeverity::Critical => 3,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    };

    let service = RateService::from_config(&config).context("building rate service")?;

    if cli.stdin {
        return serve_stdin(&service).await;
    }

    let command = Command::from_text(&cli.command_text());
    tracing::info!("🚀 Handling command {:?}", command);
    println!("{}", reply(&service, command).await);

    Ok(())
}

/// 每行 `id<TAB>texto`；沒有 id 的行不做去重
async fn serve_stdin(service: &RateService) -> anyhow::Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    tracing::info!("📥 Reading messages from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let (id, text) = match line.split_once('\t') {
            Some((id, text)) => (Some(id.trim()), text),
            None => (None, line.as_str()),
        };

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if service.dedup_check(id) {
                continue;
            }
        }

        let command = Command::from_text(text);
        tracing::debug!("🚀 Handling command {:?}", command);
        println!("{}", reply(service, command).await);
    }
    Ok(())
}
