pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

pub use toml_config::RatesConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "tasa-ve")]
#[command(about = "Tasas de cambio del bolívar: oficial BCV, P2P y mesas bancarias")]
pub struct CliConfig {
    /// Texto del comando: oficial, p2p / paralelo, bancos / mesas
    #[arg(default_value = "ayuda")]
    pub command: Vec<String>,

    /// Path to TOML configuration file (built-in sources when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override [http].timeout_seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Read `id<TAB>texto` lines from stdin; repeated ids are skipped
    #[arg(long)]
    pub stdin: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn command_text(&self) -> String {
        self.command.join(" ")
    }

    /// 載入設定檔並套用命令列覆蓋
    pub fn load_rates_config(&self) -> crate::utils::error::Result<RatesConfig> {
        let mut config = match &self.config {
            Some(path) => RatesConfig::from_file(path)?,
            None => RatesConfig::default(),
        };
        if let Some(timeout) = self.timeout {
            config.http.timeout_seconds = timeout;
        }
        Ok(config)
    }
}
