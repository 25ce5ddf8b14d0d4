use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateError {
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Request to {url} timed out")]
    TimeoutError { url: String },

    #[error("Upstream {url} responded with HTTP {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("No usable data: {message}")]
    NoDataError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, RateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Parse,
    NoData,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RateError {
    pub fn parse(message: impl Into<String>) -> Self {
        RateError::ParseError {
            message: message.into(),
        }
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        RateError::NoDataError {
            message: message.into(),
        }
    }

    /// 將 reqwest 錯誤轉為分類明確的錯誤（逾時獨立出來）
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RateError::TimeoutError {
                url: url.to_string(),
            }
        } else {
            RateError::NetworkError(err)
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RateError::NetworkError(_)
            | RateError::TimeoutError { .. }
            | RateError::HttpStatusError { .. } => ErrorCategory::Network,
            RateError::ParseError { .. } | RateError::SerializationError(_) => {
                ErrorCategory::Parse
            }
            RateError::NoDataError { .. } => ErrorCategory::NoData,
            RateError::ConfigError { .. }
            | RateError::ConfigValidationError { .. }
            | RateError::InvalidConfigValueError { .. }
            | RateError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RateError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NoData => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Parse => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => "La fuente de datos no responde en este momento".to_string(),
            ErrorCategory::Parse => "La fuente de datos cambió de formato".to_string(),
            ErrorCategory::NoData => "La fuente aún no publica datos".to_string(),
            ErrorCategory::Configuration => format!("Configuración inválida: {}", self),
            ErrorCategory::System => format!("Error del sistema: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check connectivity or raise [http].timeout_seconds",
            ErrorCategory::Parse => "Review the extractor rule for this source in the config file",
            ErrorCategory::NoData => "Try again later; the upstream has not published yet",
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}
