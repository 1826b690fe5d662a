use crate::role::Route;
use clap::Parser;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be an http(s) url, got {value:?}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("unknown start path {0:?}")]
    UnknownRoute(String),
}

/// Marketplace client settings. Every flag can also come from the
/// environment or a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(name = "agrimarket")]
#[command(about = "Agricultural supply-chain marketplace client")]
pub struct AppConfig {
    /// Base url of the marketplace backend (PostgREST)
    #[arg(long, env = "AGRI_BACKEND_URL")]
    pub backend_url: String,

    /// Anonymous api key sent with every backend request
    #[arg(long, env = "AGRI_BACKEND_KEY", hide_env_values = true, default_value = "")]
    pub backend_key: String,

    /// JSON-RPC endpoint of the wallet bridge
    #[arg(long, env = "AGRI_WALLET_RPC_URL", default_value = "http://127.0.0.1:1248")]
    pub wallet_rpc_url: String,

    /// Timeout for backend requests and wallet account polls. The wallet
    /// approval prompt is never timed out.
    #[arg(long, env = "AGRI_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// How often the wallet is polled for account switches
    #[arg(long, env = "AGRI_ACCOUNT_POLL_MS", default_value_t = 500)]
    pub account_poll_ms: u64,

    /// Route shown at startup, e.g. `/marketplace`
    #[arg(long, env = "AGRI_START_PATH", default_value = "/")]
    pub start_path: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("backend_url", &self.backend_url)?;
        check_url("wallet_rpc_url", &self.wallet_rpc_url)?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "request_timeout_secs",
            });
        }
        if self.account_poll_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "account_poll_ms",
            });
        }
        self.start_route()?;
        Ok(())
    }

    pub fn start_route(&self) -> Result<Route, ConfigError> {
        Route::from_path(&self.start_path)
            .ok_or_else(|| ConfigError::UnknownRoute(self.start_path.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_millis(self.account_poll_ms)
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        })
    }
}
