use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Provider {
    pub url: String,
    pub auth_token: String,
    pub webhook_secret: String,
    /// Accept provider callbacks without a signature header. Off by default;
    /// every unsigned request is logged when enabled.
    #[serde(default)]
    pub allow_unsigned: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Fees {
    pub deposit_percent: Decimal,
    pub withdrawal_percent: Decimal,
    pub fixed: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RateLimit {
    pub max_requests: i32,
    pub window_secs: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub listen: String,
    pub admin_token: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    pub provider: Provider,
    pub fees: Fees,
    pub rate_limit: RateLimit,
    pub server: Server,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        config.try_deserialize()
    }
}
