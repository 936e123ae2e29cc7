use eeg_core::config::{env_string, env_u16};
use eeg_core::EegConfig;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub shared: EegConfig,
    pub host: String,
    pub port: u16,
}

impl QueryConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(QueryConfig {
            shared: EegConfig::from_env()?,
            host: env_string("QUERY_HOST", "0.0.0.0"),
            port: env_u16("QUERY_PORT", 8081),
        })
    }
}
