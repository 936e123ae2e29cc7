use eeg_core::config::{env_string, env_u16};
use eeg_core::EegConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub shared: EegConfig,
    pub host: String,
    pub port: u16,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(GatewayConfig {
            shared: EegConfig::from_env()?,
            host: env_string("GATEWAY_HOST", "0.0.0.0"),
            port: env_u16("GATEWAY_PORT", 8080),
        })
    }
}
