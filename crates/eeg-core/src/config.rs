use std::env;

/// Env-var-driven configuration shared by all three binaries. Each binary
/// layers its own bind-address fields on top via its own `Config` struct
/// that embeds this one.
#[derive(Debug, Clone)]
pub struct EegConfig {
    pub database_url: String,
    pub jwt_secret_key: String,
    pub jwt_algo: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expire_minutes: u32,
    pub kafka_broker: String,
    pub app_env: AppEnv,
    pub kafka_region: Option<String>,
    pub kafka_group_id: String,
    pub core_service_url: Option<String>,
    pub eeg_service_url: Option<String>,
    pub ocr_stt_service_url: Option<String>,
    pub raw_eeg_bucket: Option<String>,
    pub redis_url: Option<String>,
    /// Upper bound on raw batches the worker processes concurrently.
    /// Kafka only guarantees ordering within a partition, and batches are
    /// partitioned by user id, so this must stay at 1 to keep a given
    /// user's batches processed in publish order; raise it only if the
    /// consumer is repartitioned to dedicate one partition per in-flight
    /// permit.
    pub analysis_max_concurrent_batches: u32,
    pub worker_recycle_after_tasks: u64,
    pub aggregation_poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Local,
    Staging,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "staging" => AppEnv::Staging,
            "production" => AppEnv::Production,
            _ => AppEnv::Local,
        }
    }

    /// Whether the Kafka client should use SASL_SSL + OAUTHBEARER instead
    /// of a plaintext connection.
    pub fn requires_secure_kafka(&self) -> bool {
        matches!(self, AppEnv::Staging | AppEnv::Production)
    }
}

impl EegConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(EegConfig {
            database_url: env_string("DATABASE_URL", "postgresql://postgres@localhost/eeg"),
            jwt_secret_key: env_string("JWT_SECRET_KEY", "dev-secret-change-me"),
            jwt_algo: env_string("JWT_ALGO", "HS256"),
            jwt_issuer: env_string("JWT_ISSUER", "eeg-platform"),
            jwt_audience: env_string("JWT_AUDIENCE", "eeg-clients"),
            access_token_expire_minutes: env_u32("ACCESS_TOKEN_EXPIRE_MINUTES", 60),
            kafka_broker: env_string("KAFKA_BROKER", "127.0.0.1:9092"),
            app_env: AppEnv::parse(&env_string("APP_ENV", "local")),
            kafka_region: env_optional_string("KAFKA_REGION"),
            kafka_group_id: env_string("KAFKA_GROUP_ID", "eeg-platform"),
            core_service_url: env_optional_string("CORE_SERVICE_URL"),
            eeg_service_url: env_optional_string("EEG_SERVICE_URL"),
            ocr_stt_service_url: env_optional_string("OCR_STT_SERVICE_URL"),
            raw_eeg_bucket: env_optional_string("RAW_EEG_BUCKET"),
            redis_url: env_optional_string("REDIS_URL"),
            analysis_max_concurrent_batches: env_u32("ANALYSIS_MAX_CONCURRENT_BATCHES", 1),
            worker_recycle_after_tasks: env_u64("WORKER_RECYCLE_AFTER_TASKS", 1_000),
            aggregation_poll_interval_seconds: env_u64(
                "AGGREGATION_POLL_INTERVAL_SECONDS",
                6 * 3600,
            ),
        })
    }
}

pub fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_optional_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

pub fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

pub fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_bool_accepts_common_truthy_and_falsy_forms() {
        env::set_var("EEG_CORE_TEST_BOOL_TRUE", "yes");
        env::set_var("EEG_CORE_TEST_BOOL_FALSE", "0");
        assert!(env_bool("EEG_CORE_TEST_BOOL_TRUE", false));
        assert!(!env_bool("EEG_CORE_TEST_BOOL_FALSE", true));
        env::remove_var("EEG_CORE_TEST_BOOL_TRUE");
        env::remove_var("EEG_CORE_TEST_BOOL_FALSE");
    }

    #[test]
    fn app_env_defaults_to_local() {
        assert_eq!(AppEnv::parse("nonsense"), AppEnv::Local);
        assert!(!AppEnv::Local.requires_secure_kafka());
        assert!(AppEnv::Production.requires_secure_kafka());
    }
}
