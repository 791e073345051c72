use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Term engine
    pub neuron_api_key: String,
    pub neuron_api_endpoint: String,

    // Language model
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_max_tokens: Option<u32>,

    // Prompt templates and link policy
    pub prompts_file_path: Option<String>,
    pub anchors_config_path: Option<String>,

    // Queue storage
    pub database_url: String,

    // Scheduling
    pub worker_id: String,
    pub keyword_lease_minutes: i64,
    pub claim_batch_size: usize,
    pub scheduler_interval_secs: u64,

    // Query polling
    pub query_initial_delay_secs: u64,
    pub query_poll_interval_secs: u64,
    pub query_poll_timeout_secs: u64,

    // Optimization
    pub heading_regression_tolerance: i32,

    // HTTP
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            neuron_api_key: required("NEURON_API_KEY")?,
            neuron_api_endpoint: required("NEURON_API_ENDPOINT")?,
            openai_api_key: required("OPENAI_KEY")?,
            openai_model: required("OPENAI_MODEL")?,
            openai_max_tokens: parsed_optional("OPENAI_MAX_TOKENS")?,
            prompts_file_path: optional("PROMPTS_FILE_PATH"),
            anchors_config_path: optional("ANCHORS_CONFIG_PATH"),
            database_url: required("DATABASE_URL")?,
            worker_id: std::env::var("WORKER_ID").unwrap_or_else(|_| "seoforge-worker".to_string()),
            keyword_lease_minutes: parsed("KEYWORD_LEASE_MINUTES", 120)?,
            claim_batch_size: parsed("CLAIM_BATCH_SIZE", 5)?,
            scheduler_interval_secs: parsed("SCHEDULER_INTERVAL_SECS", 300)?,
            query_initial_delay_secs: parsed("QUERY_INITIAL_DELAY_SECS", 65)?,
            query_poll_interval_secs: parsed("QUERY_POLL_INTERVAL_SECS", 10)?,
            query_poll_timeout_secs: parsed("QUERY_POLL_TIMEOUT_SECS", 120)?,
            heading_regression_tolerance: parsed("HEADING_REGRESSION_TOLERANCE", 4)?,
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", 180)?,
        })
    }

    pub fn lease_duration(&self) -> Result<chrono::Duration> {
        lease_minutes(self.keyword_lease_minutes)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            neuron_endpoint = self.neuron_api_endpoint.as_str(),
            neuron_key_set = !self.neuron_api_key.is_empty(),
            openai_model = self.openai_model.as_str(),
            openai_key_set = !self.openai_api_key.is_empty(),
            prompts_file = self.prompts_file_path.as_deref().unwrap_or("<built-in>"),
            anchors_config = self.anchors_config_path.as_deref().unwrap_or("<none>"),
            worker_id = self.worker_id.as_str(),
            lease_minutes = self.keyword_lease_minutes,
            claim_batch_size = self.claim_batch_size,
            scheduler_interval_secs = self.scheduler_interval_secs,
            "Configuration loaded"
        );
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} environment variable is required"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn lease_minutes(minutes: i64) -> Result<chrono::Duration> {
    if minutes <= 0 {
        bail!("KEYWORD_LEASE_MINUTES must be positive, got {minutes}");
    }
    chrono::Duration::try_minutes(minutes)
        .with_context(|| format!("KEYWORD_LEASE_MINUTES is out of range: {minutes}"))
}

fn parsed_optional<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        _ => Ok(None),
    }
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_falls_back_to_default_when_unset() {
        let value: u64 = parsed("SEOFORGE_TEST_SURELY_UNSET_VAR", 65).unwrap();
        assert_eq!(value, 65);
    }

    #[test]
    fn unparsable_optional_number_is_an_error() {
        std::env::set_var("SEOFORGE_TEST_BAD_MAX_TOKENS", "lots");
        let err = parsed_optional::<u32>("SEOFORGE_TEST_BAD_MAX_TOKENS").unwrap_err();
        assert!(err.to_string().contains("SEOFORGE_TEST_BAD_MAX_TOKENS"));

        std::env::set_var("SEOFORGE_TEST_GOOD_MAX_TOKENS", " 900 ");
        assert_eq!(parsed_optional::<u32>("SEOFORGE_TEST_GOOD_MAX_TOKENS").unwrap(), Some(900));
        assert_eq!(parsed_optional::<u32>("SEOFORGE_TEST_UNSET_MAX_TOKENS").unwrap(), None);
    }

    #[test]
    fn lease_minutes_must_be_positive_and_in_range() {
        assert_eq!(lease_minutes(120).unwrap(), chrono::Duration::minutes(120));
        assert!(lease_minutes(0).is_err());
        assert!(lease_minutes(i64::MAX).is_err());
    }

    #[test]
    fn optional_ignores_blank_values() {
        assert_eq!(optional("SEOFORGE_TEST_ANOTHER_UNSET_VAR"), None);
    }
}
