//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("service.base_url", "http://127.0.0.1:5409")?
        .set_default("service.api_prefix", "/api/ai")?
        .set_default("service.connect_timeout_secs", 10)?
        .set_default("service.request_timeout_secs", 120)?
        .set_default("service.retry_concurrency", 2)?
        .set_default("service.use_reference", true)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}
