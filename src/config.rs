//! Configuration for the aggregation service
//!
//! Everything the resilience pipeline and the engine need is externally
//! configurable via `SUPCAT_*` environment variables; the defaults match
//! the catalog client's production settings.

use crate::error::{Error, Result};
use crate::resilience::{BackoffConfig, BreakerConfig, PipelineConfig};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Inbound HTTP server address
    pub http_addr: SocketAddr,

    /// Base URL of the catalog service
    pub catalog_url: String,

    /// Maximum number of suppliers fetched per composition (known scale limit)
    pub supplier_page_cap: usize,

    /// Bounded concurrency for per-supplier link fetches
    pub fan_out: usize,

    /// Whole-operation deadline for one composition
    pub operation_deadline: Duration,

    /// Resilience pipeline settings for outbound catalog calls
    pub pipeline: PipelineConfig,

    /// Log level
    pub log_level: String,

    /// Log format (json or pretty)
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            catalog_url: "http://localhost:8081".to_string(),
            supplier_page_cap: 1000,
            fan_out: 8,
            operation_deadline: Duration::from_secs(30),
            pipeline: PipelineConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, field: &mut T) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = env::var(name) {
        *field = raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid {name}: {e}")))?;
    }
    Ok(())
}

fn parse_duration_ms(name: &str, field: &mut Duration) -> Result<()> {
    if let Ok(raw) = env::var(name) {
        let ms: u64 = raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid {name}: {e}")))?;
        *field = Duration::from_millis(ms);
    }
    Ok(())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        parse_var("SUPCAT_HTTP_ADDR", &mut config.http_addr)?;
        if let Ok(url) = env::var("SUPCAT_CATALOG_URL") {
            config.catalog_url = url;
        }
        parse_var("SUPCAT_SUPPLIER_PAGE_CAP", &mut config.supplier_page_cap)?;
        parse_var("SUPCAT_FAN_OUT", &mut config.fan_out)?;
        parse_duration_ms("SUPCAT_OPERATION_DEADLINE_MS", &mut config.operation_deadline)?;

        parse_var("SUPCAT_MAX_ATTEMPTS", &mut config.pipeline.backoff.max_attempts)?;
        parse_duration_ms("SUPCAT_RETRY_BASE_MS", &mut config.pipeline.backoff.base_delay)?;
        parse_duration_ms("SUPCAT_RETRY_MAX_MS", &mut config.pipeline.backoff.max_delay)?;
        parse_duration_ms("SUPCAT_ATTEMPT_TIMEOUT_MS", &mut config.pipeline.attempt_timeout)?;

        parse_var(
            "SUPCAT_BREAKER_FAILURE_RATIO",
            &mut config.pipeline.breaker.failure_ratio,
        )?;
        parse_var(
            "SUPCAT_BREAKER_MIN_THROUGHPUT",
            &mut config.pipeline.breaker.minimum_throughput,
        )?;
        parse_duration_ms(
            "SUPCAT_BREAKER_SAMPLING_WINDOW_MS",
            &mut config.pipeline.breaker.sampling_window,
        )?;
        parse_duration_ms("SUPCAT_BREAK_DURATION_MS", &mut config.pipeline.breaker.break_duration)?;

        if config.fan_out == 0 {
            return Err(Error::Config("SUPCAT_FAN_OUT must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&config.pipeline.breaker.failure_ratio) {
            return Err(Error::Config(
                "SUPCAT_BREAKER_FAILURE_RATIO must be within [0, 1]".to_string(),
            ));
        }

        if let Ok(level) = env::var("SUPCAT_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(format) = env::var("SUPCAT_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(Error::Config(format!(
                        "invalid SUPCAT_LOG_FORMAT: {other} (expected 'json' or 'pretty')"
                    )))
                }
            };
        }

        Ok(config)
    }
}
