use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Service name used in log output
    #[serde(default = "default_service_name")]
    pub service_name: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// NATS JetStream stream name for simple device reports
    #[serde(default = "default_device_reports_stream")]
    pub device_reports_stream: String,

    /// NATS subject pattern for the device report consumer filter
    #[serde(default = "default_device_reports_subject")]
    pub device_reports_subject: String,

    /// NATS JetStream stream name for hook-triggered device events
    #[serde(default = "default_device_events_stream")]
    pub device_events_stream: String,

    /// NATS subject pattern for the device event consumer filter
    #[serde(default = "default_device_events_subject")]
    pub device_events_subject: String,

    /// NATS JetStream stream name for hook-triggered device change events
    #[serde(default = "default_device_changes_stream")]
    pub device_changes_stream: String,

    /// NATS subject pattern for the device change consumer filter
    #[serde(default = "default_device_changes_subject")]
    pub device_changes_subject: String,

    /// Batch size for consumers
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Outbound HTTP configuration
    /// Base URL of the analytics collection endpoint
    #[serde(default = "default_google_analytics_base_url")]
    pub google_analytics_base_url: String,

    /// Base URL of the authorization service
    #[serde(default = "default_authorization_service_base_url")]
    pub authorization_service_base_url: String,

    /// Timeout for outbound HTTP requests in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "ga-bridge".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_device_reports_stream() -> String {
    "device_reports".to_string()
}

fn default_device_reports_subject() -> String {
    "device_reports.>".to_string()
}

fn default_device_events_stream() -> String {
    "device_events".to_string()
}

fn default_device_events_subject() -> String {
    "device_events.>".to_string()
}

fn default_device_changes_stream() -> String {
    "device_change_events".to_string()
}

fn default_device_changes_subject() -> String {
    "device_change_events.>".to_string()
}

fn default_nats_batch_size() -> usize {
    30
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// Outbound HTTP defaults
fn default_google_analytics_base_url() -> String {
    "https://www.google-analytics.com".to_string()
}

fn default_authorization_service_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("GA_BRIDGE"))
            .build()?
            .try_deserialize()
    }
}
