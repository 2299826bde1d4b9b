//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "crudboard";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RENDER_WAIT_MS: u64 = 1500;
pub(crate) const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";
const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_STALE_AFTER_SECS: u64 = 5 * 60;
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;
const DEFAULT_AUTO_DISMISS_MS: u64 = 3000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 250;

/// Command-line arguments for the crudboard binary.
#[derive(Debug, Parser)]
#[command(name = "crudboard", version, about = "Users and products console")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CRUDBOARD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Base URL of the users/products REST API.
    #[arg(long = "api-url", env = "CRUDBOARD_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Override the per-request API timeout.
    #[arg(long = "api-timeout-ms", value_name = "MILLISECONDS")]
    pub api_timeout_ms: Option<u64>,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// How long a page waits for its data before rendering the loading state.
    #[arg(long = "render-wait-ms", value_name = "MILLISECONDS")]
    pub render_wait_ms: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub api: ApiSettings,
    pub query: QuerySettings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub render_wait: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Always ends with `/` so relative paths join beneath it.
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub stale_after: Duration,
    pub retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub auto_dismiss_after: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse the process arguments and load settings for them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("CRUDBOARD").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_serve_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    api: RawApiSettings,
    query: RawQuerySettings,
    notifications: RawNotificationSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(url) = overrides.api_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(timeout) = overrides.api_timeout_ms {
            self.api.timeout_ms = Some(timeout);
        }
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(wait) = overrides.render_wait_ms {
            self.server.render_wait_ms = Some(wait);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            api,
            query,
            notifications,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            api: build_api_settings(api)?,
            query: build_query_settings(query)?,
            notifications: build_notification_settings(notifications)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;
    let render_wait =
        Duration::from_millis(server.render_wait_ms.unwrap_or(DEFAULT_RENDER_WAIT_MS));

    Ok(ServerSettings { addr, render_wait })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let mut base_url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let timeout_ms = api.timeout_ms.unwrap_or(DEFAULT_API_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "api.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_query_settings(query: RawQuerySettings) -> Result<QuerySettings, LoadError> {
    let stale_after =
        Duration::from_secs(query.stale_after_seconds.unwrap_or(DEFAULT_STALE_AFTER_SECS));
    let retries = query.retries.unwrap_or(DEFAULT_RETRIES);
    let retry_base_delay =
        Duration::from_millis(query.retry_base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS));
    let retry_max_delay =
        Duration::from_millis(query.retry_max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS));

    if retry_max_delay < retry_base_delay {
        return Err(LoadError::invalid(
            "query.retry_max_delay_ms",
            "must not be smaller than query.retry_base_delay_ms",
        ));
    }

    Ok(QuerySettings {
        stale_after,
        retries,
        retry_base_delay,
        retry_max_delay,
    })
}

fn build_notification_settings(
    notifications: RawNotificationSettings,
) -> Result<NotificationSettings, LoadError> {
    let auto_dismiss_ms = notifications
        .auto_dismiss_ms
        .unwrap_or(DEFAULT_AUTO_DISMISS_MS);
    if auto_dismiss_ms == 0 {
        return Err(LoadError::invalid(
            "notifications.auto_dismiss_ms",
            "must be greater than zero",
        ));
    }

    let sweep_interval_ms = notifications
        .sweep_interval_ms
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS);
    if sweep_interval_ms == 0 {
        return Err(LoadError::invalid(
            "notifications.sweep_interval_ms",
            "must be greater than zero",
        ));
    }

    Ok(NotificationSettings {
        auto_dismiss_after: Duration::from_millis(auto_dismiss_ms),
        sweep_interval: Duration::from_millis(sweep_interval_ms),
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    SocketAddr::from_str(&candidate).map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    render_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    stale_after_seconds: Option<u64>,
    retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotificationSettings {
    auto_dismiss_ms: Option<u64>,
    sweep_interval_ms: Option<u64>,
}
