//! Layered application configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a YAML/TOML/JSON file (`--config` / `CONFIG_FILE`, else `./web-tester.yaml`
//!    when present)
//! 3. `WEB_TESTER_*` environment variables, `__` between sections
//!    (e.g. `WEB_TESTER_SERVER__PORT=8080`)
//! 4. command-line flags, which clap also reads from their own env vars

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::assistant::ReplyDelay;
use crate::workspace::WorkspaceSettings;

/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "web-tester.yaml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "WEB_TESTER";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Origin that `/path` preview URLs resolve against
    #[arg(long, env = "PUBLIC_ORIGIN")]
    pub public_origin: Option<String>,

    /// File that stores theme and pane width
    #[arg(long, env = "PREFS_PATH")]
    pub prefs_path: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub preview: PreviewConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Defaults to `http://host:port`.
    #[serde(default)]
    pub public_origin: Option<String>,
    pub request_timeout_secs: u64,
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub prefs_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreviewConfig {
    pub load_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    pub min_reply_delay_ms: u64,
    pub max_reply_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.static_dir", "static")?
            .set_default("storage.prefs_path", "web-tester-prefs.json")?
            .set_default("preview.load_timeout_ms", 10_000)?
            .set_default("assistant.min_reply_delay_ms", 700)?
            .set_default("assistant.max_reply_delay_ms", 1_500)?
            .set_default("logging.json", false)?;

        // An explicitly named file must exist; the cwd fallback is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            }
            None => builder,
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(origin) = cli.public_origin {
            builder = builder.set_override("server.public_origin", origin)?;
        }
        if let Some(path) = cli.prefs_path {
            builder = builder.set_override("storage.prefs_path", path)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Address the listener binds.
    #[must_use]
    pub fn bind_address(&self) -> String {
        match self.server.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{ip}]:{}", self.server.port),
            _ => format!("{}:{}", self.server.host, self.server.port),
        }
    }

    /// Origin that relative preview paths resolve against.
    ///
    /// Without an explicit origin this is `http://host:port`, with a wildcard
    /// bind address replaced by loopback so the browser can reach it.
    pub fn public_origin(&self) -> Result<Url, url::ParseError> {
        if let Some(origin) = &self.server.public_origin {
            return Url::parse(origin);
        }
        let host = match self.server.host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) if ip.is_unspecified() => Ipv4Addr::LOCALHOST.to_string(),
            Ok(IpAddr::V6(ip)) if ip.is_unspecified() => format!("[{}]", Ipv6Addr::LOCALHOST),
            Ok(IpAddr::V6(ip)) => format!("[{ip}]"),
            _ => self.server.host.clone(),
        };
        Url::parse(&format!("http://{host}:{}", self.server.port))
    }

    /// Per-request deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Workspace tunables derived from this config.
    pub fn workspace_settings(&self) -> Result<WorkspaceSettings, url::ParseError> {
        Ok(WorkspaceSettings {
            origin: self.public_origin()?,
            load_timeout: Duration::from_millis(self.preview.load_timeout_ms),
            reply_delay: ReplyDelay::new(
                Duration::from_millis(self.assistant.min_reply_delay_ms),
                Duration::from_millis(self.assistant.max_reply_delay_ms),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(public_origin: Option<&str>) -> AppConfig {
        config_on("0.0.0.0", public_origin)
    }

    fn config_on(host: &str, public_origin: Option<&str>) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: host.to_string(),
                port: 8080,
                public_origin: public_origin.map(str::to_string),
                request_timeout_secs: 5,
                static_dir: PathBuf::from("static"),
            },
            storage: StorageConfig {
                prefs_path: PathBuf::from("prefs.json"),
            },
            preview: PreviewConfig {
                load_timeout_ms: 2_500,
            },
            assistant: AssistantConfig {
                min_reply_delay_ms: 900,
                max_reply_delay_ms: 100,
            },
            logging: LoggingConfig { json: false },
        }
    }

    #[test]
    fn test_public_origin_defaults_to_bind_address() {
        let origin = config_on("localhost", None).public_origin().unwrap();
        assert_eq!(origin.as_str(), "http://localhost:8080/");

        let origin = config(Some("https://tester.example")).public_origin().unwrap();
        assert_eq!(origin.host_str(), Some("tester.example"));
    }

    #[test]
    fn test_workspace_settings_orders_delay_bounds() {
        let settings = config(None).workspace_settings().unwrap();
        assert_eq!(settings.load_timeout, Duration::from_millis(2_500));
        assert_eq!(settings.reply_delay.min(), Duration::from_millis(100));
        assert_eq!(settings.reply_delay.max(), Duration::from_millis(900));
    }

    #[test]
    fn test_wildcard_and_ipv6_hosts_make_reachable_origins() {
        let origin = config_on("0.0.0.0", None).public_origin().unwrap();
        assert_eq!(origin.as_str(), "http://127.0.0.1:8080/");

        let origin = config_on("::", None).public_origin().unwrap();
        assert_eq!(origin.as_str(), "http://[::1]:8080/");

        let ipv6 = config_on("::1", None);
        assert_eq!(ipv6.public_origin().unwrap().as_str(), "http://[::1]:8080/");
        assert_eq!(ipv6.bind_address(), "[::1]:8080");
        assert_eq!(config_on("0.0.0.0", None).bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_bad_public_origin_is_an_error() {
        assert!(config(Some("not a url")).workspace_settings().is_err());
    }
}
