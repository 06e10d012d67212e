//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys and the Paystack secret come from GROQ_API_KEYS /
//! PAYSTACK_SECRET_KEY or from the files named in the config, never from the
//! TOML itself.

use common::Secret;
use key_pool::{DispatchOptions, parse_key_list};
use provider::ChatDefaults;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "groq-relay.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub groq: GroqConfig,
    pub paystack: PaystackConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
    /// Mount `/api/debug/next-key`, which advances the cursor on every call.
    pub debug_routes: bool,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 1000,
            debug_routes: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Groq upstream and chat defaults
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub default_model: String,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    pub retry_backoff_ms: u64,
    pub fail_fast_invalid_payload: bool,
    /// File with comma- or newline-separated keys (alternative to GROQ_API_KEYS)
    pub api_keys_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_keys: Vec<Secret<String>>,
}

impl Default for GroqConfig {
    fn default() -> Self {
        let defaults = ChatDefaults::default();
        Self {
            base_url: groq_client::GROQ_API_BASE.to_string(),
            timeout_secs: 60,
            default_model: defaults.model,
            default_temperature: defaults.temperature,
            default_max_tokens: defaults.max_tokens,
            retry_backoff_ms: 0,
            fail_fast_invalid_payload: false,
            api_keys_file: None,
            api_keys: Vec::new(),
        }
    }
}

impl GroqConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            defaults: ChatDefaults {
                model: self.default_model.clone(),
                temperature: self.default_temperature,
                max_tokens: self.default_max_tokens,
            },
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            fail_fast_invalid_payload: self.fail_fast_invalid_payload,
        }
    }
}

/// Paystack forwarder settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PaystackConfig {
    pub base_url: String,
    pub currency: String,
    pub timeout_secs: u64,
    /// File containing the secret key (alternative to PAYSTACK_SECRET_KEY)
    pub secret_key_file: Option<PathBuf>,
    #[serde(skip)]
    pub secret_key: Option<Secret<String>>,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            base_url: paystack::PAYSTACK_API_BASE.to_string(),
            currency: paystack::DEFAULT_CURRENCY.to_string(),
            timeout_secs: 30,
            secret_key_file: None,
            secret_key: None,
        }
    }
}

impl PaystackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where the config file came from. A missing file is only tolerated when
/// nobody asked for it by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    pub explicit: bool,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a resolved path. A missing default file yields built-in
    /// defaults so the relay can run from environment variables alone.
    pub fn load_from(source: &ConfigPath) -> common::Result<Self> {
        if !source.explicit && !source.path.exists() {
            return Self::from_toml("");
        }
        Self::load(&source.path)
    }

    /// Parse TOML, apply env overlays and validate.
    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> ConfigPath {
        if let Some(p) = cli_path {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigPath {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        }
    }

    /// Overlay PORT, GROQ_API_KEYS and PAYSTACK_SECRET_KEY.
    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| {
                common::Error::Config(format!("PORT must be a port number, got: {port}"))
            })?;
            self.server.listen_addr.set_port(port);
        }

        // Keys: env var takes precedence over file
        match std::env::var("GROQ_API_KEYS") {
            Ok(raw) if !raw.trim().is_empty() => self.groq.api_keys = parse_key_list(&raw),
            _ => {
                if let Some(ref path) = self.groq.api_keys_file {
                    let raw = read_secret_file(path, "api_keys_file")?;
                    self.groq.api_keys = parse_key_list(&raw);
                }
            }
        }

        match std::env::var("PAYSTACK_SECRET_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                self.paystack.secret_key = Some(Secret::new(key.trim().to_owned()));
            }
            _ => {
                if let Some(ref path) = self.paystack.secret_key_file {
                    let key = read_secret_file(path, "secret_key_file")?;
                    let key = key.trim().to_owned();
                    if !key.is_empty() {
                        self.paystack.secret_key = Some(Secret::new(key));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        for (field, url) in [
            ("groq.base_url", &self.groq.base_url),
            ("paystack.base_url", &self.paystack.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{field} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.groq.timeout_secs == 0 || self.paystack.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.groq.default_model.trim().is_empty() {
            return Err(common::Error::Config(
                "default_model must not be empty".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.groq.default_temperature) {
            return Err(common::Error::Config(format!(
                "default_temperature must be between 0 and 2, got: {}",
                self.groq.default_temperature
            )));
        }

        if self.groq.default_max_tokens == 0 {
            return Err(common::Error::Config(
                "default_max_tokens must be greater than 0".into(),
            ));
        }

        if self.paystack.currency.trim().is_empty() {
            return Err(common::Error::Config("currency must not be empty".into()));
        }

        if let Some(origin) = self
            .server
            .cors_origins
            .iter()
            .find(|o| axum::http::HeaderValue::from_str(o).is_err())
        {
            return Err(common::Error::Config(format!(
                "invalid CORS origin: {origin:?}"
            )));
        }

        Ok(())
    }
}

fn read_secret_file(path: &Path, field: &str) -> common::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!("failed to read {field} {}: {e}", path.display()))
    })
}
