//! Configuration management for the Kiosk CLI.
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Command-line arguments
//! 2. `PORT` and `OPENAI_API_KEY` (compatibility variables)
//! 3. Environment variables (`KIOSK_*`)
//! 4. Config file (`~/.config/kiosk/config.toml`)
//! 5. Default values

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use kiosk_server::{RateLimitConfig, ServerConfig, UpstreamConfig};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server host.
    #[serde(default = "default_host")]
    pub server_host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Directory uploaded files are stored in.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Path of the message logbook file.
    #[serde(default = "default_logbook_path")]
    pub logbook_path: String,

    /// Base URL of the completion API.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Credential for the completion API.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Model requested from the completion API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for completions.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upstream request timeout in seconds.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Requests allowed per client per window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    /// Rate limit window in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_logbook_path() -> String {
    "logs.txt".to_string()
}

fn default_upstream_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.7
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_rate_limit_max_requests() -> u32 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    15 * 60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_host(),
            server_port: default_port(),
            upload_dir: default_upload_dir(),
            logbook_path: default_logbook_path(),
            upstream_base_url: default_upstream_base_url(),
            openai_api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from all sources.
    ///
    /// Reports warnings for configuration errors but falls back to defaults.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("KIOSK_"));

        let mut config = match figment.extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: configuration error, using defaults");
                eprintln!("  Config file: {}", config_path.display());
                eprintln!("  Error: {}", e);
                Config::default()
            }
        };

        config.apply_compat_env();
        config
    }

    /// Applies the bare `PORT` and `OPENAI_API_KEY` variables, which take
    /// precedence over the file and the `KIOSK_*` namespace.
    fn apply_compat_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server_port = port,
                Err(_) => eprintln!("Warning: ignoring non-numeric PORT value"),
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.openai_api_key = Some(key);
            }
        }
    }

    /// Returns the path to the config file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kiosk")
            .join("config.toml")
    }

    /// Returns the path to the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kiosk")
    }

    /// Saves the current configuration to the config file.
    pub fn save(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(Self::config_dir())?;

        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(Self::config_path(), toml_str)?;
        Ok(())
    }

    /// Sets the completion model and saves.
    pub fn set_model(&mut self, model: &str) -> Result<(), std::io::Error> {
        self.model = model.to_string();
        self.save()
    }

    /// Converts the loaded configuration into server settings.
    ///
    /// `host` and `port` from the command line win over everything.
    pub fn to_server_config(&self, host: Option<String>, port: Option<u16>) -> ServerConfig {
        let host = host.unwrap_or_else(|| self.server_host.clone());
        let port = port.unwrap_or(self.server_port);
        let addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| ServerConfig::default().addr);

        ServerConfig::builder()
            .addr(addr)
            .upstream(UpstreamConfig {
                base_url: self.upstream_base_url.clone(),
                api_key: self.openai_api_key.clone().unwrap_or_default(),
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                timeout: Duration::from_secs(self.upstream_timeout_secs),
            })
            .rate_limit(RateLimitConfig {
                max_requests: self.rate_limit_max_requests,
                window: Duration::from_secs(self.rate_limit_window_secs),
            })
            .upload_dir(&self.upload_dir)
            .logbook_path(&self.logbook_path)
            .build()
    }
}

/// Prints the current configuration and its sources.
pub fn show_config() {
    let config = Config::load();
    let config_path = Config::config_path();

    println!("Kiosk Configuration");
    println!("===================\n");

    println!("Config file: {}", config_path.display());
    if config_path.exists() {
        println!("Status: Found\n");
    } else {
        println!("Status: Not found (using defaults)\n");
    }

    println!("Current settings:");
    println!("  server_host: {}", config.server_host);
    println!("  server_port: {}", config.server_port);
    println!("  upload_dir: {}", config.upload_dir);
    println!("  logbook_path: {}", config.logbook_path);
    println!("  upstream_base_url: {}", config.upstream_base_url);
    println!(
        "  openai_api_key: {}",
        if config.openai_api_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!("  model: {}", config.model);
    println!("  max_tokens: {}", config.max_tokens);
    println!("  temperature: {}", config.temperature);
    println!(
        "  rate_limit: {} requests / {} s",
        config.rate_limit_max_requests, config.rate_limit_window_secs
    );

    println!("\nEnvironment variables:");
    println!("  PORT, OPENAI_API_KEY");
    println!("  KIOSK_SERVER_HOST, KIOSK_SERVER_PORT, KIOSK_UPLOAD_DIR,");
    println!("  KIOSK_LOGBOOK_PATH, KIOSK_UPSTREAM_BASE_URL, KIOSK_MODEL,");
    println!("  KIOSK_MAX_TOKENS, KIOSK_TEMPERATURE,");
    println!("  KIOSK_RATE_LIMIT_MAX_REQUESTS, KIOSK_RATE_LIMIT_WINDOW_SECS");
}
