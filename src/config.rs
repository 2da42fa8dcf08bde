use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crypto::PasswordCrypto;
use crate::models::PeriodFilter;

pub const BASE_CONFIG_FILE: &str = "default.ini";
pub const LOCAL_CONFIG_FILE: &str = "properties.ini";
pub const ENV_PREFIX: &str = "PAYSLIP";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub debug: DebugConfig,
    pub login: LoginConfig,
    pub file: FileConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    pub log_folder: PathBuf,
    pub log_level: String,
    #[serde(alias = "selenium_log_level")]
    pub webdriver_log_level: String,
    pub dry_run: bool,
    pub logging_enabled: bool,
    #[serde(alias = "selenium_logging_enabled")]
    pub webdriver_logging_enabled: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    pub url: String,
    pub client_number: String,
    pub username: String,
    /// Plaintext once loaded; on disk it may be a sealed token.
    pub password: String,
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("url", &self.url)
            .field("client_number", &self.client_number)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Path template with `{accounting_period%fmt}` / `{create_date%fmt}` placeholders.
    pub file_destination: String,
    pub rename: bool,
    pub search_period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub wait_timeout: u64,
    pub download_timeout: u64,
    pub headless: bool,
    /// Use an already running WebDriver endpoint instead of spawning chromedriver.
    #[serde(default)]
    pub webdriver_url: Option<String>,
    #[serde(default = "default_chromedriver_port")]
    pub chromedriver_port: u16,
    #[serde(default)]
    pub chromedriver_path: Option<PathBuf>,
}

fn default_chromedriver_port() -> u16 {
    9516
}

/// Values given on the command line; they win over every file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dry_run: bool,
    pub headless: bool,
}

impl AppConfig {
    /// Loads `default.ini`, then the per-user and local `properties.ini`
    /// files, then `PAYSLIP_*` environment variables, then `overrides`.
    pub fn load(config_dir: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let base = config_dir.join(BASE_CONFIG_FILE);
        let mut builder = Config::builder()
            .add_source(ConfigFile::from(base.as_path()).format(FileFormat::Ini).required(true));

        if let Some(user_file) = Self::user_config_path() {
            builder = builder.add_source(
                ConfigFile::from(user_file.as_path())
                    .format(FileFormat::Ini)
                    .required(false),
            );
        }

        builder = builder
            .add_source(
                ConfigFile::from(config_dir.join(LOCAL_CONFIG_FILE).as_path())
                    .format(FileFormat::Ini)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        if overrides.dry_run {
            builder = builder.set_override("debug.dry_run", true)?;
        }
        if overrides.headless {
            builder = builder.set_override("settings.headless", true)?;
        }

        let mut config: Self = builder
            .build()
            .with_context(|| format!("Failed to read configuration from {}", config_dir.display()))?
            .try_deserialize()
            .context("Invalid configuration")?;

        if PasswordCrypto::is_sealed(&config.login.password) {
            config.login.password = PasswordCrypto::open_password(&config.login.password)
                .context("Failed to open sealed login.password")?;
        }

        Ok(config)
    }

    /// `properties.ini` in the platform's per-user config directory.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "payslip", "payslip-downloader")
            .map(|dirs| dirs.config_dir().join(LOCAL_CONFIG_FILE))
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.wait_timeout)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.download_timeout)
    }

    pub fn period_filter(&self) -> PeriodFilter {
        PeriodFilter::from_search_period(&self.file.search_period)
    }

    pub fn webdriver_url(&self) -> Option<&str> {
        self.settings
            .webdriver_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Copy safe to print or log.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.login.password = "<redacted>".to_string();
        copy
    }
}
