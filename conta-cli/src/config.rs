use anyhow::{Context, Result};
use chrono_tz::Tz;
use conta_client::HttpBankApi;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::ensure_conta_home;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api: ApiSection,
    pub display: DisplaySection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSection {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySection {
    /// IANA zone used for statement dates.
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSection {
    /// tracing filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "conta=info".to_string(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiSection {
                base_url: HttpBankApi::DEFAULT_BASE_URL.to_string(),
                timeout_secs: default_timeout_secs(),
            },
            display: DisplaySection {
                timezone: "America/Sao_Paulo".to_string(),
            },
            log: LogSection::default(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        self.display
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid display.timezone {:?}: {e}", self.display.timezone))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_conta_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}
