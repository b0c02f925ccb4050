use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::judge::PollPolicy;

#[derive(Parser)]
#[command(name = "judgehub", version = "0.1", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: String,

    /// Whether to flush the existing database
    #[arg(long = "flush-data", short = 'f', default_value_t = false)]
    pub flush_data: bool,
}

impl CliArgs {
    /// Load the configuration from the specified file
    pub fn to_config(&self) -> std::io::Result<Config> {
        let file = std::fs::File::open(&self.config_path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| e.into())
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub judge: JudgeConfig,
    #[serde(default = "default_languages")]
    pub languages: Vec<LanguageConfig>,
}

#[derive(Deserialize, Debug)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

/// Connection and polling settings for the external judge
#[derive(Deserialize, Debug, Clone)]
pub struct JudgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_max_fetch_failures")]
    pub max_fetch_failures: u32,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl JudgeConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
            deadline: Duration::from_secs(self.deadline_secs),
            max_fetch_failures: self.max_fetch_failures,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_poll_attempts() -> u32 {
    150
}

fn default_deadline_secs() -> u64 {
    300
}

fn default_max_fetch_failures() -> u32 {
    3
}

fn default_max_in_flight() -> usize {
    16
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// A language the judge understands, keyed by its judge-side id
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    pub name: String,
    pub id: u32,
}

pub fn default_languages() -> Vec<LanguageConfig> {
    [("PYTHON", 71), ("JAVA", 62), ("JAVASCRIPT", 63)]
        .into_iter()
        .map(|(name, id)| LanguageConfig {
            name: name.to_string(),
            id,
        })
        .collect()
}

/// Case-insensitive lookup of a language id by name
pub fn language_id(languages: &[LanguageConfig], name: &str) -> Option<u32> {
    languages
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(name))
        .map(|l| l.id)
}

pub fn language_name(languages: &[LanguageConfig], id: u32) -> Option<&str> {
    languages
        .iter()
        .find(|l| l.id == id)
        .map(|l| l.name.as_str())
}
