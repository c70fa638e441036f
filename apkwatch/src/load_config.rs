/// `load_config` module: loads the static YAML config and injects secrets from the environment.
///
/// This is the only place where the YAML file and the process environment are read.
/// Everything downstream receives one fully built [`CliConfig`] by reference.
///
/// # Responsibilities
/// - Parse the YAML file into the core [`RelayConfig`] plus the channel section
/// - Read `BOT_TOKEN`, `CHANNEL_ID` and `MESSAGE_ID` from the environment
/// - Reject configs with no variants or duplicate variant keys
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::Result;
use apkwatch_core::config::RelayConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Where the publisher sends files and which message holds the digest.
#[derive(Clone)]
pub struct ChannelConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub pinned_message_id: i64,
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("pinned_message_id", &self.pinned_message_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub relay: RelayConfig,
    pub channel: ChannelConfig,
}

#[derive(Debug, Deserialize)]
struct ChannelSection {
    #[serde(default = "default_api_base")]
    api_base: String,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_TELEGRAM_API.to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(flatten)]
    relay: RelayConfig,
    #[serde(default)]
    channel: ChannelSection,
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Found in environment");
            Ok(value)
        }
        Ok(_) => {
            error!(var = name, "Environment variable is empty");
            Err(anyhow::anyhow!("{name} environment variable is empty"))
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            Err(anyhow::anyhow!("{name} environment variable not set: {e}"))
        }
    }
}

fn validate(relay: &RelayConfig) -> Result<()> {
    if relay.variants.is_empty() {
        anyhow::bail!("config lists no variants");
    }
    let mut keys = HashSet::new();
    for variant in &relay.variants {
        if variant.key.is_empty() || variant.slug.is_empty() {
            anyhow::bail!("every variant needs a key and a slug");
        }
        if !keys.insert(variant.key.as_str()) {
            anyhow::bail!("duplicate variant key: {}", variant.key);
        }
    }
    if relay.source.listing_window == 0 {
        anyhow::bail!("source.listing_window must be at least 1");
    }
    Ok(())
}

/// Parse the YAML file only. Used by commands that never touch the channel.
pub fn load_relay_config<P: AsRef<Path>>(path: P) -> Result<RelayConfig> {
    Ok(load_raw(path.as_ref())?.relay)
}

fn load_raw(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    validate(&raw.relay)?;
    Ok(raw)
}

/// Loads the static YAML config and injects the channel secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let raw = load_raw(path.as_ref())?;

    let bot_token = required_env("BOT_TOKEN")?;
    let chat_id = required_env("CHANNEL_ID")?;
    let message_id_raw = required_env("MESSAGE_ID")?;
    let pinned_message_id = match message_id_raw.trim().parse::<i64>() {
        Ok(id) => id,
        Err(e) => {
            error!(error = ?e, raw = %message_id_raw, "MESSAGE_ID must be an integer");
            return Err(anyhow::anyhow!("MESSAGE_ID must be an integer: {e}"));
        }
    };

    let config = CliConfig {
        relay: raw.relay,
        channel: ChannelConfig {
            api_base: raw.channel.api_base,
            bot_token,
            chat_id: chat_id.trim().to_string(),
            pinned_message_id,
        },
    };
    config.relay.trace_loaded();
    info!(
        chat_id = %config.channel.chat_id,
        pinned_message_id = config.channel.pinned_message_id,
        api_base = %config.channel.api_base,
        "Config loaded and merged successfully"
    );
    Ok(config)
}
