use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("at least one channel must be configured")]
    NoChannels,
    #[error("webhook mode requires PUBLIC_URL")]
    MissingPublicUrl,
    #[error("failed to parse {path}: {source}")]
    File {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Polling,
    Webhook,
}

/// A channel users are asked to join. Only the first one is verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLink {
    /// `@username` or numeric chat id.
    pub chat: String,
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_token: String,
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    pub channels: Vec<ChannelLink>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub mode: UpdateMode,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_port")]
    pub listen_port: u16,
}

fn default_port() -> u16 {
    10000
}

fn default_max_connections() -> u32 {
    10
}

impl BotConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_paths = ["./gatebot.toml", "/etc/gatebot/gatebot.toml"];

        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::File {
                    path: path.to_string(),
                    source,
                })?;
                config.validate()?;
                return Ok(config);
            }
        }

        tracing::info!("Loading config from environment");
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = get("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let admin_ids = match get("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => Vec::new(),
        };

        let channels = parse_channels(&get("CHANNELS").ok_or(ConfigError::Missing("CHANNELS"))?)?;

        let mode = match get("BOT_MODE").as_deref().map(str::trim) {
            None | Some("") | Some("polling") => UpdateMode::Polling,
            Some("webhook") => UpdateMode::Webhook,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "BOT_MODE",
                    value: other.to_string(),
                })
            }
        };

        let listen_port = match get("PORT") {
            Some(p) => p.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: p.clone(),
            })?,
            None => default_port(),
        };

        let max_connections = get("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_connections);

        Ok(Self {
            bot_token,
            admin_ids,
            channels,
            database_url: get("DATABASE_URL").filter(|u| !u.is_empty()),
            max_connections,
            mode,
            public_url: get("PUBLIC_URL")
                .or_else(|| get("RENDER_EXTERNAL_URL"))
                .filter(|u| !u.is_empty()),
            webhook_secret: get("WEBHOOK_SECRET").filter(|s| !s.is_empty()),
            listen_port,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        if self.mode == UpdateMode::Webhook && self.public_url.is_none() {
            return Err(ConfigError::MissingPublicUrl);
        }
        Ok(())
    }

    /// The channel whose membership is actually checked.
    pub fn gate_channel(&self) -> Option<&ChannelLink> {
        self.channels.first()
    }

    pub fn webhook_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|base| format!("{}/webhook", base.trim_end_matches('/')))
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                key: "ADMIN_IDS",
                value: s.to_string(),
            })
        })
        .collect()
}

/// `CHANNELS=@first=https://t.me/first,@second=https://t.me/second`
fn parse_channels(raw: &str) -> Result<Vec<ChannelLink>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, entry)| {
            let (chat, url) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                key: "CHANNELS",
                value: entry.to_string(),
            })?;
            Ok(ChannelLink {
                chat: chat.trim().to_string(),
                label: format!("Join{}", i + 1),
                url: url.trim().to_string(),
            })
        })
        .collect()
}
