use std::{fs, io::ErrorKind, path::Path};

use anyhow::anyhow;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::ShoutoutError;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub twitch: TwitchConfig,

    #[serde(default)]
    pub shoutout: ShoutoutConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TwitchConfig {
    /// Base of the helix api, without a trailing slash.
    pub api_url: String,

    /// Where client-credentials grants are posted.
    pub token_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ShoutoutConfig {
    /// Upper bound for a composed message, in characters.
    pub max_length: usize,

    /// Channel links are `{platform_url}/{login}`.
    pub platform_url: String,

    pub default_vibe: String,
    pub default_about: String,
    pub default_game: String,

    /// How many recent videos and clips are read for vibe matching.
    pub media_limit: u8,

    /// When false, the first phrase of every pool is used.
    pub randomize_phrases: bool,

    pub phrase_seed: Option<u64>,

    /// Checked in order; every matching rule contributes its label.
    pub vibes: Vec<VibeRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VibeRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl VibeRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_owned(),
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
        }
    }
}

impl Config {
    /// Reads the config from the file if it exists, otherwise writes the
    /// default config to the file and loads that.
    pub fn read_or_write_default_from<P: AsRef<Path>>(path: P) -> Result<Self, ShoutoutError> {
        let p = path.as_ref();

        if !p.exists() {
            let default = Config::default();

            let toml_string = toml::to_string_pretty(&default).map_err(|e| {
                ShoutoutError::LoadConfig(
                    "couldn't format default config with toml".to_owned(),
                    e.into(),
                )
            })?;

            if let Err(e) = fs::write(p, toml_string) {
                warn!(
                    "wanted to write the default configuration file to {}, but couldn't.",
                    p.display(),
                );
                match e.kind() {
                    ErrorKind::NotFound => {
                        warn!("does its parent directory exist?");
                    }
                    ErrorKind::PermissionDenied => {
                        warn!("is there permission to write to it?");
                    }
                    _ => warn!("(here's the error: {})", e),
                }
            } else {
                info!("wrote the default configuration file to {}", p.display());
            }

            Ok(default)
        } else {
            let raw_string = fs::read_to_string(p).map_err(|e| {
                ShoutoutError::LoadConfig(
                    format!("couldn't read contents of {}", p.display()),
                    e.into(),
                )
            })?;

            let config = Self::from_toml_str(&raw_string).map_err(|e| match e {
                ShoutoutError::LoadConfig(msg, source) => {
                    ShoutoutError::LoadConfig(format!("{msg} ({})", p.display()), source)
                }
                other => other,
            })?;

            info!("configuration has been read from {}", p.display());

            Ok(config)
        }
    }

    /// Parses and validates a config from a toml string. Missing sections fall back to their
    /// defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ShoutoutError> {
        let config: Config = toml::from_str(raw).map_err(|e| {
            ShoutoutError::LoadConfig("couldn't parse toml".to_owned(), e.into())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ShoutoutError> {
        if self.shoutout.max_length == 0 {
            return Err(ShoutoutError::LoadConfig(
                "invalid [shoutout] section".to_owned(),
                anyhow!("max_length must be at least 1"),
            ));
        }

        // helix caps `first` at 100
        if !(1..=100).contains(&self.shoutout.media_limit) {
            return Err(ShoutoutError::LoadConfig(
                "invalid [shoutout] section".to_owned(),
                anyhow!("media_limit must be between 1 and 100"),
            ));
        }

        for rule in &self.shoutout.vibes {
            if rule.label.trim().is_empty() {
                return Err(ShoutoutError::InvalidVibeRule(
                    rule.label.clone(),
                    "label is empty".to_owned(),
                ));
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ShoutoutError::InvalidVibeRule(
                    rule.label.clone(),
                    "no keywords".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.twitch.tv/helix".to_owned(),
            token_url: "https://id.twitch.tv/oauth2/token".to_owned(),
        }
    }
}

impl Default for ShoutoutConfig {
    fn default() -> Self {
        Self {
            max_length: 400,
            platform_url: "https://twitch.tv".to_owned(),
            default_vibe: "great energy ✨".to_owned(),
            default_about: "amazing streams".to_owned(),
            default_game: "awesome content".to_owned(),
            media_limit: 3,
            randomize_phrases: true,
            phrase_seed: None,
            vibes: default_vibes(),
        }
    }
}

pub fn default_vibes() -> Vec<VibeRule> {
    vec![
        VibeRule::new("cozy vibes ☕", &["cozy", "chill", "relax"]),
        VibeRule::new("spooky thrills 👻", &["horror", "spooky", "scary"]),
        VibeRule::new(
            "competitive grind 💪",
            &["ranked", "competitive", "grind", "sweat"],
        ),
        VibeRule::new("wild fun 🎉", &["fun", "chaos", "wild", "crazy"]),
        VibeRule::new("anime madness 🎴", &["anime", "gacha", "manga"]),
    ]
}
