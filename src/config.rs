//! Configuration management for AnchorMind

use std::env;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::notes::HeatmapThresholds;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub viewer: ViewerConfig,
    pub heatmap: HeatmapThresholds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend root, without the `/api` prefix
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    /// Scale of the main page view
    pub render_scale: f32,
    /// Scale of the thumbnail strip
    pub thumbnail_scale: f32,
    /// Thumbnails cover pages `1..=thumbnail_page_limit`
    pub thumbnail_page_limit: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            render_scale: 1.5,
            thumbnail_scale: 0.3,
            thumbnail_page_limit: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig::default(),
            viewer: ViewerConfig::default(),
            heatmap: HeatmapThresholds::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            api: ApiConfig {
                base_url: lookup("ANCHORMIND_API_URL").unwrap_or(defaults.api.base_url),
                timeout_secs: parse_or(
                    &lookup,
                    "ANCHORMIND_API_TIMEOUT_SECS",
                    defaults.api.timeout_secs,
                )?,
            },
            viewer: ViewerConfig {
                render_scale: parse_or(
                    &lookup,
                    "ANCHORMIND_RENDER_SCALE",
                    defaults.viewer.render_scale,
                )?,
                thumbnail_scale: parse_or(
                    &lookup,
                    "ANCHORMIND_THUMBNAIL_SCALE",
                    defaults.viewer.thumbnail_scale,
                )?,
                thumbnail_page_limit: parse_or(
                    &lookup,
                    "ANCHORMIND_THUMBNAIL_LIMIT",
                    defaults.viewer.thumbnail_page_limit,
                )?,
            },
            heatmap: HeatmapThresholds {
                low_max: parse_or(&lookup, "ANCHORMIND_HEAT_LOW_MAX", defaults.heatmap.low_max)?,
                medium_max: parse_or(
                    &lookup,
                    "ANCHORMIND_HEAT_MEDIUM_MAX",
                    defaults.heatmap.medium_max,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, scale) in [
            ("ANCHORMIND_RENDER_SCALE", self.viewer.render_scale),
            ("ANCHORMIND_THUMBNAIL_SCALE", self.viewer.thumbnail_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(invalid(key, scale));
            }
        }
        if self.heatmap.medium_max < self.heatmap.low_max {
            return Err(invalid("ANCHORMIND_HEAT_MEDIUM_MAX", self.heatmap.medium_max));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, raw)),
        None => Ok(default),
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}
