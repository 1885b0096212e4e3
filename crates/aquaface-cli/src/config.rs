use anyhow::{Context, Result};
use aquaface_core::quality::DEFAULT_SHARPNESS_SATURATION;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Decision threshold used when nothing else is configured.
pub const DEFAULT_THRESHOLD: f32 = 0.75;

/// CLI configuration: defaults, then an optional TOML file, then `AQUAFACE_*`
/// environment variables. Command-line flags are applied last by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Adjusted similarity must exceed this for a "same person" verdict.
    pub threshold: f32,
    /// Attenuate similarity by the worse image quality.
    pub quality_weighting: bool,
    /// Laplacian variance at which sharpness saturates.
    pub sharpness_saturation: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            quality_weighting: true,
            sharpness_saturation: DEFAULT_SHARPNESS_SATURATION,
        }
    }
}

impl Config {
    /// Load from `path` (or `AQUAFACE_CONFIG` when `path` is `None`), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("AQUAFACE_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let config = Self::from_toml_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                tracing::debug!(path = %path.display(), "loaded config file");
                config
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `AQUAFACE_*` overrides read through `lookup`. Unparsable values
    /// are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env_parse(&lookup, "AQUAFACE_THRESHOLD") {
            self.threshold = v;
        }
        if let Some(v) = lookup("AQUAFACE_QUALITY_WEIGHTING") {
            self.quality_weighting = v != "0";
        }
        if let Some(v) = env_parse(&lookup, "AQUAFACE_SHARPNESS_SATURATION") {
            self.sharpness_saturation = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}
