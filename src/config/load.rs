use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `VIVACE__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("VIVACE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.playback.volume) {
            return Err("playback.volume must be between 0.0 and 2.0".to_string());
        }
        if !(10..=1000).contains(&self.playback.tick_ms) {
            return Err("playback.tick_ms must be between 10 and 1000".to_string());
        }
        if self.history.limit == 0 {
            return Err("history.limit must be >= 1".to_string());
        }
        Ok(())
    }

    /// The cache root to use: configured, XDG default, or `./cache` as
    /// a last resort.
    pub fn cache_root(&self) -> PathBuf {
        self.cache
            .root
            .clone()
            .or_else(default_cache_dir)
            .unwrap_or_else(|| PathBuf::from("cache"))
    }

    /// The library directory to scan: configured, `~/Music`, or
    /// `./Music` as a last resort.
    pub fn library_path(&self) -> PathBuf {
        if let Some(path) = &self.library.path {
            return path.clone();
        }
        match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join("Music"),
            None => PathBuf::from("Music"),
        }
    }
}

/// Resolve the config path from `VIVACE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("VIVACE_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/vivace/config.toml`
/// or `~/.config/vivace/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".config"))
    } else {
        None
    };

    config_home.map(|d| d.join("vivace").join("config.toml"))
}

/// Compute the default cache dir under `$XDG_CACHE_HOME/vivace` or
/// `~/.cache/vivace` when `XDG_CACHE_HOME` is not set.
pub fn default_cache_dir() -> Option<PathBuf> {
    let cache_home = if let Some(xdg) = env::var_os("XDG_CACHE_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".cache"))
    } else {
        None
    };

    cache_home.map(|d| d.join("vivace"))
}
