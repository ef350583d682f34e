//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Breath timing and speed
//! - The selected breathing pattern and any custom patterns
//! - Monthly goal
//! - Sound and visual toggles (read by the UI)
//! - Developer mode day offset
//!
//! Configuration is stored at `~/.config/calmio/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::breath::{builtin_pattern, BreathPattern, BreathSettings, NamedStep};
use crate::error::{ConfigError, PatternError};
use crate::storage::data_dir;

/// File name of the config inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Breath timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingConfig {
    #[serde(default = "default_inhale_ms")]
    pub inhale_ms: u32,
    #[serde(default = "default_exhale_ms")]
    pub exhale_ms: u32,
    #[serde(default = "default_increment_ms")]
    pub increment_ms: u32,
    #[serde(default = "default_interrupted_exhale_ms")]
    pub interrupted_exhale_ms: u32,
    #[serde(default = "default_speed")]
    pub speed_multiplier: f64,
    /// Built-in or custom pattern id; unset means simple press/release.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsConfig {
    #[serde(default = "default_monthly_minutes")]
    pub monthly_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Swell the volume with each breath.
    #[serde(default)]
    pub breath_volume: bool,
    #[serde(default = "default_volume")]
    pub volume: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualConfig {
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Speed used instead of `breathing.speed_multiplier` while enabled.
    #[serde(default = "default_dev_speed")]
    pub speed_multiplier: f64,
    /// Days added to the wall clock.
    #[serde(default)]
    pub day_offset: i64,
}

/// A user-defined pattern: `{ id = "...", steps = [{ name = "Inhale", seconds = 4 }] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub id: String,
    pub steps: Vec<NamedStep>,
}

impl CustomPattern {
    pub fn to_pattern(&self) -> Result<BreathPattern, PatternError> {
        BreathPattern::from_named_steps(self.id.clone(), &self.steps)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub breathing: BreathingConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
    #[serde(default)]
    pub sound: SoundConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub developer: DeveloperConfig,
    #[serde(default)]
    pub patterns: Vec<CustomPattern>,
}

fn default_inhale_ms() -> u32 {
    BreathSettings::default().inhale_ms
}
fn default_exhale_ms() -> u32 {
    BreathSettings::default().exhale_ms
}
fn default_increment_ms() -> u32 {
    BreathSettings::default().increment_ms
}
fn default_interrupted_exhale_ms() -> u32 {
    BreathSettings::default().interrupted_exhale_ms
}
fn default_speed() -> f64 {
    1.0
}
fn default_dev_speed() -> f64 {
    10.0
}
fn default_monthly_minutes() -> f64 {
    crate::stats::MONTHLY_GOAL_MINUTES
}
fn default_true() -> bool {
    true
}
fn default_volume() -> u32 {
    50
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            inhale_ms: default_inhale_ms(),
            exhale_ms: default_exhale_ms(),
            increment_ms: default_increment_ms(),
            interrupted_exhale_ms: default_interrupted_exhale_ms(),
            speed_multiplier: default_speed(),
            pattern: None,
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            monthly_minutes: default_monthly_minutes(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            breath_volume: false,
            volume: default_volume(),
        }
    }
}

impl Default for DeveloperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            speed_multiplier: default_dev_speed(),
            day_offset: 0,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                // Optional strings clear on an empty value.
                serde_json::Value::Null | serde_json::Value::String(_)
                    if value.is_empty() || value == "none" =>
                {
                    serde_json::Value::Null
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// `config.toml` inside [`data_dir`].
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from(CONFIG_FILE),
                message: e.to_string(),
            })
    }

    /// Load from the data directory, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from `path`; a missing file gives defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. The config is only changed if the
    /// result still validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check value ranges and custom patterns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        let b = &self.breathing;
        for (key, ms) in [
            ("breathing.inhale_ms", b.inhale_ms),
            ("breathing.exhale_ms", b.exhale_ms),
            ("breathing.interrupted_exhale_ms", b.interrupted_exhale_ms),
        ] {
            if ms == 0 {
                return invalid(key, "must be greater than 0");
            }
        }
        for (key, speed) in [
            ("breathing.speed_multiplier", b.speed_multiplier),
            ("developer.speed_multiplier", self.developer.speed_multiplier),
        ] {
            if !speed.is_finite() || speed <= 0.0 {
                return invalid(key, "must be a positive number");
            }
        }
        if !self.goals.monthly_minutes.is_finite() || self.goals.monthly_minutes <= 0.0 {
            return invalid("goals.monthly_minutes", "must be a positive number");
        }
        if self.sound.volume > 100 {
            return invalid("sound.volume", "must be between 0 and 100");
        }
        for custom in &self.patterns {
            if let Err(e) = custom.to_pattern() {
                return invalid(&format!("patterns.{}", custom.id), &e.to_string());
            }
        }
        Ok(())
    }

    pub fn breath_settings(&self) -> BreathSettings {
        BreathSettings {
            inhale_ms: self.breathing.inhale_ms,
            exhale_ms: self.breathing.exhale_ms,
            increment_ms: self.breathing.increment_ms,
            interrupted_exhale_ms: self.breathing.interrupted_exhale_ms,
        }
    }

    /// Speed the engine should run at, honoring developer mode.
    pub fn speed_multiplier(&self) -> f64 {
        if self.developer.enabled {
            self.developer.speed_multiplier
        } else {
            self.breathing.speed_multiplier
        }
    }

    /// Look up a pattern by id; custom patterns shadow built-in ones.
    pub fn find_pattern(&self, id: &str) -> Result<BreathPattern, PatternError> {
        match self.patterns.iter().find(|p| p.id == id) {
            Some(custom) => custom.to_pattern(),
            None => builtin_pattern(id),
        }
    }

    /// The selected pattern, or `None` for simple mode.
    pub fn resolve_pattern(&self) -> Result<Option<BreathPattern>, PatternError> {
        self.breathing
            .pattern
            .as_deref()
            .map(|id| self.find_pattern(id))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breath::PhaseKind;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.sound.volume, 50);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("visual.dark_mode").as_deref(), Some("false"));
        assert_eq!(cfg.get("breathing.inhale_ms").as_deref(), Some("4000"));
        assert_eq!(cfg.get("breathing.pattern").as_deref(), Some("null"));
        assert!(cfg.get("visual.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("sound.breath_volume", "true").unwrap();
        cfg.set("breathing.speed_multiplier", "2.5").unwrap();
        cfg.set("developer.day_offset", "-3").unwrap();
        cfg.set("breathing.pattern", "box").unwrap();
        assert!(cfg.sound.breath_volume);
        assert_eq!(cfg.breathing.speed_multiplier, 2.5);
        assert_eq!(cfg.developer.day_offset, -3);
        assert_eq!(cfg.breathing.pattern.as_deref(), Some("box"));

        cfg.set("breathing.pattern", "").unwrap();
        assert_eq!(cfg.breathing.pattern, None);
    }

    #[test]
    fn whole_number_speed_is_accepted() {
        let mut cfg = Config::default();
        cfg.set("breathing.speed_multiplier", "3").unwrap();
        assert_eq!(cfg.breathing.speed_multiplier, 3.0);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("visual.nonexistent_key", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("visual.dark_mode", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("breathing.speed_multiplier", "0").is_err());
        assert!(cfg.set("sound.volume", "101").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn custom_patterns_parse_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [breathing]
            pattern = "sleepy"

            [[patterns]]
            id = "sleepy"
            steps = [
                { name = "Inhale", seconds = 4 },
                { name = "Hold", seconds = 7 },
                { name = "Exhale", seconds = 8 },
            ]
            "#,
        )
        .unwrap();
        let pattern = cfg.resolve_pattern().unwrap().unwrap();
        assert_eq!(pattern.name(), "sleepy");
        assert_eq!(pattern.phases()[1].kind, PhaseKind::Hold);
        assert_eq!(cfg.breathing.inhale_ms, 4000);
    }

    #[test]
    fn unknown_pattern_id_is_an_error() {
        let mut cfg = Config::default();
        assert_eq!(cfg.resolve_pattern(), Ok(None));
        cfg.breathing.pattern = Some("missing".into());
        assert_eq!(
            cfg.resolve_pattern(),
            Err(PatternError::UnknownPattern("missing".into()))
        );
    }

    #[test]
    fn developer_mode_overrides_speed() {
        let mut cfg = Config::default();
        assert_eq!(cfg.speed_multiplier(), 1.0);
        cfg.developer.enabled = true;
        assert_eq!(cfg.speed_multiplier(), 10.0);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let mut cfg = Config::default();
        cfg.set("goals.monthly_minutes", "900").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().goals.monthly_minutes, 900.0);

        std::fs::write(&path, "breathing = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
