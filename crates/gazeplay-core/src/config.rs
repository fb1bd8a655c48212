//! Configuration surface.
//!
//! `GazeplayConfig` is the on-disk (TOML) form with durations in seconds.
//! [`ThresholdConfig`] is the engine's view, with durations converted once
//! to whole microseconds so dwell comparisons are exact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::sec_to_us;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable {name}: {reason}")]
    EnvVar { name: String, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GazeplayConfig {
    #[serde(default)]
    pub thresholds: ThresholdSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdSection {
    /// Vertical metric must exceed this to count as attending. Live-tunable.
    pub pitch_down_threshold: f32,
    /// |yaw| and |roll| must both stay under this bound (radians) to face the screen.
    pub facing_angle_bound_rad: f32,
    /// Consecutive direct-pose frames before the landmark path is skipped.
    pub max_stable_frames: u32,
}

impl Default for ThresholdSection {
    fn default() -> Self {
        Self {
            pitch_down_threshold: -0.35,
            facing_angle_bound_rad: 0.35,
            max_stable_frames: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingSection {
    pub on_delay_sec: f32,
    pub off_delay_sec: f32,
    pub min_frame_interval_sec: f32,
    pub landmark_refresh_interval_sec: f32,
    pub face_loss_timeout_sec: f32,
    pub watchdog_period_sec: f32,
    pub command_min_interval_sec: f32,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            on_delay_sec: 0.5,
            off_delay_sec: 1.2,
            min_frame_interval_sec: 0.1,
            landmark_refresh_interval_sec: 1.0,
            face_loss_timeout_sec: 2.0,
            watchdog_period_sec: 0.5,
            command_min_interval_sec: 1.5,
        }
    }
}

/// Which playback sink the dispatcher is wired to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// Post a single platform play/pause toggle.
    #[default]
    MediaKey,
    /// Script the active browser tab on an allow-listed media domain.
    TabScript,
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MediaKey => f.write_str("media_key"),
            Self::TabScript => f.write_str("tab_script"),
        }
    }
}

impl FromStr for DispatchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "media_key" => Ok(Self::MediaKey),
            "tab_script" => Ok(Self::TabScript),
            other => Err(ConfigError::Validation(format!(
                "unknown dispatch strategy '{other}' (expected media_key or tab_script)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchSection {
    pub strategy: DispatchStrategy,
    /// Media domains the tab-script strategy may control.
    pub domain_allowlist: Vec<String>,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            strategy: DispatchStrategy::MediaKey,
            domain_allowlist: [
                "youtube.com",
                "netflix.com",
                "twitch.tv",
                "vimeo.com",
                "primevideo.com",
                "disneyplus.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        }
    }
}

/// Engine-facing thresholds. Everything is fixed at construction except
/// `pitch_down_threshold`, which the classifier accepts live updates for.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    pub pitch_down_threshold: f32,
    pub facing_angle_bound: f32,
    pub max_stable_frames: u32,
    pub on_delay_us: u64,
    pub off_delay_us: u64,
    pub min_frame_interval_us: u64,
    pub landmark_refresh_interval_us: u64,
    pub face_loss_timeout_us: u64,
    pub watchdog_period_us: u64,
    pub command_min_interval_us: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        GazeplayConfig::default().threshold_config()
    }
}

impl GazeplayConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: GazeplayConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `GAZEPLAY_*` environment overrides applied.
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists)
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    ///
    /// A user file replaces the default file wholesale; fields it omits take
    /// built-in defaults.
    pub fn load_layered(
        default_path: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = GazeplayConfig::default();

        if let Some(path) = default_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        if let Some(path) = user_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Keys use the
    /// `GAZEPLAY_` prefix, e.g. `GAZEPLAY_ON_DELAY_SEC`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            name: &str,
        ) -> Result<Option<T>, ConfigError> {
            match lookup(name) {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                    ConfigError::EnvVar {
                        name: name.to_string(),
                        reason: format!("cannot parse '{raw}'"),
                    }
                }),
            }
        }

        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;

        if let Some(v) = parsed(lookup, "GAZEPLAY_PITCH_DOWN_THRESHOLD")? {
            self.thresholds.pitch_down_threshold = v;
        }
        if let Some(v) = parsed(lookup, "GAZEPLAY_FACING_ANGLE_BOUND_RAD")? {
            self.thresholds.facing_angle_bound_rad = v;
        }
        if let Some(v) = parsed(lookup, "GAZEPLAY_MAX_STABLE_FRAMES")? {
            self.thresholds.max_stable_frames = v;
        }

        let timing: [(&str, &mut f32); 7] = [
            ("GAZEPLAY_ON_DELAY_SEC", &mut self.timing.on_delay_sec),
            ("GAZEPLAY_OFF_DELAY_SEC", &mut self.timing.off_delay_sec),
            (
                "GAZEPLAY_MIN_FRAME_INTERVAL_SEC",
                &mut self.timing.min_frame_interval_sec,
            ),
            (
                "GAZEPLAY_LANDMARK_REFRESH_INTERVAL_SEC",
                &mut self.timing.landmark_refresh_interval_sec,
            ),
            (
                "GAZEPLAY_FACE_LOSS_TIMEOUT_SEC",
                &mut self.timing.face_loss_timeout_sec,
            ),
            (
                "GAZEPLAY_WATCHDOG_PERIOD_SEC",
                &mut self.timing.watchdog_period_sec,
            ),
            (
                "GAZEPLAY_COMMAND_MIN_INTERVAL_SEC",
                &mut self.timing.command_min_interval_sec,
            ),
        ];
        for (name, slot) in timing {
            if let Some(v) = parsed(lookup, name)? {
                *slot = v;
            }
        }

        if let Some(raw) = lookup("GAZEPLAY_DISPATCH_STRATEGY") {
            self.dispatch.strategy = raw.parse().map_err(|e: ConfigError| ConfigError::EnvVar {
                name: "GAZEPLAY_DISPATCH_STRATEGY".to_string(),
                reason: e.to_string(),
            })?;
        }
        if let Some(raw) = lookup("GAZEPLAY_DOMAIN_ALLOWLIST") {
            self.dispatch.domain_allowlist = raw
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let th = &self.thresholds;
        if !th.pitch_down_threshold.is_finite() {
            return Err(ConfigError::Validation(
                "thresholds.pitch_down_threshold must be finite".to_string(),
            ));
        }
        if !(th.facing_angle_bound_rad > 0.0
            && th.facing_angle_bound_rad <= std::f32::consts::FRAC_PI_2)
        {
            return Err(ConfigError::Validation(
                "thresholds.facing_angle_bound_rad must be in (0, pi/2]".to_string(),
            ));
        }
        if th.max_stable_frames == 0 {
            return Err(ConfigError::Validation(
                "thresholds.max_stable_frames must be > 0".to_string(),
            ));
        }

        let t = &self.timing;
        let durations = [
            ("on_delay_sec", t.on_delay_sec),
            ("off_delay_sec", t.off_delay_sec),
            ("min_frame_interval_sec", t.min_frame_interval_sec),
            ("landmark_refresh_interval_sec", t.landmark_refresh_interval_sec),
            ("face_loss_timeout_sec", t.face_loss_timeout_sec),
            ("watchdog_period_sec", t.watchdog_period_sec),
            ("command_min_interval_sec", t.command_min_interval_sec),
        ];
        for (name, value) in durations {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "timing.{name} must be positive"
                )));
            }
        }
        // The watchdog injects a plain observation; it can only force Away
        // if the off-dwell fits inside the face-loss timeout.
        if t.off_delay_sec > t.face_loss_timeout_sec {
            return Err(ConfigError::Validation(
                "timing.off_delay_sec must be <= face_loss_timeout_sec".to_string(),
            ));
        }

        let d = &self.dispatch;
        if d.strategy == DispatchStrategy::TabScript && d.domain_allowlist.is_empty() {
            return Err(ConfigError::Validation(
                "dispatch.domain_allowlist must not be empty for tab_script".to_string(),
            ));
        }
        if let Some(bad) = d
            .domain_allowlist
            .iter()
            .find(|dom| dom.trim().is_empty() || dom.contains('/'))
        {
            return Err(ConfigError::Validation(format!(
                "dispatch.domain_allowlist entry '{bad}' is not a bare domain"
            )));
        }

        Ok(())
    }

    /// Engine view with durations in microseconds.
    pub fn threshold_config(&self) -> ThresholdConfig {
        let t = &self.timing;
        ThresholdConfig {
            pitch_down_threshold: self.thresholds.pitch_down_threshold,
            facing_angle_bound: self.thresholds.facing_angle_bound_rad,
            max_stable_frames: self.thresholds.max_stable_frames,
            on_delay_us: sec_to_us(t.on_delay_sec),
            off_delay_us: sec_to_us(t.off_delay_sec),
            min_frame_interval_us: sec_to_us(t.min_frame_interval_sec),
            landmark_refresh_interval_us: sec_to_us(t.landmark_refresh_interval_sec),
            face_loss_timeout_us: sec_to_us(t.face_loss_timeout_sec),
            watchdog_period_us: sec_to_us(t.watchdog_period_sec),
            command_min_interval_us: sec_to_us(t.command_min_interval_sec),
        }
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        fs::write(path, content)?;
        Ok(())
    }
}
