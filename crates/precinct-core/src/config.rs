//! Configuration loading and typed config structures for the Precinct simulation.
//!
//! The canonical configuration lives in `precinct-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a named default, so a partial file (or none at all)
//! yields a complete configuration.
//!
//! The `overrides` section is a flat map of dot-notation tunable keys
//! (see [`crate::tunables`]) applied on top of the sections at load time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use precinct_agents::config::MAX_ESTIMATE_NOISE;
use precinct_agents::{ControllerConfig, DetectiveConfig, LearningConfig, OfficerConfig};
use precinct_world::RiskConfig;
use serde::Deserialize;

use crate::rewards::RewardConfig;
use crate::tunables::{self, TunableKind};

/// Errors that can occur when loading or changing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A tunable key that does not exist.
    #[error("unknown tunable: {key}")]
    UnknownKey {
        /// The rejected key.
        key: String,
    },

    /// A value that cannot be coerced to the tunable's declared type.
    #[error("tunable {key} expects {expected}, got {found}")]
    TypeMismatch {
        /// The tunable being set.
        key: String,
        /// Its declared type.
        expected: TunableKind,
        /// The rejected value, rendered as JSON.
        found: String,
    },

    /// A value of the right type that breaks a configuration constraint.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Which constraint was broken.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Longest accepted step interval, in milliseconds.
pub const MAX_STEP_INTERVAL_MS: u64 = 60_000;

/// Top-level simulation configuration.
///
/// Mirrors the structure of `precinct-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, pacing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Roster composition and initial stats.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Episode cadence and chain limits.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Detection risk weights.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Officer outcome rewards.
    #[serde(default)]
    pub rewards: RewardConfig,

    /// Learning hyperparameters shared by every learned policy.
    #[serde(default)]
    pub learning: LearningConfig,

    /// Officer stat dynamics.
    #[serde(default)]
    pub officer: OfficerConfig,

    /// Detective audit parameters.
    #[serde(default)]
    pub detective: DetectiveConfig,

    /// Controller setpoint and reward shape.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Where stores keep their files.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dot-notation tunable overrides applied after the sections.
    #[serde(default)]
    pub overrides: BTreeMap<String, serde_json::Value>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and any
    /// tunable or validation error raised while applying `overrides`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, and
    /// any tunable or validation error raised while applying `overrides`.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self) -> Result<(), ConfigError> {
        let overrides = std::mem::take(&mut self.overrides);
        for (key, value) in &overrides {
            tunables::assign(self, key, value)?;
        }
        self.overrides = overrides;
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first broken constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            self.world.step_interval_ms <= MAX_STEP_INTERVAL_MS
                && self.world.turbo_interval_ms <= MAX_STEP_INTERVAL_MS,
            "world step intervals must not exceed 60000 ms",
        )?;

        let roster = &self.roster;
        let officers = roster
            .corrupt_officers
            .saturating_add(roster.honest_officers);
        check(officers > 0, "roster needs at least one officer")?;
        check_range(
            "roster.initial_corruption",
            roster.initial_corruption_min,
            roster.initial_corruption_max,
        )?;
        check_range(
            "roster.replacement_corruption",
            roster.replacement_corruption_min,
            roster.replacement_corruption_max,
        )?;
        check(
            (0.0..=100.0).contains(&roster.honest_integrity),
            "roster.honest_integrity must lie in [0, 100]",
        )?;

        let schedule = &self.schedule;
        check(
            schedule.inspection_frequency > 0,
            "schedule.inspection_frequency must be positive",
        )?;
        check(schedule.max_chain > 0, "schedule.max_chain must be positive")?;
        check(
            (0.0..=1.0).contains(&schedule.alert_decay),
            "schedule.alert_decay must lie in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&schedule.kickback_rate),
            "schedule.kickback_rate must lie in [0, 1]",
        )?;

        let learning = &self.learning;
        check(
            learning.learning_rate > 0.0 && learning.learning_rate.is_finite(),
            "learning.learning_rate must be positive",
        )?;
        check(
            (0.0..=1.0).contains(&learning.gamma),
            "learning.gamma must lie in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&learning.epsilon_min),
            "learning.epsilon_min must lie in [0, 1]",
        )?;
        check(
            learning.epsilon_decay > 0.0 && learning.epsilon_decay <= 1.0,
            "learning.epsilon_decay must lie in (0, 1]",
        )?;
        check(
            learning.batch_size > 0 && learning.memory_size >= learning.batch_size,
            "learning.memory_size must be at least learning.batch_size, which must be positive",
        )?;
        check(learning.hidden_dim > 0, "learning.hidden_dim must be positive")?;
        check(
            learning.gradient_clip > 0.0,
            "learning.gradient_clip must be positive",
        )?;

        check(
            self.controller.tolerance >= 0.0,
            "controller.tolerance must not be negative",
        )?;
        check(
            (0.0..=MAX_ESTIMATE_NOISE).contains(&self.detective.estimate_noise),
            "detective.estimate_noise must lie in [0, 100]",
        )?;
        let risk = &self.risk;
        check(
            [
                risk.witness_risk_factor,
                risk.detective_risk_factor,
                risk.location_risk_weight,
                risk.severity_risk_factor,
                risk.alert_risk_factor,
            ]
            .iter()
            .all(|w| *w >= 0.0 && w.is_finite()),
            "risk weights must be finite and non-negative",
        )
    }
}

fn check(ok: bool, reason: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: reason.to_owned(),
        })
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    check(
        (0.0..=100.0).contains(&min) && (0.0..=100.0).contains(&max) && min <= max,
        &format!("{name} must satisfy 0 <= min <= max <= 100"),
    )
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between steps.
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Real-time milliseconds between steps in turbo mode.
    #[serde(default)]
    pub turbo_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            step_interval_ms: default_step_interval_ms(),
            turbo_interval_ms: 0,
        }
    }
}

/// Roster composition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosterConfig {
    /// Corrupt officers in a fresh roster.
    #[serde(default = "default_corrupt_officers")]
    pub corrupt_officers: u32,

    /// Honest officers in a fresh roster.
    #[serde(default = "default_honest_officers")]
    pub honest_officers: u32,

    /// Lower bound of a fresh corrupt officer's corruption score.
    #[serde(default = "default_initial_corruption_min")]
    pub initial_corruption_min: f64,

    /// Upper bound of a fresh corrupt officer's corruption score.
    #[serde(default = "default_initial_corruption_max")]
    pub initial_corruption_max: f64,

    /// Lower bound of a replacement's corruption score.
    #[serde(default = "default_replacement_corruption_min")]
    pub replacement_corruption_min: f64,

    /// Upper bound of a replacement's corruption score.
    #[serde(default = "default_replacement_corruption_max")]
    pub replacement_corruption_max: f64,

    /// Centre of an honest officer's starting loyalty (spread of +/- 5).
    #[serde(default = "default_honest_integrity")]
    pub honest_integrity: f64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            corrupt_officers: default_corrupt_officers(),
            honest_officers: default_honest_officers(),
            initial_corruption_min: default_initial_corruption_min(),
            initial_corruption_max: default_initial_corruption_max(),
            replacement_corruption_min: default_replacement_corruption_min(),
            replacement_corruption_max: default_replacement_corruption_max(),
            honest_integrity: default_honest_integrity(),
        }
    }
}

/// Episode cadence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleConfig {
    /// Episodes between hierarchy passes.
    #[serde(default = "default_inspection_frequency")]
    pub inspection_frequency: u64,

    /// Roster members sampled per hierarchy pass.
    #[serde(default = "default_audit_sample_size")]
    pub audit_sample_size: usize,

    /// Amount the global alert level falls each episode.
    #[serde(default = "default_alert_decay")]
    pub alert_decay: f64,

    /// Episodes per session before the runner stops (0 = unlimited).
    #[serde(default = "default_episode_window")]
    pub episode_window: u64,

    /// Maximum resolutions per episode.
    #[serde(default = "default_max_chain")]
    pub max_chain: u32,

    /// Share of a paid offer routed to the controller.
    #[serde(default = "default_kickback_rate")]
    pub kickback_rate: f64,

    /// In turbo mode, observers see every Nth episode.
    #[serde(default = "default_turbo_snapshot_interval")]
    pub turbo_snapshot_interval: u64,

    /// Stats rows replayed on cold start.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Whether every resolution is appended to the action history.
    #[serde(default = "default_persist_history")]
    pub persist_history: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            inspection_frequency: default_inspection_frequency(),
            audit_sample_size: default_audit_sample_size(),
            alert_decay: default_alert_decay(),
            episode_window: default_episode_window(),
            max_chain: default_max_chain(),
            kickback_rate: default_kickback_rate(),
            turbo_snapshot_interval: default_turbo_snapshot_interval(),
            history_window: default_history_window(),
            persist_history: default_persist_history(),
        }
    }
}

impl ScheduleConfig {
    /// Whether `session_episodes` has reached the episode window.
    ///
    /// A window of 0 never ends the session.
    pub const fn window_reached(&self, session_episodes: u64) -> bool {
        self.episode_window > 0 && session_episodes >= self.episode_window
    }

    /// Whether a turbo-mode observer sees the `session_episode`-th episode.
    pub const fn is_snapshot(&self, session_episode: u64) -> bool {
        match session_episode.checked_rem(self.turbo_snapshot_interval) {
            Some(rest) => rest == 0,
            None => true,
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory for the roster, history, and stats files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for learned-state blobs.
    #[serde(default = "default_brain_dir")]
    pub brain_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            brain_dir: default_brain_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("Precinct")
}

const fn default_seed() -> u64 {
    42
}

const fn default_step_interval_ms() -> u64 {
    50
}

const fn default_corrupt_officers() -> u32 {
    5
}

const fn default_honest_officers() -> u32 {
    2
}

const fn default_initial_corruption_min() -> f64 {
    60.0
}

const fn default_initial_corruption_max() -> f64 {
    90.0
}

const fn default_replacement_corruption_min() -> f64 {
    30.0
}

const fn default_replacement_corruption_max() -> f64 {
    60.0
}

const fn default_honest_integrity() -> f64 {
    90.0
}

const fn default_inspection_frequency() -> u64 {
    10
}

const fn default_audit_sample_size() -> usize {
    3
}

const fn default_alert_decay() -> f64 {
    0.05
}

const fn default_episode_window() -> u64 {
    5_000
}

const fn default_max_chain() -> u32 {
    3
}

const fn default_kickback_rate() -> f64 {
    0.10
}

const fn default_turbo_snapshot_interval() -> u64 {
    100
}

const fn default_history_window() -> usize {
    200
}

const fn default_persist_history() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_brain_dir() -> PathBuf {
    PathBuf::from("brains")
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config.roster.corrupt_officers, 5);
        assert_eq!(config.roster.honest_officers, 2);
        assert_eq!(config.schedule.inspection_frequency, 10);
        assert_eq!(config.schedule.max_chain, 3);
        assert!((config.controller.target_corruption - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.learning.batch_size, 32);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r"
world:
  seed: 7
schedule:
  inspection_frequency: 4
risk:
  witness_risk_factor: 0.05
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.name, "Precinct");
        assert_eq!(config.schedule.inspection_frequency, 4);
        assert_eq!(config.schedule.audit_sample_size, 3);
        assert!((config.risk.witness_risk_factor - 0.05).abs() < f64::EPSILON);
        assert!((config.risk.detective_risk_factor - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn overrides_are_applied_on_load() {
        let yaml = r#"
overrides:
  controller.target_corruption: 35
  schedule.inspection_frequency: "5"
"#;
        let config = SimulationConfig::parse(yaml).unwrap();
        assert!((config.controller.target_corruption - 35.0).abs() < f64::EPSILON);
        assert_eq!(config.schedule.inspection_frequency, 5);
    }

    #[test]
    fn unknown_override_is_rejected() {
        let yaml = "overrides:\n  chief.mood: 3\n";
        let err = SimulationConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { .. }));
    }

    #[test]
    fn inverted_corruption_range_is_invalid() {
        let yaml = "roster:\n  initial_corruption_min: 95\n  initial_corruption_max: 60\n";
        let err = SimulationConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn schedule_bounds_follow_live_values() {
        let mut schedule = ScheduleConfig {
            episode_window: 0,
            ..ScheduleConfig::default()
        };
        assert!(!schedule.window_reached(u64::MAX));
        schedule.episode_window = 4;
        assert!(!schedule.window_reached(3));
        assert!(schedule.window_reached(4));

        schedule.turbo_snapshot_interval = 10;
        assert!(schedule.is_snapshot(20));
        assert!(!schedule.is_snapshot(21));
        schedule.turbo_snapshot_interval = 0;
        assert!(schedule.is_snapshot(21));
    }

    #[test]
    fn estimate_noise_must_be_bounded() {
        for noise in ["1e308", ".inf", "-1"] {
            let yaml = format!("detective:\n  estimate_noise: {noise}\n");
            let err = SimulationConfig::parse(&yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{noise}");
        }
        let config = SimulationConfig::parse("detective:\n  estimate_noise: 100\n").unwrap();
        assert!((config.detective.estimate_noise - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/precinct.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
