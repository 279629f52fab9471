//! The runtime tunable overlay.
//!
//! A flat namespace of dot-notation keys (`controller.target_corruption`,
//! `schedule.inspection_frequency`, ...) over [`SimulationConfig`]. Each key
//! has a declared [`TunableKind`]; [`set`] coerces an incoming JSON value
//! (numbers, numeric strings, booleans) to that kind, validates the
//! resulting configuration as a whole, and only then commits it. On any
//! error the prior configuration is retained.
//!
//! Network shape (`learning.hidden_dim`) and replay capacity
//! (`learning.memory_size`) are fixed at construction and are not exposed.

use std::fmt;

use serde_json::Value;

use crate::config::{ConfigError, SimulationConfig};

/// Declared type of a tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunableKind {
    /// A finite floating-point number.
    Float,
    /// A non-negative integer.
    Integer,
    /// A boolean flag.
    Bool,
}

impl fmt::Display for TunableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => f.write_str("float"),
            Self::Integer => f.write_str("integer"),
            Self::Bool => f.write_str("bool"),
        }
    }
}

/// Every tunable key, grouped by section.
pub const KEYS: &[&str] = &[
    "world.step_interval_ms",
    "world.turbo_interval_ms",
    "roster.replacement_corruption_min",
    "roster.replacement_corruption_max",
    "schedule.inspection_frequency",
    "schedule.audit_sample_size",
    "schedule.alert_decay",
    "schedule.episode_window",
    "schedule.max_chain",
    "schedule.kickback_rate",
    "schedule.turbo_snapshot_interval",
    "schedule.history_window",
    "schedule.persist_history",
    "risk.witness_risk_factor",
    "risk.detective_risk_factor",
    "risk.location_risk_weight",
    "risk.severity_risk_factor",
    "risk.alert_risk_factor",
    "rewards.arrest_success",
    "rewards.arrest_failed",
    "rewards.investigate_success",
    "rewards.de_escalate_success",
    "rewards.de_escalate_failed",
    "rewards.severe_injury",
    "rewards.ticket_success",
    "rewards.ticket_invalid",
    "rewards.report_success",
    "rewards.warrant_success",
    "rewards.whistleblow_success",
    "rewards.success_multiplier",
    "rewards.extortion_success",
    "rewards.frame_success",
    "rewards.tip_off_success",
    "rewards.tip_off_useless",
    "rewards.destroy_success",
    "rewards.intimidate_success",
    "rewards.intimidate_useless",
    "rewards.steal_useless",
    "rewards.brutality_success",
    "rewards.isolate_success",
    "rewards.isolate_useless",
    "rewards.caught",
    "learning.learning_rate",
    "learning.gamma",
    "learning.epsilon_start",
    "learning.epsilon_min",
    "learning.epsilon_decay",
    "learning.batch_size",
    "learning.target_update",
    "learning.gradient_clip",
    "learning.inheritance_margin",
    "officer.corruption_gain",
    "officer.corruption_loss",
    "officer.paranoia_gain",
    "officer.loyalty_loss",
    "officer.default_bribe",
    "officer.honest_offer_threshold",
    "detective.guilty_threshold",
    "detective.estimate_noise",
    "detective.solved_reward",
    "detective.wrongful_reward",
    "detective.missed_reward",
    "detective.cleared_reward",
    "controller.target_corruption",
    "controller.tolerance",
    "controller.execute_base",
    "controller.execute_gain",
    "controller.fire_above_reward",
    "controller.warning_penalty",
    "controller.warning_base",
    "controller.warning_gain",
    "controller.execute_penalty",
    "controller.deficit_scale",
    "controller.fire_below_reward",
    "controller.status_quo_reward",
    "controller.fire_corruption_penalty",
];

/// A mutable view of one tunable field.
enum Slot<'a> {
    Float(&'a mut f64),
    Integer(&'a mut u64),
    Count(&'a mut u32),
    Size(&'a mut usize),
    Bool(&'a mut bool),
}

impl Slot<'_> {
    const fn kind(&self) -> TunableKind {
        match self {
            Self::Float(_) => TunableKind::Float,
            Self::Integer(_) | Self::Count(_) | Self::Size(_) => TunableKind::Integer,
            Self::Bool(_) => TunableKind::Bool,
        }
    }

    fn current(&self) -> Value {
        match self {
            Self::Float(v) => Value::from(**v),
            Self::Integer(v) => Value::from(**v),
            Self::Count(v) => Value::from(**v),
            Self::Size(v) => Value::from(**v),
            Self::Bool(v) => Value::from(**v),
        }
    }

    fn write(self, key: &str, value: &Value) -> Result<(), ConfigError> {
        let mismatch = |expected| ConfigError::TypeMismatch {
            key: key.to_owned(),
            expected,
            found: value.to_string(),
        };
        match self {
            Self::Float(slot) => {
                *slot = coerce_float(value).ok_or_else(|| mismatch(TunableKind::Float))?;
            }
            Self::Integer(slot) => {
                *slot = coerce_integer(value).ok_or_else(|| mismatch(TunableKind::Integer))?;
            }
            Self::Count(slot) => {
                *slot = coerce_integer(value)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| mismatch(TunableKind::Integer))?;
            }
            Self::Size(slot) => {
                *slot = coerce_integer(value)
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| mismatch(TunableKind::Integer))?;
            }
            Self::Bool(slot) => {
                *slot = coerce_bool(value).ok_or_else(|| mismatch(TunableKind::Bool))?;
            }
        }
        Ok(())
    }
}

#[allow(clippy::too_many_lines)]
fn slot<'a>(config: &'a mut SimulationConfig, key: &str) -> Option<Slot<'a>> {
    let c = config;
    let slot = match key {
        "world.step_interval_ms" => Slot::Integer(&mut c.world.step_interval_ms),
        "world.turbo_interval_ms" => Slot::Integer(&mut c.world.turbo_interval_ms),

        "roster.replacement_corruption_min" => {
            Slot::Float(&mut c.roster.replacement_corruption_min)
        }
        "roster.replacement_corruption_max" => {
            Slot::Float(&mut c.roster.replacement_corruption_max)
        }

        "schedule.inspection_frequency" => Slot::Integer(&mut c.schedule.inspection_frequency),
        "schedule.audit_sample_size" => Slot::Size(&mut c.schedule.audit_sample_size),
        "schedule.alert_decay" => Slot::Float(&mut c.schedule.alert_decay),
        "schedule.episode_window" => Slot::Integer(&mut c.schedule.episode_window),
        "schedule.max_chain" => Slot::Count(&mut c.schedule.max_chain),
        "schedule.kickback_rate" => Slot::Float(&mut c.schedule.kickback_rate),
        "schedule.turbo_snapshot_interval" => {
            Slot::Integer(&mut c.schedule.turbo_snapshot_interval)
        }
        "schedule.history_window" => Slot::Size(&mut c.schedule.history_window),
        "schedule.persist_history" => Slot::Bool(&mut c.schedule.persist_history),

        "risk.witness_risk_factor" => Slot::Float(&mut c.risk.witness_risk_factor),
        "risk.detective_risk_factor" => Slot::Float(&mut c.risk.detective_risk_factor),
        "risk.location_risk_weight" => Slot::Float(&mut c.risk.location_risk_weight),
        "risk.severity_risk_factor" => Slot::Float(&mut c.risk.severity_risk_factor),
        "risk.alert_risk_factor" => Slot::Float(&mut c.risk.alert_risk_factor),

        "rewards.arrest_success" => Slot::Float(&mut c.rewards.arrest_success),
        "rewards.arrest_failed" => Slot::Float(&mut c.rewards.arrest_failed),
        "rewards.investigate_success" => Slot::Float(&mut c.rewards.investigate_success),
        "rewards.de_escalate_success" => Slot::Float(&mut c.rewards.de_escalate_success),
        "rewards.de_escalate_failed" => Slot::Float(&mut c.rewards.de_escalate_failed),
        "rewards.severe_injury" => Slot::Float(&mut c.rewards.severe_injury),
        "rewards.ticket_success" => Slot::Float(&mut c.rewards.ticket_success),
        "rewards.ticket_invalid" => Slot::Float(&mut c.rewards.ticket_invalid),
        "rewards.report_success" => Slot::Float(&mut c.rewards.report_success),
        "rewards.warrant_success" => Slot::Float(&mut c.rewards.warrant_success),
        "rewards.whistleblow_success" => Slot::Float(&mut c.rewards.whistleblow_success),
        "rewards.success_multiplier" => Slot::Float(&mut c.rewards.success_multiplier),
        "rewards.extortion_success" => Slot::Float(&mut c.rewards.extortion_success),
        "rewards.frame_success" => Slot::Float(&mut c.rewards.frame_success),
        "rewards.tip_off_success" => Slot::Float(&mut c.rewards.tip_off_success),
        "rewards.tip_off_useless" => Slot::Float(&mut c.rewards.tip_off_useless),
        "rewards.destroy_success" => Slot::Float(&mut c.rewards.destroy_success),
        "rewards.intimidate_success" => Slot::Float(&mut c.rewards.intimidate_success),
        "rewards.intimidate_useless" => Slot::Float(&mut c.rewards.intimidate_useless),
        "rewards.steal_useless" => Slot::Float(&mut c.rewards.steal_useless),
        "rewards.brutality_success" => Slot::Float(&mut c.rewards.brutality_success),
        "rewards.isolate_success" => Slot::Float(&mut c.rewards.isolate_success),
        "rewards.isolate_useless" => Slot::Float(&mut c.rewards.isolate_useless),
        "rewards.caught" => Slot::Float(&mut c.rewards.caught),

        "learning.learning_rate" => Slot::Float(&mut c.learning.learning_rate),
        "learning.gamma" => Slot::Float(&mut c.learning.gamma),
        "learning.epsilon_start" => Slot::Float(&mut c.learning.epsilon_start),
        "learning.epsilon_min" => Slot::Float(&mut c.learning.epsilon_min),
        "learning.epsilon_decay" => Slot::Float(&mut c.learning.epsilon_decay),
        "learning.batch_size" => Slot::Size(&mut c.learning.batch_size),
        "learning.target_update" => Slot::Integer(&mut c.learning.target_update),
        "learning.gradient_clip" => Slot::Float(&mut c.learning.gradient_clip),
        "learning.inheritance_margin" => Slot::Float(&mut c.learning.inheritance_margin),

        "officer.corruption_gain" => Slot::Float(&mut c.officer.corruption_gain),
        "officer.corruption_loss" => Slot::Float(&mut c.officer.corruption_loss),
        "officer.paranoia_gain" => Slot::Float(&mut c.officer.paranoia_gain),
        "officer.loyalty_loss" => Slot::Float(&mut c.officer.loyalty_loss),
        "officer.default_bribe" => Slot::Integer(&mut c.officer.default_bribe),
        "officer.honest_offer_threshold" => Slot::Integer(&mut c.officer.honest_offer_threshold),

        "detective.guilty_threshold" => Slot::Float(&mut c.detective.guilty_threshold),
        "detective.estimate_noise" => Slot::Float(&mut c.detective.estimate_noise),
        "detective.solved_reward" => Slot::Float(&mut c.detective.solved_reward),
        "detective.wrongful_reward" => Slot::Float(&mut c.detective.wrongful_reward),
        "detective.missed_reward" => Slot::Float(&mut c.detective.missed_reward),
        "detective.cleared_reward" => Slot::Float(&mut c.detective.cleared_reward),

        "controller.target_corruption" => Slot::Float(&mut c.controller.target_corruption),
        "controller.tolerance" => Slot::Float(&mut c.controller.tolerance),
        "controller.execute_base" => Slot::Float(&mut c.controller.execute_base),
        "controller.execute_gain" => Slot::Float(&mut c.controller.execute_gain),
        "controller.fire_above_reward" => Slot::Float(&mut c.controller.fire_above_reward),
        "controller.warning_penalty" => Slot::Float(&mut c.controller.warning_penalty),
        "controller.warning_base" => Slot::Float(&mut c.controller.warning_base),
        "controller.warning_gain" => Slot::Float(&mut c.controller.warning_gain),
        "controller.execute_penalty" => Slot::Float(&mut c.controller.execute_penalty),
        "controller.deficit_scale" => Slot::Float(&mut c.controller.deficit_scale),
        "controller.fire_below_reward" => Slot::Float(&mut c.controller.fire_below_reward),
        "controller.status_quo_reward" => Slot::Float(&mut c.controller.status_quo_reward),
        "controller.fire_corruption_penalty" => {
            Slot::Float(&mut c.controller.fire_corruption_penalty)
        }

        _ => return None,
    };
    Some(slot)
}

/// Declared type of `key`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKey`] if `key` is not a tunable.
pub fn kind(key: &str) -> Result<TunableKind, ConfigError> {
    let mut scratch = SimulationConfig::default();
    slot(&mut scratch, key)
        .map(|s| s.kind())
        .ok_or_else(|| unknown(key))
}

/// Current value of `key` in `config`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKey`] if `key` is not a tunable.
pub fn get(config: &SimulationConfig, key: &str) -> Result<Value, ConfigError> {
    let mut view = config.clone();
    slot(&mut view, key)
        .map(|s| s.current())
        .ok_or_else(|| unknown(key))
}

/// Coerce `value` to the declared type of `key` and commit it to `config`
/// if the resulting configuration is valid.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKey`], [`ConfigError::TypeMismatch`], or
/// [`ConfigError::Invalid`]; `config` is unchanged in every case.
pub fn set(config: &mut SimulationConfig, key: &str, value: &Value) -> Result<(), ConfigError> {
    let mut candidate = config.clone();
    assign(&mut candidate, key, value)?;
    candidate.validate()?;
    *config = candidate;
    Ok(())
}

/// Coerce and write without validating the configuration as a whole.
pub(crate) fn assign(
    config: &mut SimulationConfig,
    key: &str,
    value: &Value,
) -> Result<(), ConfigError> {
    slot(config, key)
        .ok_or_else(|| unknown(key))?
        .write(key, value)
}

fn unknown(key: &str) -> ConfigError {
    ConfigError::UnknownKey {
        key: key.to_owned(),
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn coerce_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn whole_number(value: f64) -> Option<u64> {
    let whole = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (whole && value <= u64::MAX as f64).then_some(value as u64)
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn every_listed_key_resolves() {
        let config = SimulationConfig::default();
        for key in KEYS {
            assert!(get(&config, key).is_ok(), "{key}");
        }
    }

    #[test]
    fn unknown_key_is_rejected_and_config_kept() {
        let mut config = SimulationConfig::default();
        let err = set(&mut config, "controller.mood", &json!(1.0)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { .. }));
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn shape_parameters_are_not_tunable() {
        assert!(kind("learning.hidden_dim").is_err());
        assert!(kind("learning.memory_size").is_err());
    }

    #[test]
    fn numbers_are_coerced_to_declared_kind() {
        let mut config = SimulationConfig::default();
        set(&mut config, "controller.target_corruption", &json!(40)).unwrap();
        assert!((config.controller.target_corruption - 40.0).abs() < f64::EPSILON);

        set(&mut config, "schedule.inspection_frequency", &json!(25.0)).unwrap();
        assert_eq!(config.schedule.inspection_frequency, 25);

        set(&mut config, "schedule.max_chain", &json!("4")).unwrap();
        assert_eq!(config.schedule.max_chain, 4);

        set(&mut config, "risk.alert_risk_factor", &json!(" 0.5 ")).unwrap();
        assert!((config.risk.alert_risk_factor - 0.5).abs() < f64::EPSILON);

        set(&mut config, "schedule.persist_history", &json!("off")).unwrap();
        assert!(!config.schedule.persist_history);
    }

    #[test]
    fn mistyped_values_keep_prior_value() {
        let mut config = SimulationConfig::default();
        for (key, value) in [
            ("schedule.inspection_frequency", json!(2.5)),
            ("schedule.inspection_frequency", json!(-3)),
            ("controller.tolerance", json!("wide")),
            ("controller.tolerance", json!(true)),
            ("schedule.persist_history", json!(7)),
        ] {
            let err = set(&mut config, key, &value).unwrap_err();
            assert!(matches!(err, ConfigError::TypeMismatch { .. }), "{key}");
        }
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected_as_a_whole() {
        let mut config = SimulationConfig::default();
        let err = set(&mut config, "schedule.inspection_frequency", &json!(0)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(config.schedule.inspection_frequency, 10);
    }

    #[test]
    fn kinds_are_reported() {
        assert_eq!(kind("rewards.caught").unwrap(), TunableKind::Float);
        assert_eq!(kind("learning.batch_size").unwrap(), TunableKind::Integer);
        assert_eq!(kind("schedule.persist_history").unwrap(), TunableKind::Bool);
    }
}
