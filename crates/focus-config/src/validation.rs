//! Configuration validation

use crate::schema::{RawConfig, RawEngineConfig, RawHostConfig, RawRestrictions};
use focus_util::{DayKey, HOURS_PER_DAY};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid day in [schedule]: {0}")]
    InvalidDay(String),

    #[error("Hour {hour} on {day} is out of range (expected 0-23)")]
    HourOutOfRange { day: String, hour: u32 },

    #[error("Duplicate schedule entry for {0}")]
    DuplicateDay(String),

    #[error("[engine] {field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error(
        "[engine] overlay_interval_seconds ({overlay}s) must be shorter than enforcement_interval_seconds ({enforcement}s)"
    )]
    OverlayNotFaster { overlay: u64, enforcement: u64 },

    #[error("[host] {0} cannot be empty")]
    EmptyCommand(&'static str),

    #[error("[restrictions] {0}")]
    RestrictionError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_schedule(config));
    errors.extend(validate_engine(&config.engine));
    errors.extend(validate_restrictions(&config.restrictions));
    errors.extend(validate_host(&config.host));

    errors
}

fn validate_schedule(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (name, hours) in &config.schedule {
        match name.parse::<DayKey>() {
            Ok(day) => {
                // "mon" and "monday" name the same day
                if !seen.insert(day) {
                    errors.push(ValidationError::DuplicateDay(day.name().into()));
                }
            }
            Err(_) => errors.push(ValidationError::InvalidDay(name.clone())),
        }

        for &hour in hours {
            if hour >= u32::from(HOURS_PER_DAY) {
                errors.push(ValidationError::HourOutOfRange {
                    day: name.clone(),
                    hour,
                });
            }
        }
    }

    errors
}

fn validate_engine(engine: &RawEngineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let checks = [
        ("enforcement_interval_seconds", engine.enforcement_interval_seconds),
        ("overlay_interval_seconds", engine.overlay_interval_seconds),
        ("collaborator_timeout_ms", engine.collaborator_timeout_ms),
        (
            "daily_target_minutes",
            engine.daily_target_minutes.map(u64::from),
        ),
    ];
    for (field, value) in checks {
        if value == Some(0) {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    let enforcement = engine
        .enforcement_interval_seconds
        .unwrap_or(crate::DEFAULT_ENFORCEMENT_INTERVAL_SECS);
    let overlay = engine
        .overlay_interval_seconds
        .unwrap_or(crate::DEFAULT_OVERLAY_INTERVAL_SECS);
    if overlay > 0 && enforcement > 0 && overlay >= enforcement {
        errors.push(ValidationError::OverlayNotFaster {
            overlay,
            enforcement,
        });
    }

    errors
}

fn validate_restrictions(restrictions: &RawRestrictions) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(prefixes) = &restrictions.system_prefixes
        && prefixes.iter().any(|p| p.is_empty())
    {
        errors.push(ValidationError::RestrictionError(
            "system prefixes cannot be empty strings".into(),
        ));
    }

    if let Some(allow) = &restrictions.allow_list
        && allow.iter().any(|id| id.trim().is_empty())
    {
        errors.push(ValidationError::RestrictionError(
            "allow_list entries cannot be empty".into(),
        ));
    }

    errors
}

fn validate_host(host: &RawHostConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(cmd) = &host.overlay_command
        && cmd.first().is_none_or(|program| program.is_empty())
    {
        errors.push(ValidationError::EmptyCommand("overlay_command"));
    }

    if let Some(cmd) = &host.settings_command
        && cmd.first().is_none_or(|program| program.is_empty())
    {
        errors.push(ValidationError::EmptyCommand("settings_command"));
    }

    if host.overlay_app_id.as_deref() == Some("") {
        errors.push(ValidationError::EmptyCommand("overlay_app_id"));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_schedule(entries: &[(&str, Vec<u32>)]) -> RawConfig {
        RawConfig {
            schedule: entries
                .iter()
                .map(|(day, hours)| (day.to_string(), hours.clone()))
                .collect(),
            ..RawConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RawConfig::default()).is_empty());
    }

    #[test]
    fn unknown_day_is_rejected() {
        let errors = validate_config(&config_with_schedule(&[("funday", vec![9])]));
        assert!(matches!(errors.as_slice(), [ValidationError::InvalidDay(d)] if d == "funday"));
    }

    #[test]
    fn hour_24_is_rejected() {
        let errors = validate_config(&config_with_schedule(&[("monday", vec![9, 24])]));
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::HourOutOfRange { hour: 24, .. }]
        ));
    }

    #[test]
    fn abbreviation_and_full_name_collide() {
        let errors = validate_config(&config_with_schedule(&[
            ("mon", vec![9]),
            ("monday", vec![10]),
        ]));
        assert!(matches!(errors.as_slice(), [ValidationError::DuplicateDay(_)]));
    }

    #[test]
    fn sunday_is_schedulable() {
        let errors = validate_config(&config_with_schedule(&[("sunday", vec![0, 23])]));
        assert!(errors.is_empty());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = RawConfig::default();
        config.engine.enforcement_interval_seconds = Some(0);
        config.engine.daily_target_minutes = Some(0);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::ZeroValue { .. })));
    }

    #[test]
    fn overlay_must_tick_faster_than_enforcement() {
        let mut config = RawConfig::default();
        config.engine.enforcement_interval_seconds = Some(5);
        config.engine.overlay_interval_seconds = Some(5);

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::OverlayNotFaster {
                overlay: 5,
                enforcement: 5
            }]
        ));
    }

    #[test]
    fn empty_commands_are_rejected() {
        let mut config = RawConfig::default();
        config.host.overlay_command = Some(vec![]);
        config.host.settings_command = Some(vec!["".into()]);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn empty_system_prefix_is_rejected() {
        let mut config = RawConfig::default();
        config.restrictions.system_prefixes = Some(vec!["".into()]);

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::RestrictionError(_)]
        ));
    }
}
