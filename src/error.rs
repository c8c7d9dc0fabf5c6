//! Error types for WoodEnergy
//!
//! This module defines the errors raised by the estimator and the
//! scenario loader. Export errors live in [`crate::export`].

use thiserror::Error;

/// Result type alias for WoodEnergy operations
pub type Result<T> = std::result::Result<T, WoodEnergyError>;

/// Main error type for WoodEnergy operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WoodEnergyError {
    /// Inputs rejected before any computation took place
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// Scenario file could not be read or parsed
    #[error("Scenario error: {0}")]
    Scenario(String),
}

/// Reasons a configuration is rejected by the precondition check
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No machine profile supplied
    #[error("At least one machine profile is required")]
    EmptyProfiles,

    /// Two profiles share the same name
    #[error("Duplicate machine: {0}")]
    DuplicateMachine(String),

    /// A quantity that must be strictly positive is not
    #[error("{field} must be > 0, got {value}")]
    NonPositive { field: String, value: f64 },

    /// Load factor outside (0, 1]
    #[error("Load factor for {machine} must be in (0, 1], got {value}")]
    LoadFactorOutOfRange { machine: String, value: f64 },

    /// Effort coefficient below the softwood baseline
    #[error("Effort coefficient for {species} must be >= 1, got {value}")]
    EffortBelowBaseline { species: String, value: f64 },

    /// Grid emissions intensity is negative (or NaN)
    #[error("Emissions intensity must be >= 0 g/kWh, got {0}")]
    NegativeEmissions(f64),

    /// Species name not present in the catalog
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),
}

impl ConfigError {
    pub(crate) fn non_positive(field: impl Into<String>, value: f64) -> Self {
        ConfigError::NonPositive {
            field: field.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WoodEnergyError::from(ConfigError::non_positive("target volume", 0.0));
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("target volume"));
    }

    #[test]
    fn test_error_conversion() {
        let err: WoodEnergyError = ConfigError::UnknownSpecies("Teak".to_string()).into();
        assert!(matches!(
            err,
            WoodEnergyError::InvalidConfiguration(ConfigError::UnknownSpecies(_))
        ));
    }
}
