//! Validation settings threaded explicitly through table construction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// How strictly tables are checked when they are constructed.
///
/// # Example
///
/// ```rust
/// use phi_core::TpmConfig;
///
/// let config = TpmConfig::from_json_str(r#"{ "check_independence": false }"#).unwrap();
/// assert!(config.validate);
/// assert!(!config.check_independence);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpmConfig {
    /// Check probabilities and shape, then canonicalize to multidimensional form.
    pub validate: bool,
    /// Also check conditional independence of state-by-state tables (expensive).
    pub check_independence: bool,
    /// Allowed deviation of a state-by-state row sum from 1.
    pub row_sum_tolerance: f64,
    /// Allowed deviation of the conversion round trip from the original table.
    pub independence_tolerance: f64,
}

impl Default for TpmConfig {
    fn default() -> Self {
        Self {
            validate: true,
            check_independence: true,
            row_sum_tolerance: 1e-5,
            independence_tolerance: 1e-8,
        }
    }
}

impl TpmConfig {
    /// Store tables exactly as given.
    pub fn unchecked() -> Self {
        Self {
            validate: false,
            check_independence: false,
            ..Self::default()
        }
    }

    /// Builder: toggle the conditional-independence check.
    pub fn with_independence_check(mut self, check: bool) -> Self {
        self.check_independence = check;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] on malformed JSON or a negative
    /// or non-finite tolerance.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json).map_err(|e| CoreError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.check()?;
        debug!(?config, "loaded TPM config");
        Ok(config)
    }

    /// Check that both tolerances are finite and non-negative.
    pub fn check(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("row_sum_tolerance", self.row_sum_tolerance),
            ("independence_tolerance", self.independence_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidConfig {
                    reason: format!("{name} must be a finite non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TpmConfig::default();
        assert!(config.validate);
        assert!(config.check_independence);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = TpmConfig::from_json_str(r#"{ "row_sum_tolerance": 0.001 }"#).unwrap();
        assert_eq!(config.row_sum_tolerance, 0.001);
        assert_eq!(config.independence_tolerance, 1e-8);
    }

    #[test]
    fn test_from_json_rejects_negative_tolerance() {
        let result = TpmConfig::from_json_str(r#"{ "independence_tolerance": -1.0 }"#);
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = TpmConfig::from_json_str("not json");
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn test_unchecked() {
        let config = TpmConfig::unchecked();
        assert!(!config.validate);
        assert!(!config.check_independence);
    }
}
