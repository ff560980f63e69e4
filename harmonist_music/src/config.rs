// Data-driven generator configuration.
//
// Every tunable of a generation run lives in `GeneratorConfig`, loaded from
// JSON. Missing fields take their defaults, so a config file only needs the
// values it changes; an empty object `{}` is the stock configuration. The CLI
// loads a file (if given) and then overrides individual fields from flags.
//
// See also: `evolution.rs` for `EvolutionConfig`, `fitness.rs` for
// `FitnessWeights`, `style.rs` for `Style`.

use crate::error::{Error, Result};
use crate::evolution::EvolutionConfig;
use crate::fitness::FitnessWeights;
use crate::midi::ImportOptions;
use crate::style::Style;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub evolution: EvolutionConfig,
    pub weights: FitnessWeights,
    pub style: Style,
    /// Quarter notes per chord slot.
    pub quarters_per_bar: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            evolution: EvolutionConfig::default(),
            weights: FitnessWeights::default(),
            style: Style::default(),
            quarters_per_bar: 1.0,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        self.weights.validate()?;
        if !(self.quarters_per_bar.is_finite() && self.quarters_per_bar > 0.0) {
            return Err(Error::Config(format!(
                "quarters_per_bar must be positive, got {}",
                self.quarters_per_bar
            )));
        }
        Ok(())
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            quarters_per_bar: self.quarters_per_bar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips() {
        let config = GeneratorConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: GeneratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{
            "evolution": { "generations": 20, "seed": 7 },
            "weights": { "repetition": 10.0 },
            "style": "choir",
            "quarters_per_bar": 2.0
        }"#;
        let config: GeneratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.evolution.generations, 20);
        assert_eq!(config.evolution.seed, Some(7));
        assert_eq!(config.evolution.population_size, 1000);
        assert_eq!(config.weights.repetition, 10.0);
        assert_eq!(config.weights.progression, 5.0);
        assert_eq!(config.style, Style::Choir);
        assert_eq!(config.import_options().quarters_per_bar, 2.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GeneratorConfig::default();
        config.quarters_per_bar = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = GeneratorConfig::default();
        config.evolution.population_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"weights":{"consonance":-1.0}}"#).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = GeneratorConfig::default();
        config.weights.progression = f64::NAN;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GeneratorConfig::load(Path::new("/nonexistent/harmonist.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
