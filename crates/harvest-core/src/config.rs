//! Engine configuration.
//!
//! [`HarvestConfig`] holds every tunable the resolver reads: chance curves,
//! growth-stage rules, the diet ranks and the RNG seed. It deserializes from
//! JSON with every field optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::MinorAbility;
use crate::chance::ChanceCurve;
use crate::error::ConfigError;

/// Rank thresholds for [`Harvester::ability_activation_modifier`](crate::resolver::Harvester::ability_activation_modifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DietConfig {
    /// Level of the first rank.
    pub rank_base_level: u32,
    /// Level of the last rank.
    pub max_level: u32,
}

impl Default for DietConfig {
    fn default() -> Self {
        Self {
            rank_base_level: 200,
            max_level: 1000,
        }
    }
}

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Double-drop overlay.
    pub double_drops: ChanceCurve,
    /// Crop replanting.
    pub replant: ChanceCurve,
    /// Stone-to-moss conversion.
    pub mossify: ChanceCurve,
    /// Soil-to-fungal-soil conversion.
    pub sporecraft: ChanceCurve,
    /// Treasure roll on one-shot nodes.
    pub foragers_luck: ChanceCurve,
    /// Growth stage a crop is replanted at while Overgrowth is active.
    pub overgrowth_stage: u8,
    /// Skill levels per replanted growth stage.
    pub replant_stage_step: u32,
    /// Highest growth stage a replanted crop can start at.
    pub max_growth_stage: u8,
    /// Ticks between a successful conversion and its deferred task.
    pub conversion_delay_ticks: u64,
    /// Deny every harvest while the actor is mounted.
    pub skip_while_mounted: bool,
    /// Diet rank thresholds.
    pub diet: DietConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            seed: None,
            double_drops: ChanceCurve::new(0.001, 1.0, 1000),
            replant: ChanceCurve::new(0.001, 1.0, 1500),
            mossify: ChanceCurve::new(0.001, 1.0, 1500),
            sporecraft: ChanceCurve::new(0.001, 0.5, 1500),
            foragers_luck: ChanceCurve::new(0.001, 0.1, 1000),
            overgrowth_stage: 4,
            replant_stage_step: 200,
            max_growth_stage: 4,
            conversion_delay_ticks: 0,
            skip_while_mounted: true,
            diet: DietConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Curve for a minor conversion ability.
    #[must_use]
    pub fn curve(&self, ability: MinorAbility) -> &ChanceCurve {
        match ability {
            MinorAbility::Replant => &self.replant,
            MinorAbility::Mossify => &self.mossify,
            MinorAbility::Sporecraft => &self.sporecraft,
        }
    }

    /// Growth stage a crop is replanted at by the chance-gated path.
    #[must_use]
    pub fn replant_stage(&self, level: u32) -> u8 {
        let stage = level / self.replant_stage_step.max(1);
        u8::try_from(stage)
            .unwrap_or(u8::MAX)
            .min(self.max_growth_stage)
    }

    /// Checks curves and step sizes.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let curves = [
            ("double_drops", &self.double_drops),
            ("replant", &self.replant),
            ("mossify", &self.mossify),
            ("sporecraft", &self.sporecraft),
            ("foragers_luck", &self.foragers_luck),
        ];
        if let Some((name, _)) = curves.iter().find(|(_, curve)| !curve.is_valid()) {
            return Err(ConfigError::InvalidCurve { name: *name });
        }
        if self.replant_stage_step == 0 {
            return Err(ConfigError::ZeroStageStep);
        }
        Ok(())
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or any validation
    /// error.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any parse or
    /// validation error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(HarvestConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = HarvestConfig::from_json_str(r#"{ "seed": 7, "overgrowth_stage": 2 }"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.overgrowth_stage, 2);
        assert_eq!(config.replant_stage_step, 200);
        assert_eq!(config.diet, DietConfig::default());
    }

    #[test]
    fn out_of_range_curve_rejected() {
        let json = r#"{ "foragers_luck": { "base_chance": 0.0, "max_chance": 1.5, "max_level": 100 } }"#;
        let err = HarvestConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCurve { name: "foragers_luck" }));
    }

    #[test]
    fn zero_stage_step_rejected() {
        let config = HarvestConfig {
            replant_stage_step: 0,
            ..HarvestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroStageStep)));
    }

    #[test]
    fn replant_stage_follows_level() {
        let config = HarvestConfig::default();
        assert_eq!(config.replant_stage(0), 0);
        assert_eq!(config.replant_stage(199), 0);
        assert_eq!(config.replant_stage(450), 2);
        assert_eq!(config.replant_stage(10_000), 4);
    }

    #[test]
    fn curve_by_ability() {
        let config = HarvestConfig::default();
        assert_eq!(config.curve(MinorAbility::Sporecraft).max_chance, 0.5);
        assert_eq!(config.curve(MinorAbility::Replant).max_level, 1500);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = HarvestConfig::from_path("/nonexistent/harvest.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
