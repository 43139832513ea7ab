//! Driver configuration, loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Complete driver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// RNG seed; overrides the engine config's seed when set.
    pub seed: Option<u64>,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Catalog JSON file. The builtin catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Engine config JSON file. Defaults are used when unset.
    pub engine_config_path: Option<PathBuf>,
    /// Number of harvestable plots laid out in the field.
    pub plots: usize,
    /// Actors replanting crops with seeds in hand.
    pub farmers: usize,
    /// Actors carrying a sword for treasure.
    pub foragers: usize,
    /// Ticks between Overgrowth activations for farmers. Zero disables it.
    pub overgrowth_every: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            ticks: 200,
            catalog_path: None,
            engine_config_path: None,
            plots: 24,
            farmers: 2,
            foragers: 1,
            overgrowth_every: 50,
        }
    }
}

impl SimConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `HARVEST_SEED` -- RNG seed
    /// - `HARVEST_TICKS` -- ticks to run (default 200)
    /// - `HARVEST_CATALOG` -- catalog JSON path
    /// - `HARVEST_CONFIG` -- engine config JSON path
    /// - `HARVEST_PLOTS` -- field size (default 24)
    /// - `HARVEST_FARMERS` / `HARVEST_FORAGERS` -- actor counts (default 2 / 1)
    /// - `HARVEST_OVERGROWTH_EVERY` -- ticks between Overgrowth activations (default 50)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            seed: parse(&lookup, "HARVEST_SEED")?,
            ticks: parse(&lookup, "HARVEST_TICKS")?.unwrap_or(defaults.ticks),
            catalog_path: lookup("HARVEST_CATALOG").map(PathBuf::from),
            engine_config_path: lookup("HARVEST_CONFIG").map(PathBuf::from),
            plots: parse(&lookup, "HARVEST_PLOTS")?.unwrap_or(defaults.plots),
            farmers: parse(&lookup, "HARVEST_FARMERS")?.unwrap_or(defaults.farmers),
            foragers: parse(&lookup, "HARVEST_FORAGERS")?.unwrap_or(defaults.foragers),
            overgrowth_every: parse(&lookup, "HARVEST_OVERGROWTH_EVERY")?
                .unwrap_or(defaults.overgrowth_every),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a number, got {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = SimConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = SimConfig::from_lookup(lookup_from(&[
            ("HARVEST_SEED", "42"),
            ("HARVEST_TICKS", " 10 "),
            ("HARVEST_CATALOG", "/tmp/catalog.json"),
            ("HARVEST_FORAGERS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.ticks, 10);
        assert_eq!(config.catalog_path, Some(PathBuf::from("/tmp/catalog.json")));
        assert_eq!(config.foragers, 3);
        assert_eq!(config.farmers, 2);
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = SimConfig::from_lookup(lookup_from(&[("HARVEST_TICKS", "many")])).unwrap_err();
        assert!(err.to_string().contains("HARVEST_TICKS"));
    }
}
