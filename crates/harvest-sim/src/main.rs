//! Headless harvest simulation.
//!
//! Lays out a field of resource plots, puts farmers and foragers to work on
//! it, and runs every harvest through the resolution engine against the
//! in-memory host. Prints the aggregate summary as JSON on stdout.
//!
//! Configuration comes from `HARVEST_*` environment variables; logging is
//! controlled through `RUST_LOG`.

mod config;
mod runner;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use harvest_core::{HarvestConfig, Harvester, ResourceCatalog};

use crate::config::SimConfig;
use crate::runner::{log_summary, Field};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("harvest-sim starting");

    let sim = SimConfig::from_env()?;
    info!(
        ticks = sim.ticks,
        plots = sim.plots,
        farmers = sim.farmers,
        foragers = sim.foragers,
        "configuration loaded"
    );

    let catalog = match &sim.catalog_path {
        Some(path) => ResourceCatalog::from_path(path)
            .with_context(|| format!("loading catalog from {}", path.display()))?,
        None => ResourceCatalog::builtin().context("loading builtin catalog")?,
    };
    info!(resources = catalog.len(), "catalog loaded");

    let mut engine = match &sim.engine_config_path {
        Some(path) => HarvestConfig::from_path(path)
            .with_context(|| format!("loading engine config from {}", path.display()))?,
        None => HarvestConfig::default(),
    };
    if sim.seed.is_some() {
        engine.seed = sim.seed;
    }

    let harvester = Harvester::new(Arc::new(catalog), engine).context("invalid engine config")?;
    let summary = Field::new(harvester, &sim).run(sim.ticks)?;

    log_summary(&summary);
    let json = serde_json::to_string_pretty(&summary).context("serializing summary")?;
    println!("{json}");
    Ok(())
}
