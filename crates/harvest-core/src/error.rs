//! Error types.
//!
//! Rule misses and chance misses are not errors: they come back as
//! [`Outcome::Denied`](crate::outcome::Outcome::Denied). Only configuration
//! and descriptor inconsistencies are reported here.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{ItemId, ResourceType};

/// A yield descriptor that cannot be used for resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// The descriptor names no drop item.
    #[error("resource {resource} has an empty drop item")]
    EmptyDrop {
        /// Offending resource.
        resource: ResourceType,
    },

    /// `min_drop` exceeds `max_drop`.
    #[error("resource {resource} has inverted drop range {min}..={max}")]
    InvertedRange {
        /// Offending resource.
        resource: ResourceType,
        /// Declared minimum.
        min: u32,
        /// Declared maximum.
        max: u32,
    },

    /// The descriptor references an item the catalog does not define.
    #[error("resource {resource} references unknown item {item}")]
    UnknownItem {
        /// Offending resource.
        resource: ResourceType,
        /// Missing item definition.
        item: ItemId,
    },

    /// The descriptor references a treasure pool the catalog does not define.
    #[error("resource {resource} references unknown treasure pool {pool}")]
    UnknownTreasurePool {
        /// Offending resource.
        resource: ResourceType,
        /// Missing pool name.
        pool: String,
    },

    /// The conversion target is not a known resource.
    #[error("resource {resource} converts into unknown resource {target}")]
    UnknownConversionTarget {
        /// Offending resource.
        resource: ResourceType,
        /// Missing target resource.
        target: ResourceType,
    },

    /// A conversion rule lists no consumables.
    #[error("resource {resource} has a conversion rule without consumables")]
    EmptyConsumables {
        /// Offending resource.
        resource: ResourceType,
    },

    /// Stacks of one item add up to more than `u32::MAX` units.
    #[error("resource {resource} requires more {item} than can be held")]
    ConsumableOverflow {
        /// Offending resource.
        resource: ResourceType,
        /// Item whose stacks overflow.
        item: ItemId,
    },

    /// A stack with zero units.
    #[error("resource {resource} declares a zero-amount stack of {item}")]
    ZeroAmount {
        /// Offending resource.
        resource: ResourceType,
        /// Item of the empty stack.
        item: ItemId,
    },
}

/// Failure to build a [`ResourceCatalog`](crate::catalog::ResourceCatalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid JSON for [`CatalogConfig`](crate::catalog::CatalogConfig).
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two descriptors share a resource type.
    #[error("duplicate descriptor for resource {0}")]
    Duplicate(ResourceType),

    /// A descriptor is inconsistent with the rest of the catalog.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Failure to build a [`HarvestConfig`](crate::config::HarvestConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config is not valid JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A chance curve has chances outside `[0, 1]` or a decreasing shape.
    #[error("chance curve {name} is invalid")]
    InvalidCurve {
        /// Config field holding the curve.
        name: &'static str,
    },

    /// `replant_stage_step` must be positive.
    #[error("replant_stage_step must be greater than zero")]
    ZeroStageStep,
}

/// Fatal failure of a single resolution call.
///
/// Nothing is mutated when this is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The descriptor for the harvested resource is unusable.
    #[error("invalid yield descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
}
