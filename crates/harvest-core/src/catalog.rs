//! Resource catalog: resource type to yield descriptor.
//!
//! The catalog is built once at startup from a [`CatalogConfig`] (JSON) and is
//! read-only afterwards; share it as `Arc<ResourceCatalog>`. Resource types the
//! catalog does not know are looked up through an
//! [`ExternalRegistry`](crate::ports::ExternalRegistry) by the resolver.
//!
//! # Validation
//!
//! Building a catalog rejects:
//! - two descriptors for the same resource type
//! - drop items, consumables and tools that are not declared in `items`
//! - inverted drop ranges
//! - treasure pools that do not exist
//! - conversion targets that are not themselves catalog resources
//!
//! # Example
//!
//! ```
//! use harvest_core::catalog::ResourceCatalog;
//! use harvest_core::model::ResourceType;
//!
//! let catalog = ResourceCatalog::builtin().unwrap();
//! let wheat = catalog.lookup(&ResourceType::new("wheat")).unwrap();
//! assert_eq!(wheat.drop.as_str(), "wheat");
//! assert!(wheat.conversion.is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, DescriptorError};
use crate::model::{ItemId, ItemStack, ResourceType};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

// =============================================================================
// Descriptors
// =============================================================================

/// How the drop quantity of a resource is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldKind {
    /// Fixed quantity from the descriptor's drop range.
    #[default]
    Unit,
    /// Quantity follows the physical stack height of the node.
    Bulk,
}

/// Item requirement for the actor's main hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRequirement {
    /// Anything, including an empty hand.
    #[default]
    Any,
    /// One of the listed items.
    AnyOf(Vec<ItemId>),
}

impl ToolRequirement {
    /// Whether `held` satisfies this requirement.
    #[must_use]
    pub fn matches(&self, held: Option<&ItemId>) -> bool {
        match self {
            Self::Any => true,
            Self::AnyOf(items) => held.is_some_and(|item| items.contains(item)),
        }
    }

    fn items(&self) -> &[ItemId] {
        match self {
            Self::Any => &[],
            Self::AnyOf(items) => items,
        }
    }
}

/// The chance-gated ability that drives a conversion when the long-duration
/// ability is not active. Each has its own curve in
/// [`HarvestConfig`](crate::config::HarvestConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinorAbility {
    /// Crop is replanted after harvest.
    Replant,
    /// Stone-like block turns mossy.
    Mossify,
    /// Soil turns into fungal soil.
    Sporecraft,
}

/// What a node becomes when a conversion lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionTarget {
    /// Same resource, growth stage reset according to skill level.
    Replant,
    /// A different resource type.
    Transform {
        /// Resource the node turns into.
        resource: ResourceType,
    },
}

/// Tool-gated conversion attached to a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRule {
    /// Main-hand requirement to attempt the conversion at all.
    #[serde(default)]
    pub tool: ToolRequirement,
    /// Items consumed when the conversion succeeds.
    pub consumables: Vec<ItemStack>,
    /// Curve used when the long-duration ability is inactive.
    pub ability: MinorAbility,
    /// Resulting node state.
    pub into: ConversionTarget,
}

const fn one() -> u32 {
    1
}

/// Immutable yield information for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldDescriptor {
    /// Resource type this descriptor belongs to.
    pub resource: ResourceType,
    /// Item dropped on harvest.
    pub drop: ItemId,
    /// Base experience per harvested unit.
    pub xp: u32,
    /// Eligible for the double-drop overlay.
    #[serde(default)]
    pub double_drops: bool,
    /// Unit or bulk quantity.
    #[serde(default)]
    pub yield_kind: YieldKind,
    /// Guaranteed drop amount.
    #[serde(default = "one")]
    pub min_drop: u32,
    /// Upper end of the drop range.
    #[serde(default = "one")]
    pub max_drop: u32,
    /// Tool-gated conversion, if the resource supports one.
    #[serde(default)]
    pub conversion: Option<ConversionRule>,
    /// Treasure pool for the luck ability, if any.
    #[serde(default)]
    pub treasure_pool: Option<String>,
    /// The `PLACED` tag marks the treasure as already claimed. When unset,
    /// placed nodes still roll for treasure.
    #[serde(default)]
    pub tracks_claims: bool,
}

impl YieldDescriptor {
    /// Creates a unit-yield descriptor dropping one `drop` for `xp`.
    #[must_use]
    pub fn new(resource: impl Into<ResourceType>, drop: impl Into<ItemId>, xp: u32) -> Self {
        Self {
            resource: resource.into(),
            drop: drop.into(),
            xp,
            double_drops: false,
            yield_kind: YieldKind::Unit,
            min_drop: 1,
            max_drop: 1,
            conversion: None,
            treasure_pool: None,
            tracks_claims: false,
        }
    }

    /// Whether the drop amount is a range rather than a fixed value.
    #[must_use]
    pub fn has_range(&self) -> bool {
        self.min_drop != self.max_drop
    }

    /// Checks the descriptor on its own, without reference to a catalog.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.drop.as_str().is_empty() {
            return Err(DescriptorError::EmptyDrop {
                resource: self.resource.clone(),
            });
        }
        if self.min_drop > self.max_drop {
            return Err(DescriptorError::InvertedRange {
                resource: self.resource.clone(),
                min: self.min_drop,
                max: self.max_drop,
            });
        }
        if let Some(rule) = &self.conversion {
            if rule.consumables.is_empty() {
                return Err(DescriptorError::EmptyConsumables {
                    resource: self.resource.clone(),
                });
            }
            if let Some(stack) = rule.consumables.iter().find(|s| s.amount == 0) {
                return Err(DescriptorError::ZeroAmount {
                    resource: self.resource.clone(),
                    item: stack.item.clone(),
                });
            }
            let mut totals: BTreeMap<&ItemId, u32> = BTreeMap::new();
            for stack in &rule.consumables {
                let total = totals.entry(&stack.item).or_insert(0);
                *total = total.checked_add(stack.amount).ok_or_else(|| {
                    DescriptorError::ConsumableOverflow {
                        resource: self.resource.clone(),
                        item: stack.item.clone(),
                    }
                })?;
            }
        }
        Ok(())
    }

    /// Every item id this descriptor references.
    fn referenced_items(&self) -> impl Iterator<Item = &ItemId> {
        let conversion_items = self.conversion.iter().flat_map(|rule| {
            rule.consumables
                .iter()
                .map(|stack| &stack.item)
                .chain(rule.tool.items())
        });
        std::iter::once(&self.drop).chain(conversion_items)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Serialized form of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Every item definition descriptors may reference.
    #[serde(default)]
    pub items: Vec<ItemId>,
    /// Main-hand requirement for the luck ability.
    #[serde(default)]
    pub luck_tool: ToolRequirement,
    /// Named treasure pools.
    #[serde(default)]
    pub treasure_pools: BTreeMap<String, Vec<ItemStack>>,
    /// One descriptor per resource type.
    pub resources: Vec<YieldDescriptor>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Validated, read-only resource catalog.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    descriptors: HashMap<ResourceType, YieldDescriptor>,
    treasure_pools: HashMap<String, Vec<ItemStack>>,
    luck_tool: ToolRequirement,
}

impl ResourceCatalog {
    /// Builds a catalog from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for duplicates or inconsistent descriptors.
    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        let CatalogConfig {
            items,
            luck_tool,
            treasure_pools,
            resources,
        } = config;

        let items: BTreeSet<ItemId> = items.into_iter().collect();
        let known: BTreeSet<&ResourceType> = resources.iter().map(|d| &d.resource).collect();

        for descriptor in &resources {
            descriptor.validate()?;

            if let Some(item) = descriptor.referenced_items().find(|i| !items.contains(*i)) {
                return Err(DescriptorError::UnknownItem {
                    resource: descriptor.resource.clone(),
                    item: item.clone(),
                }
                .into());
            }

            if let Some(pool) = &descriptor.treasure_pool {
                if !treasure_pools.contains_key(pool) {
                    return Err(DescriptorError::UnknownTreasurePool {
                        resource: descriptor.resource.clone(),
                        pool: pool.clone(),
                    }
                    .into());
                }
            }

            if let Some(ConversionRule {
                into: ConversionTarget::Transform { resource: target },
                ..
            }) = &descriptor.conversion
            {
                if !known.contains(target) {
                    return Err(DescriptorError::UnknownConversionTarget {
                        resource: descriptor.resource.clone(),
                        target: target.clone(),
                    }
                    .into());
                }
            }
        }

        let mut descriptors = HashMap::with_capacity(resources.len());
        for descriptor in resources {
            let key = descriptor.resource.clone();
            if descriptors.insert(key.clone(), descriptor).is_some() {
                return Err(CatalogError::Duplicate(key));
            }
        }

        Ok(Self {
            descriptors,
            treasure_pools: treasure_pools.into_iter().collect(),
            luck_tool,
        })
    }

    /// Parses and builds a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON, or any build error.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let config: CatalogConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// Reads, parses and builds a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or any parse
    /// or build error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// The catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded catalog is inconsistent.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Descriptor for `resource`, if the catalog defines one.
    #[must_use]
    pub fn lookup(&self, resource: &ResourceType) -> Option<&YieldDescriptor> {
        self.descriptors.get(resource)
    }

    /// Treasure pool by name.
    #[must_use]
    pub fn treasure_pool(&self, name: &str) -> Option<&[ItemStack]> {
        self.treasure_pools.get(name).map(Vec::as_slice)
    }

    /// Main-hand requirement for the luck ability.
    #[must_use]
    pub fn luck_tool(&self) -> &ToolRequirement {
        &self.luck_tool
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the catalog has no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All resource types, sorted.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&ResourceType> {
        let mut types: Vec<_> = self.descriptors.keys().collect();
        types.sort();
        types
    }
}
