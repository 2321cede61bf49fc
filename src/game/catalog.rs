//! Item catalog: the read-only registry of item definitions.
//!
//! Definitions come from an external content source (static JSON or admin
//! tooling). They are validated once on load; afterwards the engine only
//! reads them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;

/// Identifier of an item type, e.g. `"flower_1"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTypeId(String);

impl ItemTypeId {
    /// Create an id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemTypeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Broad kind of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Plants and other harvestable items.
    ConsumablePlant,
    /// Tools.
    Tool,
    /// Decorations.
    Decoration,
    /// Produces other items on tap.
    Generator,
    /// Opens into a reward bundle.
    Chest,
    /// Occupies a cell until merged away.
    Blocker,
    /// Coin/gem pickups.
    Currency,
}

/// Production parameters of a generator type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    /// Item types a tap can produce, picked uniformly.
    pub produces_pool: Vec<ItemTypeId>,
    /// Minimum time between two productions.
    pub cooldown_ms: u64,
    /// Charges a fresh instance starts with.
    pub max_charges: u32,
    /// Energy spent per tap.
    pub energy_cost_per_use: u32,
}

/// Reward table of a chest type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestSpec {
    /// Coins granted on open.
    pub coins: u64,
    /// Gems granted on open.
    pub gems: u64,
    /// Energy granted on open (clamped to max).
    pub energy: u32,
    /// Item types dropped on open, picked uniformly.
    pub drop_pool: Vec<ItemTypeId>,
    /// Number of items dropped.
    pub drop_count: u32,
}

/// Immutable definition of one item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique type id.
    pub id: ItemTypeId,
    /// Rank within the merge chain, starting at 1.
    pub tier: u32,
    /// Broad kind.
    pub category: Category,
    /// Type produced when two of these merge (None = max tier).
    #[serde(default)]
    pub merge_target: Option<ItemTypeId>,
    /// Generator parameters (generators only).
    #[serde(default)]
    pub generator: Option<GeneratorSpec>,
    /// Chest reward table (chests only).
    #[serde(default)]
    pub chest: Option<ChestSpec>,
    /// Coins rewarded when this type is created by a merge.
    #[serde(default)]
    pub coin_value: u64,
    /// XP rewarded when this type is created by a merge.
    #[serde(default)]
    pub xp_value: u64,
    /// Whether a blocker may be merged away.
    #[serde(default)]
    pub clears_on_merge: bool,
}

impl ItemDefinition {
    /// Check if this is the last tier of its chain.
    #[must_use]
    pub fn is_max_tier(&self) -> bool {
        self.merge_target.is_none()
    }

    /// Check if this is a blocker that can never be merged.
    #[must_use]
    pub fn is_fixed_blocker(&self) -> bool {
        self.category == Category::Blocker && !self.clears_on_merge
    }

    /// Coins paid when the player sells one of these: half the coin value,
    /// rounded up.
    #[must_use]
    pub fn sell_price(&self) -> u64 {
        self.coin_value.div_ceil(2)
    }
}

/// Catalog content rejected at load time.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The JSON could not be parsed.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two definitions share an id.
    #[error("duplicate item type `{0}`")]
    DuplicateId(ItemTypeId),
    /// Tier must be at least 1.
    #[error("item type `{0}` has tier 0")]
    ZeroTier(ItemTypeId),
    /// A merge target is not in the catalog.
    #[error("item type `{item}` merges into unknown type `{target}`")]
    DanglingMergeTarget {
        /// The referencing type.
        item: ItemTypeId,
        /// The missing target.
        target: ItemTypeId,
    },
    /// A merge target's tier is not above the source's.
    #[error("item type `{item}` (tier {tier}) merges into `{target}` (tier {target_tier})")]
    TierNotIncreasing {
        /// The referencing type.
        item: ItemTypeId,
        /// Its tier.
        tier: u32,
        /// The target type.
        target: ItemTypeId,
        /// The target's tier.
        target_tier: u32,
    },
    /// Category and generator spec disagree.
    #[error("item type `{0}`: generator spec must be present exactly for generators")]
    GeneratorSpecMismatch(ItemTypeId),
    /// Category and chest spec disagree.
    #[error("item type `{0}`: chest spec must be present exactly for chests")]
    ChestSpecMismatch(ItemTypeId),
    /// A generator with nothing to produce.
    #[error("generator `{0}` has an empty produce pool")]
    EmptyProducePool(ItemTypeId),
    /// A generator with no charges.
    #[error("generator `{0}` has zero max charges")]
    ZeroCharges(ItemTypeId),
    /// A produce or drop pool references an unknown type.
    #[error("item type `{item}` references unknown pool entry `{entry}`")]
    UnknownPoolEntry {
        /// The referencing type.
        item: ItemTypeId,
        /// The missing pool entry.
        entry: ItemTypeId,
    },
}

/// Validated registry of item definitions.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: BTreeMap<ItemTypeId, ItemDefinition>,
}

impl ItemCatalog {
    /// Build a catalog, validating cross references.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ItemDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut items = BTreeMap::new();
        for def in definitions {
            if def.tier == 0 {
                return Err(CatalogError::ZeroTier(def.id));
            }
            if items.contains_key(&def.id) {
                return Err(CatalogError::DuplicateId(def.id));
            }
            items.insert(def.id.clone(), def);
        }

        let catalog = Self { items };
        for def in catalog.items.values() {
            catalog.validate_definition(def)?;
        }

        tracing::debug!(types = catalog.len(), "item catalog loaded");
        Ok(catalog)
    }

    /// Parse and validate a JSON array of definitions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON, otherwise the
    /// first validation error.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<ItemDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    fn validate_definition(&self, def: &ItemDefinition) -> Result<(), CatalogError> {
        if let Some(target_id) = &def.merge_target {
            let target = self
                .items
                .get(target_id)
                .ok_or_else(|| CatalogError::DanglingMergeTarget {
                    item: def.id.clone(),
                    target: target_id.clone(),
                })?;
            // Strictly increasing tiers also rule out merge cycles.
            if target.tier <= def.tier {
                return Err(CatalogError::TierNotIncreasing {
                    item: def.id.clone(),
                    tier: def.tier,
                    target: target.id.clone(),
                    target_tier: target.tier,
                });
            }
        }

        let is_generator = def.category == Category::Generator;
        match (&def.generator, is_generator) {
            (Some(spec), true) => {
                if spec.produces_pool.is_empty() {
                    return Err(CatalogError::EmptyProducePool(def.id.clone()));
                }
                if spec.max_charges == 0 {
                    return Err(CatalogError::ZeroCharges(def.id.clone()));
                }
                self.check_pool(&def.id, &spec.produces_pool)?;
            }
            (None, false) => {}
            _ => return Err(CatalogError::GeneratorSpecMismatch(def.id.clone())),
        }

        let is_chest = def.category == Category::Chest;
        match (&def.chest, is_chest) {
            (Some(spec), true) => self.check_pool(&def.id, &spec.drop_pool)?,
            (None, false) => {}
            _ => return Err(CatalogError::ChestSpecMismatch(def.id.clone())),
        }

        Ok(())
    }

    fn check_pool(&self, owner: &ItemTypeId, pool: &[ItemTypeId]) -> Result<(), CatalogError> {
        match pool.iter().find(|entry| !self.items.contains_key(*entry)) {
            Some(entry) => Err(CatalogError::UnknownPoolEntry {
                item: owner.clone(),
                entry: entry.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Number of item types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog has no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a definition without treating a miss as a fault.
    #[must_use]
    pub fn get(&self, id: &ItemTypeId) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    /// Look up a definition referenced by board state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownItemType`] (and logs it as a content
    /// fault) if the type is missing.
    pub fn lookup(&self, id: &ItemTypeId) -> Result<&ItemDefinition, EngineError> {
        self.items.get(id).ok_or_else(|| {
            tracing::error!(item_type = %id, "board references item type missing from catalog");
            EngineError::UnknownItemType(id.clone())
        })
    }

    /// Iterate over all definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    /// The merge chain starting at `id`, ending at its max tier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownItemType`] if `id` is missing.
    pub fn chain(&self, id: &ItemTypeId) -> Result<Vec<&ItemDefinition>, EngineError> {
        let mut chain = vec![self.lookup(id)?];
        while let Some(next) = chain.last().copied().and_then(|def| def.merge_target.as_ref()) {
            chain.push(self.lookup(next)?);
        }
        Ok(chain)
    }

    /// Types that start a chain (nothing merges into them).
    #[must_use]
    pub fn chain_roots(&self) -> Vec<&ItemDefinition> {
        self.items
            .values()
            .filter(|def| {
                !self
                    .items
                    .values()
                    .any(|other| other.merge_target.as_ref() == Some(&def.id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(id: &str, tier: u32, target: Option<&str>) -> ItemDefinition {
        ItemDefinition {
            id: ItemTypeId::new(id),
            tier,
            category: Category::ConsumablePlant,
            merge_target: target.map(ItemTypeId::new),
            generator: None,
            chest: None,
            coin_value: u64::from(tier) * 5,
            xp_value: u64::from(tier),
            clears_on_merge: false,
        }
    }

    fn generator(id: &str, pool: &[&str]) -> ItemDefinition {
        ItemDefinition {
            category: Category::Generator,
            generator: Some(GeneratorSpec {
                produces_pool: pool.iter().copied().map(ItemTypeId::new).collect(),
                cooldown_ms: 1_000,
                max_charges: 3,
                energy_cost_per_use: 1,
            }),
            ..plain(id, 1, None)
        }
    }

    #[test]
    fn test_valid_chain() {
        let catalog = ItemCatalog::from_definitions(vec![
            plain("flower_1", 1, Some("flower_2")),
            plain("flower_2", 2, Some("flower_3")),
            plain("flower_3", 3, None),
        ])
        .unwrap();

        let chain = catalog.chain(&ItemTypeId::new("flower_1")).unwrap();
        let ids: Vec<_> = chain.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["flower_1", "flower_2", "flower_3"]);

        let roots = catalog.chain_roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id.as_str(), "flower_1");
    }

    #[test]
    fn test_duplicate_id() {
        let err = ItemCatalog::from_definitions(vec![plain("a", 1, None), plain("a", 1, None)])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(_)));
    }

    #[test]
    fn test_zero_tier() {
        let err = ItemCatalog::from_definitions(vec![plain("a", 0, None)]).unwrap_err();
        assert!(matches!(err, CatalogError::ZeroTier(_)));
    }

    #[test]
    fn test_dangling_merge_target() {
        let err = ItemCatalog::from_definitions(vec![plain("a", 1, Some("b"))]).unwrap_err();
        assert!(matches!(err, CatalogError::DanglingMergeTarget { .. }));
    }

    #[test]
    fn test_tier_must_increase() {
        let err = ItemCatalog::from_definitions(vec![
            plain("a", 2, Some("b")),
            plain("b", 2, Some("a")),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::TierNotIncreasing { .. }));
    }

    #[test]
    fn test_generator_validation() {
        let ok = ItemCatalog::from_definitions(vec![
            generator("basket_1", &["flower_1"]),
            plain("flower_1", 1, None),
        ]);
        assert!(ok.is_ok());

        let err = ItemCatalog::from_definitions(vec![generator("basket_1", &[])]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyProducePool(_)));

        let err = ItemCatalog::from_definitions(vec![generator("basket_1", &["ghost"])])
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownPoolEntry { .. }));

        let mut missing_spec = generator("basket_1", &["basket_1"]);
        missing_spec.generator = None;
        let err = ItemCatalog::from_definitions(vec![missing_spec]).unwrap_err();
        assert!(matches!(err, CatalogError::GeneratorSpecMismatch(_)));
    }

    #[test]
    fn test_chest_spec_required() {
        let mut chest = plain("chest_1", 1, None);
        chest.category = Category::Chest;
        let err = ItemCatalog::from_definitions(vec![chest]).unwrap_err();
        assert!(matches!(err, CatalogError::ChestSpecMismatch(_)));
    }

    #[test]
    fn test_lookup_unknown() {
        let catalog = ItemCatalog::default();
        let err = catalog.lookup(&ItemTypeId::new("ghost")).unwrap_err();
        assert_eq!(err, EngineError::UnknownItemType(ItemTypeId::new("ghost")));
        assert!(catalog.get(&ItemTypeId::new("ghost")).is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"id": "flower_1", "tier": 1, "category": "consumable_plant",
             "merge_target": "flower_2", "coin_value": 1, "xp_value": 1},
            {"id": "flower_2", "tier": 2, "category": "consumable_plant",
             "coin_value": 5, "xp_value": 3}
        ]"#;
        let catalog = ItemCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        let def = catalog.get(&ItemTypeId::new("flower_2")).unwrap();
        assert!(def.is_max_tier());
        assert_eq!(def.sell_price(), 3);
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(
            ItemCatalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_fixed_blocker() {
        let mut rock = plain("rock", 1, None);
        rock.category = Category::Blocker;
        assert!(rock.is_fixed_blocker());
        rock.clears_on_merge = true;
        assert!(!rock.is_fixed_blocker());
    }
}
