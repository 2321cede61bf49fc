//! Built-in content: a small garden catalog and a matching game config.

use crate::config::{ConfigError, GameConfig};
use crate::game::{CatalogError, ItemCatalog};

const CATALOG_JSON: &str = include_str!("../data/catalog.json");
const GAME_JSON: &str = include_str!("../data/game.json");

/// The built-in item catalog.
///
/// # Errors
///
/// Returns a [`CatalogError`] if the embedded catalog is invalid.
pub fn default_catalog() -> Result<ItemCatalog, CatalogError> {
    ItemCatalog::from_json(CATALOG_JSON)
}

/// The built-in game config.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the embedded config does not parse.
pub fn default_config() -> Result<GameConfig, ConfigError> {
    GameConfig::from_json(GAME_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Category, ItemTypeId};

    #[test]
    fn test_builtin_content_is_consistent() {
        let catalog = default_catalog().unwrap();
        let config = default_config().unwrap();
        config.validate(&catalog).unwrap();
    }

    #[test]
    fn test_builtin_chains() {
        let catalog = default_catalog().unwrap();
        let chain = catalog.chain(&ItemTypeId::new("flower_1")).unwrap();
        assert_eq!(chain.len(), 5);
        assert!(chain.last().unwrap().is_max_tier());

        let rock = catalog.get(&ItemTypeId::new("rock")).unwrap();
        assert_eq!(rock.category, Category::Blocker);
        assert!(rock.is_fixed_blocker());
    }
}
