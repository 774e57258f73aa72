use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DataLoader;
use crate::error::{Entity, GameError, GameResult};
use crate::farm::Monster;
use crate::items::{ItemKind, ItemTemplate};

const DEFAULT_CATALOG_DATA: &str = include_str!("../data/catalog.json");
const DEFAULT_ECONOMY_DATA: &str = include_str!("../data/economy.json");

/// Shop items and farmable monsters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<ItemTemplate>,
    #[serde(default)]
    pub monsters: Vec<Monster>,
}

impl Catalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog from JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn item(&self, id: &str) -> GameResult<&ItemTemplate> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .ok_or_else(|| GameError::not_found(Entity::CatalogItem, id))
    }

    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn monster(&self, id: &str) -> GameResult<&Monster> {
        self.monsters
            .iter()
            .find(|monster| monster.id == id)
            .ok_or_else(|| GameError::not_found(Entity::Monster, id))
    }

    /// Shop listing for one kind, cheapest first.
    #[must_use]
    pub fn items_of_kind(&self, kind: ItemKind) -> Vec<&ItemTemplate> {
        let mut items: Vec<&ItemTemplate> =
            self.items.iter().filter(|item| item.kind == kind).collect();
        items.sort_by_key(|item| (item.price, item.id.as_str()));
        items
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no embedded config named {0}")]
    UnknownConfig(String),
}

/// Serves the JSON assets compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDataLoader;

impl StaticDataLoader {
    fn source(config_name: &str) -> Option<&'static str> {
        match config_name {
            "catalog" => Some(DEFAULT_CATALOG_DATA),
            "economy" => Some(DEFAULT_ECONOMY_DATA),
            _ => None,
        }
    }
}

impl DataLoader for StaticDataLoader {
    type Error = DataError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        self.load_config("catalog")
    }

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        let json = Self::source(config_name)
            .ok_or_else(|| DataError::UnknownConfig(config_name.to_string()))?;
        serde_json::from_str(json).map_err(|source| DataError::Parse {
            name: config_name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = StaticDataLoader.load_catalog().unwrap();
        assert_eq!(catalog.items.len(), 10);
        assert_eq!(catalog.monsters.len(), 3);
        let sword = catalog.item("iron_sword").unwrap();
        assert_eq!(sword.kind, ItemKind::Weapon);
        assert_eq!(sword.required_level, 2);
        assert_eq!(catalog.item("rusty_sword").unwrap().required_level, 1);
        assert_eq!(catalog.monster("troll").unwrap().power, 1600);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let catalog = Catalog::empty();
        assert!(matches!(
            catalog.item("excalibur"),
            Err(GameError::NotFound {
                entity: Entity::CatalogItem,
                ..
            })
        ));
        assert!(catalog.monster("dragon").is_err());
    }

    #[test]
    fn shop_listing_is_sorted_by_price() {
        let catalog = StaticDataLoader.load_catalog().unwrap();
        let shields: Vec<&str> = catalog
            .items_of_kind(ItemKind::Shield)
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(shields, vec!["wooden_shield", "iron_shield", "tower_shield"]);
    }

    #[test]
    fn loader_serves_economy_and_rejects_unknown_names() {
        let cfg: EngineConfig = StaticDataLoader.load_config("economy").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        let missing: Result<EngineConfig, _> = StaticDataLoader.load_config("weather");
        assert!(matches!(missing, Err(DataError::UnknownConfig(name)) if name == "weather"));
    }
}
