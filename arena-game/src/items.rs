//! Item catalog templates and owned item instances.

use serde::{Deserialize, Serialize};

use crate::error::{Entity, GameError, GameResult, StateError};
use crate::numbers::{floor_f64_to_u64, u64_to_f64};

/// Highest enhancement level an item can reach.
pub const MAX_ENHANCE_LEVEL: u8 = 9;

/// Multiplier applied per enhancement level.
pub const ENHANCE_POWER_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Shield,
    Armor,
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub base_power: u64,
    pub price: u64,
    #[serde(default = "ItemTemplate::default_required_level")]
    pub required_level: u32,
}

impl ItemTemplate {
    const fn default_required_level() -> u32 {
        1
    }
}

/// `floor(base_power * 1.2^level)`.
#[must_use]
pub fn enhanced_power(base_power: u64, level: u8) -> u64 {
    floor_f64_to_u64(u64_to_f64(base_power) * ENHANCE_POWER_FACTOR.powi(i32::from(level)))
}

/// Owned instance of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerItem {
    pub id: u64,
    pub template_id: String,
    pub name: String,
    pub kind: ItemKind,
    pub base_power: u64,
    pub price: u64,
    pub enhance_level: u8,
    pub power: u64,
    #[serde(default)]
    pub equipped: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl PlayerItem {
    #[must_use]
    pub fn from_template(id: u64, template: &ItemTemplate) -> Self {
        Self {
            id,
            template_id: template.id.clone(),
            name: template.name.clone(),
            kind: template.kind,
            base_power: template.base_power,
            price: template.price,
            enhance_level: 0,
            power: template.base_power,
            equipped: false,
            deleted: false,
        }
    }

    #[must_use]
    pub const fn is_maxed(&self) -> bool {
        self.enhance_level >= MAX_ENHANCE_LEVEL
    }

    /// Raise the enhancement level by one and recompute power.
    pub(crate) fn level_up(&mut self) {
        self.enhance_level = (self.enhance_level + 1).min(MAX_ENHANCE_LEVEL);
        self.power = enhanced_power(self.base_power, self.enhance_level);
    }
}

/// Which owned items contribute to a player's power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPolicy {
    /// Every non-deleted item counts, equipped or not.
    #[default]
    AllOwned,
    EquippedOnly,
}

/// A player's items. Sold items stay in the list flagged `deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<PlayerItem>,
    next_id: u64,
}

impl Inventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unequipped +0 instance and return its id.
    pub fn add(&mut self, template: &ItemTemplate) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.items
            .push(PlayerItem::from_template(self.next_id, template));
        self.next_id
    }

    #[must_use]
    pub fn get(&self, item_id: u64) -> Option<&PlayerItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Look up an item that has not been sold.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `ItemDeleted` for sold items.
    pub fn active(&self, item_id: u64) -> GameResult<&PlayerItem> {
        let item = self
            .get(item_id)
            .ok_or_else(|| GameError::not_found(Entity::Item, item_id))?;
        if item.deleted {
            return Err(StateError::ItemDeleted { item_id }.into());
        }
        Ok(item)
    }

    pub(crate) fn active_mut(&mut self, item_id: u64) -> GameResult<&mut PlayerItem> {
        self.active(item_id)?;
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| GameError::not_found(Entity::Item, item_id))
    }

    /// Items that have not been sold.
    pub fn owned(&self) -> impl Iterator<Item = &PlayerItem> {
        self.items.iter().filter(|item| !item.deleted)
    }

    #[must_use]
    pub fn equipped(&self, kind: ItemKind) -> Option<&PlayerItem> {
        self.owned().find(|item| item.kind == kind && item.equipped)
    }

    /// Equip one item, unequipping any other item of the same kind.
    ///
    /// # Errors
    ///
    /// Fails when the item is unknown or sold.
    pub fn equip(&mut self, item_id: u64) -> GameResult<()> {
        let kind = self.active(item_id)?.kind;
        for item in &mut self.items {
            if item.kind == kind {
                item.equipped = item.id == item_id;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when the item is unknown or sold.
    pub fn unequip(&mut self, item_id: u64) -> GameResult<()> {
        self.active_mut(item_id)?.equipped = false;
        Ok(())
    }

    /// Soft-delete an item, returning a copy of it as it was before removal.
    pub(crate) fn remove(&mut self, item_id: u64) -> GameResult<PlayerItem> {
        let item = self.active_mut(item_id)?;
        let snapshot = item.clone();
        item.deleted = true;
        item.equipped = false;
        Ok(snapshot)
    }

    #[must_use]
    pub fn total_power(&self, policy: PowerPolicy) -> u64 {
        self.owned()
            .filter(|item| match policy {
                PowerPolicy::AllOwned => true,
                PowerPolicy::EquippedOnly => item.equipped,
            })
            .map(|item| item.power)
            .fold(0_u64, u64::saturating_add)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owned().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str, kind: ItemKind, base_power: u64) -> ItemTemplate {
        ItemTemplate {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            base_power,
            price: 300,
            required_level: 1,
        }
    }

    #[test]
    fn enhanced_power_follows_geometric_curve() {
        assert_eq!(enhanced_power(100, 0), 100);
        assert_eq!(enhanced_power(100, 1), 120);
        assert_eq!(enhanced_power(100, 2), 144);
        assert_eq!(enhanced_power(100, 3), 172);
        assert_eq!(enhanced_power(50, 9), 257);
    }

    #[test]
    fn equip_keeps_one_item_per_kind() {
        let mut inventory = Inventory::new();
        let sword = inventory.add(&template("sword", ItemKind::Weapon, 50));
        let axe = inventory.add(&template("axe", ItemKind::Weapon, 70));
        let buckler = inventory.add(&template("buckler", ItemKind::Shield, 30));

        inventory.equip(sword).unwrap();
        inventory.equip(buckler).unwrap();
        inventory.equip(axe).unwrap();

        assert_eq!(inventory.equipped(ItemKind::Weapon).map(|i| i.id), Some(axe));
        assert!(!inventory.get(sword).unwrap().equipped);
        assert_eq!(
            inventory.equipped(ItemKind::Shield).map(|i| i.id),
            Some(buckler)
        );
    }

    #[test]
    fn power_policy_selects_counted_items() {
        let mut inventory = Inventory::new();
        let sword = inventory.add(&template("sword", ItemKind::Weapon, 50));
        inventory.add(&template("plate", ItemKind::Armor, 80));
        inventory.equip(sword).unwrap();

        assert_eq!(inventory.total_power(PowerPolicy::AllOwned), 130);
        assert_eq!(inventory.total_power(PowerPolicy::EquippedOnly), 50);
    }

    #[test]
    fn removed_items_stop_counting_and_reject_use() {
        let mut inventory = Inventory::new();
        let sword = inventory.add(&template("sword", ItemKind::Weapon, 50));
        inventory.equip(sword).unwrap();
        let sold = inventory.remove(sword).unwrap();
        assert!(sold.equipped);
        assert_eq!(inventory.total_power(PowerPolicy::AllOwned), 0);
        assert!(inventory.is_empty());
        assert_eq!(
            inventory.equip(sword),
            Err(GameError::InvalidState(StateError::ItemDeleted { item_id: sword }))
        );
        assert!(matches!(
            inventory.equip(99),
            Err(GameError::NotFound { .. })
        ));
    }
}
