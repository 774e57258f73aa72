//! Market purchases, sales and the fame-for-power-stone exchange.

use serde::{Deserialize, Serialize};

use crate::error::{GameResult, Resource};
use crate::items::{ItemTemplate, PowerPolicy};
use crate::player::Player;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "MarketConfig::default_power_stone_fame_cost")]
    pub power_stone_fame_cost: u64,
    /// Sale refund is `price / sell_refund_divisor`, floored.
    #[serde(default = "MarketConfig::default_sell_refund_divisor")]
    pub sell_refund_divisor: u64,
}

impl MarketConfig {
    const fn default_power_stone_fame_cost() -> u64 {
        1000
    }

    const fn default_sell_refund_divisor() -> u64 {
        2
    }

    #[must_use]
    pub const fn refund_for(&self, price: u64) -> u64 {
        if self.sell_refund_divisor == 0 {
            0
        } else {
            price / self.sell_refund_divisor
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            power_stone_fame_cost: Self::default_power_stone_fame_cost(),
            sell_refund_divisor: Self::default_sell_refund_divisor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub item_id: u64,
    pub template_id: String,
    pub price: u64,
    pub gold_left: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub item_id: u64,
    pub refund: u64,
    pub was_equipped: bool,
    pub player_power: u64,
}

/// Buy a catalog item as an unequipped +0 instance.
///
/// # Errors
///
/// `InsufficientResource` when the player's level or gold is short.
pub fn buy_item(
    player: &mut Player,
    template: &ItemTemplate,
    policy: PowerPolicy,
) -> GameResult<Purchase> {
    Player::ensure(
        Resource::Level,
        u64::from(player.level),
        u64::from(template.required_level),
    )?;
    player.spend_gold(template.price)?;
    let item_id = player.inventory.add(template);
    player.recompute_power(policy);
    Ok(Purchase {
        item_id,
        template_id: template.id.clone(),
        price: template.price,
        gold_left: player.gold,
    })
}

/// Sell an owned item: soft delete, unequip and refund half the price.
///
/// # Errors
///
/// `NotFound` or `ItemDeleted` when the item cannot be sold.
pub fn sell_item(
    player: &mut Player,
    item_id: u64,
    cfg: &MarketConfig,
    policy: PowerPolicy,
) -> GameResult<Sale> {
    let sold = player.inventory.remove(item_id)?;
    let refund = cfg.refund_for(sold.price);
    player.gold = player.gold.saturating_add(refund);
    let player_power = player.recompute_power(policy);
    Ok(Sale {
        item_id,
        refund,
        was_equipped: sold.equipped,
        player_power,
    })
}

/// Exchange fame for one power stone; returns the new stone count.
///
/// # Errors
///
/// `InsufficientResource` when fame is short.
pub fn buy_power_stone(player: &mut Player, cfg: &MarketConfig) -> GameResult<u64> {
    player.spend_fame(cfg.power_stone_fame_cost)?;
    player.power_stones = player.power_stones.saturating_add(1);
    Ok(player.power_stones)
}

/// Equip an item and refresh power; returns the new power.
///
/// # Errors
///
/// `NotFound` or `ItemDeleted` when the item cannot be equipped.
pub fn equip_item(player: &mut Player, item_id: u64, policy: PowerPolicy) -> GameResult<u64> {
    player.inventory.equip(item_id)?;
    Ok(player.recompute_power(policy))
}
