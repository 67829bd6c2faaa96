//! Shop upgrade definitions.

use serde::{Deserialize, Serialize};

/// Permanent stat change applied when an item is bought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopEffect {
    /// Add to one `head_power` slot
    HeadPower { head: usize, amount: u32 },
    /// Raise max and current hp
    MaxHp(u32),
    /// Raise max and current energy
    MaxEnergy(u32),
    /// One more cooldown reduction level
    CooldownReduction,
}

/// Shop item definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: u32,
    pub max_purchases: u32,
    pub effect: ShopEffect,
}

/// Built-in shop inventory
pub fn get_shop_items() -> Vec<ShopItem> {
    vec![
        ShopItem {
            id: "head-0".into(),
            name: "Upgrade Blast Head".into(),
            description: "+10 Liquidity Blast dmg".into(),
            cost: 40,
            max_purchases: 5,
            effect: ShopEffect::HeadPower { head: 0, amount: 10 },
        },
        ShopItem {
            id: "head-1".into(),
            name: "Upgrade Strike Head".into(),
            description: "+10 Scalability Strike dmg".into(),
            cost: 40,
            max_purchases: 5,
            effect: ShopEffect::HeadPower { head: 1, amount: 10 },
        },
        ShopItem {
            id: "head-2".into(),
            name: "Upgrade Swap Head".into(),
            description: "+10 Atomic Swap dmg & heal".into(),
            cost: 40,
            max_purchases: 5,
            effect: ShopEffect::HeadPower { head: 2, amount: 10 },
        },
        ShopItem {
            id: "max-hp".into(),
            name: "Reinforce Scales".into(),
            description: "+20 Max HP".into(),
            cost: 30,
            max_purchases: 5,
            effect: ShopEffect::MaxHp(20),
        },
        ShopItem {
            id: "max-energy".into(),
            name: "Expand Energy Core".into(),
            description: "+15 Max Energy".into(),
            cost: 35,
            max_purchases: 5,
            effect: ShopEffect::MaxEnergy(15),
        },
        ShopItem {
            id: COOLDOWN_ITEM_ID.into(),
            name: "Temporal Flux".into(),
            description: "-0.5s all cooldowns".into(),
            cost: 60,
            max_purchases: 4,
            effect: ShopEffect::CooldownReduction,
        },
    ]
}

/// ID of the cooldown reduction upgrade
pub const COOLDOWN_ITEM_ID: &str = "cooldown";

/// Get shop item by ID
pub fn get_shop_item(id: &str) -> Option<ShopItem> {
    get_shop_items().into_iter().find(|i| i.id == id)
}
