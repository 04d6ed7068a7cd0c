//! Response records of the YGOPRODeck API
//!
//! Enumerated fields (card type, race, attribute, frame) are kept as strings
//! so new values published by the API never break deserialization.

use crate::cache::ImageSize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardImage {
    pub id: u64,
    pub image_url: String,
    pub image_url_small: String,
    pub image_url_cropped: String,
}

impl CardImage {
    /// Remote URL of the requested artwork variant
    pub fn url_for(&self, size: ImageSize) -> &str {
        match size {
            ImageSize::Default => &self.image_url,
            ImageSize::Small => &self.image_url_small,
            ImageSize::Cropped => &self.image_url_cropped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSet {
    pub set_name: String,
    pub set_code: String,
    pub set_rarity: String,
    #[serde(default)]
    pub set_rarity_code: String,
    pub set_price: String,
    /// Only present with `tcgplayer_data`
    #[serde(default)]
    pub set_edition: Option<String>,
    #[serde(default)]
    pub set_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPrice {
    #[serde(default)]
    pub cardmarket_price: String,
    #[serde(default)]
    pub tcgplayer_price: String,
    #[serde(default)]
    pub ebay_price: String,
    #[serde(default)]
    pub amazon_price: String,
    #[serde(default)]
    pub coolstuffinc_price: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BanlistInfo {
    #[serde(default)]
    pub ban_tcg: Option<String>,
    #[serde(default)]
    pub ban_ocg: Option<String>,
    #[serde(default)]
    pub ban_goat: Option<String>,
}

/// Extra data returned with `misc=yes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiscInfo {
    #[serde(default)]
    pub beta_name: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub viewsweek: Option<u64>,
    #[serde(default)]
    pub upvotes: Option<i64>,
    #[serde(default)]
    pub downvotes: Option<i64>,
    #[serde(default)]
    pub formats: Vec<String>,
    #[serde(default)]
    pub treated_as: Option<String>,
    #[serde(default)]
    pub tcg_date: Option<String>,
    #[serde(default)]
    pub ocg_date: Option<String>,
    #[serde(default)]
    pub konami_id: Option<u64>,
    #[serde(default)]
    pub md_rarity: Option<String>,
    #[serde(default)]
    pub has_effect: Option<u8>,
    #[serde(default)]
    pub genesys_points: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: String,
    #[serde(rename = "frameType")]
    pub frame_type: String,
    pub desc: String,
    #[serde(default)]
    pub ygoprodeck_url: Option<String>,
    #[serde(default)]
    pub atk: Option<i64>,
    #[serde(default)]
    pub def: Option<i64>,
    #[serde(default)]
    pub level: Option<u32>,
    pub race: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub linkval: Option<u32>,
    #[serde(default)]
    pub linkmarkers: Vec<String>,
    #[serde(default)]
    pub archetype: Option<String>,
    #[serde(default)]
    pub card_sets: Vec<CardSet>,
    #[serde(default)]
    pub card_images: Vec<CardImage>,
    #[serde(default)]
    pub card_prices: Vec<CardPrice>,
    #[serde(default)]
    pub banlist_info: Option<BanlistInfo>,
    #[serde(default)]
    pub misc_info: Vec<MiscInfo>,
}

const EXTRA_DECK_TYPES: [&str; 8] = [
    "Fusion Monster",
    "Link Monster",
    "Pendulum Effect Fusion Monster",
    "Synchro Monster",
    "Synchro Pendulum Effect Monster",
    "Synchro Tuner Monster",
    "XYZ Monster",
    "XYZ Pendulum Effect Monster",
];

impl Card {
    pub fn is_spell(&self) -> bool {
        self.card_type.contains("Spell")
    }

    pub fn is_trap(&self) -> bool {
        self.card_type.contains("Trap")
    }

    pub fn is_monster(&self) -> bool {
        !self.is_spell() && !self.is_trap()
    }

    pub fn is_extra_deck(&self) -> bool {
        EXTRA_DECK_TYPES.contains(&self.card_type.as_str())
    }

    /// Primary artwork plus alternate arts, if the card has any image
    pub fn images(&self) -> Option<(&CardImage, &[CardImage])> {
        self.card_images.split_first()
    }

    /// Image id used as the image-cache key for this card
    pub fn primary_image_id(&self) -> Option<u64> {
        self.card_images.first().map(|img| img.id)
    }
}

/// Pagination block returned with `num`/`offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_rows: u64,
    pub total_rows: u64,
    pub rows_remaining: u64,
    pub total_pages: u64,
    pub pages_remaining: u64,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub next_page_offset: Option<u64>,
}

/// Envelope of `/cardinfo.php` and `/randomcard.php`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfoResponse {
    pub data: Vec<Card>,
    #[serde(default)]
    pub meta: Option<PaginationMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSetInfo {
    pub set_name: String,
    pub set_code: String,
    pub num_of_cards: u32,
    #[serde(default)]
    pub tcg_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSetDetails {
    pub id: u64,
    pub name: String,
    pub set_name: String,
    pub set_code: String,
    pub set_rarity: String,
    pub set_price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub archetype_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseVersion {
    pub database_version: String,
    pub last_update: String,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
