//! Typed wrappers over [`YgoApi::request`]

use super::YgoApi;
use crate::cache::{ImageKey, ImageSize};
use crate::error::{ApiError, Result};
use crate::models::{
    Archetype, Card, CardInfoResponse, CardSetDetails, CardSetInfo, DatabaseVersion,
};
use crate::params::{CardInfoParams, QueryParams, StatFilter};
use std::path::PathBuf;

pub const CARD_INFO: &str = "/cardinfo.php";
pub const RANDOM_CARD: &str = "/randomcard.php";
const CARD_SETS: &str = "/cardsets.php";
const CARD_SET_INFO: &str = "/cardsetsinfo.php";
const ARCHETYPES: &str = "/archetypes.php";
const DB_VERSION: &str = "/checkDBVer.php";

/// First card of a lookup, with "not found" answers mapped to `None`
fn first_card(result: Result<CardInfoResponse>) -> Result<Option<Card>> {
    match result {
        Ok(response) => Ok(response.data.into_iter().next()),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn empty_response(endpoint: &str) -> ApiError {
    ApiError::Network {
        message: format!("Empty response from {}", endpoint),
    }
}

impl YgoApi {
    pub async fn get_card_info(&self, params: &CardInfoParams) -> Result<CardInfoResponse> {
        self.request(CARD_INFO, &QueryParams::from(params)).await
    }

    /// Exact-name lookup; `None` when the API does not know the card
    pub async fn get_card_by_name(&self, name: &str) -> Result<Option<Card>> {
        let params = CardInfoParams {
            name: Some(name.to_string()),
            ..Default::default()
        };
        first_card(self.get_card_info(&params).await)
    }

    /// Passcode lookup; `None` when the API does not know the card
    pub async fn get_card_by_id(&self, id: impl ToString) -> Result<Option<Card>> {
        let params = CardInfoParams {
            id: Some(id.to_string()),
            ..Default::default()
        };
        first_card(self.get_card_info(&params).await)
    }

    /// Fuzzy name search
    pub async fn search_cards(
        &self,
        fname: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            fname: Some(fname.to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_archetype(
        &self,
        archetype: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            archetype: Some(archetype.to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_set(
        &self,
        cardset: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            cardset: Some(cardset.to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_random_card(&self) -> Result<Card> {
        let response: CardInfoResponse = self.request(RANDOM_CARD, &QueryParams::new()).await?;
        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| empty_response(RANDOM_CARD))
    }

    pub async fn get_all_card_sets(&self) -> Result<Vec<CardSetInfo>> {
        self.request(CARD_SETS, &QueryParams::new()).await
    }

    pub async fn get_card_set_info(&self, setcode: &str) -> Result<CardSetDetails> {
        self.request(CARD_SET_INFO, &QueryParams::new().with("setcode", setcode))
            .await
    }

    pub async fn get_all_archetypes(&self) -> Result<Vec<Archetype>> {
        self.request(ARCHETYPES, &QueryParams::new()).await
    }

    /// The endpoint answers with a one-element list
    pub async fn check_database_version(&self) -> Result<DatabaseVersion> {
        let versions: Vec<DatabaseVersion> = self.request(DB_VERSION, &QueryParams::new()).await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| empty_response(DB_VERSION))
    }

    pub async fn get_staple_cards(&self, params: CardInfoParams) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            staple: Some("yes".to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    /// `format` as the API spells it, e.g. `"tcg"`, `"goat"`, `"master duel"`
    pub async fn get_cards_by_format(
        &self,
        format: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            format: Some(format.to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    /// Genesys cards, with their point values in `misc_info`
    pub async fn get_cards_by_genesys_format(
        &self,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            format: Some("genesys".to_string()),
            misc: Some("yes".to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    /// `banlist` is one of `"TCG"`, `"OCG"`, `"Goat"`
    pub async fn get_banlist_cards(
        &self,
        banlist: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            banlist: Some(banlist.to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    /// Page of results; the response carries a `meta` block
    pub async fn get_cards_with_pagination(
        &self,
        num: u32,
        offset: u32,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            num: Some(num),
            offset: Some(offset),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_type(
        &self,
        card_type: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            card_type: Some(card_type.to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_attribute(
        &self,
        attribute: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            attribute: vec![attribute.to_string()],
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_race(
        &self,
        race: &str,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            race: vec![race.to_string()],
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_level(
        &self,
        level: impl Into<StatFilter>,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            level: Some(level.into()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_atk(
        &self,
        atk: impl Into<StatFilter>,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            atk: Some(atk.into()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_by_def(
        &self,
        def: impl Into<StatFilter>,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            def: Some(def.into()),
            ..params
        };
        self.get_card_info(&params).await
    }

    pub async fn get_cards_with_misc_info(
        &self,
        params: CardInfoParams,
    ) -> Result<CardInfoResponse> {
        let params = CardInfoParams {
            misc: Some("yes".to_string()),
            ..params
        };
        self.get_card_info(&params).await
    }

    /// Cached artwork of the card's primary image, if it has been downloaded
    pub async fn get_local_image_path(&self, card: &Card, size: ImageSize) -> Option<PathBuf> {
        let store = self.image_store()?;
        let id = card.primary_image_id()?;
        store.get(&ImageKey::new(id, size)).await
    }

    /// Sweep old artwork; returns the number of files removed
    pub async fn cleanup_image_cache(&self) -> usize {
        match self.image_store().and_then(|store| store.sweeper()) {
            Some(sweeper) => sweeper.cleanup().await,
            None => 0,
        }
    }

    /// Sweep old response entries; returns the number of entries removed
    pub async fn cleanup_cache(&self) -> usize {
        match self.cache_store().and_then(|store| store.sweeper()) {
            Some(sweeper) => sweeper.cleanup().await,
            None => 0,
        }
    }
}
