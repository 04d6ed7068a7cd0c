//! Request parameters, canonical cache keys and query strings
//!
//! Parameters live in a `BTreeMap`, so both the cache key JSON and the query
//! string come out sorted by name no matter how the caller built them.

use crate::error::ApiError;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Namespace prefix of every response cache key
pub const CACHE_NAMESPACE: &str = "ygoapi";

/// Page size parameter, only valid together with [`PAGE_OFFSET`]
pub const PAGE_SIZE: &str = "num";
/// Page offset parameter, only valid together with [`PAGE_SIZE`]
pub const PAGE_OFFSET: &str = "offset";

/// Canonical bag of request parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter; `null` values are dropped
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        match value.into() {
            Value::Null => {
                self.0.remove(&key);
            }
            value => {
                self.0.insert(key, value);
            }
        }
        self
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of these parameters
    pub fn merge(mut self, other: QueryParams) -> Self {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
        self
    }

    /// Build parameters from any serializable struct or map.
    ///
    /// `None` fields serialize to `null` and are dropped.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let mut params = Self::new();
        if let Value::Object(map) = serde_json::to_value(value)? {
            for (key, value) in map {
                params.insert(key, value);
            }
        }
        Ok(params)
    }

    /// Reject a page size without an offset and vice versa
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.contains(PAGE_SIZE) != self.contains(PAGE_OFFSET) {
            return Err(ApiError::Validation {
                message: format!(
                    "You cannot use only one of '{}' or '{}'. You must use both or none.",
                    PAGE_OFFSET, PAGE_SIZE
                ),
            });
        }
        Ok(())
    }

    /// Query string pairs: arrays comma-joined, booleans and numbers as text
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
            .collect()
    }

    /// Sorted JSON of the parameters, empty when there are none
    pub fn canonical_json(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// `"<namespace>:<endpoint>:<sorted params JSON>"`
pub fn cache_key(endpoint: &str, params: &QueryParams) -> String {
    format!("{}:{}:{}", CACHE_NAMESPACE, endpoint, params.canonical_json())
}

/// Join a host, an endpoint path and the encoded query string
pub fn build_url(
    base_url: &str,
    endpoint: &str,
    params: &QueryParams,
) -> Result<Url, url::ParseError> {
    let base = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
    let pairs = params.query_pairs();
    if pairs.is_empty() {
        Url::parse(&base)
    } else {
        Url::parse_with_params(&base, pairs)
    }
}

// ── typed card search parameters ─────────────────────────────────────

/// Comparison operators accepted by numeric card filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Lte => "lte",
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Gte => "gte",
        }
    }
}

/// ATK / DEF / level filter: an exact value or a comparison like `gte2000`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatFilter {
    Exact(i64),
    Compare(ComparisonOperator, i64),
}

impl fmt::Display for StatFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatFilter::Exact(value) => write!(f, "{}", value),
            StatFilter::Compare(op, value) => write!(f, "{}{}", op.as_str(), value),
        }
    }
}

impl Serialize for StatFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatFilter::Exact(value) => serializer.serialize_i64(*value),
            StatFilter::Compare(..) => serializer.collect_str(self),
        }
    }
}

impl From<i64> for StatFilter {
    fn from(value: i64) -> Self {
        StatFilter::Exact(value)
    }
}

/// Build a comparison filter string such as `"lte4"`
pub fn build_comparison(op: ComparisonOperator, value: i64) -> String {
    StatFilter::Compare(op, value).to_string()
}

/// Filters for `/cardinfo.php`
///
/// Card enums (types, races, attributes, formats...) are passed through as
/// the API spells them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CardInfoParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub konami_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atk: Option<StatFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub def: Option<StatFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<StatFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub race: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attribute: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linkmarker: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banlist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staple: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_effect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startdate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enddate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dateregion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcgplayer_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl From<&CardInfoParams> for QueryParams {
    fn from(params: &CardInfoParams) -> Self {
        // Plain strings, numbers and lists; serialization cannot fail.
        QueryParams::from_serialize(params).unwrap_or_default()
    }
}

impl From<CardInfoParams> for QueryParams {
    fn from(params: CardInfoParams) -> Self {
        QueryParams::from(&params)
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
