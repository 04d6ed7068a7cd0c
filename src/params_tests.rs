//! Tests for parameter handling, cache keys and URL building.

use super::*;
use serde_json::json;

// ── cache keys ───────────────────────────────────────────────────────

#[test]
fn cache_key_ignores_insertion_order() {
    let a = QueryParams::new()
        .with("name", "Dark Magician")
        .with("type", "Normal Monster");
    let b = QueryParams::new()
        .with("type", "Normal Monster")
        .with("name", "Dark Magician");

    assert_eq!(cache_key("/cardinfo.php", &a), cache_key("/cardinfo.php", &b));
}

#[test]
fn cache_key_format() {
    let params = QueryParams::new().with("name", "Dark Magician");
    assert_eq!(
        cache_key("/cardinfo.php", &params),
        r#"ygoapi:/cardinfo.php:{"name":"Dark Magician"}"#
    );
}

#[test]
fn cache_key_sorts_keys_ascending() {
    let params = QueryParams::new()
        .with("offset", 0)
        .with("attribute", json!(["DARK", "LIGHT"]))
        .with("num", 5);
    assert_eq!(
        cache_key("/cardinfo.php", &params),
        r#"ygoapi:/cardinfo.php:{"attribute":["DARK","LIGHT"],"num":5,"offset":0}"#
    );
}

#[test]
fn cache_key_without_params_has_empty_suffix() {
    assert_eq!(
        cache_key("/randomcard.php", &QueryParams::new()),
        "ygoapi:/randomcard.php:"
    );
}

#[test]
fn cache_key_differs_for_different_values() {
    let keys: Vec<String> = [
        QueryParams::new().with("name", "Dark Magician"),
        QueryParams::new().with("name", "Blue-Eyes White Dragon"),
        QueryParams::new().with("fname", "Dark Magician"),
        QueryParams::new().with("num", 5).with("offset", 0),
        QueryParams::new().with("num", 5).with("offset", 5),
        QueryParams::new().with("num", "5").with("offset", 0),
        QueryParams::new().with("attribute", json!(["DARK", "LIGHT"])),
        QueryParams::new().with("attribute", "DARK,LIGHT"),
        QueryParams::new(),
    ]
    .iter()
    .map(|p| cache_key("/cardinfo.php", p))
    .collect();

    for (i, a) in keys.iter().enumerate() {
        for b in keys.iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn cache_key_differs_per_endpoint() {
    let params = QueryParams::new();
    assert_ne!(
        cache_key("/cardsets.php", &params),
        cache_key("/archetypes.php", &params)
    );
}

#[test]
fn null_values_are_omitted() {
    let params = QueryParams::new()
        .with("name", "Dark Magician")
        .with("archetype", Value::Null);
    assert_eq!(params.len(), 1);
    assert!(!params.contains("archetype"));
    assert_eq!(
        cache_key("/cardinfo.php", &params),
        cache_key("/cardinfo.php", &QueryParams::new().with("name", "Dark Magician"))
    );
}

#[test]
fn inserting_null_clears_previous_value() {
    let mut params = QueryParams::new().with("sort", "atk");
    params.insert("sort", Option::<String>::None);
    assert!(params.is_empty());
}

// ── validation ───────────────────────────────────────────────────────

#[test]
fn page_size_without_offset_is_rejected() {
    let err = QueryParams::new().with("num", 1).validate().unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(matches!(err, ApiError::Validation { .. }));
    assert!(err.to_string().contains("offset"));
}

#[test]
fn offset_without_page_size_is_rejected() {
    let err = QueryParams::new().with("offset", 10).validate().unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn both_or_neither_pagination_params_pass() {
    assert!(QueryParams::new().validate().is_ok());
    assert!(QueryParams::new()
        .with("num", 10)
        .with("offset", 0)
        .validate()
        .is_ok());
}

// ── query strings ────────────────────────────────────────────────────

#[test]
fn query_pairs_serialize_values() {
    let params = QueryParams::new()
        .with("race", json!(["Spellcaster", "Warrior"]))
        .with("has_effect", false)
        .with("tcgplayer_data", true)
        .with("level", 4)
        .with("name", "Dark Magician");

    let pairs = params.query_pairs();
    assert_eq!(
        pairs,
        vec![
            ("has_effect".to_string(), "false".to_string()),
            ("level".to_string(), "4".to_string()),
            ("name".to_string(), "Dark Magician".to_string()),
            ("race".to_string(), "Spellcaster,Warrior".to_string()),
            ("tcgplayer_data".to_string(), "true".to_string()),
        ]
    );
}

#[test]
fn build_url_encodes_query() {
    let params = QueryParams::new()
        .with("attribute", json!(["DARK", "LIGHT"]))
        .with("name", "Dark Magician");
    let url = build_url("https://db.ygoprodeck.com/api/v7", "/cardinfo.php", &params).unwrap();
    assert_eq!(
        url.as_str(),
        "https://db.ygoprodeck.com/api/v7/cardinfo.php?attribute=DARK%2CLIGHT&name=Dark+Magician"
    );
}

#[test]
fn build_url_without_params_has_no_query() {
    let url = build_url("http://localhost:1234/", "/randomcard.php", &QueryParams::new()).unwrap();
    assert_eq!(url.as_str(), "http://localhost:1234/randomcard.php");
    assert!(url.query().is_none());
}

#[test]
fn build_url_rejects_garbage_host() {
    assert!(build_url("not a url", "/cardinfo.php", &QueryParams::new()).is_err());
}

// ── typed params ─────────────────────────────────────────────────────

#[test]
fn stat_filter_formats() {
    assert_eq!(StatFilter::Exact(2500).to_string(), "2500");
    assert_eq!(
        StatFilter::Compare(ComparisonOperator::Gte, 2000).to_string(),
        "gte2000"
    );
    assert_eq!(build_comparison(ComparisonOperator::Lt, 2500), "lt2500");
    assert_eq!(build_comparison(ComparisonOperator::Lte, 4), "lte4");
    assert_eq!(build_comparison(ComparisonOperator::Gt, 1000), "gt1000");
}

#[test]
fn card_info_params_convert_to_query_params() {
    let params = CardInfoParams {
        name: Some("Dark Magician".into()),
        card_type: Some("Normal Monster".into()),
        atk: Some(StatFilter::Compare(ComparisonOperator::Gte, 2000)),
        level: Some(StatFilter::Exact(7)),
        attribute: vec!["DARK".into(), "LIGHT".into()],
        has_effect: Some(false),
        ..Default::default()
    };
    let query = QueryParams::from(&params);

    assert_eq!(query.get("name"), Some(&json!("Dark Magician")));
    assert_eq!(query.get("type"), Some(&json!("Normal Monster")));
    assert_eq!(query.get("atk"), Some(&json!("gte2000")));
    assert_eq!(query.get("level"), Some(&json!(7)));
    assert_eq!(query.get("attribute"), Some(&json!(["DARK", "LIGHT"])));
    assert_eq!(query.get("has_effect"), Some(&json!(false)));
    assert!(!query.contains("race"));
    assert!(!query.contains("num"));
}

#[test]
fn empty_card_info_params_are_empty() {
    assert!(QueryParams::from(CardInfoParams::default()).is_empty());
}

#[test]
fn merge_overrides_existing_keys() {
    let base = QueryParams::new().with("fname", "Magician").with("num", 5);
    let merged = base.merge(QueryParams::new().with("num", 10).with("offset", 0));
    assert_eq!(merged.get("num"), Some(&json!(10)));
    assert_eq!(merged.get("fname"), Some(&json!("Magician")));
    assert_eq!(merged.len(), 3);
}
