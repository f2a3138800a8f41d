use adaptive_context::selection::{BudgetStrategy, ContextSelector, StrategyTier};
use adaptive_context::types::{SelectionOptions, SelectionResult};
use serde_json::{json, Value};

mod common;

use common::BIOLOGY_DOC;

async fn lexical_result() -> SelectionResult {
    ContextSelector::default()
        .select_context(
            "Explain the phases of mitosis",
            &BIOLOGY_DOC,
            &SelectionOptions::default(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn golden_selection_result_field_order() {
    let json_str = serde_json::to_string(&lexical_result().await).unwrap();

    // "selected_chunks" -> "strategy_used" -> "strategy" -> "stats"
    let chunks_pos = json_str.find("\"selected_chunks\":").unwrap();
    let label_pos = json_str.find("\"strategy_used\":").unwrap();
    let strategy_pos = json_str.find("\"strategy\":").unwrap();
    let stats_pos = json_str.find("\"stats\":").unwrap();

    assert!(chunks_pos < label_pos);
    assert!(label_pos < strategy_pos);
    assert!(strategy_pos < stats_pos);
}

#[tokio::test]
async fn golden_selection_result_values() {
    let value: Value = serde_json::to_value(lexical_result().await).unwrap();

    assert_eq!(value["strategy_used"], "lexical_mmr_standard_full");
    assert_eq!(value["strategy"], "full");
    assert_eq!(
        value["selected_chunks"][0],
        json!({
            "id": 0,
            "text": BIOLOGY_DOC[0],
            "source_token_estimate": 45
        })
    );

    let stats = &value["stats"];
    assert_eq!(stats["original_count"], 6);
    assert_eq!(stats["filtered_count"], 3);
    assert_eq!(stats["selected_count"], 3);
    assert_eq!(stats["total_tokens"], 110);
    assert_eq!(stats["target_tokens"], 110);
    assert_eq!(stats["method"], "lexical");
    assert_eq!(stats["emergency_compressed"], false);
    assert!(stats["avg_relevance"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn golden_empty_result() {
    let value: Value = serde_json::to_value(
        ContextSelector::default()
            .select_context::<&str>("anything", &[], &SelectionOptions::default())
            .await
            .unwrap(),
    )
    .unwrap();

    assert_eq!(
        value,
        json!({
            "selected_chunks": [],
            "strategy_used": "empty_input",
            "strategy": null,
            "stats": {
                "original_count": 0,
                "filtered_count": 0,
                "selected_count": 0,
                "total_tokens": 0,
                "target_tokens": 0,
                "avg_relevance": 0.0,
                "method": "none",
                "emergency_compressed": false
            }
        })
    );
}

#[test]
fn golden_options_serialization() {
    let value = serde_json::to_value(SelectionOptions::default()).unwrap();
    assert_eq!(
        value,
        json!({
            "context_depth": "standard",
            "max_tokens": 4000,
            "use_semantic_search": true,
            "diversity_weight": null,
            "min_relevance_score": null
        })
    );

    let parsed: SelectionOptions =
        serde_json::from_str(r#"{"context_depth": "minimal", "max_tokens": 900}"#).unwrap();
    assert_eq!(parsed.max_tokens, 900);
    assert!(parsed.use_semantic_search);
}

#[test]
fn golden_strategy_tier_serialization() {
    let tier = StrategyTier {
        threshold_tokens: Some(4000),
        strategy: BudgetStrategy::Optimized,
        max_chunks: Some(12),
        max_tokens: Some(3000),
    };
    assert_eq!(
        serde_json::to_value(&tier).unwrap(),
        json!({
            "threshold_tokens": 4000,
            "strategy": "optimized",
            "max_chunks": 12,
            "max_tokens": 3000
        })
    );

    let catch_all = StrategyTier {
        threshold_tokens: None,
        strategy: BudgetStrategy::Summarized,
        max_chunks: Some(5),
        max_tokens: Some(2000),
    };
    let json_str = serde_json::to_string(&catch_all).unwrap();
    assert!(!json_str.contains("threshold_tokens"));
}
