//! Best-effort coercion of the extracted JSON into one of the two canonical
//! result shapes. Individual bad fields are defaulted or dropped instead of
//! failing the whole request; the one unrecoverable case is a recommendation
//! reply whose `recommendations` field is not a list.

use serde_json::Value;

use crate::api::models::{
    AnalysisResult, ApiResult, ComparableProduct, MarketSentiment, OriginalQueryDetails,
    Recommendation, RecommendationResult,
};
use crate::error::{AppError, Result};

const KNOWN_TAGS: [&str; 3] = ["price", "features", "reviews"];

/// Delimiter the answer service sometimes uses instead of a proper list.
const FEATURE_DELIMITER: char = '；';

pub fn normalize(value: Value) -> Result<ApiResult> {
    let is_recommendation = value["queryType"]
        .as_str()
        .map(|s| s.starts_with("recommendation"))
        .unwrap_or(false);

    if is_recommendation {
        normalize_recommendation(&value).map(ApiResult::Recommendation)
    } else {
        Ok(ApiResult::Analysis(normalize_analysis(&value)))
    }
}

fn normalize_recommendation(value: &Value) -> Result<RecommendationResult> {
    let items = value["recommendations"].as_array().ok_or_else(|| {
        AppError::Schema("recommendations must be an array".to_string())
    })?;

    let recommendations = items
        .iter()
        .map(|item| Recommendation {
            product_name: coerce_string(&item["productName"]),
            category: coerce_string(&item["category"]),
            key_features: feature_list(&item["keyFeatures"]),
            approx_price_ntd: coerce_string(&item["approxPriceNTD"]),
            reason_why_suitable: coerce_string(&item["reasonWhySuitable"]),
            key_consideration: coerce_string(&item["keyConsideration"]),
        })
        .collect();

    Ok(RecommendationResult {
        query_type: coerce_string(&value["queryType"]),
        original_query_details: query_details(&value["originalQueryDetails"]),
        recommendations,
    })
}

fn normalize_analysis(value: &Value) -> AnalysisResult {
    let comparable_products = value["comparableProducts"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(comparable_product)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let tags = value["tags"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|tag| KNOWN_TAGS.contains(tag))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    AnalysisResult {
        name: non_empty_or(&value["name"], "Unknown Product"),
        category: non_empty_or(&value["category"], "General"),
        query_type: "analysis".to_string(),
        price_range: opt_string(&value["priceRange"]),
        overview: non_empty_or(&value["overview"], "No overview available."),
        pros: string_list(&value["pros"]),
        cons: string_list(&value["cons"]),
        market_sentiment: MarketSentiment {
            score: coerce_number(&value["marketSentiment"]["score"]),
            description: non_empty_or(
                &value["marketSentiment"]["description"],
                "No sentiment description available.",
            ),
        },
        best_for: string_list(&value["bestFor"]),
        considerations: string_list(&value["considerations"]),
        tags,
        comparable_products,
    }
}

/// An entry is kept only when both the name and the key difference are
/// actual strings; anything else is dropped rather than failing the request.
fn comparable_product(item: &Value) -> Option<ComparableProduct> {
    let name = item["name"].as_str()?;
    let key_difference = item["keyDifferenceOrBenefit"].as_str()?;

    Some(ComparableProduct {
        name: name.to_string(),
        key_difference_or_benefit: key_difference.to_string(),
        approx_price_range: item["approxPriceRange"]
            .as_str()
            .unwrap_or("N/A")
            .to_string(),
        target_audience: opt_string(&item["targetAudience"]),
        unique_selling_point: opt_string(&item["uniqueSellingPoint"]),
    })
}

fn query_details(value: &Value) -> Option<OriginalQueryDetails> {
    if !value.is_object() {
        return None;
    }
    Some(OriginalQueryDetails {
        target_user: opt_string(&value["targetUser"]),
        specific_needs: string_list(&value["specificNeeds"]),
        price_range: opt_string(&value["priceRange"]),
    })
}

fn feature_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(coerce_string).collect(),
        Value::String(s) => s
            .split(FEATURE_DELIMITER)
            .map(|part| part.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().map(coerce_string).collect())
        .unwrap_or_default()
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn non_empty_or(value: &Value, default: &str) -> String {
    match value.as_str() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => default.to_string(),
    }
}

fn opt_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
