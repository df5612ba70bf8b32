use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const MAX_QUERY_LENGTH: usize = 500;

/// Inbound request body for `POST /api/analyze`.
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(default)]
    pub filter: Option<FilterField>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(rename = "type", default)]
    pub query_type: Option<String>,
}

/// The filter field arrives as a single string, a list, or null.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum FilterField {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterTag {
    Price,
    Features,
    Reviews,
}

impl FilterTag {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "price" => Some(FilterTag::Price),
            "features" => Some(FilterTag::Features),
            "reviews" => Some(FilterTag::Reviews),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Zh,
    En,
}

impl Language {
    /// Normalizes a raw language hint: base-code extraction (`zh-TW` -> `zh`),
    /// falling back to `zh` for anything unsupported or missing.
    pub fn normalize(raw: Option<&str>) -> Self {
        let base = raw
            .unwrap_or("")
            .split('-')
            .next()
            .unwrap_or("")
            .to_lowercase();
        match base.as_str() {
            "en" => Language::En,
            _ => Language::Zh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Analysis,
    Recommendation,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Analysis => "analysis",
            Mode::Recommendation => "recommendation",
        }
    }
}

/// Normalized request, immutable once constructed. Filters are sorted and
/// deduplicated so that equal filter sets compare equal regardless of the
/// order the caller sent them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    pub query: String,
    pub filters: Vec<FilterTag>,
    pub language: Language,
    pub mode: Mode,
}

impl Request {
    /// Builds a normalized request from the raw body plus an optional
    /// `Accept-Language` hint, used only when the body carries no language.
    pub fn from_parts(raw: AnalyzeRequest, accept_language: Option<&str>) -> Result<Self> {
        let trimmed = raw.query.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest(
                "Query parameter must be a non-empty string".to_string(),
            ));
        }
        // Silent truncation, not an error.
        let query: String = trimmed.chars().take(MAX_QUERY_LENGTH).collect();

        let mut filters: Vec<FilterTag> = match raw.filter {
            Some(FilterField::One(f)) => FilterTag::parse(&f).into_iter().collect(),
            Some(FilterField::Many(fs)) => {
                fs.iter().filter_map(|f| FilterTag::parse(f)).collect()
            }
            None => Vec::new(),
        };
        filters.sort();
        filters.dedup();

        let language = Language::normalize(raw.language.as_deref().or(accept_language));

        let mode = match raw.query_type.as_deref() {
            Some("recommendation_v2") => Mode::Recommendation,
            _ => Mode::Analysis,
        };

        Ok(Request {
            query,
            filters,
            language,
            mode,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSentiment {
    pub score: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableProduct {
    pub name: String,
    pub key_difference_or_benefit: String,
    pub approx_price_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_selling_point: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub name: String,
    pub category: String,
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    pub overview: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub market_sentiment: MarketSentiment,
    pub best_for: Vec<String>,
    pub considerations: Vec<String>,
    pub tags: Vec<String>,
    pub comparable_products: Vec<ComparableProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalQueryDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_name: String,
    pub category: String,
    pub key_features: Vec<String>,
    #[serde(rename = "approxPriceNTD")]
    pub approx_price_ntd: String,
    pub reason_why_suitable: String,
    pub key_consideration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query_details: Option<OriginalQueryDetails>,
    pub recommendations: Vec<Recommendation>,
}

/// The two canonical result shapes, discriminated by their `queryType`
/// marker. Serialized without an extra wrapper so the body is exactly one
/// of the two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResult {
    Recommendation(RecommendationResult),
    Analysis(AnalysisResult),
}
