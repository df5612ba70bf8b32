//! Prompt construction for the answer service.
//!
//! Pure and deterministic: the same normalized request always yields the
//! same (system, user) pair, which is what makes cache keys reusable and
//! the templates testable.

use crate::api::models::{FilterTag, Language, Mode, Request};

const ZH_ANALYSIS: &str = r#"你是一位專業的產品分析專家。請針對使用者詢問的產品進行深入分析。

回應必須是一個單一、完整且有效的 JSON 物件，其結構如下：
{
  "name": "產品完整名稱",
  "category": "產品類別",
  "priceRange": "價格範圍（新台幣）",
  "overview": "產品概述",
  "pros": ["優點1", "優點2", "優點3"],
  "cons": ["缺點1", "缺點2"],
  "marketSentiment": {
    "score": 評分（1-10）,
    "description": "市場評價描述"
  },
  "bestFor": ["最適合的使用場景1", "場景2"],
  "considerations": ["購買考量1", "考量2"],
  "tags": ["price", "features", "reviews"],
  "comparableProducts": [
    {
      "name": "競品名稱",
      "keyDifferenceOrBenefit": "主要差異或優勢",
      "approxPriceRange": "價格範圍"
    }
  ]
}

重要提示：
1. 直接回傳此 JSON 物件，不要加入任何其他文字。
2. 所有資訊必須基於實際市場資料。
3. 價格必須是實際的新台幣範圍。
"#;

const ZH_RECOMMENDATION: &str = r#"你是一位專業的台灣市場產品推薦專家。你的任務是根據使用者的需求，推薦2-3款最適合的產品選擇。

回應必須是一個單一、完整且有效的 JSON 物件，其結構如下：
{
  "queryType": "recommendation_v2",
  "originalQueryDetails": {
    "targetUser": "從使用者提示中理解到的目標使用者",
    "specificNeeds": ["需求1", "需求2"],
    "priceRange": "價格範圍要求（如果有）"
  },
  "recommendations": [
    {
      "productName": "產品完整名稱",
      "category": "產品類別",
      "keyFeatures": ["特色1", "特色2", "特色3"],
      "approxPriceNTD": "價格範圍（新台幣）",
      "reasonWhySuitable": "為何適合使用者",
      "keyConsideration": "購買前重要提醒"
    }
  ]
}

重要提示：
1. 直接回傳此 JSON 物件，不要加入任何其他文字。
2. 所有產品必須是台灣市面上可買到的。
3. 價格必須是實際的新台幣範圍。
4. keyFeatures 必須是字串陣列。
"#;

const EN_ANALYSIS: &str = r#"You are a professional product analysis expert. Please provide an in-depth analysis of the product in question.

Response must be a single, complete, and valid JSON object with the following structure:
{
  "name": "full product name",
  "category": "product category",
  "priceRange": "price range in NTD",
  "overview": "product overview",
  "pros": ["pro1", "pro2", "pro3"],
  "cons": ["con1", "con2"],
  "marketSentiment": {
    "score": rating (1-10),
    "description": "market sentiment description"
  },
  "bestFor": ["best use case1", "case2"],
  "considerations": ["consideration1", "consideration2"],
  "tags": ["price", "features", "reviews"],
  "comparableProducts": [
    {
      "name": "competitor name",
      "keyDifferenceOrBenefit": "main difference or advantage",
      "approxPriceRange": "price range"
    }
  ]
}

Important notes:
1. Return only this JSON object without any additional text.
2. All information must be based on actual market data.
3. Prices must be actual ranges in NTD.
"#;

const EN_RECOMMENDATION: &str = r#"You are a professional product recommendation expert. Your task is to recommend 2-3 most suitable products based on user requirements.

Response must be a single, complete, and valid JSON object with the following structure:
{
  "queryType": "recommendation_v2",
  "originalQueryDetails": {
    "targetUser": "target user understood from prompt",
    "specificNeeds": ["need1", "need2"],
    "priceRange": "price range requirement if any"
  },
  "recommendations": [
    {
      "productName": "full product name",
      "category": "product category",
      "keyFeatures": ["feature1", "feature2", "feature3"],
      "approxPriceNTD": "price range in NTD",
      "reasonWhySuitable": "why suitable for user",
      "keyConsideration": "important note before purchase"
    }
  ]
}

Important notes:
1. Return only this JSON object without any additional text.
2. All products must be available in Taiwan market.
3. Prices must be actual ranges in NTD.
4. keyFeatures must be an array of strings.
"#;

/// Renders the filter set as a natural-language emphasis clause in the
/// request's language. An empty set yields an empty clause.
pub fn filter_clause(filters: &[FilterTag], language: Language) -> String {
    if filters.is_empty() {
        return String::new();
    }

    match language {
        Language::Zh => {
            let parts: Vec<&str> = filters
                .iter()
                .map(|f| match f {
                    FilterTag::Price => "價格和CP值",
                    FilterTag::Features => "功能和使用體驗",
                    FilterTag::Reviews => "使用者評價和口碑",
                })
                .collect();
            format!("請特別著重分析以下面向：{}。", parts.join("、"))
        }
        Language::En => {
            let parts: Vec<&str> = filters
                .iter()
                .map(|f| match f {
                    FilterTag::Price => "price and value for money",
                    FilterTag::Features => "features and user experience",
                    FilterTag::Reviews => "user reviews and market reception",
                })
                .collect();
            format!("Please focus particularly on: {}.", parts.join(", "))
        }
    }
}

/// Builds the (system prompt, user message) pair for a normalized request.
pub fn build_prompt(request: &Request) -> (String, String) {
    let template = match (request.language, request.mode) {
        (Language::Zh, Mode::Analysis) => ZH_ANALYSIS,
        (Language::Zh, Mode::Recommendation) => ZH_RECOMMENDATION,
        (Language::En, Mode::Analysis) => EN_ANALYSIS,
        (Language::En, Mode::Recommendation) => EN_RECOMMENDATION,
    };

    let clause = filter_clause(&request.filters, request.language);
    let system = if clause.is_empty() {
        template.to_string()
    } else {
        format!("{}{}", template, clause)
    };

    (system, request.query.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{FilterTag, Language, Mode, Request};

    fn request(filters: Vec<FilterTag>, language: Language, mode: Mode) -> Request {
        Request {
            query: "iPhone 15".to_string(),
            filters,
            language,
            mode,
        }
    }

    #[test]
    fn empty_filter_set_yields_empty_clause() {
        assert_eq!(filter_clause(&[], Language::En), "");
        assert_eq!(filter_clause(&[], Language::Zh), "");
    }

    #[test]
    fn english_filter_clause_lists_selected_aspects() {
        let clause = filter_clause(&[FilterTag::Price, FilterTag::Reviews], Language::En);
        assert_eq!(
            clause,
            "Please focus particularly on: price and value for money, user reviews and market reception."
        );
    }

    #[test]
    fn chinese_filter_clause_uses_enumeration_comma() {
        let clause = filter_clause(&[FilterTag::Price, FilterTag::Features], Language::Zh);
        assert!(clause.starts_with("請特別著重分析以下面向："));
        assert!(clause.contains("、"));
    }

    #[test]
    fn template_selection_covers_all_four_combinations() {
        let combos = [
            (Language::Zh, Mode::Analysis),
            (Language::Zh, Mode::Recommendation),
            (Language::En, Mode::Analysis),
            (Language::En, Mode::Recommendation),
        ];
        let mut systems = Vec::new();
        for (language, mode) in combos {
            let (system, user) = build_prompt(&request(vec![], language, mode));
            assert_eq!(user, "iPhone 15");
            systems.push(system);
        }
        // All four templates are distinct.
        for i in 0..systems.len() {
            for j in (i + 1)..systems.len() {
                assert_ne!(systems[i], systems[j]);
            }
        }
    }

    #[test]
    fn recommendation_templates_pin_the_expected_shape() {
        let (system, _) =
            build_prompt(&request(vec![], Language::En, Mode::Recommendation));
        assert!(system.contains("\"queryType\": \"recommendation_v2\""));
        assert!(system.contains("approxPriceNTD"));
    }

    #[test]
    fn build_prompt_is_deterministic() {
        let req = request(vec![FilterTag::Price], Language::En, Mode::Analysis);
        assert_eq!(build_prompt(&req), build_prompt(&req));
    }

    #[test]
    fn filter_clause_is_appended_to_system_prompt() {
        let req = request(vec![FilterTag::Price], Language::En, Mode::Analysis);
        let (system, _) = build_prompt(&req);
        assert!(system.ends_with("Please focus particularly on: price and value for money."));
    }
}
