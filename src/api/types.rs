//! Wire types for the policy API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A monetary or numeric field that the API sends either as a JSON number or
/// as a formatted string such as `"1,00,000"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Numeric value of the amount.
    ///
    /// Text may carry a leading `₹` or `INR` plus comma or space grouping
    /// (`"₹ 1,00,000"`). Anything else makes the amount unreadable.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let text = s.trim();
                let text = text
                    .strip_prefix('₹')
                    .or_else(|| text.strip_prefix("INR"))
                    .unwrap_or(text);
                let cleaned: String = text
                    .chars()
                    .filter(|c| *c != ',' && !c.is_whitespace())
                    .collect();
                cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n:.2}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A policy record from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: String,
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub policy_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(
        rename = "premium_amount (INR)",
        alias = "premium_amount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub premium_amount: Option<Amount>,
    #[serde(
        rename = "sum_assured (INR)",
        alias = "sum_assured",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sum_assured: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_duration_years: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_target_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Columns the client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Policy {
    /// Case-insensitive substring match over name, type, description and keywords.
    ///
    /// An empty query matches every policy.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [
            self.policy_name.as_str(),
            self.policy_type.as_str(),
            self.description.as_str(),
            self.keywords.as_deref().unwrap_or(""),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Keywords split on commas.
    pub fn keyword_list(&self) -> Vec<String> {
        split_list(self.keywords.as_deref())
    }

    /// Target groups split on commas, `["General"]` when absent.
    pub fn target_groups(&self) -> Vec<String> {
        let groups = split_list(self.customer_target_group.as_deref());
        if groups.is_empty() {
            vec!["General".to_string()]
        } else {
            groups
        }
    }

    pub fn premium(&self) -> Option<f64> {
        self.premium_amount.as_ref().and_then(Amount::value)
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub policy_id: String,
    #[serde(default)]
    pub policy_name: String,
    #[serde(default, alias = "premium_amount", skip_serializing_if = "Option::is_none")]
    pub premium: Option<Amount>,
}

impl CartItem {
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            policy_id: policy.policy_id.clone(),
            policy_name: policy.policy_name.clone(),
            premium: policy.premium_amount.clone(),
        }
    }
}

/// Cart contents as returned by `GET /cart`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn contains(&self, policy_id: &str) -> bool {
        self.items.iter().any(|i| i.policy_id == policy_id)
    }

    /// Sum of the premiums that parse as numbers.
    pub fn total_premium(&self) -> f64 {
        self.items
            .iter()
            .filter_map(|i| i.premium.as_ref().and_then(Amount::value))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CartMutation<'a> {
    pub customer_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<&'a str>,
}

/// Dashboard time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsRange {
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl AnalyticsRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }
}

impl std::str::FromStr for AnalyticsRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "1y" => Ok(Self::Year),
            other => Err(format!("unknown range '{other}', expected 7d, 30d, 90d or 1y")),
        }
    }
}

/// Headline dashboard numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    #[serde(default)]
    pub total_policies: u64,
    #[serde(default)]
    pub total_customers: u64,
    #[serde(default)]
    pub conversion_rate: f64,
    #[serde(default)]
    pub avg_premium: f64,
}

/// One chart series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Vec<f64>,
}

/// Labels plus one or more series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    /// Pairs each label with the first series' value.
    pub fn points(&self) -> Vec<(&str, f64)> {
        let Some(series) = self.datasets.first() else {
            return Vec::new();
        };
        self.labels
            .iter()
            .zip(series.data.iter())
            .map(|(label, value)| (label.as_str(), *value))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPolicy {
    pub policy_id: String,
    pub policy_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub customer: String,
    pub policy: String,
    pub time: String,
}

/// Response of `GET /analytics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    #[serde(default)]
    pub metrics: DashboardMetrics,
    #[serde(default)]
    pub policy_performance: ChartData,
    #[serde(default)]
    pub customer_segments: ChartData,
    #[serde(default)]
    pub sales_trend: ChartData,
    #[serde(default)]
    pub top_policies: Vec<TopPolicy>,
    #[serde(default)]
    pub recent_activities: Vec<RecentActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_parses_suffixed_columns() {
        let policy: Policy = serde_json::from_value(json!({
            "policy_id": "P1",
            "policy_name": "Smart Term",
            "policy_type": "Term",
            "description": "Pure protection",
            "keywords": "term, protection",
            "premium_amount (INR)": "12,500",
            "sum_assured (INR)": 5000000,
            "policy_duration_years": 20,
            "brochure": "term.pdf"
        }))
        .unwrap();

        assert_eq!(policy.premium(), Some(12500.0));
        assert_eq!(policy.sum_assured, Some(Amount::Number(5_000_000.0)));
        assert_eq!(policy.keyword_list(), vec!["term", "protection"]);
        assert_eq!(policy.extra["brochure"], "term.pdf");
    }

    #[test]
    fn test_policy_accepts_unsuffixed_amounts() {
        let policy: Policy = serde_json::from_value(json!({
            "policy_id": "P2",
            "premium_amount": 900.5
        }))
        .unwrap();
        assert_eq!(policy.premium(), Some(900.5));
        assert_eq!(policy.target_groups(), vec!["General"]);
    }

    #[test]
    fn test_matches_query_is_case_insensitive() {
        let policy: Policy = serde_json::from_value(json!({
            "policy_id": "P3",
            "policy_name": "Health Shield",
            "policy_type": "Health",
            "description": "Covers hospitalisation",
            "keywords": "mediclaim,family"
        }))
        .unwrap();

        assert!(policy.matches_query("SHIELD"));
        assert!(policy.matches_query("Mediclaim"));
        assert!(policy.matches_query(""));
        assert!(!policy.matches_query("ulip"));
    }

    #[test]
    fn test_cart_total_ignores_unparseable_premiums() {
        let cart = Cart {
            items: vec![
                CartItem {
                    policy_id: "P1".into(),
                    policy_name: "A".into(),
                    premium: Some(Amount::Text("1,000".into())),
                },
                CartItem {
                    policy_id: "P2".into(),
                    policy_name: "B".into(),
                    premium: Some(Amount::Text("n/a".into())),
                },
            ],
        };
        assert_eq!(cart.total_premium(), 1000.0);
        assert!(cart.contains("P2"));
    }

    #[test]
    fn test_amount_text_parsing() {
        assert_eq!(Amount::Text("1,00,00,000".into()).value(), Some(10_000_000.0));
        assert_eq!(Amount::Text("-500".into()).value(), Some(-500.0));
        assert_eq!(Amount::Text("₹ 2,500.50".into()).value(), Some(2500.5));
        assert_eq!(Amount::Text("INR 12000".into()).value(), Some(12000.0));
        assert_eq!(Amount::Text("12,50 €".into()).value(), None);
        assert_eq!(Amount::Text("$100".into()).value(), None);
        assert_eq!(Amount::Text("inf".into()).value(), None);
    }

    #[test]
    fn test_analytics_report_tolerates_missing_sections() {
        let report: AnalyticsReport = serde_json::from_value(json!({
            "metrics": { "total_policies": 12, "conversion_rate": 4.5 },
            "sales_trend": { "labels": ["2024-01-01"], "datasets": [{ "data": [3] }] }
        }))
        .unwrap();

        assert_eq!(report.metrics.total_policies, 12);
        assert_eq!(report.sales_trend.points(), vec![("2024-01-01", 3.0)]);
        assert!(report.top_policies.is_empty());
    }

    #[test]
    fn test_analytics_range_roundtrip() {
        for range in ["7d", "30d", "90d", "1y"] {
            let parsed: AnalyticsRange = range.parse().unwrap();
            assert_eq!(parsed.as_str(), range);
        }
        assert!("2w".parse::<AnalyticsRange>().is_err());
    }
}
