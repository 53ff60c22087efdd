//! Admin console forms: custom filters, new policies and promotion requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Form input rejected before it reaches the API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {form}: {}", .problems.join("; "))]
pub struct ValidationError {
    pub form: &'static str,
    pub problems: Vec<String>,
}

/// Widget type of a custom filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Dropdown,
    Checkbox,
    Range,
    Text,
}

impl std::str::FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dropdown" => Ok(Self::Dropdown),
            "checkbox" => Ok(Self::Checkbox),
            "range" => Ok(Self::Range),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown filter type: {other}")),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dropdown => "dropdown",
            Self::Checkbox => "checkbox",
            Self::Range => "range",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// Body of `POST /custom_filters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFilterDef {
    pub filter_name: String,
    pub filter_type: FilterKind,
    #[serde(default)]
    pub filter_options: Vec<String>,
}

impl CustomFilterDef {
    /// Trims the name, drops blank options and checks the result.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let filter_name = self.filter_name.trim().to_string();
        let filter_options: Vec<String> = self
            .filter_options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let mut problems = Vec::new();
        if filter_name.is_empty() {
            problems.push("filter name is required".to_string());
        }
        if self.filter_type == FilterKind::Dropdown && filter_options.is_empty() {
            problems.push("a dropdown filter needs at least one option".to_string());
        }
        if !problems.is_empty() {
            return Err(ValidationError {
                form: "custom filter",
                problems,
            });
        }

        Ok(Self {
            filter_name,
            filter_type: self.filter_type,
            filter_options,
        })
    }
}

/// A custom filter as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFilter {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(flatten)]
    pub def: CustomFilterDef,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// The policy-creation form. Numeric fields are kept as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDraft {
    pub policy_name: String,
    pub policy_type: String,
    pub sum_assured: String,
    pub premium_amount: String,
    pub policy_duration_years: String,
    pub risk_category: String,
    #[serde(default)]
    pub customer_target_group: String,
    pub description: String,
    #[serde(default)]
    pub keywords: String,
}

impl Default for PolicyDraft {
    fn default() -> Self {
        Self {
            policy_name: String::new(),
            policy_type: "Term".to_string(),
            sum_assured: String::new(),
            premium_amount: String::new(),
            policy_duration_years: String::new(),
            risk_category: "Low".to_string(),
            customer_target_group: String::new(),
            description: String::new(),
            keywords: String::new(),
        }
    }
}

impl PolicyDraft {
    /// Checks required fields, then that the numeric fields are positive numbers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("policy_name", &self.policy_name),
            ("policy_type", &self.policy_type),
            ("sum_assured", &self.sum_assured),
            ("premium_amount", &self.premium_amount),
            ("policy_duration_years", &self.policy_duration_years),
            ("description", &self.description),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError {
                form: "policy",
                problems: vec![format!("missing required fields: {}", missing.join(", "))],
            });
        }

        let numeric = [
            ("sum assured", &self.sum_assured),
            ("premium amount", &self.premium_amount),
            ("policy duration", &self.policy_duration_years),
        ];
        let problems: Vec<String> = numeric
            .iter()
            .filter(|(_, value)| !is_positive_number(value))
            .map(|(label, _)| format!("{label} must be a valid positive number"))
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                form: "policy",
                problems,
            })
        }
    }
}

fn is_positive_number(raw: &str) -> bool {
    raw.trim()
        .parse::<f64>()
        .map(|n| n.is_finite() && n > 0.0)
        .unwrap_or(false)
}

/// Body of `POST /promote_policies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRequest {
    pub policy_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
}
