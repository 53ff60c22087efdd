//! Customer-targeting filter state for promotion campaigns.

use serde::{Deserialize, Serialize};

/// An inclusive numeric range that only applies when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: u32,
    pub max: u32,
    pub enabled: bool,
}

impl NumericRange {
    pub const fn disabled(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            enabled: false,
        }
    }

    pub const fn enabled(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            enabled: true,
        }
    }

    /// Whether `value` passes; a disabled range passes everything.
    pub fn admits(&self, value: u32) -> bool {
        !self.enabled || (self.min..=self.max).contains(&value)
    }
}

/// A date window given as ISO dates; empty strings mean open-ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: String,
    pub to: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicFilters {
    pub age: NumericRange,
    pub gender: Vec<String>,
    pub income_bracket: Vec<String>,
    pub employment_status: Vec<String>,
    pub marital_status: Vec<String>,
    pub location_city: Vec<String>,
}

impl Default for DemographicFilters {
    fn default() -> Self {
        Self {
            age: NumericRange::disabled(18, 65),
            gender: Vec::new(),
            income_bracket: Vec::new(),
            employment_status: Vec::new(),
            marital_status: Vec::new(),
            location_city: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFilters {
    pub policy_ownership_count: NumericRange,
    pub last_policy_purchase: DateWindow,
    pub credit_score: NumericRange,
    pub preferred_policy_type: Vec<String>,
}

impl Default for PolicyFilters {
    fn default() -> Self {
        Self {
            policy_ownership_count: NumericRange::disabled(0, 5),
            last_policy_purchase: DateWindow::default(),
            credit_score: NumericRange::disabled(300, 900),
            preferred_policy_type: Vec::new(),
        }
    }
}

/// Behavioural filters. `None` on a tri-state means "don't care".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionFilters {
    pub clicked: Option<bool>,
    pub purchased: Option<bool>,
    pub abandoned_cart: Option<bool>,
    pub viewed_duration: NumericRange,
    pub comparison_count: NumericRange,
}

impl Default for InteractionFilters {
    fn default() -> Self {
        Self {
            clicked: None,
            purchased: None,
            abandoned_cart: None,
            viewed_duration: NumericRange::disabled(0, 120),
            comparison_count: NumericRange::disabled(0, 10),
        }
    }
}

/// Full filter state. `Default` is the cleared ("Clear All") state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub demographic: DemographicFilters,
    pub policy: PolicyFilters,
    pub interaction: InteractionFilters,
    pub persona: Vec<String>,
}

impl FilterState {
    /// Number of filters that constrain the audience.
    pub fn active_filter_count(&self) -> usize {
        let d = &self.demographic;
        let p = &self.policy;
        let i = &self.interaction;

        [
            d.age.enabled,
            !d.gender.is_empty(),
            !d.income_bracket.is_empty(),
            !d.employment_status.is_empty(),
            !d.marital_status.is_empty(),
            !d.location_city.is_empty(),
            p.policy_ownership_count.enabled,
            p.last_policy_purchase.enabled,
            p.credit_score.enabled,
            !p.preferred_policy_type.is_empty(),
            i.clicked.is_some(),
            i.purchased.is_some(),
            i.abandoned_cart.is_some(),
            i.viewed_duration.enabled,
            i.comparison_count.enabled,
            !self.persona.is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn is_cleared(&self) -> bool {
        self.active_filter_count() == 0
    }
}
