//! Named filter presets and their local persistence.

use super::filters::{FilterState, NumericRange};
use crate::api::Policy;
use crate::store::{LocalStore, StoreError, PRESETS_KEY};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A saved targeting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub filters: FilterState,
    #[serde(default)]
    pub selected_policies: Vec<Policy>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub target_customer_count: u64,
    #[serde(default)]
    pub is_active: bool,
}

impl FilterPreset {
    /// Creates an inactive preset with a fresh random id.
    pub fn new(name: &str, filters: FilterState, selected_policies: Vec<Policy>) -> Self {
        Self {
            id: new_preset_id(),
            name: name.trim().to_string(),
            description: None,
            filters,
            selected_policies,
            created_at: Utc::now(),
            target_customer_count: 0,
            is_active: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

fn new_preset_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Restricts a policy list to what a preset targets.
///
/// Only the preferred policy types are applied here; the audience filters
/// select customers on the server side.
pub fn filter_policies<'a>(policies: &'a [Policy], preset: Option<&FilterPreset>) -> Vec<&'a Policy> {
    let Some(preset) = preset else {
        return policies.iter().collect();
    };

    let types = &preset.filters.policy.preferred_policy_type;
    policies
        .iter()
        .filter(|p| types.is_empty() || types.iter().any(|t| *t == p.policy_type))
        .collect()
}

/// The preset collection stored under `policy_promotion_presets`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetBook {
    presets: Vec<FilterPreset>,
}

impl PresetBook {
    /// Loads saved presets; an empty book if none were saved.
    pub fn load(store: &LocalStore) -> Result<Self, StoreError> {
        let presets = store
            .get_json::<Vec<FilterPreset>>(PRESETS_KEY)?
            .unwrap_or_default();
        Ok(Self { presets })
    }

    pub fn save(&self, store: &LocalStore) -> Result<(), StoreError> {
        store.set_json(PRESETS_KEY, &self.presets)
    }

    pub fn presets(&self) -> &[FilterPreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn add(&mut self, preset: FilterPreset) {
        self.presets.push(preset);
    }

    /// Replaces a preset's filters. Returns `false` if the id is unknown.
    pub fn update_filters(&mut self, id: &str, filters: FilterState) -> bool {
        match self.presets.iter_mut().find(|p| p.id == id) {
            Some(preset) => {
                preset.filters = filters;
                true
            }
            None => false,
        }
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.presets.iter_mut().find(|p| p.id == id) {
            Some(preset) => {
                preset.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Removes a preset. Returns the removed preset, if any.
    pub fn remove(&mut self, id: &str) -> Option<FilterPreset> {
        let pos = self.presets.iter().position(|p| p.id == id)?;
        Some(self.presets.remove(pos))
    }

    pub fn active_count(&self) -> usize {
        self.presets.iter().filter(|p| p.is_active).count()
    }

    /// The built-in starter presets.
    pub fn sample() -> Self {
        let now = Utc::now();
        let mut young = FilterState::default();
        young.demographic.age = NumericRange::enabled(25, 35);
        young.demographic.income_bracket = strings(&["250001-750000", "750001-1500000"]);
        young.demographic.employment_status = strings(&["Salaried"]);
        young.policy.policy_ownership_count = NumericRange::enabled(0, 2);
        young.policy.credit_score = NumericRange::enabled(650, 900);
        young.policy.preferred_policy_type = strings(&["Term", "ULIP"]);
        young.interaction.clicked = Some(true);
        young.interaction.purchased = Some(false);
        young.interaction.viewed_duration = NumericRange::enabled(30, 120);
        young.interaction.comparison_count = NumericRange::disabled(1, 10);
        young.persona = strings(&["Tech-Savvy", "Career-Focused"]);

        let mut family = FilterState::default();
        family.demographic.age = NumericRange::enabled(30, 50);
        family.demographic.income_bracket = strings(&["750001-1500000", "1500001+"]);
        family.demographic.employment_status = strings(&["Salaried", "Business Owner"]);
        family.demographic.marital_status = strings(&["Married"]);
        family.policy.policy_ownership_count = NumericRange::enabled(1, 5);
        family.policy.credit_score = NumericRange::enabled(700, 900);
        family.policy.preferred_policy_type = strings(&["Health", "Term"]);
        family.interaction.abandoned_cart = Some(false);
        family.interaction.viewed_duration = NumericRange::enabled(60, 120);
        family.interaction.comparison_count = NumericRange::enabled(2, 10);
        family.persona = strings(&["Family-Oriented", "Security-Conscious"]);

        let mut wealthy = FilterState::default();
        wealthy.demographic.age = NumericRange::enabled(35, 60);
        wealthy.demographic.income_bracket = strings(&["1500001+"]);
        wealthy.demographic.employment_status = strings(&["Business Owner", "Self-Employed"]);
        wealthy.demographic.location_city = strings(&["Mumbai", "Delhi", "Bengaluru"]);
        wealthy.policy.policy_ownership_count = NumericRange::enabled(2, 5);
        wealthy.policy.credit_score = NumericRange::enabled(750, 900);
        wealthy.policy.preferred_policy_type = strings(&["ULIP", "Endowment"]);
        wealthy.interaction.clicked = Some(true);
        wealthy.interaction.purchased = Some(true);
        wealthy.interaction.abandoned_cart = Some(false);
        wealthy.interaction.viewed_duration = NumericRange::enabled(90, 120);
        wealthy.interaction.comparison_count = NumericRange::enabled(3, 10);
        wealthy.persona = strings(&["Investment-Savvy", "Wealth-Builder"]);

        let presets = vec![
            FilterPreset {
                target_customer_count: 15420,
                is_active: true,
                created_at: now,
                ..FilterPreset::new("Young Professionals", young, Vec::new())
                    .with_description("Target young working professionals aged 25-35")
            },
            FilterPreset {
                target_customer_count: 8750,
                created_at: now - Duration::days(1),
                ..FilterPreset::new("Family Protectors", family, Vec::new()).with_description(
                    "Married individuals with families looking for comprehensive coverage",
                )
            },
            FilterPreset {
                target_customer_count: 3240,
                is_active: true,
                created_at: now - Duration::days(2),
                ..FilterPreset::new("High Net Worth Investors", wealthy, Vec::new())
                    .with_description("Affluent customers interested in investment-linked policies")
            },
        ];

        Self { presets }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
