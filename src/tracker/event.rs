//! Event types for interaction tracking.
//!
//! Known event kinds are modelled as a tagged union; anything else a page
//! wants to record goes through [`EventKind::Custom`] plus the open `extra`
//! map. The wire format is the flat camelCase object the collector expects.

use super::session::SessionId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a customer interacted with a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Click,
    Search,
    Compare,
    CartAdd,
    CartAbandon,
    Purchase,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::Search => "search",
            Self::Compare => "compare",
            Self::CartAdd => "cart_add",
            Self::CartAbandon => "cart_abandon",
            Self::Purchase => "purchase",
        }
    }
}

/// The kind of a tracked event, with the fields specific to it.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A page was displayed.
    PageView {
        page: String,
        referrer: Option<String>,
    },

    /// A customer interacted with a policy card or detail view.
    PolicyInteraction {
        customer_id: Option<String>,
        policy_id: String,
        interaction: InteractionType,
        /// Whole seconds of visibility for `view` interactions.
        duration_secs: Option<u64>,
    },

    /// No tracked input for at least the idle threshold.
    UserIdle { duration_secs: f64 },

    /// Emitted once when the session is torn down.
    SessionEnd,

    /// Any other UI event, e.g. `search_initiated` or `nav_cart_click`.
    Custom(String),
}

impl EventKind {
    /// Returns the `eventType` tag sent on the wire.
    pub fn event_type(&self) -> &str {
        match self {
            Self::PageView { .. } => "pageview",
            Self::PolicyInteraction { .. } => "policy_interaction",
            Self::UserIdle { .. } => "user_idle",
            Self::SessionEnd => "session_end",
            Self::Custom(tag) => tag,
        }
    }

    fn write_fields(&self, out: &mut Map<String, Value>) {
        match self {
            Self::PageView { page, referrer } => {
                out.insert("page".into(), Value::from(page.as_str()));
                out.insert(
                    "referrer".into(),
                    Value::from(referrer.as_deref().unwrap_or("")),
                );
            }
            Self::PolicyInteraction {
                customer_id,
                policy_id,
                interaction,
                duration_secs,
            } => {
                out.insert(
                    "customerId".into(),
                    customer_id.as_deref().map_or(Value::Null, Value::from),
                );
                out.insert("policyId".into(), Value::from(policy_id.as_str()));
                out.insert("interactionType".into(), Value::from(interaction.as_str()));
                if let Some(duration) = duration_secs {
                    out.insert("duration".into(), Value::from(*duration));
                }
            }
            Self::UserIdle { duration_secs } => {
                out.insert("duration".into(), Value::from(*duration_secs));
            }
            Self::SessionEnd | Self::Custom(_) => {}
        }
    }
}

/// A single analytics record, built once and handed to the emitter.
#[derive(Debug, Clone)]
pub struct TrackedEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
    pub current_page: String,
    /// Open contextual fields (query strings, result counts, ...).
    pub extra: Map<String, Value>,
}

impl TrackedEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        kind: EventKind,
        session_id: SessionId,
        current_page: impl Into<String>,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            session_id,
            current_page: current_page.into(),
            extra,
        }
    }

    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }

    /// Builds the flat JSON body posted to the collector.
    ///
    /// Extras are written first so that the reserved keys always win.
    pub fn to_payload(&self) -> Value {
        let mut out = Map::new();
        self.kind.write_fields(&mut out);
        for (key, value) in &self.extra {
            out.insert(key.clone(), value.clone());
        }
        out.insert("eventType".into(), Value::from(self.event_type()));
        out.insert(
            "timestamp".into(),
            Value::from(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        out.insert("sessionId".into(), Value::from(self.session_id.as_str()));
        out.insert("currentPage".into(), Value::from(self.current_page.as_str()));
        Value::Object(out)
    }
}
