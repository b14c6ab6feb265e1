//! Collaborator inputs consumed by the document engine
//!
//! Jobs, business profiles and materials are owned by other subsystems;
//! the engine only reads them.

use serde::{Deserialize, Serialize};

/// Trade of the operator who owns a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Painter,
    Plasterer,
    Carpenter,
    Electrician,
    #[default]
    Other,
}

impl TradeType {
    pub fn code(&self) -> &'static str {
        match self {
            TradeType::Painter => "painter",
            TradeType::Plasterer => "plasterer",
            TradeType::Carpenter => "carpenter",
            TradeType::Electrician => "electrician",
            TradeType::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TradeType::Painter => "Painting",
            TradeType::Plasterer => "Plastering",
            TradeType::Carpenter => "Carpentry",
            TradeType::Electrician => "Electrical",
            TradeType::Other => "General trade work",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    Residential,
    Commercial,
}

/// One line of the job's materials ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLine {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    /// Cost price per unit, excluding markup
    pub unit_cost: f64,
    /// Overrides the business default markup for this line
    #[serde(default)]
    pub markup_percent: Option<f64>,
}

impl MaterialLine {
    /// Unit cost with markup folded in when `include_markup` is set
    pub fn priced_unit_cost(&self, include_markup: bool, default_markup: f64) -> f64 {
        if !include_markup {
            return self.unit_cost;
        }
        let markup = self.markup_percent.unwrap_or(default_markup);
        round_cents(self.unit_cost * (1.0 + markup / 100.0))
    }

    pub fn line_total(&self, include_markup: bool, default_markup: f64) -> f64 {
        round_cents(self.priced_unit_cost(include_markup, default_markup) * self.quantity)
    }
}

/// Round to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// A job record with its AI-generated job pack text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    /// Owner of the job
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub trade_type: TradeType,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub address: Option<String>,
    /// State or territory code of the site (e.g. "NSW")
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub scope_of_work: Option<String>,
    #[serde(default)]
    pub inclusions: Option<String>,
    #[serde(default)]
    pub exclusions: Option<String>,
    #[serde(default)]
    pub client_notes: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub contract_value: Option<f64>,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
}

/// The operator's business and legal identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub user_id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub abn: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub licence_number: Option<String>,
    #[serde(default)]
    pub insurance_policy: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    /// Default materials markup in percent
    #[serde(default)]
    pub markup_percent: Option<f64>,
    /// Home state or territory code
    #[serde(default)]
    pub state: Option<String>,
}

/// Subscription tier of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Business,
}

impl PlanTier {
    pub fn parse_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Some(PlanTier::Free),
            "pro" => Some(PlanTier::Pro),
            "business" => Some(PlanTier::Business),
            _ => None,
        }
    }
}

/// Identity and entitlements of whoever invokes an engine operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: String,
    #[serde(default)]
    pub plan: PlanTier,
    /// Business verification has been completed
    #[serde(default)]
    pub verified: bool,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, plan: PlanTier, verified: bool) -> Self {
        Self {
            user_id: user_id.into(),
            plan,
            verified,
        }
    }
}
