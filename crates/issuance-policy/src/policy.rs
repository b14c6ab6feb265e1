//! Issuer completeness policy
//!
//! Which business-profile fields must (or should) be present before a
//! document can be issued is data, not code: a [`PolicySet`] is a list of
//! rules, each scoped by jurisdiction, trade and document type. All rules
//! that match a request are unioned; a field required by any matching rule
//! is never also reported as merely recommended.

use std::collections::BTreeSet;

use jobpack_types::{BusinessProfile, DocType, TradeType};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::jurisdiction::{Jurisdiction, State};

/// A business profile field that can be demanded at issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuerField {
    BusinessName,
    Abn,
    LicenceNumber,
    ContactName,
    Phone,
    Email,
    Address,
    InsurancePolicy,
    LogoUrl,
}

impl IssuerField {
    /// Label shown to the user in missing-field lists
    pub fn label(&self) -> &'static str {
        match self {
            IssuerField::BusinessName => "Business name",
            IssuerField::Abn => "ABN",
            IssuerField::LicenceNumber => "Licence number",
            IssuerField::ContactName => "Contact name",
            IssuerField::Phone => "Phone",
            IssuerField::Email => "Email",
            IssuerField::Address => "Business address",
            IssuerField::InsurancePolicy => "Insurance policy",
            IssuerField::LogoUrl => "Logo",
        }
    }

    /// Current, non-blank value of this field on `profile`
    pub fn value<'a>(&self, profile: &'a BusinessProfile) -> Option<&'a str> {
        let value = match self {
            IssuerField::BusinessName => &profile.business_name,
            IssuerField::Abn => &profile.abn,
            IssuerField::LicenceNumber => &profile.licence_number,
            IssuerField::ContactName => &profile.contact_name,
            IssuerField::Phone => &profile.phone,
            IssuerField::Email => &profile.email,
            IssuerField::Address => &profile.address,
            IssuerField::InsurancePolicy => &profile.insurance_policy,
            IssuerField::LogoUrl => &profile.logo_url,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// One scoped policy rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// `"AU"`, `"AU-NSW"` or a state code; absent matches everywhere
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub trade: Option<TradeType>,
    /// Empty matches every document type
    #[serde(default)]
    pub doc_types: Vec<DocType>,
    #[serde(default)]
    pub required: Vec<IssuerField>,
    #[serde(default)]
    pub recommended: Vec<IssuerField>,
}

impl PolicyRule {
    fn matches(&self, jurisdiction: &Jurisdiction, trade: TradeType, doc_type: DocType) -> bool {
        let jurisdiction_matches = match self.jurisdiction.as_deref() {
            None => true,
            Some(code) => {
                let scope = Jurisdiction::parse(code);
                scope.state.is_none() || scope.state == jurisdiction.state
            }
        };
        jurisdiction_matches
            && self.trade.map(|t| t == trade).unwrap_or(true)
            && (self.doc_types.is_empty() || self.doc_types.contains(&doc_type))
    }
}

/// Resolved requirements for one issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    pub required: Vec<IssuerField>,
    pub recommended: Vec<IssuerField>,
}

/// Configurable set of issuance rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySet {
    pub rules: Vec<PolicyRule>,
}

impl Default for PolicySet {
    /// National baseline plus licensing rules for NSW, QLD and electricians
    fn default() -> Self {
        Self {
            rules: vec![
                PolicyRule {
                    jurisdiction: Some("AU".to_string()),
                    required: vec![IssuerField::BusinessName, IssuerField::Abn],
                    recommended: vec![
                        IssuerField::ContactName,
                        IssuerField::Phone,
                        IssuerField::Email,
                        IssuerField::Address,
                        IssuerField::LogoUrl,
                        IssuerField::InsurancePolicy,
                    ],
                    ..Default::default()
                },
                PolicyRule {
                    jurisdiction: Some(format!("AU-{}", State::NSW)),
                    required: vec![IssuerField::LicenceNumber],
                    ..Default::default()
                },
                PolicyRule {
                    jurisdiction: Some(format!("AU-{}", State::QLD)),
                    required: vec![IssuerField::LicenceNumber],
                    ..Default::default()
                },
                PolicyRule {
                    trade: Some(TradeType::Electrician),
                    required: vec![IssuerField::LicenceNumber],
                    ..Default::default()
                },
            ],
        }
    }
}

impl PolicySet {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let set: PolicySet = serde_json::from_str(json)?;
        if set.rules.is_empty() {
            return Err(PolicyError::Empty);
        }
        for rule in &set.rules {
            if let Some(code) = rule.jurisdiction.as_deref() {
                let upper = code.trim().to_uppercase();
                if upper != "AU" && Jurisdiction::parse(code).state.is_none() {
                    return Err(PolicyError::UnknownJurisdiction(code.to_string()));
                }
            }
        }
        Ok(set)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, PolicyError> {
        let json = std::fs::read_to_string(path).map_err(|error| PolicyError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_json(&json)
    }

    /// Union of all rules matching the request
    pub fn requirements_for(
        &self,
        jurisdiction: &Jurisdiction,
        trade: TradeType,
        doc_type: DocType,
    ) -> Requirements {
        let mut required = BTreeSet::new();
        let mut recommended = BTreeSet::new();
        for rule in self
            .rules
            .iter()
            .filter(|r| r.matches(jurisdiction, trade, doc_type))
        {
            required.extend(rule.required.iter().copied());
            recommended.extend(rule.recommended.iter().copied());
        }
        Requirements {
            recommended: recommended.difference(&required).copied().collect(),
            required: required.into_iter().collect(),
        }
    }
}
