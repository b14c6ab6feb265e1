//! Issuer completeness check

use jobpack_types::BusinessProfile;
use serde::{Deserialize, Serialize};

use crate::abn::validate_abn;
use crate::policy::{IssuerField, Requirements};

/// Outcome of checking a business profile against resolved requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssuerCheck {
    /// Labels of required fields that are empty
    pub missing_required: Vec<String>,
    /// Labels of recommended fields that are empty
    pub missing_recommended: Vec<String>,
    pub warnings: Vec<String>,
}

impl IssuerCheck {
    /// No required field is missing
    pub fn passes(&self) -> bool {
        self.missing_required.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.passes() && self.missing_recommended.is_empty() && self.warnings.is_empty()
    }
}

/// Compare `profile` with `requirements`. A present ABN that fails the
/// checksum is a warning, not a missing field.
pub fn check_issuer(profile: &BusinessProfile, requirements: &Requirements) -> IssuerCheck {
    let missing = |fields: &[IssuerField]| -> Vec<String> {
        fields
            .iter()
            .filter(|f| f.value(profile).is_none())
            .map(|f| f.label().to_string())
            .collect()
    };

    let mut warnings = Vec::new();
    if let Some(abn) = IssuerField::Abn.value(profile) {
        if let Err(e) = validate_abn(abn) {
            warnings.push(format!("ABN '{}' looks invalid: {}", abn, e));
        }
    }

    IssuerCheck {
        missing_required: missing(&requirements.required),
        missing_recommended: missing(&requirements.recommended),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jurisdiction::{Jurisdiction, State};
    use crate::policy::PolicySet;
    use jobpack_types::{DocType, TradeType};
    use pretty_assertions::assert_eq;

    fn requirements(state: State) -> Requirements {
        PolicySet::default().requirements_for(&Jurisdiction::new(state), TradeType::Painter, DocType::PaymentClaim)
    }

    #[test]
    fn test_missing_abn_blocks() {
        let profile = BusinessProfile {
            business_name: Some("Brush Strokes".to_string()),
            ..Default::default()
        };
        let check = check_issuer(&profile, &requirements(State::VIC));

        assert!(!check.passes());
        assert_eq!(check.missing_required, vec!["ABN".to_string()]);
        assert!(check.missing_recommended.contains(&"Phone".to_string()));
    }

    #[test]
    fn test_complete_profile_passes() {
        let profile = BusinessProfile {
            business_name: Some("Brush Strokes".to_string()),
            abn: Some("51 824 753 556".to_string()),
            contact_name: Some("Sam".to_string()),
            phone: Some("0400 000 000".to_string()),
            email: Some("sam@example.com".to_string()),
            address: Some("1 Main St".to_string()),
            logo_url: Some("https://example.com/logo.png".to_string()),
            insurance_policy: Some("PL-123".to_string()),
            licence_number: Some("123456C".to_string()),
            ..Default::default()
        };
        let check = check_issuer(&profile, &requirements(State::NSW));
        assert!(check.is_clean());
    }

    #[test]
    fn test_invalid_abn_is_a_warning() {
        let profile = BusinessProfile {
            business_name: Some("Brush Strokes".to_string()),
            abn: Some("12 345 678 901".to_string()),
            ..Default::default()
        };
        let check = check_issuer(&profile, &requirements(State::VIC));
        assert!(check.passes());
        assert_eq!(check.warnings.len(), 1);
        assert!(check.warnings[0].contains("ABN"));
    }
}
