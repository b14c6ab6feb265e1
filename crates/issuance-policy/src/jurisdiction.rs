//! Australian jurisdictions
//!
//! Issuer requirements, work health and safety regulators and security of
//! payment legislation all vary by state or territory.

use serde::{Deserialize, Serialize};

/// Australian state and territory codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    NSW,
    VIC,
    QLD,
    WA,
    SA,
    TAS,
    ACT,
    NT,
}

impl State {
    pub const ALL: [State; 8] = [
        State::NSW,
        State::VIC,
        State::QLD,
        State::WA,
        State::SA,
        State::TAS,
        State::ACT,
        State::NT,
    ];

    /// Get the full state or territory name
    pub fn name(&self) -> &'static str {
        match self {
            State::NSW => "New South Wales",
            State::VIC => "Victoria",
            State::QLD => "Queensland",
            State::WA => "Western Australia",
            State::SA => "South Australia",
            State::TAS => "Tasmania",
            State::ACT => "Australian Capital Territory",
            State::NT => "Northern Territory",
        }
    }

    /// Work health and safety regulator named on SWMS documents
    pub fn whs_regulator(&self) -> &'static str {
        match self {
            State::NSW => "SafeWork NSW",
            State::VIC => "WorkSafe Victoria",
            State::QLD => "Workplace Health and Safety Queensland",
            State::WA => "WorkSafe WA",
            State::SA => "SafeWork SA",
            State::TAS => "WorkSafe Tasmania",
            State::ACT => "WorkSafe ACT",
            State::NT => "NT WorkSafe",
        }
    }

    /// Security of payment legislation payment claims are made under
    pub fn security_of_payment_act(&self) -> &'static str {
        match self {
            State::NSW => "Building and Construction Industry Security of Payment Act 1999 (NSW)",
            State::VIC => "Building and Construction Industry Security of Payment Act 2002 (Vic)",
            State::QLD => "Building Industry Fairness (Security of Payment) Act 2017 (Qld)",
            State::WA => "Building and Construction Industry (Security of Payment) Act 2021 (WA)",
            State::SA => "Building and Construction Industry Security of Payment Act 2009 (SA)",
            State::TAS => "Building and Construction Industry Security of Payment Act 2009 (Tas)",
            State::ACT => "Building and Construction Industry (Security of Payment) Act 2009 (ACT)",
            State::NT => "Construction Contracts (Security of Payments) Act 2004 (NT)",
        }
    }

    /// Parse from state code or name (case-insensitive)
    pub fn parse_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NSW" | "NEW SOUTH WALES" => Some(State::NSW),
            "VIC" | "VICTORIA" => Some(State::VIC),
            "QLD" | "QUEENSLAND" => Some(State::QLD),
            "WA" | "WESTERN AUSTRALIA" => Some(State::WA),
            "SA" | "SOUTH AUSTRALIA" => Some(State::SA),
            "TAS" | "TASMANIA" => Some(State::TAS),
            "ACT" | "AUSTRALIAN CAPITAL TERRITORY" => Some(State::ACT),
            "NT" | "NORTHERN TERRITORY" => Some(State::NT),
            _ => None,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Country-level jurisdiction, optionally narrowed to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Jurisdiction {
    pub state: Option<State>,
}

impl Jurisdiction {
    pub fn national() -> Self {
        Self { state: None }
    }

    pub fn new(state: State) -> Self {
        Self { state: Some(state) }
    }

    /// Parse `"AU"`, `"AU-NSW"` or a bare state code/name. Unknown state
    /// text falls back to national.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let state_part = trimmed
            .strip_prefix("AU-")
            .or_else(|| trimmed.strip_prefix("au-"))
            .unwrap_or(trimmed);
        Self {
            state: State::parse_code(state_part),
        }
    }

    /// First state found among the candidates (job site, then business)
    pub fn resolve<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        candidates
            .into_iter()
            .flatten()
            .find_map(State::parse_code)
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Get the jurisdiction ID string (e.g., "AU-NSW")
    pub fn id(&self) -> String {
        match self.state {
            Some(state) => format!("AU-{}", state),
            None => "AU".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parsing() {
        assert_eq!(State::parse_code("nsw"), Some(State::NSW));
        assert_eq!(State::parse_code("Queensland"), Some(State::QLD));
        assert_eq!(State::parse_code(" VIC "), Some(State::VIC));
        assert_eq!(State::parse_code("FL"), None);
    }

    #[test]
    fn test_jurisdiction_id() {
        assert_eq!(Jurisdiction::national().id(), "AU");
        assert_eq!(Jurisdiction::new(State::NSW).id(), "AU-NSW");
        assert_eq!(Jurisdiction::parse("AU-QLD").state, Some(State::QLD));
        assert_eq!(Jurisdiction::parse("AU").state, None);
        assert_eq!(Jurisdiction::parse("Tasmania").state, Some(State::TAS));
    }

    #[test]
    fn test_resolve_prefers_first_known_state() {
        let j = Jurisdiction::resolve([None, Some("somewhere"), Some("WA"), Some("NSW")]);
        assert_eq!(j.state, Some(State::WA));
        assert_eq!(Jurisdiction::resolve([None, None]), Jurisdiction::national());
    }

    #[test]
    fn test_every_state_has_regulator_and_act() {
        for state in State::ALL {
            assert!(!state.whs_regulator().is_empty());
            assert!(state.security_of_payment_act().contains("Act"));
        }
    }
}
