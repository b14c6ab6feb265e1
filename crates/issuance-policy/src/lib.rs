//! Issuance policy for Australian trade documents
//!
//! Resolves which issuer fields a business profile must carry before a
//! document can be issued, scoped by state, trade and document type.
//!
//! # Example
//!
//! ```
//! use issuance_policy::{check_issuer, Jurisdiction, PolicySet, State};
//! use jobpack_types::{BusinessProfile, DocType, TradeType};
//!
//! let policy = PolicySet::default();
//! let reqs = policy.requirements_for(&Jurisdiction::new(State::NSW), TradeType::Painter, DocType::Swms);
//! let check = check_issuer(&BusinessProfile::default(), &reqs);
//! assert!(check.missing_required.contains(&"ABN".to_string()));
//! ```

pub mod abn;
pub mod check;
pub mod error;
pub mod jurisdiction;
pub mod policy;

pub use abn::{format_abn, is_valid_abn, validate_abn, AbnError};
pub use check::{check_issuer, IssuerCheck};
pub use error::PolicyError;
pub use jurisdiction::{Jurisdiction, State};
pub use policy::{IssuerField, PolicyRule, PolicySet, Requirements};
