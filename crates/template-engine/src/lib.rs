//! Document template engine
//!
//! This crate owns the template side of document generation:
//! - Schema validation of raw template JSON (`validate_template`)
//! - The process-wide template registry with `reload()`
//! - The embedded, deployed template set
//! - OVIS integrity rules and their evaluation against a render model

pub mod embedded;
pub mod error;
pub mod ovis;
pub mod registry;
pub mod validator;

pub use error::{TemplateError, TemplateValidationError};
pub use ovis::{run_checks, OvisRule, RuleParseError};
pub use registry::{TemplateInfo, TemplateRegistry, TemplateSource};
pub use validator::validate_template;
