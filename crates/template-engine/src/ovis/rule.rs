//! OVIS rule expressions
//!
//! Rules are small function-call expressions over section, field and column
//! ids:
//!
//! | Rule | Triggers when |
//! |---|---|
//! | `required_missing()` | any required field is empty |
//! | `empty(section.field)` | that field is empty |
//! | `rows_below_min(section)` | the table has fewer filled rows than `minRows` |
//! | `table_empty(section)` | no table row has a non-empty cell |
//! | `sum_zero(section.column)` | the numeric column sums to zero |
//! | `date_order(section.a, section.b)` | date `a` falls after date `b` |

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref CALL: Regex = Regex::new(r"^\s*([a-z_]+)\s*\((.*)\)\s*$").unwrap();
    static ref REFERENCE: Regex = Regex::new(r"^([A-Za-z0-9_-]+)(?:\.([A-Za-z0-9_-]+))?$").unwrap();
}

/// A rule string could not be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("Rule is not a function call: '{0}'")]
    Syntax(String),

    #[error("Unknown rule function '{0}'")]
    UnknownFunction(String),

    #[error("'{function}' expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid reference '{0}'")]
    Reference(String),
}

/// `section.field` or `section.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub section: String,
    pub field: String,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.field)
    }
}

/// Parsed OVIS rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OvisRule {
    RequiredMissing,
    Empty(FieldRef),
    RowsBelowMin { section: String },
    TableEmpty { section: String },
    SumZero(FieldRef),
    DateOrder { first: FieldRef, second: FieldRef },
}

impl OvisRule {
    pub fn parse(input: &str) -> Result<Self, RuleParseError> {
        let caps = CALL
            .captures(input)
            .ok_or_else(|| RuleParseError::Syntax(input.to_string()))?;
        let function = &caps[1];
        let raw_args = caps[2].trim();
        let args: Vec<&str> = if raw_args.is_empty() {
            Vec::new()
        } else {
            raw_args.split(',').map(str::trim).collect()
        };

        let arity = |expected: usize| -> Result<(), RuleParseError> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(RuleParseError::Arity {
                    function: function.to_string(),
                    expected,
                    got: args.len(),
                })
            }
        };

        match function {
            "required_missing" => {
                arity(0)?;
                Ok(OvisRule::RequiredMissing)
            }
            "empty" => {
                arity(1)?;
                Ok(OvisRule::Empty(field_ref(args[0])?))
            }
            "rows_below_min" => {
                arity(1)?;
                Ok(OvisRule::RowsBelowMin {
                    section: section_ref(args[0])?,
                })
            }
            "table_empty" => {
                arity(1)?;
                Ok(OvisRule::TableEmpty {
                    section: section_ref(args[0])?,
                })
            }
            "sum_zero" => {
                arity(1)?;
                Ok(OvisRule::SumZero(field_ref(args[0])?))
            }
            "date_order" => {
                arity(2)?;
                Ok(OvisRule::DateOrder {
                    first: field_ref(args[0])?,
                    second: field_ref(args[1])?,
                })
            }
            other => Err(RuleParseError::UnknownFunction(other.to_string())),
        }
    }
}

impl FromStr for OvisRule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OvisRule::parse(s)
    }
}

impl fmt::Display for OvisRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OvisRule::RequiredMissing => write!(f, "required_missing()"),
            OvisRule::Empty(r) => write!(f, "empty({})", r),
            OvisRule::RowsBelowMin { section } => write!(f, "rows_below_min({})", section),
            OvisRule::TableEmpty { section } => write!(f, "table_empty({})", section),
            OvisRule::SumZero(r) => write!(f, "sum_zero({})", r),
            OvisRule::DateOrder { first, second } => write!(f, "date_order({}, {})", first, second),
        }
    }
}

fn field_ref(arg: &str) -> Result<FieldRef, RuleParseError> {
    match REFERENCE.captures(arg) {
        Some(caps) => match caps.get(2) {
            Some(field) => Ok(FieldRef {
                section: caps[1].to_string(),
                field: field.as_str().to_string(),
            }),
            None => Err(RuleParseError::Reference(arg.to_string())),
        },
        None => Err(RuleParseError::Reference(arg.to_string())),
    }
}

fn section_ref(arg: &str) -> Result<String, RuleParseError> {
    match REFERENCE.captures(arg) {
        Some(caps) if caps.get(2).is_none() => Ok(caps[1].to_string()),
        _ => Err(RuleParseError::Reference(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_function() {
        assert_eq!(OvisRule::parse("required_missing()").unwrap(), OvisRule::RequiredMissing);
        assert_eq!(
            OvisRule::parse("empty(client.client_name)").unwrap(),
            OvisRule::Empty(FieldRef {
                section: "client".to_string(),
                field: "client_name".to_string()
            })
        );
        assert_eq!(
            OvisRule::parse("rows_below_min(hazards)").unwrap(),
            OvisRule::RowsBelowMin {
                section: "hazards".to_string()
            }
        );
        assert!(matches!(
            OvisRule::parse(" date_order( dates.original_completion , dates.revised_completion ) "),
            Ok(OvisRule::DateOrder { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_rules() {
        assert!(matches!(OvisRule::parse("client_name is empty"), Err(RuleParseError::Syntax(_))));
        assert!(matches!(OvisRule::parse("missing(a.b)"), Err(RuleParseError::UnknownFunction(_))));
        assert!(matches!(
            OvisRule::parse("empty(a.b, c.d)"),
            Err(RuleParseError::Arity { expected: 1, got: 2, .. })
        ));
        assert!(matches!(OvisRule::parse("empty(client)"), Err(RuleParseError::Reference(_))));
        assert!(matches!(OvisRule::parse("table_empty(a.b)"), Err(RuleParseError::Reference(_))));
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for rule in [
            "required_missing()",
            "empty(client.client_name)",
            "table_empty(materials_used)",
            "sum_zero(items.amount)",
            "date_order(dates.a, dates.b)",
        ] {
            let parsed = OvisRule::parse(rule).unwrap();
            assert_eq!(parsed.to_string(), rule);
        }
    }
}
