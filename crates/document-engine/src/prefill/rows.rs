//! Row collections that populate tables, keyed by `rowsKey`
//!
//! Each collection yields loosely-keyed source rows; a table takes the
//! keys matching its column ids and leaves the rest empty.

use std::collections::BTreeMap;

use jobpack_types::{round_cents, DocType, FieldValue, Table, TableRow, TradeType};

use super::PrefillContext;

/// Source row before projection onto a table's columns
pub type SourceRow = BTreeMap<&'static str, FieldValue>;

/// A hazard entry of the trade library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hazard {
    pub task: &'static str,
    pub hazard: &'static str,
    pub risk: &'static str,
    pub controls: &'static str,
}

/// Rows for the collection named `rows_key`. Unknown keys yield no rows.
pub fn collect(doc_type: DocType, rows_key: &str, ctx: &PrefillContext<'_>) -> Vec<SourceRow> {
    match rows_key {
        "materials" => materials_rows(doc_type, ctx),
        "hazards" => hazards_for(ctx.job.trade_type)
            .iter()
            .map(|h| {
                row([
                    ("task", h.task.into()),
                    ("hazard", h.hazard.into()),
                    ("risk", h.risk.into()),
                    ("controls", h.controls.into()),
                    ("responsible", FieldValue::from(ctx.profile.contact_name.clone())),
                ])
            })
            .collect(),
        "attendees" => ctx
            .profile
            .contact_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(|name| vec![row([("name", name.into()), ("role", "Supervisor".into())])])
            .unwrap_or_default(),
        "stages" => ctx
            .job
            .contract_value
            .map(|value| {
                vec![row([
                    ("stage", "Works completed to date".into()),
                    ("value", value.into()),
                ])]
            })
            .unwrap_or_default(),
        "maintenance_tasks" => maintenance_for(ctx.job.trade_type)
            .iter()
            .map(|(task, frequency, notes)| {
                row([
                    ("task", (*task).into()),
                    ("frequency", (*frequency).into()),
                    ("notes", (*notes).into()),
                ])
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn row<const N: usize>(cells: [(&'static str, FieldValue); N]) -> SourceRow {
    cells.into_iter().collect()
}

/// Materials ledger, with markup folded into unit costs only when asked.
/// Payment claims also carry a labour line when hours and a rate are known.
fn materials_rows(doc_type: DocType, ctx: &PrefillContext<'_>) -> Vec<SourceRow> {
    let default_markup = ctx.profile.markup_percent.unwrap_or(0.0);
    let mut rows: Vec<SourceRow> = ctx
        .job
        .materials
        .iter()
        .map(|line| {
            row([
                ("description", line.name.as_str().into()),
                ("item", line.name.as_str().into()),
                ("quantity", line.quantity.into()),
                ("unit", FieldValue::from(line.unit.clone())),
                (
                    "unit_cost",
                    line.priced_unit_cost(ctx.include_markup, default_markup).into(),
                ),
                (
                    "amount",
                    line.line_total(ctx.include_markup, default_markup).into(),
                ),
            ])
        })
        .collect();

    if doc_type == DocType::PaymentClaim {
        if let (Some(hours), Some(rate)) = (ctx.job.estimated_hours, ctx.profile.hourly_rate) {
            rows.push(row([
                ("description", "Labour".into()),
                ("quantity", hours.into()),
                ("unit", "hr".into()),
                ("unit_cost", rate.into()),
                ("amount", round_cents(hours * rate).into()),
            ]));
        }
    }
    rows
}

/// Project source rows onto `table`'s columns and pad to `min_rows`
pub fn project(table: &Table, source: Vec<SourceRow>) -> Vec<TableRow> {
    let mut rows: Vec<TableRow> = source
        .into_iter()
        .map(|src| {
            table
                .columns
                .iter()
                .map(|c| {
                    let value = src.get(c.id.as_str()).cloned().unwrap_or_default();
                    (c.id.clone(), value)
                })
                .collect()
        })
        .collect();

    while rows.len() < table.min_rows {
        rows.push(table.blank_row());
    }
    rows
}

/// Default hazard register for a trade
pub fn hazards_for(trade: TradeType) -> &'static [Hazard] {
    match trade {
        TradeType::Painter => &[
            Hazard {
                task: "Working from ladders and trestles",
                hazard: "Falls from height",
                risk: "High",
                controls: "Platform ladders or trestles with guard rails; three points of contact; edge protection above 2 m",
            },
            Hazard {
                task: "Surface preparation",
                hazard: "Lead paint dust in older buildings",
                risk: "High",
                controls: "Test for lead before sanding; wet sanding or HEPA extraction; P2 respirator",
            },
            Hazard {
                task: "Solvent-based coatings",
                hazard: "Fume inhalation and fire",
                risk: "Medium",
                controls: "Ventilate the area; low-VOC products where possible; no ignition sources",
            },
        ],
        TradeType::Plasterer => &[
            Hazard {
                task: "Cutting and sanding plasterboard",
                hazard: "Silica and gypsum dust",
                risk: "Medium",
                controls: "Dust extraction; P2 respirator; wet clean-up, no dry sweeping",
            },
            Hazard {
                task: "Handling sheets",
                hazard: "Manual handling injury",
                risk: "Medium",
                controls: "Two-person lift for sheets over 20 kg; sheet lifter for ceilings",
            },
            Hazard {
                task: "Working from trestles",
                hazard: "Falls from height",
                risk: "High",
                controls: "Trestles with planks and guard rails; keep platform clear",
            },
        ],
        TradeType::Carpenter => &[
            Hazard {
                task: "Power tool use",
                hazard: "Cuts and amputation",
                risk: "High",
                controls: "Guards fitted; RCD on all leads; eye and hearing protection",
            },
            Hazard {
                task: "Framing and fixing at height",
                hazard: "Falls from height",
                risk: "High",
                controls: "Scaffold or EWP with guard rails; harness where edge protection is not possible",
            },
            Hazard {
                task: "Handling timber",
                hazard: "Manual handling injury",
                risk: "Medium",
                controls: "Mechanical aids for long lengths; team lifts",
            },
        ],
        TradeType::Electrician => &[
            Hazard {
                task: "Work near energised circuits",
                hazard: "Electric shock",
                risk: "High",
                controls: "Isolate and lock out; test before touch; no live work",
            },
            Hazard {
                task: "Working in ceiling spaces",
                hazard: "Heat stress and falls through ceiling",
                risk: "High",
                controls: "Work in the cooler part of the day; crawl boards; isolate ceiling space power",
            },
            Hazard {
                task: "Switchboard replacement",
                hazard: "Asbestos exposure",
                risk: "High",
                controls: "Check the asbestos register; do not disturb suspected material",
            },
        ],
        TradeType::Other => &[
            Hazard {
                task: "General site work",
                hazard: "Slips, trips and falls",
                risk: "Medium",
                controls: "Keep the work area tidy; manage leads and hoses",
            },
            Hazard {
                task: "Moving materials",
                hazard: "Manual handling injury",
                risk: "Medium",
                controls: "Team lifts; trolleys for heavy items",
            },
        ],
    }
}

/// Default PPE selection for a trade
pub fn ppe_for(trade: TradeType) -> &'static [&'static str] {
    match trade {
        TradeType::Painter => &["Safety glasses", "Gloves", "Dust mask / respirator"],
        TradeType::Plasterer => &["Safety glasses", "Dust mask / respirator", "Steel-capped boots"],
        TradeType::Carpenter => &[
            "Safety glasses",
            "Hearing protection",
            "Steel-capped boots",
            "Hard hat",
        ],
        TradeType::Electrician => &["Safety glasses", "Gloves", "Steel-capped boots"],
        TradeType::Other => &["Safety glasses", "Steel-capped boots"],
    }
}

/// `(task, frequency, notes)` maintenance items for a trade
pub fn maintenance_for(trade: TradeType) -> &'static [(&'static str, &'static str, &'static str)] {
    match trade {
        TradeType::Painter => &[
            ("Wash down exterior painted surfaces", "Every 12 months", "Mild detergent and soft brush; no pressure washer"),
            ("Inspect for cracking or peeling paint", "Every 12 months", "Touch up early to keep moisture out"),
            ("Repaint high-wear exterior areas", "Every 5-7 years", ""),
        ],
        TradeType::Plasterer => &[
            ("Inspect ceilings for cracks or sagging", "Every 12 months", ""),
            ("Check wet-area sealant joints", "Every 6 months", "Re-seal any split joints"),
        ],
        TradeType::Carpenter => &[
            ("Oil or seal exposed timber", "Every 12 months", ""),
            ("Check fixings and hardware", "Every 12 months", "Tighten hinges and handrail fixings"),
        ],
        TradeType::Electrician => &[
            ("Test smoke alarms", "Every 6 months", "Replace batteries annually"),
            ("Test RCD safety switches", "Every 3 months", "Press the test button"),
        ],
        TradeType::Other => &[("General inspection of completed works", "Every 12 months", "")],
    }
}
