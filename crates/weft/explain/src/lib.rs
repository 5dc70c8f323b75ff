//! weft-explain: resolution reports
//!
//! Renders what the resolver would do for a slot and a value: every
//! discovered trait composition, step by step, with diagnostic labels.
//! Consumes only the public surface of `weft-engine`; nothing here
//! touches resolution state or creates items.

#![deny(unsafe_code)]

use std::fmt;

use serde::Serialize;
use weft_engine::{Container, Requirement, TraitRef};
use weft_types::{Slot, Value};

/// One trait application inside a path.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    /// The trait's description, or a shape-derived name for anonymous
    /// traits.
    pub trait_name: String,
    /// Labels of the slots the trait provides, in declaration order.
    pub provides: Vec<String>,
}

/// One complete trait composition satisfying the slot.
#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub steps: Vec<Step>,
}

/// Full report for one (slot, value) resolution question.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub slot: String,
    pub value: String,
    /// Discovered paths in breadth-first order; empty when nothing
    /// satisfies the slot for this value.
    pub paths: Vec<PathReport>,
}

fn slot_name(slot: &Slot) -> String {
    slot.description()
        .map(str::to_string)
        .unwrap_or_else(|| "(anonymous)".to_string())
}

fn trait_name(trait_ref: &TraitRef) -> String {
    if let Some(description) = trait_ref.description() {
        return description.to_string();
    }
    match trait_ref.requires() {
        Requirement::Predicate(_) => "predicate trait".to_string(),
        Requirement::Slots(required) => {
            let names: Vec<String> = required.iter().map(slot_name).collect();
            format!("slot trait [requires: {}]", names.join(", "))
        }
        Requirement::None => "trait".to_string(),
    }
}

/// Ask the container how `slot` would resolve for `value` and build the
/// report.
pub fn explain(container: &Container, slot: &Slot, value: &Value) -> Explanation {
    let paths = container
        .resolve_paths(slot, value)
        .into_iter()
        .map(|path| PathReport {
            steps: path
                .iter()
                .map(|trait_ref| Step {
                    trait_name: trait_name(trait_ref),
                    provides: trait_ref.provides().iter().map(slot_name).collect(),
                })
                .collect(),
        })
        .collect();

    Explanation {
        slot: slot_name(slot),
        value: value.to_string(),
        paths,
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resolving slot \"{}\" for value: {}", self.slot, self.value)?;
        if self.paths.is_empty() {
            return write!(f, "  No paths found.");
        }
        for (i, path) in self.paths.iter().enumerate() {
            writeln!(f, "  Path {}:", i + 1)?;
            for (j, step) in path.steps.iter().enumerate() {
                writeln!(
                    f,
                    "    {}. {} -> provides: [{}]",
                    j + 1,
                    step.trait_name,
                    step.provides.join(", ")
                )?;
            }
        }
        Ok(())
    }
}
