//! The optimization/enumeration engine: drives the external constraint
//! solver through a multi-phase protocol (minimize mismatch, optionally
//! minimize cardinality, enumerate with blocking constraints).
//!
//! [`Identifier`] assembles logic programs from the hypergraph and dataset
//! facts plus the embedded rule files under `asp/`, [`ClingoRunner`] runs
//! them through the solver subprocess, and [`Sample`] wraps one returned
//! answer set with its derived views.

mod clingo;
mod identify;
mod sample;

pub use clingo::{AnswerSet, ClingoRunner, SolveConfig, SolveResult};
pub use identify::{Identifier, IdentifyOptions, SolutionEvent};
pub use sample::Sample;

/// The enumeration restriction policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Family {
    /// Every solution within the weight/cardinality bounds.
    All,
    /// Subset-minimal solutions only.
    Subset,
    /// Minimum-cardinality solutions only.
    Mincard,
}

impl Family {
    /// The name used on the command line and in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Family::All => "all",
            Family::Subset => "subset",
            Family::Mincard => "mincard",
        }
    }

    pub fn try_from_name(name: &str) -> Result<Family, String> {
        match name {
            "all" => Ok(Family::All),
            "subset" => Ok(Family::Subset),
            "mincard" => Ok(Family::Mincard),
            _ => Err(format!("Unknown family `{}`.", name)),
        }
    }
}
