//! Core data model: parameter trees, reforms, household situations, and
//! chart payloads.

pub mod charts;
pub mod params;
pub mod reform;
pub mod situation;

pub use charts::{
    BudgetChart, BudgetPoint, DecileChart, IntraDecileChart, MtrChart, MtrPoint, PovertyChart,
    PovertyRow, WaterfallBar, WaterfallChart,
};
pub use params::{Entity, ParamValue, ParameterMeta, ParameterTree, VariableMetadata};
pub use reform::{ParameterOverride, ProvisionDescription, Reform};
pub use situation::{Situation, SituationPerson};
