//! Planning helpers

pub mod compile;
pub mod deps;
pub mod validate;

pub use deps::DependencyGraph;
pub use validate::PlanReport;
