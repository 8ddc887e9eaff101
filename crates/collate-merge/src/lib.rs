pub mod apparatus;
pub mod classify;
pub mod coalesce;
pub mod pipeline;
pub mod reconcile;
pub mod reconstruct;
pub mod scope;
pub mod stats;
pub mod unify;

pub use apparatus::Segment;
pub use classify::Classifier;
pub use coalesce::coalesce;
pub use pipeline::{CollatedUnit, UnitPipeline};
pub use reconstruct::reconstruct;
pub use scope::UnitScope;
pub use stats::{UnitStats, VariantCounts};
pub use unify::{Unified, Unifier};
