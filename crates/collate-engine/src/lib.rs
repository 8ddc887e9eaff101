pub mod annotate;
pub mod engine;
pub mod result;

pub use engine::CollationEngine;
pub use result::*;
