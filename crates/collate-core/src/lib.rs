pub mod config;
pub mod error;
pub mod hash;
pub mod input;
pub mod span;
pub mod witness;

pub use config::*;
pub use error::*;
pub use hash::*;
pub use input::*;
pub use span::*;
pub use witness::*;
