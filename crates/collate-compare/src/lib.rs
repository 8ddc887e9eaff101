pub mod align;
pub mod diff;
pub mod similarity;
pub mod tokenize;

pub use align::{align, Alignment};
pub use diff::{char_edits, opcodes, OpTag, Opcode};
pub use similarity::{edit_distance, jaccard};
