pub mod core;
pub mod params;

pub use self::core::{AssemblyOutcome, CanuAssembler};
