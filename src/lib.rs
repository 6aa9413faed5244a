pub mod command;
pub mod core;
pub mod runtime;
pub mod utils;

pub use runtime::{Error, PipelineConfig};
