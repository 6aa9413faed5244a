pub mod core;
pub mod splitter;
#[cfg(test)]
pub(crate) mod testing;

pub use self::core::SplitStage;
pub use splitter::{PyfastaSplitter, Splitter};
