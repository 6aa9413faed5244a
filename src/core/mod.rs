pub mod context;
pub mod job;
pub mod launcher;
pub mod layout;
pub mod runner;
pub mod unit;

pub use context::Context;
pub use job::Job;
pub use launcher::Launcher;
pub use layout::Layout;
pub use runner::JobRunner;
pub use unit::{derive_prefix, resolve_units, WorkUnit};
