pub mod pipeline;
pub mod plan;

pub use pipeline::Pipeline;
pub use plan::{Plan, Stage, StagePlan, Target};
