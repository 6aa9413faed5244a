pub mod core;
pub mod corrector;

pub use self::core::{CorrectStage, CorrectionReport};
pub use corrector::{ColormapParams, Correct, Corrector, ProovreadParams};
