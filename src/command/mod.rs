pub mod assemble;
pub mod correct;
pub mod merge;
pub mod run;
pub mod split;

pub use assemble::AssembleCMD;
pub use correct::CorrectCMD;
pub use merge::MergeCMD;
pub use run::RunCMD;
pub use split::SplitCMD;
