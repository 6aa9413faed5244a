pub mod command;
pub mod core;

pub use command::RunCMD;
