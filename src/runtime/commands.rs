use std::fmt;

use clap::Subcommand;

use crate::command;

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: split, correct, merge and optionally assemble
    Run(command::RunCMD),
    /// Split the long reads into work units
    Split(command::SplitCMD),
    /// Correct split work units against the short reads
    Correct(command::CorrectCMD),
    /// Concatenate the corrected work units
    Merge(command::MergeCMD),
    /// Assemble the merged corrected reads with canu
    Assemble(command::AssembleCMD),
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cmd = match self {
            Commands::Run(_) => "Run",
            Commands::Split(_) => "Split",
            Commands::Correct(_) => "Correct",
            Commands::Merge(_) => "Merge",
            Commands::Assemble(_) => "Assemble",
        };
        write!(f, "{}", cmd)
    }
}
