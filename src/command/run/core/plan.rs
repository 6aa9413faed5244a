use std::fmt;

use clap::ValueEnum;

/// Last artifact the pipeline should produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Stop after `<prefix>_corrected.fasta`
    #[default]
    Merge,
    /// Continue to `<prefix>_assembly/res.contigs.fasta`
    Assembly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Split,
    Correct,
    Merge,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Split => "split",
            Stage::Correct => "correct",
            Stage::Merge => "merge",
            Stage::Assemble => "assemble",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: Stage,
    pub pending: bool,
    /// What the stage will do, one line each. External commands are shown as submitted
    pub actions: Vec<String>,
}

/// What a run would do, stage by stage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub stages: Vec<StagePlan>,
}

impl Plan {
    pub fn stage(&self, stage: Stage) -> Option<&StagePlan> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn is_pending(&self, stage: Stage) -> bool {
        self.stage(stage).map(|s| s.pending).unwrap_or(false)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in self.stages.iter() {
            let status = if stage.pending { "pending" } else { "up to date" };
            writeln!(f, "[{}] {}", status, stage.stage)?;
            for action in stage.actions.iter() {
                writeln!(f, "    {}", action)?;
            }
        }
        Ok(())
    }
}
