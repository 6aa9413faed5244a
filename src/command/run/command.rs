use anyhow::{Context as _, Result};
use clap::Args;

use super::core::{Pipeline, Target};
use crate::runtime::ConfigLayer;

#[derive(Args)]
pub struct RunCMD {
    #[command(flatten)]
    pub config: ConfigLayer,

    /// Print the configuration and what each stage would run, then exit
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Last artifact to produce
    #[arg(long, value_enum, default_value_t = Target::Merge)]
    pub target: Target,
}

impl RunCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let config = self.config.resolve()?;
        let pipeline = Pipeline::new(&config)?;

        if self.dry_run {
            let effective = toml::to_string_pretty(&config)
                .context("Failed to render the effective configuration")?;
            println!("# effective configuration\n{}", effective);
            print!("{}", pipeline.plan(self.target)?);
            return Ok(());
        }

        pipeline.run(self.target)?;
        Ok(())
    }
}
