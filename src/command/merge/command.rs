use anyhow::Result;
use clap::Args;

use super::core::MergeStage;
use crate::core::Context;
use crate::runtime::ConfigLayer;

#[derive(Args)]
pub struct MergeCMD {
    #[command(flatten)]
    pub config: ConfigLayer,
}

impl MergeCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let config = self.config.resolve()?;
        let ctx = Context::new(&config)?;
        if !config.force && MergeStage::is_up_to_date(&ctx.layout, &ctx.units) {
            log::info!("{} is up to date", ctx.layout.merged_output().display());
            return Ok(());
        }
        MergeStage::run(&ctx.layout, &ctx.units)?;
        log::info!("Merge has finished successfully");
        Ok(())
    }
}
