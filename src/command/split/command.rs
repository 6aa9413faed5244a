use anyhow::Result;
use clap::Args;

use super::core::{PyfastaSplitter, SplitStage, Splitter};
use crate::core::Context;
use crate::runtime::ConfigLayer;

#[derive(Args)]
pub struct SplitCMD {
    #[command(flatten)]
    pub config: ConfigLayer,
}

impl SplitCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let config = self.config.resolve()?;
        let ctx = Context::new(&config)?;
        let splitter = PyfastaSplitter::new(&config.splitter_bin);
        if let Some(program) = splitter.program() {
            ctx.check_programs(&[program])?;
        }
        SplitStage::run(&ctx, &splitter)?;
        log::info!("Split has finished successfully");
        Ok(())
    }
}
