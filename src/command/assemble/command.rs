use anyhow::Result;
use clap::Args;

use super::core::{params, CanuAssembler};
use crate::core::Context;
use crate::runtime::ConfigLayer;

#[derive(Args)]
pub struct AssembleCMD {
    #[command(flatten)]
    pub config: ConfigLayer,
}

impl AssembleCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let config = self.config.resolve()?;
        let ctx = Context::new(&config)?;
        let params_io = params::IO::from_layout(&ctx.layout);
        let params_runtime = params::Runtime::from_config(&config);

        if config.force || !CanuAssembler::is_up_to_date(&params_io) {
            ctx.check_programs(&[params_runtime.bin.as_path()])?;
        }
        let outcome = CanuAssembler::run(&params_io, &params_runtime, &ctx.runner)?;
        log::info!("Assemble has finished ({:?})", outcome);
        Ok(())
    }
}
