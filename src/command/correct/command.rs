use anyhow::Result;
use clap::Args;
use itertools::Itertools;

use super::core::{CorrectStage, Corrector};
use crate::core::Context;
use crate::runtime::ConfigLayer;

#[derive(Args)]
pub struct CorrectCMD {
    #[command(flatten)]
    pub config: ConfigLayer,

    /// Only correct the unit with this index
    #[arg(short = 'u', long, value_parser = clap::value_parser!(usize))]
    pub unit: Option<usize>,
}

impl CorrectCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let config = self.config.resolve()?;
        let ctx = Context::new(&config)?;
        let corrector = Corrector::from_config(&config);

        let units = match self.unit {
            Some(index) => match ctx.units.get(index) {
                Some(unit) => vec![unit.clone()],
                None => anyhow::bail!(
                    "Unit {} does not exist; there are {} units",
                    index,
                    ctx.units.len()
                ),
            },
            None => ctx.units.clone(),
        };

        if !CorrectStage::pending(&ctx, &units).is_empty() {
            ctx.check_programs(&[corrector.as_correct().program()])?;
        }
        let report = CorrectStage::run(&ctx, &corrector, &units)?;
        if !report.is_complete() {
            anyhow::bail!(
                "Correction failed for {} unit(s): {}",
                report.failed.len(),
                report.failed.iter().map(|(u, _)| u).join(", ")
            );
        }
        log::info!("Correction has finished successfully");
        Ok(())
    }
}
