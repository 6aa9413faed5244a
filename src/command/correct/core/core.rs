use std::fs;
use std::path::PathBuf;

use log::{error, info, warn};

use super::corrector::{Correct, CorrectionInput, Corrector};
use crate::core::layout::WORK_DIR;
use crate::core::{Context, Job, WorkUnit};
use crate::runtime::{Error, IoContext};
use crate::utils::{publish, remove_if_exists};

/// Outcome of one correction round
#[derive(Debug, Default)]
pub struct CorrectionReport {
    pub corrected: Vec<WorkUnit>,
    pub up_to_date: Vec<WorkUnit>,
    pub failed: Vec<(WorkUnit, Error)>,
}

impl CorrectionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CorrectStage {}

impl CorrectStage {
    /// Units among `units` that still need a corrected file
    pub fn pending(ctx: &Context, units: &[WorkUnit]) -> Vec<WorkUnit> {
        units
            .iter()
            .filter(|u| ctx.config.force || !ctx.layout.corrected_file(u).is_file())
            .cloned()
            .collect()
    }

    /// Commands that would correct `units`, one per unit
    pub fn describe(ctx: &Context, corrector: &Corrector, units: &[WorkUnit]) -> Vec<String> {
        units
            .iter()
            .map(|unit| {
                let split_file = ctx.layout.split_file(unit);
                let work_dir = ctx.layout.unit_work_dir(unit);
                let input = Self::input(ctx, unit, &split_file, &work_dir);
                ctx.runner.render(&corrector.as_correct().job(&input))
            })
            .collect()
    }

    /// Correct every unit in `units` that is not corrected yet. Units are independent:
    /// a failing unit is recorded in the report and does not stop the others
    pub fn run(
        ctx: &Context,
        corrector: &Corrector,
        units: &[WorkUnit],
    ) -> Result<CorrectionReport, Error> {
        let correct = corrector.as_correct();
        let pending = Self::pending(ctx, units);
        let mut report = CorrectionReport {
            up_to_date: units
                .iter()
                .filter(|u| !pending.contains(u))
                .cloned()
                .collect(),
            ..Default::default()
        };
        if pending.is_empty() {
            info!("All {} corrected files are up to date", units.len());
            return Ok(report);
        }

        let missing: Vec<PathBuf> = pending
            .iter()
            .map(|u| ctx.layout.split_file(u))
            .filter(|p| !p.is_file())
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing_upstream_output("correct", missing));
        }

        let corrected_dir = ctx.layout.corrected_dir();
        fs::create_dir_all(&corrected_dir).with_path("Failed to create", &corrected_dir)?;

        info!(
            "Correcting {} units with {} ({} up to date)",
            pending.len(),
            correct.name(),
            report.up_to_date.len()
        );
        let mut jobs: Vec<Job> = Vec::with_capacity(pending.len());
        for unit in pending.iter() {
            let work_dir = ctx.layout.unit_work_dir(unit);
            remove_if_exists(&work_dir)?;
            fs::create_dir_all(&work_dir).with_path("Failed to create", &work_dir)?;
            let split_file = ctx.layout.split_file(unit);
            jobs.push(correct.job(&Self::input(ctx, unit, &split_file, &work_dir)));
        }

        let results = ctx.runner.run_all(jobs);
        for (unit, result) in pending.into_iter().zip(results) {
            match result.and_then(|job| Self::publish_unit(ctx, correct, &unit, &job)) {
                Ok(()) => report.corrected.push(unit),
                Err(e) => report.failed.push((unit, e)),
            }
        }

        let work_root = corrected_dir.join(WORK_DIR);
        if fs::read_dir(&work_root)
            .map(|mut d| d.next().is_none())
            .unwrap_or(false)
        {
            let _ = fs::remove_dir(&work_root);
        }

        if report.is_complete() {
            info!("Corrected {} units", report.corrected.len());
        } else {
            for (unit, e) in report.failed.iter() {
                error!("Unit {} failed: {}", unit, e);
            }
            warn!(
                "{} of {} units failed; their logs are kept under {}",
                report.failed.len(),
                units.len(),
                work_root.display()
            );
        }
        Ok(report)
    }

    fn input<'a>(
        ctx: &'a Context,
        unit: &'a WorkUnit,
        split_file: &'a std::path::Path,
        work_dir: &'a std::path::Path,
    ) -> CorrectionInput<'a> {
        CorrectionInput {
            unit,
            split_file,
            short_reads: &ctx.config.short_reads,
            work_dir,
        }
    }

    /// Move the tool's product to `<unit>_iter2.fasta` and drop the scratch directory
    fn publish_unit(
        ctx: &Context,
        correct: &dyn Correct,
        unit: &WorkUnit,
        job: &Job,
    ) -> Result<(), Error> {
        let split_file = ctx.layout.split_file(unit);
        let work_dir = ctx.layout.unit_work_dir(unit);
        let product = correct.product(&Self::input(ctx, unit, &split_file, &work_dir));
        if !product.is_file() {
            return Err(Error::external_tool_failure(
                correct.name(),
                Some(unit.name()),
                ctx.runner.render(job),
                "exit status: 0",
                Some(format!("expected output {:?} was not written", product)),
            ));
        }
        publish(&product, &ctx.layout.corrected_file(unit))?;
        remove_if_exists(&work_dir)
    }
}
