use log::{error, info};

use super::plan::{Plan, Stage, StagePlan, Target};
use crate::command::assemble::core::{params, AssemblyOutcome, CanuAssembler};
use crate::command::correct::core::{CorrectStage, Corrector};
use crate::command::merge::core::MergeStage;
use crate::command::split::core::{PyfastaSplitter, SplitStage, Splitter};
use crate::core::{Context, JobRunner, WorkUnit};
use crate::runtime::{Error, PipelineConfig};
use crate::utils::remove_if_exists;

///////////////////////////////
/// Resolved -> Split -> Corrected(all units) -> Merged -> [Assembled].
/// Work is only done where the target's outputs are missing, or everywhere with `force`
pub struct Pipeline<'a> {
    ctx: Context<'a>,
    splitter: Box<dyn Splitter>,
    corrector: Corrector,
}

/// Which stages need to run, decided from what is on disk
struct Decision {
    split: bool,
    correct: Vec<WorkUnit>,
    merge: bool,
    assemble: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Pipeline<'a>, Error> {
        Ok(Pipeline {
            ctx: Context::new(config)?,
            splitter: Box::new(PyfastaSplitter::new(&config.splitter_bin)),
            corrector: Corrector::from_config(config),
        })
    }

    pub fn with_splitter(mut self, splitter: Box<dyn Splitter>) -> Pipeline<'a> {
        self.splitter = splitter;
        self
    }

    pub fn with_runner(mut self, runner: JobRunner) -> Pipeline<'a> {
        self.ctx = self.ctx.with_runner(runner);
        self
    }

    pub fn context(&self) -> &Context<'a> {
        &self.ctx
    }

    fn assembly_params(&self) -> (params::IO, params::Runtime) {
        (
            params::IO::from_layout(&self.ctx.layout),
            params::Runtime::from_config(self.ctx.config),
        )
    }

    /// Walk back from the target: a stage runs only if something after it needs its output
    fn decide(&self, target: Target) -> Result<Decision, Error> {
        let force = self.ctx.config.force;
        let (params_io, _) = self.assembly_params();

        let assemble =
            target == Target::Assembly && (force || !CanuAssembler::is_up_to_date(&params_io));
        // the merged output always has to match the configured units, even when the contigs exist
        let merge = force || !MergeStage::is_up_to_date(&self.ctx.layout, &self.ctx.units);
        let correct = if merge {
            CorrectStage::pending(&self.ctx, &self.ctx.units)
        } else {
            Vec::new()
        };
        let split = if force {
            true
        } else if correct.is_empty() {
            false
        } else {
            !SplitStage::is_up_to_date(&self.ctx.layout, &self.ctx.units)?
        };
        // corrected files of an earlier split belong to other reads
        let correct = if split { self.ctx.units.clone() } else { correct };
        Ok(Decision {
            split,
            correct,
            merge,
            assemble,
        })
    }

    pub fn plan(&self, target: Target) -> Result<Plan, Error> {
        let decision = self.decide(target)?;
        Ok(self.plan_for(target, &decision))
    }

    fn plan_for(&self, target: Target, decision: &Decision) -> Plan {
        let layout = &self.ctx.layout;

        let mut stages = vec![
            StagePlan {
                stage: Stage::Split,
                pending: decision.split,
                actions: if decision.split {
                    SplitStage::describe(&self.ctx, self.splitter.as_ref())
                } else {
                    Vec::new()
                },
            },
            StagePlan {
                stage: Stage::Correct,
                pending: !decision.correct.is_empty(),
                actions: CorrectStage::describe(&self.ctx, &self.corrector, &decision.correct),
            },
            StagePlan {
                stage: Stage::Merge,
                pending: decision.merge,
                actions: if decision.merge {
                    vec![format!(
                        "concatenate {} corrected files into {}",
                        self.ctx.units.len(),
                        layout.merged_output().display()
                    )]
                } else {
                    Vec::new()
                },
            },
        ];
        if target == Target::Assembly {
            let (params_io, params_runtime) = self.assembly_params();
            stages.push(StagePlan {
                stage: Stage::Assemble,
                pending: decision.assemble,
                actions: if decision.assemble {
                    CanuAssembler::describe(&params_io, &params_runtime, &self.ctx.runner)
                } else {
                    Vec::new()
                },
            });
        }
        Plan { stages }
    }

    /// Make sure every program a pending stage runs can be started
    pub fn check_programs(&self, plan: &Plan) -> Result<(), Error> {
        let (_, params_runtime) = self.assembly_params();
        let mut programs = Vec::new();
        if plan.is_pending(Stage::Split) {
            programs.extend(self.splitter.program());
        }
        if plan.is_pending(Stage::Correct) {
            programs.push(self.corrector.as_correct().program());
        }
        if plan.is_pending(Stage::Assemble) {
            programs.push(params_runtime.bin.as_path());
        }
        self.ctx.check_programs(&programs)
    }

    pub fn run(&self, target: Target) -> Result<(), Error> {
        let decision = self.decide(target)?;
        let ctx = &self.ctx;
        info!(
            "Running pipeline for {} ({} units, {:?} corrector, target {:?})",
            ctx.layout.prefix(),
            ctx.units.len(),
            ctx.config.corrector,
            target
        );
        self.check_programs(&self.plan_for(target, &decision))?;

        if decision.split {
            let corrected_dir = ctx.layout.corrected_dir();
            if SplitStage::run(ctx, self.splitter.as_ref())? && corrected_dir.exists() {
                info!("Discarding {}, it was built from an earlier split", corrected_dir.display());
                remove_if_exists(&corrected_dir)?;
            }
        }

        let mut corrected_any = false;
        if !decision.correct.is_empty() {
            let mut report = CorrectStage::run(ctx, &self.corrector, &decision.correct)?;
            corrected_any = !report.corrected.is_empty();
            if let Some(i) = report.failed.iter().position(|(_, e)| e.is_fatal()) {
                return Err(report.failed.swap_remove(i).1);
            }
            if !report.is_complete() {
                error!(
                    "{} unit(s) failed correction; nothing will be merged",
                    report.failed.len()
                );
            }
        }

        let mut merged = false;
        if decision.merge || corrected_any {
            MergeStage::run(&ctx.layout, &ctx.units)?;
            merged = true;
        } else {
            info!("{} is up to date", ctx.layout.merged_output().display());
        }

        if target == Target::Assembly && (decision.assemble || merged) {
            let (params_io, mut params_runtime) = self.assembly_params();
            params_runtime.force |= merged;
            match CanuAssembler::run(&params_io, &params_runtime, &ctx.runner)? {
                AssemblyOutcome::Submitted => info!("Assembly continues on the grid"),
                AssemblyOutcome::Assembled | AssemblyOutcome::UpToDate => {}
            }
        }

        info!("Pipeline has finished successfully");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::command::split::core::testing::RoundRobinSplitter;
    use crate::core::Launcher;
    use crate::runtime::{ConfigLayer, CorrectorKind};

    /// runCorr.sh stand-in: `<long> <short> <outdir>/ <unit> <threads>`
    const FAKE_COLORMAP: &str = "#!/bin/sh\n\
        case \"$4\" in *.$FAIL_UNIT) exit 3;; esac\n\
        cp \"$1\" \"$3$4_iter2.fasta\"\n";

    /// canu stand-in: `-p res -d <dir> genomeSize=<g> -pacbio-raw <merged> useGrid=0`
    const FAKE_CANU: &str = "#!/bin/sh\ncp \"$7\" \"$4/$2.contigs.fasta\"\n";

    fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn setup(dir: &Path, units: usize, fail_unit: &str) -> PipelineConfig {
        let long_reads = dir.join("sample.fasta");
        let reads: String = (0..10).map(|i| format!(">read{}\nACGTACGT{}\n", i, i)).collect();
        fs::write(&long_reads, reads).unwrap();
        let short_reads = dir.join("short.fastq");
        fs::write(&short_reads, "@s\nACGT\n+\nIIII\n").unwrap();
        let colormap = script(
            dir,
            "runCorr.sh",
            &FAKE_COLORMAP.replace("$FAIL_UNIT", fail_unit),
        );
        let canu = script(dir, "canu", FAKE_CANU);
        ConfigLayer {
            long_reads: Some(long_reads),
            short_reads: Some(short_reads),
            corrector: Some(CorrectorKind::Colormap),
            units: Some(units),
            out_dir: Some(dir.join("out")),
            colormap_bin: Some(colormap),
            canu_bin: Some(canu),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    fn pipeline(config: &PipelineConfig) -> Pipeline<'_> {
        Pipeline::new(config)
            .unwrap()
            .with_splitter(Box::new(RoundRobinSplitter { emit: None }))
            .with_runner(JobRunner::new(Launcher::Local, 4).with_poll_interval(Duration::from_millis(10)))
    }

    #[test]
    fn test_plan_for_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), 2, "none");
        let plan = pipeline(&config).plan(Target::Merge).unwrap();

        assert!(plan.is_pending(Stage::Split));
        assert!(plan.is_pending(Stage::Merge));
        assert!(plan.stage(Stage::Assemble).is_none());
        let correct = plan.stage(Stage::Correct).unwrap();
        assert_eq!(correct.actions.len(), 2);
        assert!(correct.actions[1].contains("sample.001"));
        // planning touches nothing
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_run_to_merged_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), 2, "none");
        let pipeline = pipeline(&config);
        pipeline.run(Target::Merge).unwrap();

        let layout = &pipeline.context().layout;
        let units = &pipeline.context().units;
        let expected: String = units
            .iter()
            .map(|u| fs::read_to_string(layout.split_file(u)).unwrap())
            .collect();
        assert_eq!(fs::read_to_string(layout.merged_output()).unwrap(), expected);
        assert_eq!(expected.matches('>').count(), 10);

        let plan = pipeline.plan(Target::Merge).unwrap();
        assert!(plan.stages.iter().all(|s| !s.pending));
    }

    #[test]
    fn test_merged_output_without_intermediates_is_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), 2, "none");
        let pipeline = pipeline(&config);
        pipeline.run(Target::Merge).unwrap();
        fs::remove_dir_all(pipeline.context().layout.split_dir()).unwrap();

        let plan = pipeline.plan(Target::Merge).unwrap();
        assert!(!plan.is_pending(Stage::Split));
        assert!(!plan.is_pending(Stage::Correct));
    }

    #[test]
    fn test_failed_unit_blocks_merge() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), 3, "002");
        let pipeline = pipeline(&config);

        match pipeline.run(Target::Merge) {
            Err(Error::MissingUpstreamOutput { stage, paths }) => {
                assert_eq!(stage, "merge");
                assert_eq!(paths.len(), 1);
                assert!(paths[0].ends_with("sample.002_iter2.fasta"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        let layout = &pipeline.context().layout;
        assert!(!layout.merged_output().exists());
        assert!(layout.corrected_file(&pipeline.context().units[0]).exists());

        // the next round only has the failed unit left
        let plan = pipeline.plan(Target::Merge).unwrap();
        assert!(!plan.is_pending(Stage::Split));
        assert_eq!(plan.stage(Stage::Correct).unwrap().actions.len(), 1);
    }

    #[test]
    fn test_split_count_mismatch_stops_before_correction() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), 3, "none");
        let pipeline = Pipeline::new(&config)
            .unwrap()
            .with_splitter(Box::new(RoundRobinSplitter { emit: Some(2) }));

        assert!(matches!(
            pipeline.run(Target::Merge),
            Err(Error::OutputCountMismatch { expected: 3, found: 2, .. })
        ));
        assert!(!pipeline.context().layout.corrected_dir().exists());
    }

    #[test]
    fn test_run_to_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), 2, "none");
        let pipeline = pipeline(&config);
        pipeline.run(Target::Assembly).unwrap();

        let layout = &pipeline.context().layout;
        assert_eq!(
            fs::read(layout.assembly_contigs()).unwrap(),
            fs::read(layout.merged_output()).unwrap()
        );
        let plan = pipeline.plan(Target::Assembly).unwrap();
        assert!(!plan.is_pending(Stage::Assemble));
    }
}
