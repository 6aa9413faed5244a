use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::layout::CORRECTED_FILE_SUFFIX;
use crate::core::{Job, WorkUnit};
use crate::runtime::{CorrectorKind, PipelineConfig};

pub const LOG_DIR: &str = "log";

/// Files one correction job reads and the directory it may write to
pub struct CorrectionInput<'a> {
    pub unit: &'a WorkUnit,
    pub split_file: &'a Path,
    pub short_reads: &'a Path,
    pub work_dir: &'a Path,
}

impl CorrectionInput<'_> {
    /// `<unit>_iter2`, the stem both correctors are asked to write under
    fn output_stem(&self) -> String {
        format!("{}{}", self.unit, CORRECTED_FILE_SUFFIX.trim_end_matches(".fasta"))
    }
}

/// An external long read corrector
pub trait Correct {
    fn name(&self) -> &str;

    fn program(&self) -> &Path;

    fn job(&self, input: &CorrectionInput) -> Job;

    /// Where the tool leaves the corrected reads of a successful run
    fn product(&self, input: &CorrectionInput) -> PathBuf;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColormapParams {
    pub bin: PathBuf,
    pub threads: usize,
}

/// `runCorr.sh <long> <short> <dir>/ <unit> <threads>`, writes `<dir>/<unit>_iter2.fasta`
impl Correct for ColormapParams {
    fn name(&self) -> &str {
        "colormap"
    }

    fn program(&self) -> &Path {
        &self.bin
    }

    fn job(&self, input: &CorrectionInput) -> Job {
        let mut out_dir = OsString::from(input.work_dir);
        out_dir.push("/");
        Job::new(self.name(), &self.bin, input.work_dir.join(LOG_DIR))
            .unit(input.unit)
            .arg(input.split_file)
            .arg(input.short_reads)
            .arg(out_dir)
            .arg(input.unit.name())
            .arg(self.threads.to_string())
            .current_dir(input.work_dir)
    }

    fn product(&self, input: &CorrectionInput) -> PathBuf {
        input.work_dir.join(format!("{}.fasta", input.output_stem()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProovreadParams {
    pub bin: PathBuf,
    pub threads: usize,
    pub coverage: usize,
}

/// `proovread -l <long> -s <short> --pre <dir>/<unit>_iter2 -t <threads> --coverage=<cov>`,
/// writes `<dir>/<unit>_iter2/<unit>_iter2.trimmed.fa`
impl Correct for ProovreadParams {
    fn name(&self) -> &str {
        "proovread"
    }

    fn program(&self) -> &Path {
        &self.bin
    }

    fn job(&self, input: &CorrectionInput) -> Job {
        Job::new(self.name(), &self.bin, input.work_dir.join(LOG_DIR))
            .unit(input.unit)
            .arg("-l")
            .arg(input.split_file)
            .arg("-s")
            .arg(input.short_reads)
            .arg("--pre")
            .arg(input.work_dir.join(input.output_stem()))
            .arg("-t")
            .arg(self.threads.to_string())
            .arg(format!("--coverage={}", self.coverage))
            .current_dir(input.work_dir)
    }

    fn product(&self, input: &CorrectionInput) -> PathBuf {
        let stem = input.output_stem();
        input
            .work_dir
            .join(&stem)
            .join(format!("{}.trimmed.fa", stem))
    }
}

/// The correctors the pipeline knows, each with its own parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Corrector {
    Colormap(ColormapParams),
    Proovread(ProovreadParams),
}

impl Corrector {
    pub fn from_config(config: &PipelineConfig) -> Corrector {
        match config.corrector {
            CorrectorKind::Colormap => Corrector::Colormap(ColormapParams {
                bin: config.colormap_bin.clone(),
                threads: config.threads,
            }),
            CorrectorKind::Proovread => Corrector::Proovread(ProovreadParams {
                bin: config.proovread_bin.clone(),
                threads: config.proovread_threads,
                coverage: config.proovread_coverage,
            }),
        }
    }

    pub fn as_correct(&self) -> &dyn Correct {
        match self {
            Corrector::Colormap(params) => params as &dyn Correct,
            Corrector::Proovread(params) => params as &dyn Correct,
        }
    }
}
