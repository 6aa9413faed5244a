use std::path::{Path, PathBuf};

use crate::core::{Job, JobRunner};
use crate::runtime::Error;

/// Divides one FASTA file into `units` roughly equal parts.
/// Parts are written next to `input` and named `<input stem>.<index>.fasta`
pub trait Splitter {
    /// External program this splitter runs, if any
    fn program(&self) -> Option<&Path> {
        None
    }

    /// Human readable commands, for dry runs
    fn describe(&self, input: &Path, units: usize, runner: &JobRunner) -> Vec<String>;

    fn split(&self, input: &Path, units: usize, runner: &JobRunner) -> Result<(), Error>;
}

/// `pyfasta split -n <units> <input>`
pub struct PyfastaSplitter {
    bin: PathBuf,
}

impl PyfastaSplitter {
    pub fn new<P: Into<PathBuf>>(bin: P) -> PyfastaSplitter {
        PyfastaSplitter { bin: bin.into() }
    }

    fn job(&self, input: &Path, units: usize) -> Job {
        let work_dir = input.parent().unwrap_or_else(|| Path::new("."));
        Job::new("pyfasta", &self.bin, work_dir.join("log"))
            .arg("split")
            .arg("-n")
            .arg(units.to_string())
            .arg(input)
            .current_dir(work_dir)
    }
}

impl Splitter for PyfastaSplitter {
    fn program(&self) -> Option<&Path> {
        Some(&self.bin)
    }

    fn describe(&self, input: &Path, units: usize, runner: &JobRunner) -> Vec<String> {
        vec![runner.render(&self.job(input, units))]
    }

    fn split(&self, input: &Path, units: usize, runner: &JobRunner) -> Result<(), Error> {
        runner.run(self.job(input, units)).map(|_| ())
    }
}
