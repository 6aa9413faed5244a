use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::params;
use crate::core::layout::ASSEMBLY_PREFIX;
use crate::core::{Job, JobRunner};
use crate::runtime::{Error, IoContext};
use crate::utils::{publish, remove_if_exists, staging_path};

pub const LOG_DIR: &str = "canupipe-log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyOutcome {
    UpToDate,
    Assembled,
    /// canu handed itself to the grid; contigs appear when those jobs finish
    Submitted,
}

pub struct CanuAssembler {}

impl CanuAssembler {
    pub fn is_up_to_date(params_io: &params::IO) -> bool {
        params_io.path_contigs.is_file()
    }

    /// `canu -p res -d <dir> genomeSize=<g> -pacbio-raw <merged> useGrid=<0|1> [gridOptions=<..>]`
    pub fn job(params_io: &params::IO, params_runtime: &params::Runtime, dir: &Path) -> Job {
        let mut job = Job::new("canu", &params_runtime.bin, dir.join(LOG_DIR))
            .arg("-p")
            .arg(ASSEMBLY_PREFIX)
            .arg("-d")
            .arg(dir)
            .arg(format!("genomeSize={}", params_runtime.genome_size))
            .arg("-pacbio-raw")
            .arg(&params_io.path_in);
        job = match &params_runtime.grid_options {
            Some(grid_options) => job
                .arg("useGrid=1")
                .arg(format!("gridOptions={}", grid_options)),
            None => job.arg("useGrid=0"),
        };
        job
    }

    /// Directory canu is pointed at. Without a grid canu runs in a staging directory that is renamed
    /// once the contigs exist; with a grid its jobs keep writing after canu returns, so it works in place
    pub fn run_dir(params_io: &params::IO, params_runtime: &params::Runtime) -> PathBuf {
        match params_runtime.grid_options {
            Some(_) => params_io.path_out.clone(),
            None => staging_path(&params_io.path_out),
        }
    }

    pub fn describe(
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        runner: &JobRunner,
    ) -> Vec<String> {
        let dir = Self::run_dir(params_io, params_runtime);
        vec![runner.render(&Self::job(params_io, params_runtime, &dir))]
    }

    pub fn run(
        params_io: &params::IO,
        params_runtime: &params::Runtime,
        runner: &JobRunner,
    ) -> Result<AssemblyOutcome, Error> {
        if !params_runtime.force && Self::is_up_to_date(params_io) {
            info!("{} is up to date", params_io.path_contigs.display());
            return Ok(AssemblyOutcome::UpToDate);
        }
        if !params_io.path_in.is_file() {
            return Err(Error::missing_upstream_output(
                "assemble",
                vec![params_io.path_in.clone()],
            ));
        }

        let dir = Self::run_dir(params_io, params_runtime);
        if params_runtime.grid_options.is_none() || params_runtime.force {
            remove_if_exists(&dir)?;
        }
        fs::create_dir_all(&dir).with_path("Failed to create", &dir)?;

        info!("Assembling {}", params_io.path_in.display());
        let result = runner.run(Self::job(params_io, params_runtime, &dir));
        if result.is_err() && params_runtime.grid_options.is_none() {
            let _ = remove_if_exists(&dir);
        }
        result?;

        if params_runtime.grid_options.is_some() {
            warn!(
                "canu submitted its jobs to the grid; contigs will be written to {}",
                params_io.path_contigs.display()
            );
            return Ok(AssemblyOutcome::Submitted);
        }

        let staged_contigs = dir.join(
            params_io
                .path_contigs
                .file_name()
                .unwrap_or_default(),
        );
        if !staged_contigs.is_file() {
            let _ = remove_if_exists(&dir);
            return Err(Error::missing_upstream_output("assemble", vec![staged_contigs]));
        }
        publish(&dir, &params_io.path_out)?;
        info!("Assembly written to {}", params_io.path_contigs.display());
        Ok(AssemblyOutcome::Assembled)
    }
}
