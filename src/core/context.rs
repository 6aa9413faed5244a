use std::path::Path;

use super::layout::Layout;
use super::launcher::Launcher;
use super::runner::JobRunner;
use super::unit::{resolve_units, WorkUnit};
use crate::runtime::{Error, PipelineConfig};
use crate::utils::check_executable;

/// Everything a stage needs, derived once from the configuration
pub struct Context<'a> {
    pub config: &'a PipelineConfig,
    pub layout: Layout,
    pub units: Vec<WorkUnit>,
    pub runner: JobRunner,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Context<'a>, Error> {
        let layout = Layout::from_config(config)?;
        let units = resolve_units(layout.prefix(), config.units)?;
        let runner = JobRunner::new(Launcher::from_config(config), config.jobs);
        Ok(Context {
            config,
            layout,
            units,
            runner,
        })
    }

    pub fn with_runner(mut self, runner: JobRunner) -> Context<'a> {
        self.runner = runner;
        self
    }

    /// Fail early if a program the stages need cannot be executed.
    /// Under a scheduler the tools run on other hosts, so only the submit program is checked
    pub fn check_programs(&self, programs: &[&Path]) -> Result<(), Error> {
        match self.runner.launcher().required_program() {
            Some(submit) => check_executable(submit),
            None => programs.iter().try_for_each(|p| check_executable(p)),
        }
    }
}
