use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::unit::WorkUnit;

pub const JOB_STDOUT: &str = "job.out";
pub const JOB_STDERR: &str = "job.err";

/// One invocation of an external tool. The job owns `log_dir`, where its captured output ends up
#[derive(Clone, Debug)]
pub struct Job {
    tool: String,
    unit: Option<WorkUnit>,
    program: PathBuf,
    args: Vec<OsString>,
    log_dir: PathBuf,
    current_dir: Option<PathBuf>,
}

impl Job {
    pub fn new<T: Into<String>, P: Into<PathBuf>, L: Into<PathBuf>>(
        tool: T,
        program: P,
        log_dir: L,
    ) -> Job {
        Job {
            tool: tool.into(),
            unit: None,
            program: program.into(),
            args: Vec::new(),
            log_dir: log_dir.into(),
            current_dir: None,
        }
    }

    pub fn unit(mut self, unit: &WorkUnit) -> Job {
        self.unit = Some(unit.clone());
        self
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Job {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Job {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn work_unit(&self) -> Option<&WorkUnit> {
        self.unit.as_ref()
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// `tool` or `tool.unit`, used as scheduler job name
    pub fn label(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{}.{}", self.tool, unit),
            None => self.tool.clone(),
        }
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.log_dir.join(JOB_STDOUT)
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.log_dir.join(JOB_STDERR)
    }

    /// The plain tool invocation, without any scheduler around it
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}
