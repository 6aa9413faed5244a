use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use itertools::Itertools;
use log::{info, warn};

use super::job::Job;
use crate::runtime::{PipelineConfig, SchedulerKind};
use crate::utils::{command_to_string, shell_quote};

pub const SBATCH: &str = "sbatch";
pub const SCANCEL: &str = "scancel";
pub const SUBMIT_STDOUT: &str = "submit.out";
pub const SUBMIT_STDERR: &str = "submit.err";

/// Lines of captured stderr quoted in an error
pub const DIAGNOSTIC_LINES: usize = 20;

/// How a job's command line is turned into a running process
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Launcher {
    /// Spawn the tool directly
    Local,
    /// Submit through `sbatch --wait`, which blocks until the job ends and exits with its status
    Slurm {
        directives: Vec<String>,
        sbatch: PathBuf,
        scancel: PathBuf,
    },
}

impl Launcher {
    pub fn slurm(directives: Vec<String>) -> Launcher {
        Launcher::Slurm {
            directives,
            sbatch: PathBuf::from(SBATCH),
            scancel: PathBuf::from(SCANCEL),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Launcher {
        match config.scheduler {
            SchedulerKind::Local => Launcher::Local,
            SchedulerKind::Slurm => Launcher::slurm(config.scheduler_directives.clone()),
        }
    }

    /// Program that has to be available for this launcher, besides the tools themselves
    pub fn required_program(&self) -> Option<&Path> {
        match self {
            Launcher::Local => None,
            Launcher::Slurm { sbatch, .. } => Some(sbatch.as_path()),
        }
    }

    pub fn command(&self, job: &Job) -> Command {
        match self {
            Launcher::Local => job.command(),
            Launcher::Slurm {
                directives, sbatch, ..
            } => {
                let wrapped = std::iter::once(job.program().as_os_str())
                    .chain(job.args().iter().map(|a| a.as_os_str()))
                    .map(shell_quote)
                    .join(" ");

                let mut cmd = Command::new(sbatch);
                cmd.arg("--wait")
                    .arg("--parsable")
                    .arg(format!("--job-name={}", job.label()))
                    .arg(format!("--output={}", job.stdout_path().display()))
                    .arg(format!("--error={}", job.stderr_path().display()));
                if let Some(dir) = job.working_dir() {
                    cmd.arg(format!("--chdir={}", dir.display()));
                }
                cmd.args(directives).arg("--wrap").arg(wrapped);
                cmd
            }
        }
    }

    pub fn render(&self, job: &Job) -> String {
        command_to_string(&self.command(job))
    }

    /// Files the spawned process's own stdout and stderr are redirected to
    pub fn capture_paths(&self, job: &Job) -> (PathBuf, PathBuf) {
        match self {
            Launcher::Local => (job.stdout_path(), job.stderr_path()),
            Launcher::Slurm { .. } => (
                job.log_dir().join(SUBMIT_STDOUT),
                job.log_dir().join(SUBMIT_STDERR),
            ),
        }
    }

    /// Cancel what the scheduler still runs for a job whose local process is about to be killed.
    /// The job id comes from `--parsable` output; without it the job is cancelled by name
    pub fn cancel(&self, job: &Job) {
        let Launcher::Slurm { scancel, .. } = self else {
            return;
        };
        let target = match submitted_job_id(&job.log_dir().join(SUBMIT_STDOUT)) {
            Some(id) => id,
            None => {
                warn!("No job id recorded for {}, cancelling by name", job.label());
                format!("--name={}", job.label())
            }
        };
        let status = Command::new(scancel)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => info!("Cancelled {} ({})", job.label(), target),
            Ok(status) => warn!("{} {} failed ({})", scancel.display(), target, status),
            Err(e) => warn!("Could not run {}: {}", scancel.display(), e),
        }
    }

    /// Tail of everything the job and its launcher wrote to stderr
    pub fn diagnostics(&self, job: &Job) -> Option<String> {
        let mut paths = vec![job.stderr_path()];
        if let Launcher::Slurm { .. } = self {
            paths.push(job.log_dir().join(SUBMIT_STDERR));
        }
        let text = paths
            .iter()
            .filter_map(|p| fs::read_to_string(p).ok())
            .map(|content| tail(&content, DIAGNOSTIC_LINES))
            .filter(|t| !t.is_empty())
            .join("\n");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// `sbatch --parsable` prints `<id>` or `<id>;<cluster>` once the job is accepted
fn submitted_job_id(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let id = content.lines().next()?.split(';').next()?.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

fn tail(content: &str, lines: usize) -> String {
    let all: Vec<&str> = content.trim_end().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slurm_wraps_command() {
        let launcher = Launcher::slurm(vec!["--partition=compute".into(), "--mem=20GB".into()]);
        let job = Job::new("pyfasta", "pyfasta", "/w").arg("split").arg("-n").arg("101");
        assert_eq!(
            launcher.render(&job),
            "sbatch --wait --parsable --job-name=pyfasta --output=/w/job.out --error=/w/job.err \
             --partition=compute --mem=20GB --wrap 'pyfasta split -n 101'"
        );
        assert_eq!(launcher.capture_paths(&job).1, PathBuf::from("/w/submit.err"));
    }

    #[test]
    fn test_submitted_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUBMIT_STDOUT);
        assert_eq!(submitted_job_id(&path), None);
        fs::write(&path, "4242\n").unwrap();
        assert_eq!(submitted_job_id(&path).as_deref(), Some("4242"));
        fs::write(&path, "4243;cluster2\n").unwrap();
        assert_eq!(submitted_job_id(&path).as_deref(), Some("4243"));
        fs::write(&path, "sbatch: error: invalid partition\n").unwrap();
        assert_eq!(submitted_job_id(&path), None);
    }

    #[test]
    fn test_local_is_plain() {
        let job = Job::new("canu", "canu", "/w").arg("-p").arg("res");
        assert_eq!(Launcher::Local.render(&job), "canu -p res");
        assert_eq!(Launcher::Local.capture_paths(&job).1, PathBuf::from("/w/job.err"));
    }

    #[test]
    fn test_diagnostics_keeps_tail() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new("proovread", "proovread", dir.path());
        let content: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        fs::write(job.stderr_path(), content).unwrap();

        let diag = Launcher::Local.diagnostics(&job).unwrap();
        assert_eq!(diag.lines().count(), DIAGNOSTIC_LINES);
        assert!(diag.ends_with("line 49"));

        let empty = Job::new("proovread", "proovread", dir.path().join("none"));
        assert_eq!(Launcher::Local.diagnostics(&empty), None);
    }
}
