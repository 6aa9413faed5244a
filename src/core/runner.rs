use std::collections::VecDeque;
use std::fs::{self, File};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::job::Job;
use super::launcher::Launcher;
use crate::runtime::{Error, IoContext};

pub const POLL_INTERVAL: Duration = Duration::from_millis(200);
const SPAWN_RETRIES: usize = 10;
const ETXTBSY: i32 = 26;

/// Set from the SIGINT handler; every runner stops at its next poll
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Ask all runners of the process to cancel their jobs. Returns true if this was already requested
pub fn interrupt() -> bool {
    INTERRUPTED.swap(true, Ordering::SeqCst)
}

///////////////////////////////
/// Submits external jobs one after the other while keeping at most `max_jobs` of them alive.
/// All parallelism lives in the child processes; this loop only waits on them
pub struct JobRunner {
    launcher: Launcher,
    max_jobs: usize,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
}

struct Running {
    slot: usize,
    job: Job,
    child: Child,
}

/// Children still alive when the runner unwinds are cancelled and killed
struct InFlight<'a> {
    launcher: &'a Launcher,
    running: Vec<Running>,
}

impl InFlight<'_> {
    fn cancel_all(&mut self) -> Vec<usize> {
        let launcher = self.launcher;
        self.running
            .drain(..)
            .map(|mut running| {
                warn!("Cancelling {}", running.job.label());
                launcher.cancel(&running.job);
                let _ = running.child.kill();
                let _ = running.child.wait();
                running.slot
            })
            .collect()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl JobRunner {
    pub fn new(launcher: Launcher, max_jobs: usize) -> JobRunner {
        JobRunner {
            launcher,
            max_jobs: max_jobs.max(1),
            poll_interval: POLL_INTERVAL,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that makes this runner cancel its jobs at the next poll once set
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst) || INTERRUPTED.load(Ordering::SeqCst)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> JobRunner {
        self.poll_interval = poll_interval;
        self
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn render(&self, job: &Job) -> String {
        self.launcher.render(job)
    }

    /// Run a single job to completion
    pub fn run(&self, job: Job) -> Result<Job, Error> {
        self.run_all(vec![job])
            .pop()
            .unwrap_or_else(|| Err(Error::configuration("No job was run")))
    }

    /// Run every job. One result per job, in the order given, whatever order they finish in.
    /// A failing job does not stop the others
    pub fn run_all(&self, jobs: Vec<Job>) -> Vec<Result<Job, Error>> {
        let mut results: Vec<Option<Result<Job, Error>>> = (0..jobs.len()).map(|_| None).collect();
        let mut pending: VecDeque<(usize, Job)> = jobs.into_iter().enumerate().collect();
        let mut in_flight = InFlight {
            launcher: &self.launcher,
            running: Vec::new(),
        };

        while !pending.is_empty() || !in_flight.running.is_empty() {
            if self.is_cancelled() {
                warn!(
                    "Cancelling {} running and {} queued jobs",
                    in_flight.running.len(),
                    pending.len()
                );
                let slots = in_flight
                    .cancel_all()
                    .into_iter()
                    .chain(pending.drain(..).map(|(slot, _)| slot));
                for slot in slots {
                    results[slot] = Some(Err(Error::Cancelled));
                }
                break;
            }

            while in_flight.running.len() < self.max_jobs {
                let Some((slot, job)) = pending.pop_front() else {
                    break;
                };
                match self.spawn(&job) {
                    Ok(child) => in_flight.running.push(Running { slot, job, child }),
                    Err(e) => {
                        error!("Could not start {}: {}", job.label(), e);
                        results[slot] = Some(Err(e));
                    }
                }
            }

            let mut finished_any = false;
            let mut i = 0;
            while i < in_flight.running.len() {
                match in_flight.running[i].child.try_wait() {
                    Ok(Some(status)) => {
                        let Running { slot, job, .. } = in_flight.running.swap_remove(i);
                        results[slot] = Some(self.finish(job, status));
                        finished_any = true;
                    }
                    Ok(None) => i += 1,
                    Err(e) => {
                        let Running { slot, job, mut child } = in_flight.running.swap_remove(i);
                        let _ = child.kill();
                        results[slot] = Some(Err(Error::io(
                            format!("Lost track of {}", job.label()),
                            job.log_dir(),
                            e,
                        )));
                        finished_any = true;
                    }
                }
            }

            if !finished_any && !in_flight.running.is_empty() {
                thread::sleep(self.poll_interval);
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(Error::configuration("Job was never scheduled"))))
            .collect()
    }

    fn spawn(&self, job: &Job) -> Result<Child, Error> {
        fs::create_dir_all(job.log_dir()).with_path("Failed to create log directory", job.log_dir())?;
        let (path_stdout, path_stderr) = self.launcher.capture_paths(job);
        let stdout = File::create(&path_stdout).with_path("Failed to create", &path_stdout)?;
        let stderr = File::create(&path_stderr).with_path("Failed to create", &path_stderr)?;

        let mut cmd = self.launcher.command(job);
        let program = cmd.get_program().to_string_lossy().into_owned();
        info!("Submitting {}", job.label());
        debug!("{}", self.launcher.render(job));

        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // A freshly written script can still be open in a concurrently forked process
        let mut attempt = 0;
        let spawned = loop {
            match cmd.spawn() {
                Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempt < SPAWN_RETRIES => {
                    attempt += 1;
                    thread::sleep(self.poll_interval);
                }
                other => break other,
            }
        };
        spawned.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Error::utility_not_executable(program)
            }
            _ => Error::io(format!("Failed to spawn {}", job.label()), job.program(), e),
        })
    }

    fn finish(&self, job: Job, status: ExitStatus) -> Result<Job, Error> {
        if status.success() {
            info!("Finished {}", job.label());
            return Ok(job);
        }
        let e = Error::external_tool_failure(
            job.tool(),
            job.work_unit().map(|u| u.name()),
            self.launcher.render(&job),
            status,
            self.launcher.diagnostics(&job),
        );
        error!("{}", e);
        Err(e)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::unit::resolve_units;

    fn sh(dir: &std::path::Path, name: &str, script: &str) -> Job {
        Job::new(name, "/bin/sh", dir.join(name)).arg("-c").arg(script)
    }

    #[test]
    fn test_results_keep_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("order.txt");
        let jobs = vec![
            sh(dir.path(), "slow", &format!("sleep 0.3; echo slow >> {}", out.display())),
            sh(dir.path(), "fast", &format!("echo fast >> {}", out.display())),
        ];
        let runner = JobRunner::new(Launcher::Local, 2).with_poll_interval(Duration::from_millis(10));
        let results = runner.run_all(jobs);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().tool(), "slow");
        assert_eq!(results[1].as_ref().unwrap().tool(), "fast");
        assert_eq!(fs::read_to_string(out).unwrap(), "fast\nslow\n");
    }

    #[test]
    fn test_failure_is_attributed_to_its_unit() {
        let dir = tempfile::tempdir().unwrap();
        let units = resolve_units("sample", 3).unwrap();
        let jobs: Vec<Job> = units
            .iter()
            .map(|u| {
                let script = if u.index() == 1 {
                    "echo corrupt input >&2; exit 3"
                } else {
                    "exit 0"
                };
                sh(dir.path(), &u.name(), script).unit(u)
            })
            .collect();
        let runner = JobRunner::new(Launcher::Local, 1).with_poll_interval(Duration::from_millis(10));
        let results = runner.run_all(jobs);

        assert!(results[0].is_ok());
        assert!(results[2].is_ok());
        match &results[1] {
            Err(Error::ExternalToolFailure { unit, stderr, .. }) => {
                assert_eq!(unit.as_deref(), Some("sample.001"));
                assert_eq!(stderr.as_deref(), Some("corrupt input"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_cancel_reaches_the_scheduler() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        // accepts the job, then waits on it like `sbatch --wait`
        let sbatch = script("sbatch", "#!/bin/sh\necho '4242;cluster'\nexec sleep 30\n");
        let scancel_log = dir.path().join("scancel.log");
        let scancel = script(
            "scancel",
            &format!("#!/bin/sh\necho \"$@\" >> {}\n", scancel_log.display()),
        );
        let launcher = Launcher::Slurm {
            directives: Vec::new(),
            sbatch,
            scancel,
        };
        let runner = JobRunner::new(launcher, 1).with_poll_interval(Duration::from_millis(10));

        let units = resolve_units("sample", 2).unwrap();
        let jobs: Vec<Job> = units
            .iter()
            .map(|u| sh(dir.path(), &u.name(), "exit 0").unit(u))
            .collect();
        let token = runner.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            token.store(true, Ordering::SeqCst);
        });
        let results = runner.run_all(jobs);
        canceller.join().unwrap();

        assert!(matches!(results[0], Err(Error::Cancelled)));
        assert!(matches!(results[1], Err(Error::Cancelled)));
        assert_eq!(fs::read_to_string(scancel_log).unwrap(), "4242\n");
        // the queued unit was never submitted
        assert!(!dir.path().join("sample.001").exists());
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new("canu", dir.path().join("no-such-canu"), dir.path().join("log"));
        let runner = JobRunner::new(Launcher::Local, 4);
        assert!(matches!(
            runner.run(job),
            Err(Error::UtilityNotExecutable { .. })
        ));
    }
}
