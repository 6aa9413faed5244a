use std::path::Path;
use std::path::PathBuf;

use clap::Args;
use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::runtime::Error;
use crate::runtime::IoContext;
use crate::utils::expand_and_resolve_path;

pub const DEFAULT_UNITS: usize = 101;
pub const DEFAULT_THREADS: usize = 8;
pub const DEFAULT_PROOVREAD_THREADS: usize = 24;
pub const DEFAULT_PROOVREAD_COVERAGE: usize = 100;
pub const DEFAULT_GENOME_SIZE: &str = "565m";
pub const DEFAULT_JOBS: usize = 60;

pub const DEFAULT_SPLITTER_BIN: &str = "pyfasta";
pub const DEFAULT_COLORMAP_BIN: &str = "runCorr.sh";
pub const DEFAULT_PROOVREAD_BIN: &str = "proovread";
pub const DEFAULT_CANU_BIN: &str = "canu";

/// Which external corrector the correction stage invokes
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectorKind {
    Colormap,
    Proovread,
}

/// Where external jobs are executed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    #[default]
    Local,
    Slurm,
}

///////////////////////////////
/// One layer of settings. The same struct is read from the command line and from a TOML file;
/// command line values win.
#[derive(Args, Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// TOML file with pipeline settings. Command line options override it
    #[arg(long = "config", value_parser = clap::value_parser!(PathBuf))]
    #[serde(skip)]
    pub path_config: Option<PathBuf>,

    /// Uncorrected long reads (FASTA)
    #[arg(short = 'l', long = "long-reads", value_parser = clap::value_parser!(PathBuf))]
    pub long_reads: Option<PathBuf>,

    /// Short reads used for correction (FASTA/FASTQ)
    #[arg(short = 's', long = "short-reads", value_parser = clap::value_parser!(PathBuf))]
    pub short_reads: Option<PathBuf>,

    /// Corrector to run on every work unit
    #[arg(short = 'c', long, value_enum)]
    pub corrector: Option<CorrectorKind>,

    /// Number of work units the long reads are split into [default: 101]
    #[arg(short = 'n', long, value_parser = clap::value_parser!(usize))]
    pub units: Option<usize>,

    /// Threads given to each colormap job [default: 8]
    #[arg(short = 't', long, value_parser = clap::value_parser!(usize))]
    pub threads: Option<usize>,

    /// Threads given to each proovread job [default: 24]
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub proovread_threads: Option<usize>,

    /// Short read coverage proovread samples down to [default: 100]
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub proovread_coverage: Option<usize>,

    /// Genome size estimate handed to canu, e.g. 565m [default: 565m]
    #[arg(long)]
    pub genome_size: Option<String>,

    /// gridOptions for canu. When set canu submits its own grid jobs
    #[arg(long, allow_hyphen_values = true)]
    pub grid_options: Option<String>,

    /// Where external jobs run
    #[arg(long, value_enum)]
    pub scheduler: Option<SchedulerKind>,

    /// Directive passed as-is to the scheduler, e.g. --partition=compute. Repeatable
    #[arg(long = "directive", allow_hyphen_values = true)]
    #[serde(default)]
    pub scheduler_directives: Vec<String>,

    /// Maximum number of external jobs alive at once [default: 60]
    #[arg(short = 'j', long, value_parser = clap::value_parser!(usize))]
    pub jobs: Option<usize>,

    /// Directory all outputs are written to [default: .]
    #[arg(short = 'o', long = "out-dir", value_parser = clap::value_parser!(PathBuf))]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(PathBuf))]
    pub splitter_bin: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(PathBuf))]
    pub colormap_bin: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(PathBuf))]
    pub proovread_bin: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(PathBuf))]
    pub canu_bin: Option<PathBuf>,

    /// Rerun stages even if their outputs exist
    #[arg(long)]
    #[serde(default)]
    pub force: bool,
}

impl ConfigLayer {
    /// Read a layer from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<ConfigLayer, Error> {
        let content = std::fs::read_to_string(path).with_path("Failed to read config file", path)?;
        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("Config file {:?} is invalid: {}", path, e))
        })
    }

    /// Fill every unset value of self from the layer below
    pub fn over(self, below: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            path_config: self.path_config.or(below.path_config),
            long_reads: self.long_reads.or(below.long_reads),
            short_reads: self.short_reads.or(below.short_reads),
            corrector: self.corrector.or(below.corrector),
            units: self.units.or(below.units),
            threads: self.threads.or(below.threads),
            proovread_threads: self.proovread_threads.or(below.proovread_threads),
            proovread_coverage: self.proovread_coverage.or(below.proovread_coverage),
            genome_size: self.genome_size.or(below.genome_size),
            grid_options: self.grid_options.or(below.grid_options),
            scheduler: self.scheduler.or(below.scheduler),
            scheduler_directives: if self.scheduler_directives.is_empty() {
                below.scheduler_directives
            } else {
                self.scheduler_directives
            },
            jobs: self.jobs.or(below.jobs),
            out_dir: self.out_dir.or(below.out_dir),
            splitter_bin: self.splitter_bin.or(below.splitter_bin),
            colormap_bin: self.colormap_bin.or(below.colormap_bin),
            proovread_bin: self.proovread_bin.or(below.proovread_bin),
            canu_bin: self.canu_bin.or(below.canu_bin),
            force: self.force || below.force,
        }
    }

    /// Merge with the config file if one was given, apply defaults and validate
    pub fn resolve(&self) -> Result<PipelineConfig, Error> {
        let layer = match &self.path_config {
            Some(path) => {
                let path = expand_and_resolve_path(path)?;
                self.clone().over(ConfigLayer::from_toml_file(&path)?)
            }
            None => self.clone(),
        };
        PipelineConfig::from_layer(layer)
    }
}

///////////////////////////////
/// Settings of one pipeline run. Built once and handed to every stage by reference
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub long_reads: PathBuf,
    pub short_reads: PathBuf,
    pub corrector: CorrectorKind,
    pub units: usize,
    pub threads: usize,
    pub proovread_threads: usize,
    pub proovread_coverage: usize,
    pub genome_size: String,
    pub grid_options: Option<String>,
    pub scheduler: SchedulerKind,
    pub scheduler_directives: Vec<String>,
    pub jobs: usize,
    pub out_dir: PathBuf,
    pub splitter_bin: PathBuf,
    pub colormap_bin: PathBuf,
    pub proovread_bin: PathBuf,
    pub canu_bin: PathBuf,
    pub force: bool,
}

impl PipelineConfig {
    pub fn from_layer(layer: ConfigLayer) -> Result<PipelineConfig, Error> {
        let long_reads = layer
            .long_reads
            .ok_or_else(|| Error::configuration("No long read file given (--long-reads)"))?;
        let short_reads = layer
            .short_reads
            .ok_or_else(|| Error::configuration("No short read file given (--short-reads)"))?;
        let corrector = layer.corrector.ok_or_else(|| {
            Error::configuration("No corrector selected (--corrector colormap|proovread)")
        })?;

        let config = PipelineConfig {
            long_reads: expand_and_resolve_path(long_reads)?,
            short_reads: expand_and_resolve_path(short_reads)?,
            corrector,
            units: layer.units.unwrap_or(DEFAULT_UNITS),
            threads: layer.threads.unwrap_or(DEFAULT_THREADS),
            proovread_threads: layer.proovread_threads.unwrap_or(DEFAULT_PROOVREAD_THREADS),
            proovread_coverage: layer.proovread_coverage.unwrap_or(DEFAULT_PROOVREAD_COVERAGE),
            genome_size: layer
                .genome_size
                .unwrap_or_else(|| DEFAULT_GENOME_SIZE.to_string()),
            grid_options: layer.grid_options.filter(|g| !g.trim().is_empty()),
            scheduler: layer.scheduler.unwrap_or_default(),
            scheduler_directives: layer.scheduler_directives,
            jobs: layer.jobs.unwrap_or(DEFAULT_JOBS),
            out_dir: expand_and_resolve_path(layer.out_dir.unwrap_or_else(|| PathBuf::from(".")))?,
            splitter_bin: layer
                .splitter_bin
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPLITTER_BIN)),
            colormap_bin: layer
                .colormap_bin
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COLORMAP_BIN)),
            proovread_bin: layer
                .proovread_bin
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROOVREAD_BIN)),
            canu_bin: layer.canu_bin.unwrap_or_else(|| PathBuf::from(DEFAULT_CANU_BIN)),
            force: layer.force,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (what, path) in [("long read", &self.long_reads), ("short read", &self.short_reads)] {
            if !path.is_file() {
                return Err(Error::configuration(format!(
                    "The {} file {:?} does not exist or is not a file",
                    what, path
                )));
            }
            if let Err(e) = std::fs::File::open(path) {
                return Err(Error::configuration(format!(
                    "The {} file {:?} is not readable: {}",
                    what, path, e
                )));
            }
        }
        if self.units == 0 {
            return Err(Error::configuration("The number of units must be positive"));
        }
        if self.threads == 0 || self.proovread_threads == 0 {
            return Err(Error::configuration("Thread counts must be positive"));
        }
        if self.proovread_coverage == 0 {
            return Err(Error::configuration("Proovread coverage must be positive"));
        }
        if self.jobs == 0 {
            return Err(Error::configuration("The job limit must be positive"));
        }
        if !is_genome_size(&self.genome_size) {
            return Err(Error::configuration(format!(
                "Genome size '{}' is not a number with an optional k/m/g suffix",
                self.genome_size
            )));
        }
        if self.scheduler == SchedulerKind::Local && !self.scheduler_directives.is_empty() {
            log::warn!("Scheduler directives are ignored when jobs run locally");
        }
        Ok(())
    }
}

lazy_static! {
    static ref GENOME_SIZE: Regex = Regex::new(r"^[0-9]+(\.[0-9]+)?[kKmMgG]?$").unwrap();
}

fn is_genome_size(s: &str) -> bool {
    GENOME_SIZE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layer_with_inputs(dir: &Path) -> ConfigLayer {
        let long_reads = dir.join("sample.fasta");
        let short_reads = dir.join("short.fastq");
        fs::write(&long_reads, ">r1\nACGT\n").unwrap();
        fs::write(&short_reads, "@s1\nACGT\n+\nIIII\n").unwrap();
        ConfigLayer {
            long_reads: Some(long_reads),
            short_reads: Some(short_reads),
            corrector: Some(CorrectorKind::Colormap),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_layer(layer_with_inputs(dir.path())).unwrap();
        assert_eq!(config.units, 101);
        assert_eq!(config.threads, 8);
        assert_eq!(config.proovread_threads, 24);
        assert_eq!(config.proovread_coverage, 100);
        assert_eq!(config.genome_size, "565m");
        assert_eq!(config.scheduler, SchedulerKind::Local);
        assert_eq!(config.grid_options, None);
        assert!(!config.force);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();

        let mut layer = layer_with_inputs(dir.path());
        layer.units = Some(0);
        assert!(matches!(
            PipelineConfig::from_layer(layer),
            Err(Error::Configuration { .. })
        ));

        let mut layer = layer_with_inputs(dir.path());
        layer.genome_size = Some("big".to_string());
        assert!(matches!(
            PipelineConfig::from_layer(layer),
            Err(Error::Configuration { .. })
        ));

        let mut layer = layer_with_inputs(dir.path());
        layer.short_reads = Some(dir.path().join("missing.fastq"));
        assert!(matches!(
            PipelineConfig::from_layer(layer),
            Err(Error::Configuration { .. })
        ));

        let mut layer = layer_with_inputs(dir.path());
        layer.corrector = None;
        assert!(matches!(
            PipelineConfig::from_layer(layer),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = layer_with_inputs(dir.path());
        let path_toml = dir.path().join("pipeline.toml");
        fs::write(
            &path_toml,
            format!(
                "long_reads = {:?}\nshort_reads = {:?}\ncorrector = \"proovread\"\nunits = 7\nthreads = 3\nscheduler = \"slurm\"\nscheduler_directives = [\"--partition=compute\"]\n",
                base.long_reads.as_ref().unwrap(),
                base.short_reads.as_ref().unwrap()
            ),
        )
        .unwrap();

        let cli = ConfigLayer {
            path_config: Some(path_toml),
            units: Some(2),
            ..Default::default()
        };
        let config = cli.resolve().unwrap();
        assert_eq!(config.units, 2);
        assert_eq!(config.threads, 3);
        assert_eq!(config.corrector, CorrectorKind::Proovread);
        assert_eq!(config.scheduler, SchedulerKind::Slurm);
        assert_eq!(config.scheduler_directives, vec!["--partition=compute".to_string()]);
    }

    #[test]
    fn test_unknown_keys_in_file_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path_toml = dir.path().join("pipeline.toml");
        fs::write(&path_toml, "numJobs = 101\n").unwrap();
        assert!(matches!(
            ConfigLayer::from_toml_file(&path_toml),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_genome_size_format() {
        assert!(is_genome_size("565m"));
        assert!(is_genome_size("4.8M"));
        assert!(is_genome_size("1200000"));
        assert!(!is_genome_size("m"));
        assert!(!is_genome_size("5x"));
    }
}
